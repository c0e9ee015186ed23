/*!
# Virtio-net Header Bridge

Linux TUN devices opened with offload enabled prefix every packet with a
`virtio_net_hdr`. This module converts between that header and the offload
metadata of a [`Segment`], so the engine can sit directly behind such a
device: outbound GSO buffers read from the device become segments ready for
[`SclpOffload::segment_outbound_default`](crate::SclpOffload::segment_outbound_default),
and coalesced buffers get a header the kernel can re-segment.

The kernel has no SCLP segmentation type. Coalesced SCLP buffers are
advertised as TCPv4 GSO, which is how the kernel side of SCLP offload
re-splits them.

See: <https://github.com/torvalds/linux/blob/master/include/uapi/linux/virtio_net.h>
*/

use crate::error::{Error, Result};
use crate::header::SCLP_HDR_LEN;
use crate::segment::{ChecksumState, GsoType, Segment};
use byteorder::{ByteOrder, NativeEndian};
use bytes::BytesMut;

/// Use `csum_start` and `csum_offset`.
pub const VIRTIO_NET_HDR_F_NEEDS_CSUM: u8 = 1;
/// Checksum already validated.
pub const VIRTIO_NET_HDR_F_DATA_VALID: u8 = 2;

/// Not a GSO frame.
pub const VIRTIO_NET_HDR_GSO_NONE: u8 = 0;
/// GSO frame, IPv4 TCP. Also carries coalesced SCLP.
pub const VIRTIO_NET_HDR_GSO_TCPV4: u8 = 1;

/// Size of the virtio network header in bytes.
pub const VIRTIO_NET_HDR_LEN: usize = 10;

/// `virtio_net_hdr`, fields in native byte order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtioNetHdr {
    pub flags: u8,
    pub gso_type: u8,
    /// Bytes of headers preceding the payload (lower layers + SCLP).
    pub hdr_len: u16,
    /// Payload bytes per segment when re-split.
    pub gso_size: u16,
    pub csum_start: u16,
    /// Where the checksum goes, relative to `csum_start`.
    pub csum_offset: u16,
}

impl VirtioNetHdr {
    /// Decode the header at the start of `buf`.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedHeader`] if `buf` is shorter than [`VIRTIO_NET_HDR_LEN`].
    pub fn decode(buf: &[u8]) -> Result<VirtioNetHdr> {
        if buf.len() < VIRTIO_NET_HDR_LEN {
            return Err(Error::MalformedHeader { len: buf.len() });
        }
        Ok(VirtioNetHdr {
            flags: buf[0],
            gso_type: buf[1],
            hdr_len: NativeEndian::read_u16(&buf[2..]),
            gso_size: NativeEndian::read_u16(&buf[4..]),
            csum_start: NativeEndian::read_u16(&buf[6..]),
            csum_offset: NativeEndian::read_u16(&buf[8..]),
        })
    }

    /// Encode into the first [`VIRTIO_NET_HDR_LEN`] bytes of `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < VIRTIO_NET_HDR_LEN {
            return Err(Error::MalformedHeader { len: buf.len() });
        }
        buf[0] = self.flags;
        buf[1] = self.gso_type;
        NativeEndian::write_u16(&mut buf[2..], self.hdr_len);
        NativeEndian::write_u16(&mut buf[4..], self.gso_size);
        NativeEndian::write_u16(&mut buf[6..], self.csum_start);
        NativeEndian::write_u16(&mut buf[8..], self.csum_offset);
        Ok(())
    }

    /// Header describing `seg` to a device.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOffset`] if a checksum or header offset does not fit
    /// the 16-bit fields.
    pub fn for_segment(seg: &Segment) -> Result<VirtioNetHdr> {
        let field = |offset: usize| {
            u16::try_from(offset).map_err(|_| Error::InvalidOffset {
                offset,
                len: seg.len(),
            })
        };
        let mut hdr = VirtioNetHdr::default();
        match seg.csum {
            ChecksumState::Partial { start, offset } => {
                hdr.flags = VIRTIO_NET_HDR_F_NEEDS_CSUM;
                hdr.csum_start = field(start)?;
                hdr.csum_offset = field(offset)?;
            }
            ChecksumState::Unnecessary => hdr.flags = VIRTIO_NET_HDR_F_DATA_VALID,
            _ => {}
        }
        if seg.gso_type == GsoType::Sclp && seg.gso_size > 0 {
            hdr.gso_type = VIRTIO_NET_HDR_GSO_TCPV4;
            hdr.hdr_len = field(seg.transport_offset() + SCLP_HDR_LEN)?;
            hdr.gso_size = seg.gso_size;
        }
        Ok(hdr)
    }

    /// Build a segment from a packet read after this header.
    ///
    /// `transport_offset` locates the SCLP header within `packet`; a GSO
    /// header contributes its `gso_size` as the split boundary.
    pub fn into_segment(self, packet: BytesMut, transport_offset: usize) -> Result<Segment> {
        let mut seg = Segment::new(packet, transport_offset)?;
        if self.flags & VIRTIO_NET_HDR_F_NEEDS_CSUM != 0 {
            seg.csum = ChecksumState::Partial {
                start: usize::from(self.csum_start),
                offset: usize::from(self.csum_offset),
            };
        } else if self.flags & VIRTIO_NET_HDR_F_DATA_VALID != 0 {
            seg.csum = ChecksumState::Unnecessary;
        }
        if self.gso_type != VIRTIO_NET_HDR_GSO_NONE {
            seg.gso_size = self.gso_size;
        }
        Ok(seg)
    }
}

/*!
# Segments and Buffer Primitives

A [`Segment`] is one buffer travelling through the engine: optional
lower-layer bytes, the SCLP header at `transport_offset`, then payload. It
carries the offload metadata the engine reads and writes (checksum state,
`gso_size`, `gso_segs`).

The mechanical work of copying payload into several buffers (split) and
appending one buffer's payload to another (merge) is behind the
[`BufferOps`] trait. [`LinearBufferOps`] is the default, copying into
contiguous [`BytesMut`] buffers.
*/

use crate::checksum::{checksum, checksum_no_fold, csum_fold};
use crate::error::{Error, Result};
use crate::header::{write_check, SclpHeader, SCLP_CHECK_OFFSET, SCLP_HDR_LEN};
use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;

/// Checksum bookkeeping for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumState {
    /// Nothing is known; software must verify (receive) or compute (transmit).
    #[default]
    Unchecked,
    /// Hardware summed the transport span; the raw, unfolded sum.
    Complete(u32),
    /// Verified on receive, or computed in software on transmit.
    Unnecessary,
    /// Computation is delegated: sum from `start` to the end of the buffer
    /// and store the result at `start + offset`.
    Partial { start: usize, offset: usize },
    /// Verification failed. The next layer decides whether to drop.
    Invalid,
}

/// Segmentation type of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GsoType {
    #[default]
    None,
    /// A coalesced SCLP buffer that can be re-split at `gso_size`.
    Sclp,
}

/// One buffer plus the offload metadata attached to it.
#[derive(Debug, Clone)]
pub struct Segment {
    buf: BytesMut,
    transport_offset: usize,
    flow_hint: u32,
    pub csum: ChecksumState,
    /// Segment size: the split boundary on transmit, the coalescing mss on receive.
    pub gso_size: u16,
    /// Number of wire segments this buffer stands for.
    pub gso_segs: u16,
    pub gso_type: GsoType,
}

impl Segment {
    /// Wrap `buf`, whose SCLP header starts at `transport_offset`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOffset`] if the offset lies past the end of `buf`.
    pub fn new(buf: BytesMut, transport_offset: usize) -> Result<Segment> {
        if transport_offset > buf.len() {
            return Err(Error::InvalidOffset {
                offset: transport_offset,
                len: buf.len(),
            });
        }
        Ok(Segment {
            buf,
            transport_offset,
            flow_hint: 0,
            csum: ChecksumState::Unchecked,
            gso_size: 0,
            gso_segs: 1,
            gso_type: GsoType::None,
        })
    }

    pub fn from_slice(data: &[u8], transport_offset: usize) -> Result<Segment> {
        Segment::new(BytesMut::from(data), transport_offset)
    }

    /// Build a transport-only segment (no lower-layer bytes) from a header and payload.
    pub fn build(hdr: &SclpHeader, payload: &[u8]) -> Segment {
        let mut buf = BytesMut::with_capacity(SCLP_HDR_LEN + payload.len());
        buf.extend_from_slice(&hdr.to_bytes());
        buf.extend_from_slice(payload);
        Segment {
            buf,
            transport_offset: 0,
            flow_hint: 0,
            csum: ChecksumState::Unchecked,
            gso_size: 0,
            gso_segs: 1,
            gso_type: GsoType::None,
        }
    }

    /// Tag the segment with the dispatcher's flow hint. Accumulations only
    /// consider segments with an equal hint.
    pub fn with_flow_hint(mut self, flow_hint: u32) -> Segment {
        self.flow_hint = flow_hint;
        self
    }

    pub fn flow_hint(&self) -> u32 {
        self.flow_hint
    }

    pub fn transport_offset(&self) -> usize {
        self.transport_offset
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    /// Whether the buffer holds a complete SCLP header.
    pub fn has_header(&self) -> bool {
        self.buf.len() >= self.transport_offset + SCLP_HDR_LEN
    }

    /// Bytes from the SCLP header to the end of the buffer.
    pub fn transport(&self) -> &[u8] {
        &self.buf[self.transport_offset..]
    }

    pub(crate) fn transport_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.transport_offset..]
    }

    /// Bytes after the SCLP header; empty when the header is incomplete.
    pub fn payload(&self) -> &[u8] {
        let start = self.transport_offset + SCLP_HDR_LEN;
        self.buf.get(start..).unwrap_or(&[])
    }

    pub fn payload_len(&self) -> usize {
        self.payload().len()
    }

    pub fn header(&self) -> Result<SclpHeader> {
        SclpHeader::decode(self.transport()).map_err(|_| Error::MalformedHeader {
            len: self.buf.len(),
        })
    }

    pub fn set_header(&mut self, hdr: &SclpHeader) -> Result<()> {
        let len = self.buf.len();
        hdr.encode(self.transport_mut())
            .map_err(|_| Error::MalformedHeader { len })
    }

    /// Compute the checksum over the transport span in software and store it.
    ///
    /// Leaves the segment in [`ChecksumState::Unnecessary`].
    pub fn compute_checksum(&mut self) -> Result<()> {
        if !self.has_header() {
            return Err(Error::MalformedHeader {
                len: self.buf.len(),
            });
        }
        let span = self.transport_mut();
        write_check(span, 0);
        let check = csum_fold(checksum_no_fold(span, 0));
        write_check(span, check);
        self.csum = ChecksumState::Unnecessary;
        Ok(())
    }

    /// Whether the stored checksum matches the transport span.
    pub fn verify_checksum(&self) -> bool {
        self.has_header() && csum_fold(checksum_no_fold(self.transport(), 0)) == 0
    }

    /// Complete a delegated checksum in software.
    ///
    /// The value already stored at the checksum location seeds the sum, as a
    /// device would treat it. Segments in any other state are left alone.
    pub fn resolve_checksum(&mut self) -> Result<()> {
        let ChecksumState::Partial { start, offset } = self.csum else {
            return Ok(());
        };
        let csum_at = start + offset;
        if csum_at + 2 > self.buf.len() {
            return Err(Error::InvalidOffset {
                offset: csum_at,
                len: self.buf.len(),
            });
        }
        let initial = BigEndian::read_u16(&self.buf[csum_at..]);
        self.buf[csum_at] = 0;
        self.buf[csum_at + 1] = 0;
        let computed = checksum(&self.buf[start..], u64::from(initial));
        BigEndian::write_u16(&mut self.buf[csum_at..], !computed);
        self.csum = ChecksumState::Unnecessary;
        Ok(())
    }

    /// Hand checksum computation to the device: zero the field and record
    /// where the sum starts and where it goes.
    pub(crate) fn delegate_checksum(&mut self) {
        write_check(self.transport_mut(), 0);
        self.csum = ChecksumState::Partial {
            start: self.transport_offset,
            offset: SCLP_CHECK_OFFSET,
        };
    }

    pub(crate) fn extend_payload(&mut self, payload: &[u8]) {
        self.buf.extend_from_slice(payload);
    }
}

/// A segment the merge primitive refused, handed back with the reason.
#[derive(Debug)]
pub struct MergeRejected {
    pub segment: Segment,
    pub error: Error,
}

/// Mechanical buffer operations the engine delegates.
pub trait BufferOps {
    /// Split `seg` at `mss`-byte payload boundaries.
    ///
    /// Every output repeats the bytes of `seg` up to and including the SCLP
    /// header, followed by its slice of the payload. Outputs inherit the
    /// checksum state and flow hint of `seg`.
    fn split(&self, seg: &Segment, mss: usize) -> Result<Vec<Segment>>;

    /// Append the payload of `seg` to `acc`.
    ///
    /// On failure `seg` is returned untouched so the caller can deliver it.
    fn merge(&self, acc: &mut Segment, seg: Segment) -> Result<(), MergeRejected>;
}

/// Default 64 KiB merge ceiling, the largest IP datagram.
pub const DEFAULT_MAX_MERGED_LEN: usize = u16::MAX as usize;

/// Default cap on the number of segments a single split may produce.
pub const DEFAULT_MAX_SEGMENTS: usize = 1024;

/// Copies payload into contiguous buffers.
#[derive(Debug, Clone, Copy)]
pub struct LinearBufferOps {
    /// Largest buffer `merge` may produce, headers included.
    pub max_merged_len: usize,
    pub max_segments: usize,
}

impl Default for LinearBufferOps {
    fn default() -> Self {
        LinearBufferOps {
            max_merged_len: DEFAULT_MAX_MERGED_LEN,
            max_segments: DEFAULT_MAX_SEGMENTS,
        }
    }
}

impl BufferOps for LinearBufferOps {
    fn split(&self, seg: &Segment, mss: usize) -> Result<Vec<Segment>> {
        if mss == 0 {
            return Err(Error::InvalidMss(mss));
        }
        if !seg.has_header() {
            return Err(Error::MalformedHeader { len: seg.len() });
        }
        let headers_len = seg.transport_offset + SCLP_HDR_LEN;
        let (headers, payload) = seg.buf.split_at(headers_len);
        let needed = payload.len().div_ceil(mss);
        if needed > self.max_segments {
            return Err(Error::TooManySegments {
                needed,
                limit: self.max_segments,
            });
        }

        let segs = payload
            .chunks(mss)
            .map(|chunk| {
                let mut buf = BytesMut::with_capacity(headers_len + chunk.len());
                buf.extend_from_slice(headers);
                buf.extend_from_slice(chunk);
                Segment {
                    buf,
                    transport_offset: seg.transport_offset,
                    flow_hint: seg.flow_hint,
                    csum: seg.csum,
                    gso_size: 0,
                    gso_segs: 1,
                    gso_type: GsoType::None,
                }
            })
            .collect();
        Ok(segs)
    }

    fn merge(&self, acc: &mut Segment, seg: Segment) -> Result<(), MergeRejected> {
        let len = acc.len() + seg.payload_len();
        if len > self.max_merged_len {
            return Err(MergeRejected {
                segment: seg,
                error: Error::ResourceExhaustion {
                    len,
                    limit: self.max_merged_len,
                },
            });
        }
        acc.extend_payload(seg.payload());
        Ok(())
    }
}

/*!
# SCLP Header

The fixed 12-byte SCLP header, in network byte order:

```text
 0               2               4                               8
+---------------+---------------+-------------------------------+
|   source id   |    dest id    |F|          stream id          |
+---------------+---------------+-------------------------------+
|   remaining   |   checksum    |
+---------------+---------------+
```

`F` is the first-segment flag. It shares the 32-bit stream word with the
stream identifier on the wire, but [`SclpHeader`] keeps the two apart; the
packing happens only in [`SclpHeader::decode`] and [`SclpHeader::encode`].
*/

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// Size of the SCLP header in bytes.
pub const SCLP_HDR_LEN: usize = 12;

/// IP protocol number dispatchers use to route buffers to this engine.
pub const IPPROTO_SCLP: u8 = 253;

/// Bits of the stream word that identify a stream. Only these take part in
/// flow-continuity comparisons.
pub const SCLP_ID_MASK: u32 = 0x7FFF_FFFF;

/// Bit of the stream word marking the first segment of a split.
pub const SCLP_FIRST_SEGMENT: u32 = 0x8000_0000;

/// Offset of the checksum field within the header.
pub const SCLP_CHECK_OFFSET: usize = 10;

const SOURCE_OFFSET: usize = 0;
const DEST_OFFSET: usize = 2;
const ID_OFFSET: usize = 4;
const REMAINING_OFFSET: usize = 8;

/// Decoded SCLP header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SclpHeader {
    pub source: u16,
    pub dest: u16,
    /// Stream identifier, always within [`SCLP_ID_MASK`].
    pub stream_id: u32,
    pub first_segment: bool,
    /// Payload bytes of the original datagram still to come after this segment.
    pub remaining: u16,
    pub check: u16,
}

impl SclpHeader {
    pub fn new(source: u16, dest: u16, stream_id: u32) -> SclpHeader {
        SclpHeader {
            source,
            dest,
            stream_id: stream_id & SCLP_ID_MASK,
            ..Default::default()
        }
    }

    /// Decode the header found at the start of `buf`.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedHeader`] if `buf` is shorter than [`SCLP_HDR_LEN`].
    pub fn decode(buf: &[u8]) -> Result<SclpHeader> {
        if buf.len() < SCLP_HDR_LEN {
            return Err(Error::MalformedHeader { len: buf.len() });
        }
        let id = BigEndian::read_u32(&buf[ID_OFFSET..]);
        Ok(SclpHeader {
            source: BigEndian::read_u16(&buf[SOURCE_OFFSET..]),
            dest: BigEndian::read_u16(&buf[DEST_OFFSET..]),
            stream_id: id & SCLP_ID_MASK,
            first_segment: id & SCLP_FIRST_SEGMENT != 0,
            remaining: BigEndian::read_u16(&buf[REMAINING_OFFSET..]),
            check: BigEndian::read_u16(&buf[SCLP_CHECK_OFFSET..]),
        })
    }

    /// Encode this header into the first [`SCLP_HDR_LEN`] bytes of `buf`.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedHeader`] if `buf` is shorter than [`SCLP_HDR_LEN`].
    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < SCLP_HDR_LEN {
            return Err(Error::MalformedHeader { len: buf.len() });
        }
        buf[..SCLP_HDR_LEN].copy_from_slice(&self.to_bytes());
        Ok(())
    }

    /// The header in wire format.
    pub fn to_bytes(&self) -> [u8; SCLP_HDR_LEN] {
        let mut buf = [0u8; SCLP_HDR_LEN];
        BigEndian::write_u16(&mut buf[SOURCE_OFFSET..], self.source);
        BigEndian::write_u16(&mut buf[DEST_OFFSET..], self.dest);
        BigEndian::write_u32(&mut buf[ID_OFFSET..], self.stream_word());
        BigEndian::write_u16(&mut buf[REMAINING_OFFSET..], self.remaining);
        BigEndian::write_u16(&mut buf[SCLP_CHECK_OFFSET..], self.check);
        buf
    }

    /// The stream word as it appears on the wire.
    pub fn stream_word(&self) -> u32 {
        let flag = if self.first_segment {
            SCLP_FIRST_SEGMENT
        } else {
            0
        };
        (self.stream_id & SCLP_ID_MASK) | flag
    }

    /// Source and destination ids as the single 32-bit unit used for flow matching.
    pub fn endpoints(&self) -> u32 {
        (u32::from(self.source) << 16) | u32::from(self.dest)
    }

    /// Whether `other` belongs to the same logical stream (masked id equality).
    pub fn same_stream(&self, other: &SclpHeader) -> bool {
        (self.stream_id ^ other.stream_id) & SCLP_ID_MASK == 0
    }
}

/// Overwrite the `remaining` field of the header at the start of `buf`.
pub(crate) fn write_remaining(buf: &mut [u8], remaining: u16) {
    BigEndian::write_u16(&mut buf[REMAINING_OFFSET..REMAINING_OFFSET + 2], remaining);
}

/// Overwrite the checksum field of the header at the start of `buf`.
pub(crate) fn write_check(buf: &mut [u8], check: u16) {
    BigEndian::write_u16(&mut buf[SCLP_CHECK_OFFSET..SCLP_CHECK_OFFSET + 2], check);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_layout() {
        let hdr = SclpHeader {
            source: 0x0102,
            dest: 0x0304,
            stream_id: 0x0506_0708,
            first_segment: true,
            remaining: 0x090a,
            check: 0x0b0c,
        };
        let buf = hdr.to_bytes();
        let mut encoded = [0u8; SCLP_HDR_LEN + 2];
        hdr.encode(&mut encoded).unwrap();
        assert_eq!(encoded[..SCLP_HDR_LEN], buf);
        assert_eq!(
            buf,
            [0x01, 0x02, 0x03, 0x04, 0x85, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c]
        );
        assert_eq!(SclpHeader::decode(&buf).unwrap(), hdr);
    }

    #[test]
    fn flag_is_split_from_stream_id() {
        let buf = [0, 1, 0, 2, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0];
        let hdr = SclpHeader::decode(&buf).unwrap();
        assert!(hdr.first_segment);
        assert_eq!(hdr.stream_id, SCLP_ID_MASK);
        assert_eq!(hdr.endpoints(), 0x0001_0002);
    }

    #[test]
    fn same_stream_ignores_flag() {
        let a = SclpHeader::new(1, 2, 77);
        let mut b = a;
        b.first_segment = true;
        assert!(a.same_stream(&b));
        b.stream_id = 78;
        assert!(!a.same_stream(&b));
    }

    #[test]
    fn short_buffer() {
        assert_eq!(
            SclpHeader::decode(&[0u8; 11]),
            Err(Error::MalformedHeader { len: 11 })
        );
        let mut buf = [0u8; 4];
        assert!(SclpHeader::default().encode(&mut buf).is_err());
    }

    #[test]
    fn in_place_writers() {
        let mut buf = [0u8; SCLP_HDR_LEN];
        write_remaining(&mut buf, 2000);
        write_check(&mut buf, 0xbeef);
        let hdr = SclpHeader::decode(&buf).unwrap();
        assert_eq!(hdr.remaining, 2000);
        assert_eq!(hdr.check, 0xbeef);
    }
}

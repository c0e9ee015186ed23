//! Internet (RFC 1071) ones'-complement checksum helpers.
//!
//! SCLP checksums cover the transport header and payload only; there is no
//! pseudo-header. A sender stores `csum_fold(sum)` with the checksum field
//! zeroed, so a receiver summing the same span including the stored value
//! folds to `0xFFFF` and `csum_fold` of it yields 0.

use byteorder::{BigEndian, ByteOrder};

/// Accumulates `b` into a 64-bit ones'-complement sum without folding.
///
/// The input is consumed as big-endian u32 words; an odd trailing byte is
/// padded on the right, as RFC 1071 requires.
pub fn checksum_no_fold(b: &[u8], initial: u64) -> u64 {
    let mut words = b.chunks_exact(4);
    let mut accumulator = initial;
    for word in &mut words {
        accumulator += u64::from(BigEndian::read_u32(word));
    }

    let tail = words.remainder();
    let mut pairs = tail.chunks_exact(2);
    for pair in &mut pairs {
        accumulator += u64::from(BigEndian::read_u16(pair));
    }
    if let Some(&byte) = pairs.remainder().first() {
        accumulator += u64::from(byte) << 8;
    }
    accumulator
}

/// Folds a 64-bit accumulator down to 16 bits.
pub fn fold(mut accumulator: u64) -> u16 {
    while accumulator > 0xFFFF {
        accumulator = (accumulator >> 16) + (accumulator & 0xFFFF);
    }
    accumulator as u16
}

/// Folded (not complemented) checksum of `b`, seeded with `initial`.
pub fn checksum(b: &[u8], initial: u64) -> u16 {
    fold(checksum_no_fold(b, initial))
}

/// Complement of the folded sum: the value written into a checksum field,
/// and 0 when a span that already contains its checksum verifies.
pub fn csum_fold(accumulator: u64) -> u16 {
    !fold(accumulator)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rfc1071_example() {
        // Worked example from RFC 1071 section 3.
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data, 0), 0xddf2);
    }

    #[test]
    fn odd_length_pads_last_byte() {
        assert_eq!(checksum(&[0xab], 0), 0xab00);
        assert_eq!(checksum(&[0x12, 0x34, 0x56], 0), 0x1234 + 0x5600);
    }

    #[test]
    fn stored_checksum_verifies() {
        let mut data = vec![0u8; 37];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        data[10] = 0;
        data[11] = 0;
        let check = csum_fold(checksum_no_fold(&data, 0));
        BigEndian::write_u16(&mut data[10..12], check);
        assert_eq!(csum_fold(checksum_no_fold(&data, 0)), 0);

        data[20] ^= 0x40;
        assert_ne!(csum_fold(checksum_no_fold(&data, 0)), 0);
    }

    #[test]
    fn fold_carries() {
        assert_eq!(fold(0x1_FFFF), 0x0001);
        assert_eq!(fold(0xFFFF_FFFF_FFFF), 0xFFFF);
    }
}

//! Generic Segmentation Offload: split one oversized SCLP buffer into a
//! chain of wire-ready segments.

use crate::error::{Error, Result};
use crate::segment::{BufferOps, ChecksumState, Segment};

/// Check that `seg` can be segmented at all: it must hold an SCLP header at
/// its transport offset.
pub fn gso_send_check(seg: &Segment) -> Result<()> {
    if !seg.has_header() {
        return Err(Error::MalformedHeader { len: seg.len() });
    }
    Ok(())
}

/// Split `seg` into segments of at most `seg.gso_size` payload bytes.
///
/// Each output carries a copy of the outbound header with:
/// - the first-segment flag set on the first output only,
/// - `remaining` counting the payload bytes still to follow, ending at 0,
/// - a checksum computed in software, or delegated when `seg` is in
///   [`ChecksumState::Partial`].
///
/// # Errors
///
/// - [`Error::MalformedHeader`] if `seg` has no complete header.
/// - [`Error::InvalidMss`] if `gso_size` is 0.
/// - [`Error::NotOversized`] if the payload already fits in one segment.
/// - [`Error::PayloadTooLarge`] if the first `remaining` exceeds 16 bits.
/// - Whatever the split primitive reports.
pub fn gso_segment<O: BufferOps + ?Sized>(ops: &O, mut seg: Segment) -> Result<Vec<Segment>> {
    gso_send_check(&seg)?;

    let mss = usize::from(seg.gso_size);
    if mss == 0 {
        return Err(Error::InvalidMss(mss));
    }
    let payload_len = seg.payload_len();
    if payload_len <= mss {
        return Err(Error::NotOversized { payload_len, mss });
    }
    let mut rem = u16::try_from(payload_len - mss)
        .map_err(|_| Error::PayloadTooLarge { payload_len })?;

    // The stream word goes out with only the masked id; the flag is set
    // again on the first output below.
    let mut hdr = seg.header()?;
    hdr.first_segment = false;
    hdr.check = 0;
    seg.set_header(&hdr)?;

    let delegate = matches!(seg.csum, ChecksumState::Partial { .. });
    let mut segs = ops.split(&seg, mss)?;

    for (i, out) in segs.iter_mut().enumerate() {
        hdr.first_segment = i == 0;
        hdr.remaining = rem;
        out.set_header(&hdr)?;

        if delegate {
            out.delegate_checksum();
        } else {
            out.compute_checksum()?;
        }

        rem = rem.saturating_sub(mss as u16);
    }

    log::debug!(
        "split {} payload bytes of stream {:#x} into {} segments at mss {}",
        payload_len,
        hdr.stream_id,
        segs.len(),
        mss
    );
    Ok(segs)
}

/*!
# Generic Receive Offload

Coalesces consecutive inbound SCLP segments of one flow into a single
buffer before protocol processing.

## How SCLP GRO Works

1. Every segment passes a checksum gate. A segment that fails is delivered
   un-merged and marked [`ChecksumState::Invalid`].
2. [`find_flow`] looks for a pending [`Accumulation`] with the same flow hint
   and endpoint pair.
3. The segment is merged when its masked stream id matches, it does not open
   a new split, it is no larger than the accumulation's mss, and its
   `remaining` continues the accumulation's byte accounting:
   `(remaining + payload_len) ^ accumulation.remaining == 0`.
4. An accumulation that already stands for `u16::MAX` segments, or whose
   mss does not fit 16 bits, takes no more segments.
5. A rejected segment flushes the matched accumulation and starts a new one.
6. A merged segment that is short, or whose `remaining` is 0, closes the
   accumulation, which [`gro_complete`] turns into one large buffer.
*/

use crate::error::FlushReason;
use crate::header::{write_check, write_remaining, SclpHeader, SCLP_CHECK_OFFSET};
use crate::segment::{BufferOps, ChecksumState, GsoType, MergeRejected, Segment};

/// A pending merge: the buffer built so far plus its bookkeeping.
#[derive(Debug)]
pub struct Accumulation {
    head: Segment,
    hdr: SclpHeader,
    mss: usize,
    count: u16,
    flush: bool,
}

impl Accumulation {
    /// Start an accumulation from `seg`, whose header must be readable.
    ///
    /// The payload length of the first segment becomes the mss every later
    /// segment is measured against.
    fn start(seg: Segment, hdr: SclpHeader) -> Accumulation {
        Accumulation {
            mss: seg.payload_len(),
            head: seg,
            hdr,
            count: 1,
            flush: false,
        }
    }

    /// Header of the accumulated buffer; `remaining` tracks the last merged segment.
    pub fn header(&self) -> &SclpHeader {
        &self.hdr
    }

    pub fn mss(&self) -> usize {
        self.mss
    }

    /// Wire segments absorbed so far.
    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn segment(&self) -> &Segment {
        &self.head
    }

    pub fn flow_hint(&self) -> u32 {
        self.head.flow_hint()
    }

    /// Mark the accumulation so the next segment offered to it flushes it
    /// instead of merging.
    pub fn request_flush(&mut self) {
        self.flush = true;
    }

    pub fn is_flush_requested(&self) -> bool {
        self.flush
    }
}

/// What happened to a segment offered to [`gro_receive`].
#[derive(Debug)]
pub enum MatchOutcome {
    /// Merged into the accumulation at this index, which stays pending.
    Merged(usize),
    /// Deliver this buffer upward now: either a finalized accumulation the
    /// segment completed, or the segment itself when it cannot be coalesced.
    FlushNow(Segment),
    /// The segment now heads a new pending accumulation (the last one in the
    /// list). `evicted` is the finalized accumulation it could not extend.
    NewAccumulation { evicted: Option<Segment> },
}

/// Index of the first pending accumulation that `hdr` may continue.
///
/// Candidates are scanned in arrival order. An accumulation qualifies when
/// its flow hint equals `flow_hint` and its endpoint pair equals the
/// segment's. Nothing is recorded on the accumulations, so every call starts
/// from a clean slate.
pub fn find_flow(hdr: &SclpHeader, flow_hint: u32, pending: &[Accumulation]) -> Option<usize> {
    pending.iter().position(|acc| {
        acc.flow_hint() == flow_hint && acc.hdr.endpoints() == hdr.endpoints()
    })
}

/// Checksum gate run on every segment before coalescing.
///
/// Returns false when the segment failed verification; it is then marked
/// [`ChecksumState::Invalid`].
fn checksum_gate(seg: &mut Segment) -> bool {
    let valid = match seg.csum {
        ChecksumState::Complete(sum) => crate::checksum::csum_fold(u64::from(sum)) == 0,
        ChecksumState::Unchecked => seg.verify_checksum(),
        ChecksumState::Unnecessary | ChecksumState::Partial { .. } => return true,
        ChecksumState::Invalid => false,
    };
    seg.csum = if valid {
        ChecksumState::Unnecessary
    } else {
        ChecksumState::Invalid
    };
    valid
}

/// Why `hdr` (with `payload_len` bytes) cannot extend `acc`, if it cannot.
fn merge_rejection(acc: &Accumulation, hdr: &SclpHeader, payload_len: usize) -> Option<FlushReason> {
    if acc.flush {
        return Some(FlushReason::Requested);
    }
    if !acc.hdr.same_stream(hdr) {
        return Some(FlushReason::StreamChanged);
    }
    if hdr.first_segment {
        return Some(FlushReason::NewSplit);
    }
    if payload_len > acc.mss {
        return Some(FlushReason::Oversized);
    }
    if (u32::from(hdr.remaining) + payload_len as u32) ^ u32::from(acc.hdr.remaining) != 0 {
        return Some(FlushReason::RemainingMismatch);
    }
    // gso_segs and gso_size are 16-bit on the finalized buffer.
    if acc.count == u16::MAX || acc.mss > usize::from(u16::MAX) {
        return Some(FlushReason::ResourceExhaustion);
    }
    None
}

/// Offer one inbound segment to the pending accumulations.
///
/// New accumulations are appended to `pending`; flushed ones are removed,
/// finalized with [`gro_complete`] and returned in the outcome. The caller
/// owns `pending` and decides when to flush what is left.
pub fn gro_receive<O: BufferOps + ?Sized>(
    ops: &O,
    mut seg: Segment,
    pending: &mut Vec<Accumulation>,
) -> MatchOutcome {
    if !checksum_gate(&mut seg) {
        log::debug!(
            "{:?}: delivering {}-byte segment un-merged",
            FlushReason::ChecksumMismatch,
            seg.len()
        );
        return MatchOutcome::FlushNow(seg);
    }

    let hdr = match seg.header() {
        Ok(hdr) => hdr,
        Err(e) => {
            log::debug!("not a coalescing candidate: {e}");
            return MatchOutcome::FlushNow(seg);
        }
    };
    let len = seg.payload_len();
    if len == 0 {
        return MatchOutcome::FlushNow(seg);
    }

    let Some(index) = find_flow(&hdr, seg.flow_hint(), pending) else {
        log::trace!(
            "new accumulation for {:#010x} stream {:#x}, mss {}",
            hdr.endpoints(),
            hdr.stream_id,
            len
        );
        pending.push(Accumulation::start(seg, hdr));
        return MatchOutcome::NewAccumulation { evicted: None };
    };

    let acc = &mut pending[index];
    let rejection = match merge_rejection(acc, &hdr, len) {
        Some(reason) => Some((reason, seg)),
        None => match ops.merge(&mut acc.head, seg) {
            Ok(()) => None,
            Err(MergeRejected { segment, error }) => {
                log::warn!("merge into {:#010x} failed: {error}", hdr.endpoints());
                Some((FlushReason::ResourceExhaustion, segment))
            }
        },
    };

    if let Some((reason, seg)) = rejection {
        log::debug!(
            "{:?}: flushing {}-segment accumulation for {:#010x}",
            reason,
            acc.count,
            hdr.endpoints()
        );
        let evicted = gro_complete(pending.remove(index));
        pending.push(Accumulation::start(seg, hdr));
        return MatchOutcome::NewAccumulation {
            evicted: Some(evicted),
        };
    }

    acc.count += 1;
    acc.hdr.remaining = hdr.remaining;
    write_remaining(acc.head.transport_mut(), hdr.remaining);

    let reason = if len < acc.mss {
        Some(FlushReason::ShortSegment)
    } else if hdr.remaining == 0 {
        Some(FlushReason::EndOfStream)
    } else {
        None
    };
    match reason {
        Some(reason) => {
            log::trace!("{:?}: accumulation for {:#010x} complete", reason, hdr.endpoints());
            MatchOutcome::FlushNow(gro_complete(pending.remove(index)))
        }
        None => MatchOutcome::Merged(index),
    }
}

/// Turn a flushed accumulation into a buffer ready for protocol processing.
///
/// A buffer that never absorbed another segment is released as received.
/// A coalesced one gets its checksum field cleared and a delegated checksum
/// directive covering the whole merged payload, is typed as an SCLP GSO
/// buffer with the accumulation's mss, and records how many wire segments
/// it stands for.
pub fn gro_complete(acc: Accumulation) -> Segment {
    let Accumulation {
        mut head,
        mss,
        count,
        ..
    } = acc;

    if count == 1 {
        head.gso_size = 0;
        head.gso_segs = 1;
        return head;
    }

    write_check(head.transport_mut(), 0);
    head.csum = ChecksumState::Partial {
        start: head.transport_offset(),
        offset: SCLP_CHECK_OFFSET,
    };
    head.gso_type = GsoType::Sclp;
    // Merges stop before the mss or count outgrow 16 bits.
    head.gso_size = u16::try_from(mss).unwrap_or(u16::MAX);
    head.gso_segs = count;
    head
}

use crate::error::FlushReason;
use crate::gro::{Accumulation, MatchOutcome};
use crate::offload::NetOffload;
use crate::segment::Segment;

/// Per-context receive state: pending accumulations and the buffers ready
/// for delivery.
///
/// A `GroTable` is owned by one receive context (one queue, one worker). It
/// is not shared; give every context its own table and route a flow's
/// segments to the same context.
///
/// ```
/// use sclp_offload::{GroTable, OffloadBuilder, Segment, SclpHeader};
///
/// let offload = OffloadBuilder::new().build()?;
/// let mut table = GroTable::new();
///
/// let mut big = Segment::build(&SclpHeader::new(1, 2, 3), &[7u8; 3000]);
/// big.gso_size = 1000;
/// let wire = offload.segment_outbound_default(big)?;
///
/// let delivered = table.receive_batch(&offload, wire);
/// assert_eq!(delivered.len(), 1);
/// assert_eq!(delivered[0].payload_len(), 3000);
/// assert_eq!(delivered[0].gso_segs, 3);
/// # Ok::<(), sclp_offload::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct GroTable {
    pending: Vec<Accumulation>,
    delivered: Vec<Segment>,
}

impl GroTable {
    pub fn new() -> GroTable {
        GroTable::default()
    }

    /// Accumulations still waiting for more segments, oldest first.
    pub fn pending(&self) -> &[Accumulation] {
        &self.pending
    }

    /// Buffers ready for delivery, in delivery order.
    pub fn delivered(&self) -> &[Segment] {
        &self.delivered
    }

    pub fn take_delivered(&mut self) -> Vec<Segment> {
        std::mem::take(&mut self.delivered)
    }

    /// Offer one segment, queueing whatever it causes to be delivered.
    pub fn receive<N: NetOffload + ?Sized>(&mut self, offload: &N, seg: Segment) {
        match offload.gro_receive(seg, &mut self.pending) {
            MatchOutcome::Merged(_) => {}
            MatchOutcome::FlushNow(seg) => self.delivered.push(seg),
            MatchOutcome::NewAccumulation { evicted } => {
                if let Some(seg) = evicted {
                    self.delivered.push(seg);
                }
                if self.pending.len() > offload.max_pending() {
                    let oldest = self.pending.remove(0);
                    log::debug!(
                        "{:?}: evicting {}-segment accumulation",
                        FlushReason::TableFull,
                        oldest.count()
                    );
                    self.delivered.push(offload.gro_complete(oldest));
                }
            }
        }
    }

    /// Finalize every pending accumulation, oldest first.
    pub fn flush<N: NetOffload + ?Sized>(&mut self, offload: &N) {
        for acc in self.pending.drain(..) {
            self.delivered.push(offload.gro_complete(acc));
        }
    }

    /// Process a whole receive batch: offer every segment, flush what is
    /// still pending, and return everything delivered.
    pub fn receive_batch<N, I>(&mut self, offload: &N, segs: I) -> Vec<Segment>
    where
        N: NetOffload + ?Sized,
        I: IntoIterator<Item = Segment>,
    {
        for seg in segs {
            self.receive(offload, seg);
        }
        self.flush(offload);
        self.take_delivered()
    }
}

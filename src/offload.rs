use crate::config::OffloadConfig;
use crate::error::Result;
use crate::gro::{self, Accumulation, MatchOutcome};
use crate::gso;
use crate::segment::{BufferOps, ChecksumState, Segment};

/// The four offload callbacks a packet pipeline drives for one protocol.
///
/// [`GroTable`](crate::GroTable) is generic over this trait, so an engine for
/// another protocol, or a test double, can stand in for [`SclpOffload`].
pub trait NetOffload {
    /// Validate an outbound buffer before segmentation.
    fn gso_send_check(&self, seg: &Segment) -> Result<()>;

    /// Split an outbound buffer at its `gso_size`.
    fn gso_segment(&self, seg: Segment) -> Result<Vec<Segment>>;

    /// Offer an inbound segment to the pending accumulations.
    fn gro_receive(&self, seg: Segment, pending: &mut Vec<Accumulation>) -> MatchOutcome;

    /// Finalize a flushed accumulation.
    fn gro_complete(&self, acc: Accumulation) -> Segment;

    /// Pending accumulations a receive context may hold.
    fn max_pending(&self) -> usize;
}

/// SCLP segmentation and receive offload engine.
///
/// Immutable once built, so one instance can serve any number of receive
/// contexts; each context keeps its own pending accumulations.
#[derive(Debug, Clone)]
pub struct SclpOffload<O = crate::segment::LinearBufferOps> {
    config: OffloadConfig,
    ops: O,
}

impl<O: BufferOps> SclpOffload<O> {
    pub(crate) fn new(config: OffloadConfig, ops: O) -> Self {
        SclpOffload { config, ops }
    }

    pub fn config(&self) -> &OffloadConfig {
        &self.config
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// Split `seg` into segments of at most `mss` payload bytes.
    ///
    /// With transmit checksum offload configured, an unchecked buffer is
    /// switched to a delegated checksum first.
    pub fn segment_outbound(&self, mut seg: Segment, mss: u16) -> Result<Vec<Segment>> {
        seg.gso_size = mss;
        if self.config.tx_checksum_offload && seg.csum == ChecksumState::Unchecked {
            seg.csum = ChecksumState::Partial {
                start: seg.transport_offset(),
                offset: crate::header::SCLP_CHECK_OFFSET,
            };
        }
        gso::gso_segment(&self.ops, seg)
    }

    /// [`segment_outbound`](Self::segment_outbound) with the buffer's own
    /// `gso_size`, falling back to the configured mss.
    pub fn segment_outbound_default(&self, seg: Segment) -> Result<Vec<Segment>> {
        let mss = if seg.gso_size == 0 {
            self.config.mss
        } else {
            seg.gso_size
        };
        self.segment_outbound(seg, mss)
    }

    pub fn offer_inbound(&self, seg: Segment, pending: &mut Vec<Accumulation>) -> MatchOutcome {
        gro::gro_receive(&self.ops, seg, pending)
    }

    pub fn finalize(&self, acc: Accumulation) -> Segment {
        gro::gro_complete(acc)
    }
}

impl<O: BufferOps> NetOffload for SclpOffload<O> {
    fn gso_send_check(&self, seg: &Segment) -> Result<()> {
        gso::gso_send_check(seg)
    }

    fn gso_segment(&self, seg: Segment) -> Result<Vec<Segment>> {
        self.segment_outbound_default(seg)
    }

    fn gro_receive(&self, seg: Segment, pending: &mut Vec<Accumulation>) -> MatchOutcome {
        self.offer_inbound(seg, pending)
    }

    fn gro_complete(&self, acc: Accumulation) -> Segment {
        self.finalize(acc)
    }

    fn max_pending(&self) -> usize {
        self.config.max_pending
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::header::SclpHeader;
    use crate::OffloadBuilder;

    fn outbound(payload_len: usize) -> Segment {
        Segment::build(&SclpHeader::new(4, 5, 6), &vec![0x5a; payload_len])
    }

    #[test]
    fn tx_checksum_offload_delegates() {
        let offload = OffloadBuilder::new()
            .tx_checksum_offload(true)
            .build()
            .unwrap();
        let segs = offload.segment_outbound(outbound(2500), 1000).unwrap();
        assert_eq!(segs.len(), 3);
        assert!(segs
            .iter()
            .all(|s| matches!(s.csum, ChecksumState::Partial { .. })));
    }

    #[test]
    fn software_checksums_by_default() {
        let offload = OffloadBuilder::new().build().unwrap();
        let segs = offload.segment_outbound(outbound(2500), 1000).unwrap();
        assert!(segs.iter().all(Segment::verify_checksum));
    }

    #[test]
    fn configured_mss_is_the_fallback() {
        let offload = OffloadBuilder::new().mss(600).build().unwrap();
        let segs = NetOffload::gso_segment(&offload, outbound(1500)).unwrap();
        assert_eq!(segs.len(), 3);

        let mut seg = outbound(1500);
        seg.gso_size = 1000;
        assert_eq!(offload.segment_outbound_default(seg).unwrap().len(), 2);
    }

    #[test]
    fn send_check() {
        let offload = OffloadBuilder::new().build().unwrap();
        assert!(offload.gso_send_check(&outbound(0)).is_ok());
        let short = Segment::from_slice(&[1, 2, 3], 0).unwrap();
        assert!(offload.gso_send_check(&short).is_err());
    }
}

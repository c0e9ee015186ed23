/*!
# sclp-offload: Segmentation and Receive Offload for SCLP

SCLP is a transport protocol carried directly over IP. This crate does the
offload work around it:

- **GSO (Generic Segmentation Offload)**: split one oversized outbound SCLP
  datagram into MTU-sized segments, each with a correct header and checksum.
- **GRO (Generic Receive Offload)**: merge consecutive inbound segments of the
  same flow back into one large buffer before protocol processing.

The payload of a merged buffer is byte-for-byte what the individual segments
carried; the engine only saves the per-packet work in between.

## Quick Start

```
use sclp_offload::{GroTable, OffloadBuilder, SclpHeader, Segment};

let offload = OffloadBuilder::new().mss(1000).build()?;

// Transmit: one 3000-byte datagram becomes three wire segments.
let datagram = Segment::build(&SclpHeader::new(10, 20, 1), &vec![0xab; 3000]);
let wire = offload.segment_outbound(datagram, 1000)?;
let remaining: Vec<u16> = wire.iter().map(|s| s.header().unwrap().remaining).collect();
assert_eq!(remaining, [2000, 1000, 0]);

// Receive: the three segments coalesce back into one buffer.
let mut table = GroTable::new();
let delivered = table.receive_batch(&offload, wire);
assert_eq!(delivered.len(), 1);
assert_eq!(delivered[0].payload(), &vec![0xab; 3000][..]);
assert_eq!(delivered[0].gso_segs, 3);
# Ok::<(), sclp_offload::Error>(())
```

## Key Types

- [`SclpHeader`]: the 12-byte wire header
- [`Segment`]: a buffer plus its offload metadata
- [`SclpOffload`]: the engine, built with [`OffloadBuilder`]
- [`GroTable`]: pending accumulations of one receive context
- [`BufferOps`]: split/merge primitives, [`LinearBufferOps`] by default
- [`VirtioNetHdr`]: bridge to Linux TUN devices with offload enabled

## Concurrency

[`SclpOffload`] is immutable after construction. Each receive context owns a
[`GroTable`]; the pipeline must route all segments of a flow to the same
context. Nothing inside the engine locks.
*/

pub mod checksum;
mod config;
mod error;
pub mod gro;
pub mod gso;
mod header;
mod offload;
mod segment;
mod table;
pub mod vnet;

pub use config::{OffloadBuilder, OffloadConfig, DEFAULT_MAX_PENDING, DEFAULT_MSS};
pub use error::{Error, FlushReason, Result};
pub use gro::{Accumulation, MatchOutcome};
pub use header::{
    SclpHeader, IPPROTO_SCLP, SCLP_CHECK_OFFSET, SCLP_FIRST_SEGMENT, SCLP_HDR_LEN, SCLP_ID_MASK,
};
pub use offload::{NetOffload, SclpOffload};
pub use segment::{
    BufferOps, ChecksumState, GsoType, LinearBufferOps, MergeRejected, Segment,
    DEFAULT_MAX_MERGED_LEN, DEFAULT_MAX_SEGMENTS,
};
pub use table::GroTable;
pub use vnet::{VirtioNetHdr, VIRTIO_NET_HDR_LEN};

use std::io;
use thiserror::Error;

/// Errors surfaced by the offload engine.
///
/// Conditions the engine resolves on its own (checksum failures, stream
/// discontinuities, merge refusals) never show up here; they are turned into
/// a flush decision and reported as a [`FlushReason`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The buffer cannot hold an SCLP header at its transport offset.
    #[error("buffer of {len} bytes is too short for an SCLP header")]
    MalformedHeader { len: usize },
    /// Segmentation was requested for a payload that already fits in one segment.
    #[error("payload of {payload_len} bytes does not exceed mss {mss}")]
    NotOversized { payload_len: usize, mss: usize },
    #[error("invalid mss {0}")]
    InvalidMss(usize),
    /// The first `remaining` value would not fit the 16-bit header field.
    #[error("payload of {payload_len} bytes cannot be described by the remaining counter")]
    PayloadTooLarge { payload_len: usize },
    #[error("split needs {needed} segments, limit is {limit}")]
    TooManySegments { needed: usize, limit: usize },
    /// The merge primitive cannot extend the accumulated buffer.
    #[error("merged length {len} would exceed limit {limit}")]
    ResourceExhaustion { len: usize, limit: usize },
    #[error("transport offset {offset} is outside a {len}-byte buffer")]
    InvalidOffset { offset: usize, len: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::ResourceExhaustion { .. } | Error::TooManySegments { .. } => {
                io::ErrorKind::OutOfMemory
            }
            _ => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}

/// Why an accumulation or a segment left the coalescing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushReason {
    /// The segment failed checksum verification and is delivered un-merged.
    ChecksumMismatch,
    /// The accumulation was already marked for flushing.
    Requested,
    /// Same endpoints, different masked stream identifier.
    StreamChanged,
    /// The segment opens a new split and cannot extend an older one.
    NewSplit,
    /// The segment carries more payload than the accumulation's mss.
    Oversized,
    /// `remaining` does not continue the accumulation's byte accounting.
    RemainingMismatch,
    /// The merge primitive refused to grow the buffer.
    ResourceExhaustion,
    /// A short segment closed the accumulation.
    ShortSegment,
    /// The last segment of a split was merged.
    EndOfStream,
    /// The pending table was full and the oldest accumulation was evicted.
    TableFull,
}

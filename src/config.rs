/*!
# Offload Builder

[`OffloadBuilder`] collects the engine settings and produces an
[`SclpOffload`]:

```
use sclp_offload::OffloadBuilder;

let offload = OffloadBuilder::new()
    .mss(1400)
    .tx_checksum_offload(true)
    .max_pending(16)
    .build()?;
assert_eq!(offload.config().mss, 1400);
# Ok::<(), sclp_offload::Error>(())
```
*/

use crate::error::{Error, Result};
use crate::header::SCLP_HDR_LEN;
use crate::offload::SclpOffload;
use crate::segment::{BufferOps, LinearBufferOps, DEFAULT_MAX_MERGED_LEN, DEFAULT_MAX_SEGMENTS};

/// Segment size used when neither the caller nor the buffer supplies one.
pub const DEFAULT_MSS: u16 = 1400;

/// Accumulations a [`GroTable`](crate::GroTable) holds before evicting the
/// oldest, matching the kernel's held-packet limit.
pub const DEFAULT_MAX_PENDING: usize = 8;

/// Validated engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffloadConfig {
    /// Default split boundary for outbound buffers.
    pub mss: u16,
    /// Delegate outbound checksums to the device instead of computing them.
    pub tx_checksum_offload: bool,
    /// Largest coalesced buffer, headers included.
    pub max_merged_len: usize,
    /// Largest number of segments one split may produce.
    pub max_segments: usize,
    /// Pending accumulations per receive context.
    pub max_pending: usize,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        OffloadConfig {
            mss: DEFAULT_MSS,
            tx_checksum_offload: false,
            max_merged_len: DEFAULT_MAX_MERGED_LEN,
            max_segments: DEFAULT_MAX_SEGMENTS,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl OffloadConfig {
    fn validate(&self) -> Result<()> {
        if self.mss == 0 {
            return Err(Error::InvalidConfig("mss must be non-zero"));
        }
        if self.max_merged_len <= SCLP_HDR_LEN {
            return Err(Error::InvalidConfig(
                "max_merged_len must leave room for payload",
            ));
        }
        if self.max_segments == 0 {
            return Err(Error::InvalidConfig("max_segments must be non-zero"));
        }
        if self.max_pending == 0 {
            return Err(Error::InvalidConfig("max_pending must be non-zero"));
        }
        Ok(())
    }
}

/// Builder for [`SclpOffload`].
#[derive(Debug, Clone, Default)]
pub struct OffloadBuilder {
    config: OffloadConfig,
}

impl OffloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default maximum segment size for [`SclpOffload::segment_outbound_default`].
    pub fn mss(mut self, mss: u16) -> Self {
        self.config.mss = mss;
        self
    }

    /// Leave outbound checksums to the device. Segments produced from
    /// unchecked buffers then carry a delegated checksum directive.
    pub fn tx_checksum_offload(mut self, enable: bool) -> Self {
        self.config.tx_checksum_offload = enable;
        self
    }

    pub fn max_merged_len(mut self, len: usize) -> Self {
        self.config.max_merged_len = len;
        self
    }

    pub fn max_segments(mut self, count: usize) -> Self {
        self.config.max_segments = count;
        self
    }

    pub fn max_pending(mut self, count: usize) -> Self {
        self.config.max_pending = count;
        self
    }

    /// Build an engine over [`LinearBufferOps`] sized from this configuration.
    pub fn build(self) -> Result<SclpOffload<LinearBufferOps>> {
        let ops = LinearBufferOps {
            max_merged_len: self.config.max_merged_len,
            max_segments: self.config.max_segments,
        };
        self.build_with_ops(ops)
    }

    /// Build an engine over caller-supplied buffer primitives.
    ///
    /// `max_merged_len` and `max_segments` are then up to `ops` to enforce.
    pub fn build_with_ops<O: BufferOps>(self, ops: O) -> Result<SclpOffload<O>> {
        self.config.validate()?;
        Ok(SclpOffload::new(self.config, ops))
    }
}

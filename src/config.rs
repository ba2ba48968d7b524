//! Default compression/decompression configuration.
//!
//! `BLOSC2_CODEC` and `BLOSC2_CLEVEL` are consulted once, lazily, and cached
//! for the life of the process — mirroring the source's "read env once at
//! first use" behavior rather than re-parsing on every call.

use crate::constants::{BLOSC_BLOSCLZ, BLOSC_NOFILTER, BLOSC2_MAX_FILTERS};
use crate::constants::SplitMode;
use std::sync::OnceLock;

fn env_default_codec() -> u8 {
    static CODEC: OnceLock<u8> = OnceLock::new();
    *CODEC.get_or_init(|| {
        std::env::var("BLOSC2_CODEC")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "blosclz" => Some(BLOSC_BLOSCLZ),
                "lz4" => Some(crate::constants::BLOSC_LZ4),
                "lz4hc" => Some(crate::constants::BLOSC_LZ4HC),
                "zlib" => Some(crate::constants::BLOSC_ZLIB),
                "zstd" => Some(crate::constants::BLOSC_ZSTD),
                "snappy" => Some(crate::constants::BLOSC_SNAPPY),
                _ => None,
            })
            .unwrap_or(BLOSC_BLOSCLZ)
    })
}

fn env_default_clevel() -> u8 {
    static CLEVEL: OnceLock<u8> = OnceLock::new();
    *CLEVEL.get_or_init(|| {
        std::env::var("BLOSC2_CLEVEL")
            .ok()
            .and_then(|s| s.parse::<u8>().ok())
            .filter(|&c| c <= 9)
            .unwrap_or(5)
    })
}

/// Per-slot filter in the pipeline: id plus an opaque meta byte (used by
/// truncate-precision to carry the number of bits to keep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterSlot {
    pub id: u8,
    pub meta: u8,
}

/// Compression-side parameters for one chunk operation.
#[derive(Debug, Clone, Copy)]
pub struct CParams {
    pub codec: u8,
    pub clevel: u8,
    pub typesize: usize,
    pub filters: [FilterSlot; BLOSC2_MAX_FILTERS],
    pub blocksize: usize,
    pub splitmode: SplitMode,
    pub nthreads: usize,
    pub use_dict: bool,
}

impl Default for CParams {
    fn default() -> Self {
        CParams {
            codec: env_default_codec(),
            clevel: env_default_clevel(),
            typesize: 8,
            filters: [FilterSlot { id: BLOSC_NOFILTER, meta: 0 }; BLOSC2_MAX_FILTERS],
            blocksize: 0,
            splitmode: SplitMode::Auto,
            nthreads: 1,
            use_dict: false,
        }
    }
}

impl CParams {
    /// Convenience: a `CParams` with `filters[0]` set to the given id.
    pub fn with_filter(mut self, id: u8) -> Self {
        self.filters[0] = FilterSlot { id, meta: 0 };
        self
    }

    pub fn with_codec(mut self, codec: u8) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_typesize(mut self, typesize: usize) -> Self {
        self.typesize = typesize;
        self
    }

    pub fn with_nthreads(mut self, nthreads: usize) -> Self {
        self.nthreads = nthreads.max(1);
        self
    }
}

/// Decompression-side parameters.
#[derive(Debug, Clone, Copy)]
pub struct DParams {
    pub nthreads: usize,
}

impl Default for DParams {
    fn default() -> Self {
        DParams { nthreads: 1 }
    }
}

impl DParams {
    pub fn with_nthreads(mut self, nthreads: usize) -> Self {
        self.nthreads = nthreads.max(1);
        self
    }
}

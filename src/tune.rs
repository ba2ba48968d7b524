//! Tune hook (§4.8): decides blocksize and whether a block should be
//! byte-split before handing it to the codec. [`DefaultTune`] reproduces the
//! L1/L2-cache-size heuristic; callers needing a different strategy can
//! register one under [`crate::registry::Tune`] instead.

use crate::config::{CParams, FilterSlot};
use crate::constants::*;

const MAX_STREAMS: usize = BLOSC2_MAX_FILTERS;

fn is_hcr(codec: u8) -> bool {
    codec == BLOSC_LZ4HC || codec == BLOSC_ZLIB || codec == BLOSC_ZSTD
}

/// Whether `nbytes` compressed at `params` should be byte-split before
/// codec compression (fast codecs with shuffle enabled benefit; others
/// don't).
pub fn should_split(params: &CParams, blocksize: usize) -> bool {
    match params.splitmode {
        SplitMode::Always => return true,
        SplitMode::Never => return false,
        SplitMode::ForwardCompat | SplitMode::Auto => {}
    }

    let has_shuffle = params.filters.iter().any(|f: &FilterSlot| f.id == BLOSC_SHUFFLE);
    let fast_codec_favors_split = params.codec == BLOSC_BLOSCLZ
        || params.codec == BLOSC_LZ4
        || (params.codec == BLOSC_ZSTD && params.clevel <= 5);

    fast_codec_favors_split
        && has_shuffle
        && params.typesize <= MAX_STREAMS
        && params.typesize > 0
        && (blocksize / params.typesize) >= BLOSC_MIN_BUFFERSIZE
}

/// Resolve the effective blocksize for a chunk given `nbytes` to compress.
/// Honors an explicit `params.blocksize` override; otherwise sizes to the
/// L1/L2 cache heuristic for the chosen codec and compression level.
pub fn next_blocksize(params: &CParams, nbytes: usize) -> usize {
    if nbytes < params.typesize {
        return 1.max(nbytes);
    }

    let mut blocksize = nbytes;

    if params.blocksize != 0 {
        blocksize = params.blocksize;
    } else {
        if nbytes >= L1 {
            blocksize = L1;
            if is_hcr(params.codec) {
                blocksize *= 2;
            }
            blocksize = match params.clevel {
                0 => blocksize / 4,
                1 => blocksize / 2,
                2 => blocksize,
                3 => blocksize * 2,
                4 | 5 => blocksize * 4,
                6 | 7 | 8 => blocksize * 8,
                9 => blocksize * if is_hcr(params.codec) { 16 } else { 8 },
                _ => blocksize,
            };
        }

        let provisional_split = should_split(params, blocksize);
        if params.clevel > 0 && provisional_split {
            blocksize = match params.clevel {
                1 | 2 | 3 => 32 * 1024,
                4 | 5 | 6 => 64 * 1024,
                7 => 128 * 1024,
                8 => 256 * 1024,
                _ => 512 * 1024,
            };
            blocksize *= params.typesize.max(1);
            blocksize = blocksize.min(4 * 1024 * 1024);
            blocksize = blocksize.max(32 * 1024);
        }
    }

    if blocksize > nbytes {
        blocksize = nbytes;
    }
    if blocksize > params.typesize && params.typesize > 0 {
        blocksize = blocksize / params.typesize * params.typesize;
    }
    blocksize.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_buffer_gets_minimal_blocksize() {
        let params = CParams::default().with_typesize(8);
        assert_eq!(next_blocksize(&params, 4), 4);
    }

    #[test]
    fn explicit_blocksize_is_honored_and_aligned() {
        let mut params = CParams::default().with_typesize(8);
        params.blocksize = 100;
        assert_eq!(next_blocksize(&params, 1_000_000), 96);
    }

    #[test]
    fn blosclz_with_shuffle_favors_split() {
        let params = CParams::default().with_typesize(4).with_filter(BLOSC_SHUFFLE);
        assert!(should_split(&params, 64 * 1024));
    }
}

//! Filter pipeline: byte shuffle, bit shuffle, delta, truncate-precision,
//! byte-delta. A chunk carries up to [`crate::constants::BLOSC2_MAX_FILTERS`]
//! active slots, applied forward in slot order on compress and in reverse
//! order on decompress (§4.2).

pub mod bitshuffle;
pub mod bytedelta;
pub mod delta;
pub mod shuffle;
pub mod trunc_prec;

use crate::config::FilterSlot;
use crate::constants::*;
use crate::error::{Error, Result};

/// Run the forward filter pipeline over one block. `reference` is the
/// chunk's first block, required by the delta filter for non-reference
/// blocks (pass the same buffer as `src` when encoding the reference block
/// itself, with `is_reference = true`).
pub fn apply_forward(
    filters: &[FilterSlot; BLOSC2_MAX_FILTERS],
    typesize: usize,
    blocksize: usize,
    src: &[u8],
    reference: &[u8],
    is_reference: bool,
) -> Result<Vec<u8>> {
    let mut a = src.to_vec();
    let mut b = vec![0u8; blocksize.max(src.len())];

    for (slot, f) in filters.iter().enumerate() {
        match f.id {
            BLOSC_NOFILTER => continue,
            BLOSC_SHUFFLE => {
                shuffle::shuffle(typesize, blocksize, &a, &mut b[..blocksize]);
            }
            BLOSC_BITSHUFFLE => {
                bitshuffle::bitshuffle(typesize, blocksize, &a, &mut b[..blocksize]);
            }
            BLOSC_DELTA => {
                let offset = if is_reference { 0 } else { 1 };
                delta::delta_encoder(reference, offset, typesize, &a, &mut b[..blocksize]);
            }
            BLOSC_TRUNC_PREC => {
                let prec_bits = f.meta as i8;
                if !trunc_prec::truncate_precision(prec_bits, typesize, &a, &mut b[..blocksize]) {
                    return Err(Error::FilterError { id: f.id, slot, status: -1 });
                }
            }
            BLOSC_FILTER_BYTEDELTA => {
                bytedelta::bytedelta_encoder(typesize, blocksize, &a, &mut b[..blocksize]);
            }
            other => return Err(Error::UnknownFilter(other)),
        }
        std::mem::swap(&mut a, &mut b);
    }
    a.truncate(blocksize);
    Ok(a)
}

/// Run the backward (inverse) filter pipeline over one decoded block.
pub fn apply_backward(
    filters: &[FilterSlot; BLOSC2_MAX_FILTERS],
    typesize: usize,
    blocksize: usize,
    src: &[u8],
    reference: &[u8],
    is_reference: bool,
) -> Result<Vec<u8>> {
    let mut a = src.to_vec();
    a.resize(blocksize, 0);

    for (slot, f) in filters.iter().enumerate().rev() {
        match f.id {
            BLOSC_NOFILTER => continue,
            BLOSC_SHUFFLE => {
                let mut out = vec![0u8; blocksize];
                shuffle::unshuffle(typesize, blocksize, &a, &mut out);
                a = out;
            }
            BLOSC_BITSHUFFLE => {
                let mut out = vec![0u8; blocksize];
                bitshuffle::bitunshuffle(typesize, blocksize, &a, &mut out);
                a = out;
            }
            BLOSC_DELTA => {
                let offset = if is_reference { 0 } else { 1 };
                delta::delta_decoder(reference, offset, typesize, &mut a);
            }
            BLOSC_TRUNC_PREC => {
                // Truncation is lossy and not inverted; the stored bytes are final.
            }
            BLOSC_FILTER_BYTEDELTA => {
                let mut out = vec![0u8; blocksize];
                bytedelta::bytedelta_decoder(typesize, blocksize, &a, &mut out);
                a = out;
            }
            other => return Err(Error::FilterError { id: other, slot, status: -1 }),
        }
    }
    Ok(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_only_pipeline_roundtrips() {
        let mut filters = [FilterSlot::default(); BLOSC2_MAX_FILTERS];
        filters[0] = FilterSlot { id: BLOSC_SHUFFLE, meta: 0 };
        let src: Vec<u8> = (0u8..128).collect();
        let fwd = apply_forward(&filters, 4, src.len(), &src, &src, true).unwrap();
        let back = apply_backward(&filters, 4, src.len(), &fwd, &src, true).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn bitshuffle_then_delta_roundtrips() {
        let mut filters = [FilterSlot::default(); BLOSC2_MAX_FILTERS];
        filters[0] = FilterSlot { id: BLOSC_BITSHUFFLE, meta: 0 };
        filters[1] = FilterSlot { id: BLOSC_DELTA, meta: 0 };
        let src: Vec<u8> = (0u8..=255).cycle().take(256).collect();
        let fwd = apply_forward(&filters, 4, src.len(), &src, &src, true).unwrap();
        let back = apply_backward(&filters, 4, src.len(), &fwd, &src, true).unwrap();
        assert_eq!(back, src);
    }
}

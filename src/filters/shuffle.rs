//! Byte shuffle: regroup a block of `n` elements of `typesize` bytes each so
//! that all first bytes come first, then all second bytes, and so on. Pure
//! element-copying nested loop (no hardware vectorization, matching the
//! generic reference fallback).

/// Shuffle `src` into `dest`. `blocksize` is the number of bytes in `src`,
/// `typesize` the element size; the trailing `blocksize % typesize` bytes
/// (if any) are copied through unshuffled.
pub fn shuffle(typesize: usize, blocksize: usize, src: &[u8], dest: &mut [u8]) {
    let neblock_quot = blocksize / typesize;
    let neblock_rem = blocksize % typesize;

    for j in 0..typesize {
        for i in 0..neblock_quot {
            dest[j * neblock_quot + i] = src[i * typesize + j];
        }
    }
    let start = blocksize - neblock_rem;
    dest[start..blocksize].copy_from_slice(&src[start..blocksize]);
}

/// Inverse of [`shuffle`].
pub fn unshuffle(typesize: usize, blocksize: usize, src: &[u8], dest: &mut [u8]) {
    let neblock_quot = blocksize / typesize;
    let neblock_rem = blocksize % typesize;

    for i in 0..neblock_quot {
        for j in 0..typesize {
            dest[i * typesize + j] = src[j * neblock_quot + i];
        }
    }
    let start = blocksize - neblock_rem;
    dest[start..blocksize].copy_from_slice(&src[start..blocksize]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_aligned() {
        let src: Vec<u8> = (0u8..=255).cycle().take(256).collect();
        let mut sh = vec![0u8; src.len()];
        shuffle(4, src.len(), &src, &mut sh);
        let mut un = vec![0u8; src.len()];
        unshuffle(4, src.len(), &sh, &mut un);
        assert_eq!(un, src);
    }

    #[test]
    fn roundtrip_with_leftover() {
        let src: Vec<u8> = (0u8..=199).collect();
        let mut sh = vec![0u8; src.len()];
        shuffle(8, src.len(), &src, &mut sh);
        let mut un = vec![0u8; src.len()];
        unshuffle(8, src.len(), &sh, &mut un);
        assert_eq!(un, src);
    }
}

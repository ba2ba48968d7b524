//! Byte-delta filter: shuffle the block by byte-plane, then delta-encode
//! each plane byte-by-byte. Meant to run after shuffle has already grouped
//! same-significance bytes together, so consecutive bytes within a plane
//! tend to be close in value for smoothly varying numeric data.

/// Encode: `src` is assumed already byte-shuffled (`blocksize` bytes,
/// `typesize` planes of `blocksize / typesize` bytes each). Each plane is
/// delta-coded in place into `dest`.
pub fn bytedelta_encoder(typesize: usize, blocksize: usize, src: &[u8], dest: &mut [u8]) {
    if typesize == 0 {
        dest[..blocksize].copy_from_slice(&src[..blocksize]);
        return;
    }
    let plane_len = blocksize / typesize;
    for p in 0..typesize {
        let start = p * plane_len;
        let plane = &src[start..start + plane_len];
        let out = &mut dest[start..start + plane_len];
        if plane_len == 0 {
            continue;
        }
        out[0] = plane[0];
        for i in 1..plane_len {
            out[i] = plane[i].wrapping_sub(plane[i - 1]);
        }
    }
    let rem_start = typesize * plane_len;
    dest[rem_start..blocksize].copy_from_slice(&src[rem_start..blocksize]);
}

/// Inverse of [`bytedelta_encoder`]; result is still byte-shuffled and must
/// be unshuffled separately.
pub fn bytedelta_decoder(typesize: usize, blocksize: usize, src: &[u8], dest: &mut [u8]) {
    if typesize == 0 {
        dest[..blocksize].copy_from_slice(&src[..blocksize]);
        return;
    }
    let plane_len = blocksize / typesize;
    for p in 0..typesize {
        let start = p * plane_len;
        let plane = &src[start..start + plane_len];
        let out = &mut dest[start..start + plane_len];
        if plane_len == 0 {
            continue;
        }
        out[0] = plane[0];
        for i in 1..plane_len {
            out[i] = plane[i].wrapping_add(out[i - 1]);
        }
    }
    let rem_start = typesize * plane_len;
    dest[rem_start..blocksize].copy_from_slice(&src[rem_start..blocksize]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let src: Vec<u8> = (0u8..64).collect();
        let mut enc = vec![0u8; src.len()];
        bytedelta_encoder(4, src.len(), &src, &mut enc);
        let mut dec = vec![0u8; src.len()];
        bytedelta_decoder(4, src.len(), &enc, &mut dec);
        assert_eq!(dec, src);
    }
}

//! Strided N-D copy (§4.7): copy the region `[start, stop)` from a source
//! buffer of padded shape `src_pad_shape` into a destination buffer of
//! padded shape `dst_pad_shape` at `dst_start`, for row-major buffers of a
//! fixed `itemsize`.
//!
//! Ported from the teacher's single generic fallback loop rather than its
//! per-dimension unrolled C variants (`copy2dim`..`copy8dim`): those exist
//! there only to dodge an index-decomposition cost that doesn't matter once
//! this is single-threaded safe Rust over a `Vec`, and carrying eight
//! hand-specialized copies of the same loop would just be surface area with
//! no behavioral difference.

use crate::error::{Error, Result};
use crate::constants::B2ND_MAX_DIM;

fn strides_for(pad_shape: &[i64]) -> [i64; B2ND_MAX_DIM] {
    let ndim = pad_shape.len();
    let mut strides = [0i64; B2ND_MAX_DIM];
    if ndim == 0 {
        return strides;
    }
    strides[ndim - 1] = 1;
    for i in (0..ndim - 1).rev() {
        strides[i] = strides[i + 1] * pad_shape[i + 1];
    }
    strides
}

fn multidim_to_unidim(index: &[i64], strides: &[i64]) -> i64 {
    index.iter().zip(strides).map(|(i, s)| i * s).sum()
}

fn unidim_to_multidim(ndim: usize, shape: &[i64], mut i: i64, index: &mut [i64]) {
    if ndim == 0 {
        return;
    }
    let strides = strides_for(&shape[..ndim]);
    for j in 0..ndim {
        index[j] = i / strides[j];
        i %= strides[j];
    }
}

/// Copy `[start, stop)` (measured in elements, one entry per axis) from
/// `src` into `dst` at `dst_start`. `src`/`dst` are `itemsize`-byte-element
/// row-major buffers shaped `src_pad_shape`/`dst_pad_shape` respectively.
/// A zero-length axis (`stop[i] == start[i]`) is a no-op.
pub fn copy_region(
    itemsize: usize,
    src: &[u8],
    src_pad_shape: &[i64],
    start: &[i64],
    stop: &[i64],
    dst: &mut [u8],
    dst_pad_shape: &[i64],
    dst_start: &[i64],
) -> Result<()> {
    let ndim = src_pad_shape.len();
    if dst_pad_shape.len() != ndim || start.len() != ndim || stop.len() != ndim || dst_start.len() != ndim {
        return Err(Error::InvalidArgument("copy_region shape/start/stop dimensionality mismatch".into()));
    }
    if ndim == 0 || ndim > B2ND_MAX_DIM {
        return Err(Error::InvalidArgument("copy_region ndim out of range".into()));
    }

    let mut copy_shape = [0i64; B2ND_MAX_DIM];
    for i in 0..ndim {
        copy_shape[i] = stop[i] - start[i];
        if copy_shape[i] < 0 {
            return Err(Error::InvalidArgument("copy_region stop precedes start".into()));
        }
        if copy_shape[i] == 0 {
            return Ok(());
        }
    }

    let src_strides = strides_for(src_pad_shape);
    let dst_strides = strides_for(dst_pad_shape);

    let src_base = (multidim_to_unidim(start, &src_strides[..ndim]) as usize) * itemsize;
    let dst_base = (multidim_to_unidim(dst_start, &dst_strides[..ndim]) as usize) * itemsize;

    if ndim == 1 {
        let n = copy_shape[0] as usize * itemsize;
        dst[dst_base..dst_base + n].copy_from_slice(&src[src_base..src_base + n]);
        return Ok(());
    }

    let copy_nbytes = copy_shape[ndim - 1] as usize * itemsize;
    let outer_dims = ndim - 1;
    let number_of_copies: i64 = copy_shape[..outer_dims].iter().product();

    let mut copy_start = [0i64; B2ND_MAX_DIM];
    for ncopy in 0..number_of_copies {
        unidim_to_multidim(outer_dims, &copy_shape, ncopy, &mut copy_start);
        let src_off = multidim_to_unidim(&copy_start[..outer_dims], &src_strides[..outer_dims]) as usize * itemsize;
        let dst_off = multidim_to_unidim(&copy_start[..outer_dims], &dst_strides[..outer_dims]) as usize * itemsize;
        let s = src_base + src_off;
        let d = dst_base + dst_off;
        dst[d..d + copy_nbytes].copy_from_slice(&src[s..s + copy_nbytes]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_copy_2d_is_identity() {
        let itemsize = 4;
        let shape = [3i64, 4];
        let src: Vec<u8> = (0..(3 * 4 * 4)).map(|i| i as u8).collect();
        let mut dst = vec![0u8; src.len()];
        copy_region(itemsize, &src, &shape, &[0, 0], &shape, &mut dst, &shape, &[0, 0]).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn subregion_copy_2d_extracts_rows_and_columns() {
        let itemsize = 4;
        let shape = [4i64, 4];
        // row r, col c => value r*4 + c
        let src: Vec<u8> = (0..16u32).flat_map(|v| v.to_le_bytes()).collect();
        let dst_shape = [2i64, 2];
        let mut dst = vec![0u8; 2 * 2 * 4];
        copy_region(itemsize, &src, &shape, &[1, 1], &[3, 3], &mut dst, &dst_shape, &[0, 0]).unwrap();
        let values: Vec<u32> = dst.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect();
        assert_eq!(values, vec![5, 6, 9, 10]);
    }

    #[test]
    fn zero_length_axis_is_noop() {
        let itemsize = 4;
        let shape = [2i64, 2];
        let src = vec![0u8; 2 * 2 * 4];
        let mut dst = vec![0xffu8; 2 * 2 * 4];
        copy_region(itemsize, &src, &shape, &[0, 0], &[0, 2], &mut dst, &shape, &[0, 0]).unwrap();
        assert!(dst.iter().all(|&b| b == 0xff));
    }
}

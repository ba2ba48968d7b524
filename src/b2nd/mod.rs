//! N-D array layer (§4.7): a [`SuperChunk`] whose chunks tile an N-D logical
//! shape, with the tiling recorded in the fixed `b2nd` metadata layer so a
//! frame alone is enough to reconstruct the array.
//!
//! Every chunk in the grid is stored at its full `chunkshape` size; a chunk
//! that overhangs the array's logical shape (the last row/column/... of the
//! grid along any axis whose extent isn't a multiple of its chunkshape) is
//! zero-padded past the logical boundary, and that padding is never read
//! back out.

pub mod copy;
pub mod meta;

use crate::config::{CParams, DParams};
use crate::constants::B2ND_MAX_DIM;
use crate::error::{Error, Result};
use crate::frame;
use crate::schunk::{Storage, SuperChunk};
use std::path::Path;

/// An N-D array backed by a super-chunk whose chunks tile `shape` in
/// row-major chunk-grid order (axis 0 varies slowest).
pub struct NdArray {
    pub sc: SuperChunk,
    pub ndim: usize,
    pub shape: Vec<i64>,
    pub chunkshape: Vec<i64>,
    pub blockshape: Vec<i64>,
    pub itemsize: usize,
    pub dtype_format: u8,
    pub dtype: String,
}

fn row_major_strides(dims: &[i64]) -> Vec<i64> {
    let ndim = dims.len();
    let mut strides = vec![0i64; ndim];
    if ndim == 0 {
        return strides;
    }
    strides[ndim - 1] = 1;
    for i in (0..ndim - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

fn flatten_index(index: &[i64], strides: &[i64]) -> i64 {
    index.iter().zip(strides).map(|(i, s)| i * s).sum()
}

fn unflatten_index(mut linear: i64, dims: &[i64]) -> Vec<i64> {
    let strides = row_major_strides(dims);
    let ndim = dims.len();
    let mut idx = vec![0i64; ndim];
    for j in 0..ndim {
        if strides[j] == 0 {
            idx[j] = 0;
            continue;
        }
        idx[j] = linear / strides[j];
        linear %= strides[j];
    }
    idx
}

fn chunks_per_axis(shape: &[i64], chunkshape: &[i64]) -> Vec<i64> {
    shape
        .iter()
        .zip(chunkshape)
        .map(|(&s, &c)| if s == 0 { 0 } else { (s + c - 1) / c })
        .collect()
}

/// Call `f` once per chunk-grid multi-index in `[lo, hi]` (inclusive on both
/// ends), in row-major order.
fn for_each_chunk_in_range(lo: &[i64], hi: &[i64], mut f: impl FnMut(&[i64]) -> Result<()>) -> Result<()> {
    let ndim = lo.len();
    let dims: Vec<i64> = (0..ndim).map(|i| hi[i] - lo[i] + 1).collect();
    let total: i64 = dims.iter().product();
    for lin in 0..total {
        let rel = unflatten_index(lin, &dims);
        let cm: Vec<i64> = (0..ndim).map(|i| lo[i] + rel[i]).collect();
        f(&cm)?;
    }
    Ok(())
}

impl NdArray {
    fn validate_region(&self, start: &[i64], stop: &[i64]) -> Result<()> {
        if start.len() != self.ndim || stop.len() != self.ndim {
            return Err(Error::InvalidArgument("start/stop dimensionality mismatch".into()));
        }
        for i in 0..self.ndim {
            if start[i] < 0 || stop[i] < start[i] || stop[i] > self.shape[i] {
                return Err(Error::OutOfRange);
            }
        }
        Ok(())
    }

    fn chunk_bytes(&self) -> usize {
        self.chunkshape.iter().product::<i64>() as usize * self.itemsize
    }

    fn chunks_per_axis(&self) -> Vec<i64> {
        chunks_per_axis(&self.shape, &self.chunkshape)
    }

    fn chunk_origin(&self, cm: &[i64]) -> Vec<i64> {
        cm.iter().zip(&self.chunkshape).map(|(&c, &cs)| c * cs).collect()
    }

    /// Chunk `cm`'s logical extent (may be smaller than `chunkshape` at the
    /// edge of the array on axes whose shape isn't a chunkshape multiple).
    fn chunk_logical_stop(&self, origin: &[i64]) -> Vec<i64> {
        origin
            .iter()
            .zip(&self.shape)
            .zip(&self.chunkshape)
            .map(|((&o, &s), &cs)| (o + cs).min(s))
            .collect()
    }

    fn refresh_shape_metalayer(&mut self) -> Result<()> {
        let m = meta::Metadata {
            ndim: self.ndim,
            shape: self.shape.clone(),
            chunkshape: self.chunkshape.clone(),
            blockshape: self.blockshape.clone(),
            dtype_format: self.dtype_format,
            dtype: self.dtype.clone(),
        };
        self.sc.meta_update(meta::B2ND_METALAYER_NAME, meta::encode(&m))
    }

    fn fill_from_buffer(&mut self, src: &[u8]) -> Result<()> {
        let cpa = self.chunks_per_axis();
        let total: i64 = cpa.iter().product();
        let chunk_bytes = self.chunk_bytes();
        let zeros = vec![0i64; self.ndim];
        for lin in 0..total {
            let cm = unflatten_index(lin, &cpa);
            let origin = self.chunk_origin(&cm);
            let stop = self.chunk_logical_stop(&origin);
            let mut scratch = vec![0u8; chunk_bytes];
            copy::copy_region(self.itemsize, src, &self.shape, &origin, &stop, &mut scratch, &self.chunkshape, &zeros)?;
            self.sc.append_buffer(&scratch)?;
        }
        Ok(())
    }

    fn rebuild_from_buffer(&mut self, new_shape: Vec<i64>, buf: &[u8]) -> Result<()> {
        let storage = self.sc.storage.clone();
        let cparams = self.sc.cparams;
        let dparams = self.sc.dparams;
        let mut sc = SuperChunk::new(storage, cparams, dparams);
        let m = meta::Metadata {
            ndim: self.ndim,
            shape: new_shape.clone(),
            chunkshape: self.chunkshape.clone(),
            blockshape: self.blockshape.clone(),
            dtype_format: self.dtype_format,
            dtype: self.dtype.clone(),
        };
        sc.meta_add(meta::B2ND_METALAYER_NAME, meta::encode(&m))?;
        self.sc = sc;
        self.shape = new_shape;
        self.fill_from_buffer(buf)
    }

    /// Decompress the whole array into one contiguous row-major buffer.
    pub fn to_cbuffer(&self, dst: &mut [u8]) -> Result<()> {
        let expected = self.shape.iter().product::<i64>() as usize * self.itemsize;
        if dst.len() != expected {
            return Err(Error::BufferTooSmall { needed: expected });
        }
        let cpa = self.chunks_per_axis();
        let total: i64 = cpa.iter().product();
        let chunk_bytes = self.chunk_bytes();
        let zeros = vec![0i64; self.ndim];
        for lin in 0..total {
            let cm = unflatten_index(lin, &cpa);
            let origin = self.chunk_origin(&cm);
            let stop = self.chunk_logical_stop(&origin);
            let local_stop: Vec<i64> = stop.iter().zip(&origin).map(|(&s, &o)| s - o).collect();
            let mut scratch = vec![0u8; chunk_bytes];
            self.sc.decompress_chunk(lin as usize, &mut scratch)?;
            copy::copy_region(self.itemsize, &scratch, &self.chunkshape, &zeros, &local_stop, dst, &self.shape, &origin)?;
        }
        Ok(())
    }

    /// Copy `array[start:stop]` into `dst`, a contiguous buffer shaped
    /// `stop - start`. An empty axis (`start[i] == stop[i]`) is a no-op.
    pub fn get_slice_cbuffer(&self, start: &[i64], stop: &[i64], dst: &mut [u8]) -> Result<()> {
        self.validate_region(start, stop)?;
        let dst_shape: Vec<i64> = stop.iter().zip(start).map(|(&e, &s)| e - s).collect();
        let expected = dst_shape.iter().product::<i64>() as usize * self.itemsize;
        if dst.len() != expected {
            return Err(Error::BufferTooSmall { needed: expected });
        }
        if dst_shape.iter().any(|&d| d == 0) {
            return Ok(());
        }
        let lo: Vec<i64> = (0..self.ndim).map(|i| start[i] / self.chunkshape[i]).collect();
        let hi: Vec<i64> = (0..self.ndim).map(|i| (stop[i] - 1) / self.chunkshape[i]).collect();
        let cpa = self.chunks_per_axis();
        let cpa_strides = row_major_strides(&cpa);
        let chunk_bytes = self.chunk_bytes();

        for_each_chunk_in_range(&lo, &hi, |cm| {
            let origin = self.chunk_origin(cm);
            let chunk_stop = self.chunk_logical_stop(&origin);
            let isect_start: Vec<i64> = origin.iter().zip(start).map(|(&o, &s)| o.max(s)).collect();
            let isect_stop: Vec<i64> = chunk_stop.iter().zip(stop).map(|(&cs, &s)| cs.min(s)).collect();
            let local_start: Vec<i64> = isect_start.iter().zip(&origin).map(|(&a, &o)| a - o).collect();
            let local_stop: Vec<i64> = isect_stop.iter().zip(&origin).map(|(&a, &o)| a - o).collect();
            let dst_start: Vec<i64> = isect_start.iter().zip(start).map(|(&a, &s)| a - s).collect();

            let linear = flatten_index(cm, &cpa_strides) as usize;
            let mut scratch = vec![0u8; chunk_bytes];
            self.sc.decompress_chunk(linear, &mut scratch)?;
            copy::copy_region(self.itemsize, &scratch, &self.chunkshape, &local_start, &local_stop, dst, &dst_shape, &dst_start)
        })
    }

    /// Write `src` (shaped `stop - start`) into `array[start:stop]`. Chunks
    /// fully covered by the write skip the read side entirely; partially
    /// covered chunks are read, patched and recompressed.
    pub fn set_slice_cbuffer(&mut self, start: &[i64], stop: &[i64], src: &[u8]) -> Result<()> {
        self.validate_region(start, stop)?;
        let src_shape: Vec<i64> = stop.iter().zip(start).map(|(&e, &s)| e - s).collect();
        let expected = src_shape.iter().product::<i64>() as usize * self.itemsize;
        if src.len() != expected {
            return Err(Error::InvalidArgument("set_slice_cbuffer: src size doesn't match stop - start".into()));
        }
        if src_shape.iter().any(|&d| d == 0) {
            return Ok(());
        }
        let lo: Vec<i64> = (0..self.ndim).map(|i| start[i] / self.chunkshape[i]).collect();
        let hi: Vec<i64> = (0..self.ndim).map(|i| (stop[i] - 1) / self.chunkshape[i]).collect();

        let shape = self.shape.clone();
        let chunkshape = self.chunkshape.clone();
        let itemsize = self.itemsize;
        let cpa = chunks_per_axis(&shape, &chunkshape);
        let cpa_strides = row_major_strides(&cpa);
        let chunk_bytes = chunkshape.iter().product::<i64>() as usize * itemsize;

        for_each_chunk_in_range(&lo, &hi, |cm| {
            let origin: Vec<i64> = cm.iter().zip(&chunkshape).map(|(&c, &cs)| c * cs).collect();
            let chunk_stop: Vec<i64> =
                origin.iter().zip(&shape).zip(&chunkshape).map(|((&o, &s), &cs)| (o + cs).min(s)).collect();
            let isect_start: Vec<i64> = origin.iter().zip(start).map(|(&o, &s)| o.max(s)).collect();
            let isect_stop: Vec<i64> = chunk_stop.iter().zip(stop).map(|(&cs, &s)| cs.min(s)).collect();
            let local_start: Vec<i64> = isect_start.iter().zip(&origin).map(|(&a, &o)| a - o).collect();
            let local_stop: Vec<i64> = isect_stop.iter().zip(&origin).map(|(&a, &o)| a - o).collect();
            let src_start: Vec<i64> = isect_start.iter().zip(start).map(|(&a, &s)| a - s).collect();
            let chunk_extent: Vec<i64> = chunk_stop.iter().zip(&origin).map(|(&cs, &o)| cs - o).collect();
            let full_chunk = local_start.iter().all(|&v| v == 0) && local_stop == chunk_extent;

            let seg_len: Vec<i64> = local_stop.iter().zip(&local_start).map(|(&e, &s)| e - s).collect();
            let src_stop: Vec<i64> = src_start.iter().zip(&seg_len).map(|(&s, &l)| s + l).collect();

            let linear = flatten_index(cm, &cpa_strides) as usize;
            let mut scratch = vec![0u8; chunk_bytes];
            if !full_chunk {
                self.sc.decompress_chunk(linear, &mut scratch)?;
            }
            copy::copy_region(itemsize, src, &src_shape, &src_start, &src_stop, &mut scratch, &chunkshape, &local_start)?;
            self.sc.update_buffer(linear, &scratch)
        })
    }

    /// Outer-product fancy indexing: `selections[i]` is the list of indices
    /// to read along axis `i`; `buf` receives the result shaped
    /// `[selections[0].len(), selections[1].len(), ...]`.
    pub fn get_orthogonal_selection(&self, selections: &[Vec<i64>], buf: &mut [u8]) -> Result<()> {
        if selections.len() != self.ndim {
            return Err(Error::InvalidArgument("orthogonal selection needs one index list per axis".into()));
        }
        let out_shape: Vec<i64> = selections.iter().map(|s| s.len() as i64).collect();
        let expected = out_shape.iter().product::<i64>() as usize * self.itemsize;
        if buf.len() != expected {
            return Err(Error::BufferTooSmall { needed: expected });
        }
        let total: i64 = out_shape.iter().product();
        let out_strides = row_major_strides(&out_shape);
        let mut elem = vec![0u8; self.itemsize];
        for lin in 0..total {
            let rel = unflatten_index(lin, &out_shape);
            let idx: Vec<i64> = (0..self.ndim).map(|i| selections[i][rel[i] as usize]).collect();
            let stop: Vec<i64> = idx.iter().map(|&v| v + 1).collect();
            self.get_slice_cbuffer(&idx, &stop, &mut elem)?;
            let off = flatten_index(&rel, &out_strides) as usize * self.itemsize;
            buf[off..off + self.itemsize].copy_from_slice(&elem);
        }
        Ok(())
    }

    /// Inverse of [`NdArray::get_orthogonal_selection`].
    pub fn set_orthogonal_selection(&mut self, selections: &[Vec<i64>], buf: &[u8]) -> Result<()> {
        if selections.len() != self.ndim {
            return Err(Error::InvalidArgument("orthogonal selection needs one index list per axis".into()));
        }
        let out_shape: Vec<i64> = selections.iter().map(|s| s.len() as i64).collect();
        let expected = out_shape.iter().product::<i64>() as usize * self.itemsize;
        if buf.len() != expected {
            return Err(Error::InvalidArgument("orthogonal selection buffer size mismatch".into()));
        }
        let total: i64 = out_shape.iter().product();
        let out_strides = row_major_strides(&out_shape);
        for lin in 0..total {
            let rel = unflatten_index(lin, &out_shape);
            let idx: Vec<i64> = (0..self.ndim).map(|i| selections[i][rel[i] as usize]).collect();
            let stop: Vec<i64> = idx.iter().map(|&v| v + 1).collect();
            let off = flatten_index(&rel, &out_strides) as usize * self.itemsize;
            self.set_slice_cbuffer(&idx, &stop, &buf[off..off + self.itemsize])?;
        }
        Ok(())
    }

    /// Append `src` along `axis`; `src` must agree with `shape` on every
    /// other axis. The append length along `axis` is inferred from
    /// `src.len()`. When `axis == 0` and the array's current extent is a
    /// whole number of `chunkshape[0]` and `src` supplies exactly one more
    /// full chunk, the new chunk is encoded directly with no read of
    /// existing data; any other shape grows the array the slow way (decode
    /// everything, splice, re-chunk).
    pub fn append(&mut self, src: &[u8], axis: usize) -> Result<()> {
        if axis >= self.ndim {
            return Err(Error::OutOfRange);
        }
        if src.len() % self.itemsize != 0 {
            return Err(Error::InvalidArgument("append: src length is not a multiple of itemsize".into()));
        }
        let mut other_product = 1i64;
        for i in 0..self.ndim {
            if i != axis {
                other_product *= self.shape[i];
            }
        }
        if other_product == 0 {
            return Err(Error::InvalidArgument("append: cannot infer length along a zero-sized axis".into()));
        }
        let elem_count = (src.len() / self.itemsize) as i64;
        if elem_count % other_product != 0 {
            return Err(Error::InvalidArgument("append: src size doesn't align with the array's shape on the other axes".into()));
        }
        let append_len = elem_count / other_product;

        let fast_path = axis == 0
            && self.chunkshape[0] != 0
            && self.shape[0] % self.chunkshape[0] == 0
            && append_len == self.chunkshape[0];

        if fast_path {
            let no_padding_needed = (1..self.ndim).all(|i| self.shape[i] == self.chunkshape[i]);
            if no_padding_needed {
                self.sc.append_buffer(src)?;
            } else {
                let chunk_bytes = self.chunk_bytes();
                let zeros = vec![0i64; self.ndim];
                let src_shape: Vec<i64> = (0..self.ndim).map(|i| if i == 0 { append_len } else { self.shape[i] }).collect();
                let mut scratch = vec![0u8; chunk_bytes];
                copy::copy_region(self.itemsize, src, &src_shape, &zeros, &src_shape, &mut scratch, &self.chunkshape, &zeros)?;
                self.sc.append_buffer(&scratch)?;
            }
            self.shape[0] += append_len;
            return self.refresh_shape_metalayer();
        }

        let mut new_shape = self.shape.clone();
        new_shape[axis] += append_len;
        let old_bytes = self.shape.iter().product::<i64>() as usize * self.itemsize;
        let mut old_buf = vec![0u8; old_bytes];
        self.to_cbuffer(&mut old_buf)?;

        let new_bytes = new_shape.iter().product::<i64>() as usize * self.itemsize;
        let mut new_buf = vec![0u8; new_bytes];
        let zeros = vec![0i64; self.ndim];
        copy::copy_region(self.itemsize, &old_buf, &self.shape, &zeros, &self.shape, &mut new_buf, &new_shape, &zeros)?;

        let mut append_origin = zeros.clone();
        append_origin[axis] = self.shape[axis];
        let src_shape: Vec<i64> = (0..self.ndim).map(|i| if i == axis { append_len } else { self.shape[i] }).collect();
        copy::copy_region(self.itemsize, src, &src_shape, &zeros, &src_shape, &mut new_buf, &new_shape, &append_origin)?;

        self.rebuild_from_buffer(new_shape, &new_buf)
    }

    /// Drop every axis whose extent is 1.
    pub fn squeeze(&self) -> Result<NdArray> {
        let keep: Vec<usize> = (0..self.ndim).filter(|&i| self.shape[i] != 1).collect();
        if keep.is_empty() {
            return Err(Error::InvalidArgument("squeeze: cannot squeeze every axis".into()));
        }
        let new_shape: Vec<i64> = keep.iter().map(|&i| self.shape[i]).collect();
        let new_chunkshape: Vec<i64> = keep.iter().map(|&i| self.chunkshape[i]).collect();
        let new_blockshape: Vec<i64> = keep.iter().map(|&i| self.blockshape[i]).collect();
        let total = self.shape.iter().product::<i64>() as usize * self.itemsize;
        let mut buf = vec![0u8; total];
        self.to_cbuffer(&mut buf)?;
        from_cbuffer(
            self.sc.storage.clone(),
            self.sc.cparams,
            self.sc.dparams,
            new_shape,
            new_chunkshape,
            new_blockshape,
            self.itemsize,
            self.dtype_format,
            self.dtype.clone(),
            &buf,
        )
    }

    pub fn save(&self, urlpath: &Path) -> Result<()> {
        frame::to_file(&self.sc, urlpath)
    }

    pub fn to_cframe(&self) -> Result<Vec<u8>> {
        frame::to_bytes(&self.sc)
    }

    fn from_superchunk(sc: SuperChunk) -> Result<NdArray> {
        let bytes = sc
            .meta_get(meta::B2ND_METALAYER_NAME)
            .ok_or_else(|| Error::CorruptFrame("missing b2nd metadata layer".into()))?;
        let m = meta::decode(bytes)?;
        Ok(NdArray {
            ndim: m.ndim,
            shape: m.shape,
            chunkshape: m.chunkshape,
            blockshape: m.blockshape,
            itemsize: sc.cparams.typesize,
            dtype_format: m.dtype_format,
            dtype: m.dtype,
            sc,
        })
    }
}

pub fn open(urlpath: &Path) -> Result<NdArray> {
    NdArray::from_superchunk(frame::open_file(urlpath)?)
}

pub fn from_cframe(buf: Vec<u8>) -> Result<NdArray> {
    NdArray::from_superchunk(frame::from_bytes(buf)?)
}

fn validate_shapes(ndim: usize, shape: &[i64], chunkshape: &[i64], blockshape: &[i64], itemsize: usize) -> Result<()> {
    if ndim == 0 || ndim > B2ND_MAX_DIM {
        return Err(Error::InvalidArgument("ndim out of range".into()));
    }
    if shape.len() != ndim || chunkshape.len() != ndim || blockshape.len() != ndim {
        return Err(Error::InvalidArgument("shape/chunkshape/blockshape length must equal ndim".into()));
    }
    if itemsize == 0 {
        return Err(Error::InvalidArgument("itemsize must be nonzero".into()));
    }
    for i in 0..ndim {
        if shape[i] < 0 {
            return Err(Error::InvalidArgument("shape entries must be non-negative".into()));
        }
        if chunkshape[i] <= 0 {
            return Err(Error::InvalidArgument("chunkshape entries must be positive".into()));
        }
        if blockshape[i] <= 0 || blockshape[i] > chunkshape[i] {
            return Err(Error::InvalidArgument("blockshape entries must be in (0, chunkshape]".into()));
        }
    }
    Ok(())
}

/// Create an array with no data chunks yet (the public contract's
/// `empty`/`create` are the same operation here; nothing is appended until
/// the caller calls [`NdArray::append`] or a sibling constructor does).
#[allow(clippy::too_many_arguments)]
pub fn create(
    storage: Storage,
    mut cparams: CParams,
    dparams: DParams,
    shape: Vec<i64>,
    chunkshape: Vec<i64>,
    blockshape: Vec<i64>,
    itemsize: usize,
    dtype_format: u8,
    dtype: String,
) -> Result<NdArray> {
    let ndim = shape.len();
    validate_shapes(ndim, &shape, &chunkshape, &blockshape, itemsize)?;
    cparams.typesize = itemsize;
    cparams.blocksize = blockshape.iter().product::<i64>() as usize * itemsize;

    let mut sc = SuperChunk::new(storage, cparams, dparams);
    let m = meta::Metadata {
        ndim,
        shape: shape.clone(),
        chunkshape: chunkshape.clone(),
        blockshape: blockshape.clone(),
        dtype_format,
        dtype: dtype.clone(),
    };
    sc.meta_add(meta::B2ND_METALAYER_NAME, meta::encode(&m))?;
    Ok(NdArray { sc, ndim, shape, chunkshape, blockshape, itemsize, dtype_format, dtype })
}

#[allow(clippy::too_many_arguments)]
pub fn empty(
    storage: Storage,
    cparams: CParams,
    dparams: DParams,
    shape: Vec<i64>,
    chunkshape: Vec<i64>,
    blockshape: Vec<i64>,
    itemsize: usize,
    dtype_format: u8,
    dtype: String,
) -> Result<NdArray> {
    create(storage, cparams, dparams, shape, chunkshape, blockshape, itemsize, dtype_format, dtype)
}

/// `src.len()` must equal `prod(shape) * itemsize`; splits and compresses
/// the buffer chunk by chunk in row-major chunk-grid order.
#[allow(clippy::too_many_arguments)]
pub fn from_cbuffer(
    storage: Storage,
    cparams: CParams,
    dparams: DParams,
    shape: Vec<i64>,
    chunkshape: Vec<i64>,
    blockshape: Vec<i64>,
    itemsize: usize,
    dtype_format: u8,
    dtype: String,
    src: &[u8],
) -> Result<NdArray> {
    let expected = shape.iter().product::<i64>() as usize * itemsize;
    if src.len() != expected {
        return Err(Error::InvalidArgument("from_cbuffer: srcsize does not match shape * itemsize".into()));
    }
    let mut arr = create(storage, cparams, dparams, shape, chunkshape, blockshape, itemsize, dtype_format, dtype)?;
    arr.fill_from_buffer(src)?;
    Ok(arr)
}

/// `concat(a, b, axis=0, copy=false)` succeeds without touching chunk
/// payloads iff `a`'s extent along `axis` is already a whole number of
/// `chunkshape[0]` and the two arrays share chunkshape/blockshape/codec —
/// `b`'s owned chunk buffers are spliced onto `a`'s chunk table as-is.
/// Otherwise both arrays are fully decoded, concatenated in a scratch
/// buffer, and re-chunked.
pub fn concatenate(a: NdArray, b: NdArray, axis: usize, copy: bool) -> Result<NdArray> {
    if a.ndim != b.ndim {
        return Err(Error::InvalidArgument("concatenate: ndim mismatch".into()));
    }
    if axis >= a.ndim {
        return Err(Error::OutOfRange);
    }
    if a.itemsize != b.itemsize || a.dtype != b.dtype {
        return Err(Error::InvalidArgument("concatenate: dtype/itemsize mismatch".into()));
    }
    for i in 0..a.ndim {
        if i != axis && a.shape[i] != b.shape[i] {
            return Err(Error::InvalidArgument("concatenate: shape mismatch on a non-concatenation axis".into()));
        }
    }

    let fast_path = !copy
        && axis == 0
        && a.chunkshape == b.chunkshape
        && a.blockshape == b.blockshape
        && a.sc.cparams.codec == b.sc.cparams.codec
        && a.sc.cparams.clevel == b.sc.cparams.clevel
        && a.chunkshape[0] != 0
        && a.shape[0] % a.chunkshape[0] == 0;

    if fast_path {
        return concatenate_fast_path(a, b);
    }
    concatenate_general(a, b, axis)
}

fn concatenate_fast_path(mut a: NdArray, b: NdArray) -> Result<NdArray> {
    for c in b.sc.chunks() {
        a.sc.append_chunk(c.bytes().to_vec())?;
    }
    a.shape[0] += b.shape[0];
    a.refresh_shape_metalayer()?;
    Ok(a)
}

fn concatenate_general(a: NdArray, b: NdArray, axis: usize) -> Result<NdArray> {
    let mut new_shape = a.shape.clone();
    new_shape[axis] += b.shape[axis];

    let a_bytes = a.shape.iter().product::<i64>() as usize * a.itemsize;
    let mut a_buf = vec![0u8; a_bytes];
    a.to_cbuffer(&mut a_buf)?;
    let b_bytes = b.shape.iter().product::<i64>() as usize * b.itemsize;
    let mut b_buf = vec![0u8; b_bytes];
    b.to_cbuffer(&mut b_buf)?;

    let total = new_shape.iter().product::<i64>() as usize * a.itemsize;
    let mut new_buf = vec![0u8; total];
    let zeros = vec![0i64; a.ndim];
    copy::copy_region(a.itemsize, &a_buf, &a.shape, &zeros, &a.shape, &mut new_buf, &new_shape, &zeros)?;
    let mut b_origin = zeros.clone();
    b_origin[axis] = a.shape[axis];
    copy::copy_region(b.itemsize, &b_buf, &b.shape, &zeros, &b.shape, &mut new_buf, &new_shape, &b_origin)?;

    from_cbuffer(
        a.sc.storage.clone(),
        a.sc.cparams,
        a.sc.dparams,
        new_shape,
        a.chunkshape.clone(),
        a.blockshape.clone(),
        a.itemsize,
        a.dtype_format,
        a.dtype.clone(),
        &new_buf,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BLOSC_BLOSCLZ;

    fn u32_cparams() -> CParams {
        CParams::default().with_codec(BLOSC_BLOSCLZ)
    }

    fn iota_u32(n: usize) -> Vec<u8> {
        (0..n as u32).flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn from_cbuffer_to_cbuffer_roundtrip_with_edge_padding() {
        // 7x5 array chunked 3x2: neither axis divides evenly, so the last
        // row and column of the chunk grid overhang the logical shape.
        let shape = vec![7, 5];
        let src = iota_u32(7 * 5);
        let arr = from_cbuffer(
            Storage::InMemory,
            u32_cparams(),
            DParams::default(),
            shape.clone(),
            vec![3, 2],
            vec![3, 2],
            4,
            0,
            "<u4".to_string(),
            &src,
        )
        .unwrap();
        assert_eq!(arr.sc.nchunks(), 3 * 3);
        let mut out = vec![0u8; src.len()];
        arr.to_cbuffer(&mut out).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn get_slice_cbuffer_extracts_interior_window() {
        let shape = vec![6, 6];
        let src = iota_u32(36);
        let arr = from_cbuffer(
            Storage::InMemory,
            u32_cparams(),
            DParams::default(),
            shape,
            vec![4, 4],
            vec![2, 2],
            4,
            0,
            "<u4".to_string(),
            &src,
        )
        .unwrap();
        let mut window = vec![0u8; 2 * 2 * 4];
        arr.get_slice_cbuffer(&[3, 3], &[5, 5], &mut window).unwrap();
        let values: Vec<u32> = window.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect();
        assert_eq!(values, vec![3 * 6 + 3, 3 * 6 + 4, 4 * 6 + 3, 4 * 6 + 4]);
    }

    #[test]
    fn set_slice_cbuffer_then_get_slice_roundtrips() {
        let shape = vec![6, 6];
        let src = vec![0u8; 36 * 4];
        let mut arr = from_cbuffer(
            Storage::InMemory,
            u32_cparams(),
            DParams::default(),
            shape,
            vec![4, 4],
            vec![2, 2],
            4,
            0,
            "<u4".to_string(),
            &src,
        )
        .unwrap();
        let patch = iota_u32(4);
        arr.set_slice_cbuffer(&[3, 3], &[5, 5], &patch).unwrap();
        let mut window = vec![0u8; patch.len()];
        arr.get_slice_cbuffer(&[3, 3], &[5, 5], &mut window).unwrap();
        assert_eq!(window, patch);

        // Untouched corner stays zero.
        let mut corner = vec![0xffu8; 4];
        arr.get_slice_cbuffer(&[0, 0], &[1, 1], &mut corner).unwrap();
        assert_eq!(corner, vec![0u8; 4]);
    }

    #[test]
    fn append_fast_path_grows_axis0_with_one_chunk() {
        let mut arr = create(
            Storage::InMemory,
            u32_cparams(),
            DParams::default(),
            vec![0, 3],
            vec![2, 3],
            vec![2, 3],
            4,
            0,
            "<u4".to_string(),
        )
        .unwrap();
        let first = iota_u32(2 * 3);
        arr.append(&first, 0).unwrap();
        assert_eq!(arr.shape, vec![2, 3]);
        assert_eq!(arr.sc.nchunks(), 1);

        let mut out = vec![0u8; first.len()];
        arr.to_cbuffer(&mut out).unwrap();
        assert_eq!(out, first);
    }

    #[test]
    fn append_general_path_handles_unaligned_growth() {
        let shape = vec![3, 3];
        let src = iota_u32(9);
        let mut arr = from_cbuffer(
            Storage::InMemory,
            u32_cparams(),
            DParams::default(),
            shape,
            vec![2, 3],
            vec![2, 3],
            4,
            0,
            "<u4".to_string(),
            &src,
        )
        .unwrap();
        let extra = iota_u32(2 * 3).iter().map(|&b| b.wrapping_add(1)).collect::<Vec<u8>>();
        arr.append(&extra, 0).unwrap();
        assert_eq!(arr.shape, vec![5, 3]);

        let mut out = vec![0u8; 5 * 3 * 4];
        arr.to_cbuffer(&mut out).unwrap();
        assert_eq!(&out[..9 * 4], &src[..]);
        assert_eq!(&out[9 * 4..], &extra[..]);
    }

    #[test]
    fn concatenate_fast_path_splices_chunks_without_recompressing() {
        let cparams = u32_cparams();
        let a = from_cbuffer(
            Storage::InMemory,
            cparams,
            DParams::default(),
            vec![2, 3],
            vec![2, 3],
            vec![2, 3],
            4,
            0,
            "<u4".to_string(),
            &iota_u32(6),
        )
        .unwrap();
        let b = from_cbuffer(
            Storage::InMemory,
            cparams,
            DParams::default(),
            vec![2, 3],
            vec![2, 3],
            vec![2, 3],
            4,
            0,
            "<u4".to_string(),
            &iota_u32(6).iter().map(|&v| v.wrapping_add(100)).collect::<Vec<u8>>(),
        )
        .unwrap();
        let c = concatenate(a, b, 0, false).unwrap();
        assert_eq!(c.shape, vec![4, 3]);
        assert_eq!(c.sc.nchunks(), 2);

        let mut out = vec![0u8; 4 * 3 * 4];
        c.to_cbuffer(&mut out).unwrap();
        let first_values: Vec<u32> = out[..24].chunks_exact(4).map(|x| u32::from_le_bytes(x.try_into().unwrap())).collect();
        assert_eq!(first_values, (0..6u32).collect::<Vec<_>>());
    }

    #[test]
    fn squeeze_drops_unit_axes() {
        let src = iota_u32(5);
        let arr = from_cbuffer(
            Storage::InMemory,
            u32_cparams(),
            DParams::default(),
            vec![1, 5],
            vec![1, 5],
            vec![1, 5],
            4,
            0,
            "<u4".to_string(),
            &src,
        )
        .unwrap();
        let squeezed = arr.squeeze().unwrap();
        assert_eq!(squeezed.shape, vec![5]);
        let mut out = vec![0u8; src.len()];
        squeezed.to_cbuffer(&mut out).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn save_open_roundtrips_shape_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("array.b2frame");
        let src = iota_u32(24);
        let arr = from_cbuffer(
            Storage::Contiguous { urlpath: None },
            u32_cparams(),
            DParams::default(),
            vec![4, 6],
            vec![3, 4],
            vec![3, 4],
            4,
            0,
            "<u4".to_string(),
            &src,
        )
        .unwrap();
        arr.save(&path).unwrap();
        let reopened = open(&path).unwrap();
        assert_eq!(reopened.shape, vec![4, 6]);
        let mut out = vec![0u8; src.len()];
        reopened.to_cbuffer(&mut out).unwrap();
        assert_eq!(out, src);
    }
}

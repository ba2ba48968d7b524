//! Super-chunk (§4.5): an ordered sequence of chunks sharing one codec,
//! typesize, filter pipeline and pair of metadata stores. Owns its chunks
//! directly (sparse-style in-memory backing); [`crate::frame`] serializes a
//! `SuperChunk` to the contiguous/sparse on-disk formats.

use crate::chunk;
use crate::config::{CParams, DParams};
use crate::constants::SpecialKind;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// One entry in the super-chunk's chunk table: either an owned compressed
/// chunk blob or a synthesized special chunk that never touches the codec.
#[derive(Debug, Clone)]
pub enum ChunkRef {
    Owned(Vec<u8>),
    Special(SpecialKind, Vec<u8>),
}

impl ChunkRef {
    pub fn bytes(&self) -> &[u8] {
        match self {
            ChunkRef::Owned(b) => b,
            ChunkRef::Special(_, b) => b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Empty,
    Populated,
    Sealed,
}

/// Where a super-chunk's chunks are stored.
#[derive(Debug, Clone)]
pub enum Storage {
    /// Chunks held only in memory.
    InMemory,
    /// Chunks destined for a single contiguous frame file/buffer.
    Contiguous { urlpath: Option<String> },
    /// Chunks destined for one file per chunk under a directory.
    Sparse { dirpath: String },
}

/// Ordered sequence of compressed chunks plus shared compression defaults
/// and metadata stores.
pub struct SuperChunk {
    pub storage: Storage,
    pub cparams: CParams,
    pub dparams: DParams,
    chunks: Vec<ChunkRef>,
    nbytes: u64,
    cbytes: u64,
    state: State,
    fixed_meta: HashMap<String, Vec<u8>>,
    vl_meta: HashMap<String, Vec<u8>>,
}

impl SuperChunk {
    pub fn new(storage: Storage, cparams: CParams, dparams: DParams) -> Self {
        SuperChunk {
            storage,
            cparams,
            dparams,
            chunks: Vec::new(),
            nbytes: 0,
            cbytes: 0,
            state: State::Empty,
            fixed_meta: HashMap::new(),
            vl_meta: HashMap::new(),
        }
    }

    pub fn nchunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn nbytes(&self) -> u64 {
        self.nbytes
    }

    pub fn cbytes(&self) -> u64 {
        self.cbytes
    }

    fn freeze_if_first_chunk(&mut self) {
        if self.state == State::Empty {
            self.state = State::Populated;
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.state == State::Sealed {
            return Err(Error::InvalidArgument("super-chunk is sealed".into()));
        }
        Ok(())
    }

    /// Compress `src` with the super-chunk's default `cparams` and append it.
    /// Returns the new chunk count.
    pub fn append_buffer(&mut self, src: &[u8]) -> Result<usize> {
        self.check_writable()?;
        let chunk = chunk::compress(&self.cparams, src)?;
        self.append_chunk_bytes(chunk)
    }

    /// Adopt an already-compressed chunk buffer. Returns the new chunk count.
    pub fn append_chunk(&mut self, cbuf: Vec<u8>) -> Result<usize> {
        self.check_writable()?;
        chunk::read_header(&cbuf)?;
        self.append_chunk_bytes(cbuf)
    }

    fn append_chunk_bytes(&mut self, cbuf: Vec<u8>) -> Result<usize> {
        let header = chunk::read_header(&cbuf)?;
        self.nbytes += header.nbytes as u64;
        self.cbytes += cbuf.len() as u64;
        self.chunks.push(ChunkRef::Owned(cbuf));
        self.freeze_if_first_chunk();
        Ok(self.chunks.len())
    }

    /// Insert a pre-compressed chunk at logical position `i`.
    pub fn insert_chunk(&mut self, i: usize, cbuf: Vec<u8>) -> Result<usize> {
        self.check_writable()?;
        if i > self.chunks.len() {
            return Err(Error::OutOfRange);
        }
        let header = chunk::read_header(&cbuf)?;
        self.nbytes += header.nbytes as u64;
        self.cbytes += cbuf.len() as u64;
        self.chunks.insert(i, ChunkRef::Owned(cbuf));
        self.freeze_if_first_chunk();
        Ok(self.chunks.len())
    }

    /// Replace chunk `i`'s compressed representation in place.
    pub fn update_chunk(&mut self, i: usize, cbuf: Vec<u8>) -> Result<()> {
        self.check_writable()?;
        let old = self.chunks.get(i).ok_or(Error::OutOfRange)?;
        let old_header = chunk::read_header(old.bytes())?;
        let new_header = chunk::read_header(&cbuf)?;
        self.nbytes = self.nbytes - old_header.nbytes as u64 + new_header.nbytes as u64;
        self.cbytes = self.cbytes - old.bytes().len() as u64 + cbuf.len() as u64;
        self.chunks[i] = ChunkRef::Owned(cbuf);
        Ok(())
    }

    /// Recompress `src` and replace chunk `i`.
    pub fn update_buffer(&mut self, i: usize, src: &[u8]) -> Result<()> {
        let cbuf = chunk::compress(&self.cparams, src)?;
        self.update_chunk(i, cbuf)
    }

    /// Logically remove chunk `i`; contiguous backing reclaims the space
    /// only at the next compaction (not implemented by this core).
    pub fn delete_chunk(&mut self, i: usize) -> Result<()> {
        self.check_writable()?;
        if i >= self.chunks.len() {
            return Err(Error::OutOfRange);
        }
        let removed = self.chunks.remove(i);
        let header = chunk::read_header(removed.bytes())?;
        self.nbytes -= header.nbytes as u64;
        self.cbytes -= removed.bytes().len() as u64;
        Ok(())
    }

    /// Replace the chunk order with `old[perm[k]]` for each `k`. `perm` must
    /// be a permutation of `[0, nchunks)`.
    pub fn reorder_offsets(&mut self, perm: &[usize]) -> Result<()> {
        if perm.len() != self.chunks.len() {
            return Err(Error::InvalidArgument("permutation length mismatch".into()));
        }
        let mut seen = vec![false; perm.len()];
        for &p in perm {
            if p >= perm.len() || seen[p] {
                return Err(Error::InvalidArgument("not a permutation".into()));
            }
            seen[p] = true;
        }
        let old = std::mem::take(&mut self.chunks);
        self.chunks = perm.iter().map(|&p| old[p].clone()).collect();
        Ok(())
    }

    /// Borrow chunk `i`'s compressed bytes.
    pub fn get_chunk(&self, i: usize) -> Result<&[u8]> {
        self.chunks.get(i).map(|c| c.bytes()).ok_or(Error::OutOfRange)
    }

    /// Decompress chunk `i` into `dst`, which must equal its logical size.
    pub fn decompress_chunk(&self, i: usize, dst: &mut [u8]) -> Result<usize> {
        let cbuf = self.get_chunk(i)?;
        chunk::decompress(&self.dparams, cbuf, dst)
    }

    /// Append a special chunk whose logical bytes are all zero.
    pub fn append_zeros(&mut self, nbytes: usize) -> Result<usize> {
        self.check_writable()?;
        let cbuf = chunk::chunk_zeros(self.cparams.typesize, nbytes)?;
        self.nbytes += nbytes as u64;
        self.cbytes += cbuf.len() as u64;
        self.chunks.push(ChunkRef::Special(SpecialKind::Zero, cbuf));
        self.freeze_if_first_chunk();
        Ok(self.chunks.len())
    }

    /// Add a fixed metadata layer. Fails once any chunk has been appended.
    pub fn meta_add(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        if self.state != State::Empty {
            return Err(Error::FrozenMetadata(name.to_string()));
        }
        self.fixed_meta.insert(name.to_string(), bytes);
        Ok(())
    }

    /// Rewrite a fixed metadata layer in place; the new value must not be
    /// longer than the original.
    pub fn meta_update(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let existing = self.fixed_meta.get(name).ok_or_else(|| Error::FrozenMetadata(name.to_string()))?;
        if bytes.len() > existing.len() {
            return Err(Error::InvalidArgument("metadata layer update would grow it".into()));
        }
        self.fixed_meta.insert(name.to_string(), bytes);
        Ok(())
    }

    pub fn meta_get(&self, name: &str) -> Option<&[u8]> {
        self.fixed_meta.get(name).map(|v| v.as_slice())
    }

    pub fn vlmeta_add(&mut self, name: &str, bytes: Vec<u8>) {
        self.vl_meta.insert(name.to_string(), bytes);
    }

    pub fn vlmeta_update(&mut self, name: &str, bytes: Vec<u8>) {
        self.vl_meta.insert(name.to_string(), bytes);
    }

    pub fn vlmeta_delete(&mut self, name: &str) -> bool {
        self.vl_meta.remove(name).is_some()
    }

    pub fn vlmeta_exists(&self, name: &str) -> bool {
        self.vl_meta.contains_key(name)
    }

    pub fn vlmeta_get(&self, name: &str) -> Option<&[u8]> {
        self.vl_meta.get(name).map(|v| v.as_slice())
    }

    pub fn vlmeta_list_names(&self) -> Vec<&str> {
        self.vl_meta.keys().map(|s| s.as_str()).collect()
    }

    pub fn fixed_meta_layers(&self) -> &HashMap<String, Vec<u8>> {
        &self.fixed_meta
    }

    pub fn vl_meta_layers(&self) -> &HashMap<String, Vec<u8>> {
        &self.vl_meta
    }

    pub fn chunks(&self) -> &[ChunkRef] {
        &self.chunks
    }

    /// Transition to the sealed, read-only state (mirrors `schunk_to_file`/
    /// `schunk_to_buffer`).
    pub fn seal(&mut self) {
        self.state = State::Sealed;
    }

    pub fn is_sealed(&self) -> bool {
        self.state == State::Sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BLOSC_BLOSCLZ;

    fn sc() -> SuperChunk {
        let cparams = CParams::default().with_typesize(4).with_codec(BLOSC_BLOSCLZ);
        SuperChunk::new(Storage::InMemory, cparams, DParams::default())
    }

    #[test]
    fn append_and_decompress_roundtrip() {
        let mut s = sc();
        let data: Vec<u8> = (0..4096u32).flat_map(|i| i.to_le_bytes()).collect();
        s.append_buffer(&data).unwrap();
        assert_eq!(s.nchunks(), 1);
        let mut out = vec![0u8; data.len()];
        s.decompress_chunk(0, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn meta_add_fails_after_first_chunk() {
        let mut s = sc();
        s.append_buffer(&[1, 2, 3, 4]).unwrap();
        assert!(s.meta_add("b2nd", vec![1, 2, 3]).is_err());
    }

    #[test]
    fn reorder_offsets_permutes_content() {
        let mut s = sc();
        for k in 0..5u32 {
            let data: Vec<u8> = (0..64u32).map(|i| (i * k) as u8).collect();
            s.append_buffer(&data).unwrap();
        }
        let perm: Vec<usize> = (0..5).map(|i| (i + 3) % 5).collect();
        s.reorder_offsets(&perm).unwrap();
        let mut out = vec![0u8; 64];
        s.decompress_chunk(0, &mut out).unwrap();
        let expected: Vec<u8> = (0..64u32).map(|i| (i * 3) as u8).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn delete_chunk_updates_counters() {
        let mut s = sc();
        s.append_buffer(&[0u8; 64]).unwrap();
        s.append_buffer(&[1u8; 64]).unwrap();
        s.delete_chunk(0).unwrap();
        assert_eq!(s.nchunks(), 1);
        assert_eq!(s.nbytes(), 64);
    }
}

//! Chunk codec (§4.4): the bit-exact 32-byte extended header, per-block
//! compression via [`crate::block`] and [`crate::pool`], special-chunk
//! synthesis, and the getitem fast path.

use crate::block::{self, BlockOutput};
use crate::config::{CParams, DParams, FilterSlot};
use crate::constants::*;
use crate::error::{Error, Result};
use crate::pool;

/// Parsed chunk header (§6, bit-exact with the 32-byte extended layout).
#[derive(Debug, Clone, Copy)]
pub struct ChunkHeader {
    pub version: u8,
    pub versionlz: u8,
    pub flags1: u8,
    pub typesize: u8,
    pub nbytes: u32,
    pub blocksize: u32,
    pub cbytes: u32,
    pub codec: u8,
    pub flags2: u8,
    pub filter_ids: [u8; BLOSC2_MAX_FILTERS],
    pub filter_metas: [u8; BLOSC2_MAX_FILTERS],
}

impl ChunkHeader {
    pub fn special_kind(&self) -> Option<SpecialKind> {
        let bits = self.flags2 >> BLOSC2_SPECIAL_BIT_SHIFT;
        if bits == 0 {
            None
        } else {
            SpecialKind::from_bits(bits).filter(|k| !matches!(k, SpecialKind::None))
        }
    }

    pub fn is_split(&self) -> bool {
        self.flags2 & BLOSC2_FLAG_SPLIT != 0
    }

    fn write(&self, buf: &mut [u8; BLOSC_EXTENDED_HEADER_LENGTH]) {
        buf[CHUNK_VERSION] = self.version;
        buf[CHUNK_VERSIONLZ] = self.versionlz;
        buf[CHUNK_FLAGS1] = self.flags1;
        buf[CHUNK_TYPESIZE] = self.typesize;
        buf[CHUNK_NBYTES..CHUNK_NBYTES + 4].copy_from_slice(&self.nbytes.to_le_bytes());
        buf[CHUNK_BLOCKSIZE..CHUNK_BLOCKSIZE + 4].copy_from_slice(&self.blocksize.to_le_bytes());
        buf[CHUNK_CBYTES..CHUNK_CBYTES + 4].copy_from_slice(&self.cbytes.to_le_bytes());
        buf[CHUNK_CODEC] = self.codec;
        buf[CHUNK_FLAGS2] = self.flags2;
        buf[CHUNK_FILTER_IDS..CHUNK_FILTER_IDS + BLOSC2_MAX_FILTERS].copy_from_slice(&self.filter_ids);
        buf[CHUNK_FILTER_METAS..CHUNK_FILTER_METAS + BLOSC2_MAX_FILTERS]
            .copy_from_slice(&self.filter_metas);
    }

    fn read(buf: &[u8]) -> Result<Self> {
        if buf.len() < BLOSC_EXTENDED_HEADER_LENGTH {
            return Err(Error::CorruptChunk("header shorter than extended header length".into()));
        }
        let mut filter_ids = [0u8; BLOSC2_MAX_FILTERS];
        filter_ids.copy_from_slice(&buf[CHUNK_FILTER_IDS..CHUNK_FILTER_IDS + BLOSC2_MAX_FILTERS]);
        let mut filter_metas = [0u8; BLOSC2_MAX_FILTERS];
        filter_metas.copy_from_slice(&buf[CHUNK_FILTER_METAS..CHUNK_FILTER_METAS + BLOSC2_MAX_FILTERS]);
        Ok(ChunkHeader {
            version: buf[CHUNK_VERSION],
            versionlz: buf[CHUNK_VERSIONLZ],
            flags1: buf[CHUNK_FLAGS1],
            typesize: buf[CHUNK_TYPESIZE],
            nbytes: u32::from_le_bytes(buf[CHUNK_NBYTES..CHUNK_NBYTES + 4].try_into().unwrap()),
            blocksize: u32::from_le_bytes(buf[CHUNK_BLOCKSIZE..CHUNK_BLOCKSIZE + 4].try_into().unwrap()),
            cbytes: u32::from_le_bytes(buf[CHUNK_CBYTES..CHUNK_CBYTES + 4].try_into().unwrap()),
            codec: buf[CHUNK_CODEC],
            flags2: buf[CHUNK_FLAGS2],
            filter_ids,
            filter_metas,
        })
    }

    fn filter_slots(&self) -> [FilterSlot; BLOSC2_MAX_FILTERS] {
        let mut slots = [FilterSlot::default(); BLOSC2_MAX_FILTERS];
        for i in 0..BLOSC2_MAX_FILTERS {
            slots[i] = FilterSlot { id: self.filter_ids[i], meta: self.filter_metas[i] };
        }
        slots
    }
}

/// MSB of a block offset table entry: this block is stored raw (uncoded),
/// not handed to the codec on read.
const BLOCK_RAW_BIT: u32 = 1 << 31;

fn nblocks(nbytes: usize, blocksize: usize) -> usize {
    if nbytes == 0 || blocksize == 0 {
        0
    } else {
        (nbytes + blocksize - 1) / blocksize
    }
}

/// Compress `src` into a full chunk: header, per-block offset table, then
/// block payloads (see [`chunk_zeros`] et al. for special-chunk synthesis
/// instead of normal compression).
pub fn compress(params: &CParams, src: &[u8]) -> Result<Vec<u8>> {
    if params.typesize == 0 || params.typesize > BLOSC_MAX_TYPESIZE {
        return Err(Error::InvalidArgument("typesize out of range".into()));
    }
    if src.len() as i64 > BLOSC2_MAX_BUFFERSIZE {
        return Err(Error::BufferTooBig);
    }

    let blocksize = crate::tune::next_blocksize(params, src.len().max(1));
    let n_blocks = nblocks(src.len(), blocksize);
    let reference = if src.is_empty() { &[][..] } else { &src[..blocksize.min(src.len())] };
    // Decided once from the chunk's nominal blocksize, not re-derived per
    // block: a trailing partial block is still subject to the same
    // split/whole choice the header's SPLIT flag advertises for the chunk.
    let split_used = crate::tune::should_split(params, blocksize) && params.typesize > 1;

    let results: std::sync::Mutex<Vec<Option<BlockOutput>>> =
        std::sync::Mutex::new((0..n_blocks).map(|_| None).collect());
    pool::run_blocks(params.nthreads, n_blocks, |b| {
        let start = b * blocksize;
        let end = (start + blocksize).min(src.len());
        let block_src = &src[start..end];
        let out = block::compress_block(params, block_src, reference, b == 0, split_used)?;
        results.lock().unwrap()[b] = Some(out);
        Ok(())
    })?;
    let block_payloads = results.into_inner().unwrap();

    // Bit 31 of each offset entry flags that block as stored raw (codec
    // declined or byte-split wasn't worth it), since raw/encoded can differ
    // block-to-block within one chunk.
    let mut offsets = Vec::with_capacity(n_blocks);
    let mut payloads = Vec::with_capacity(n_blocks);
    let mut running = 0u32;
    for out in block_payloads.into_iter() {
        let out = out.expect("every block index is visited exactly once");
        let (raw, buf) = match out {
            BlockOutput::Encoded(b) => (false, b),
            BlockOutput::Raw(b) => (true, b),
        };
        let mut entry = running;
        if raw {
            entry |= BLOCK_RAW_BIT;
        }
        offsets.push(entry);
        running += buf.len() as u32;
        payloads.push(buf);
    }
    let mut flags1 = 0u8;
    for f in &params.filters {
        if f.id == BLOSC_SHUFFLE { flags1 |= BLOSC_DOSHUFFLE; }
        if f.id == BLOSC_BITSHUFFLE { flags1 |= BLOSC_DOBITSHUFFLE; }
        if f.id == BLOSC_DELTA { flags1 |= BLOSC_DODELTA; }
    }
    let mut flags2 = 0u8;
    if split_used {
        flags2 |= BLOSC2_FLAG_SPLIT;
    }

    let offset_table_len = n_blocks * 4;
    let header_len = BLOSC_EXTENDED_HEADER_LENGTH;
    let cbytes = header_len + offset_table_len + payloads.iter().map(|p| p.len()).sum::<usize>();

    let header = ChunkHeader {
        version: BLOSC_VERSION_FORMAT,
        versionlz: 1,
        flags1,
        typesize: params.typesize as u8,
        nbytes: src.len() as u32,
        blocksize: blocksize as u32,
        cbytes: cbytes as u32,
        codec: params.codec,
        flags2,
        filter_ids: params.filters.map(|f| f.id),
        filter_metas: params.filters.map(|f| f.meta),
    };

    let mut out = vec![0u8; cbytes];
    let mut hbuf = [0u8; BLOSC_EXTENDED_HEADER_LENGTH];
    header.write(&mut hbuf);
    out[..header_len].copy_from_slice(&hbuf);
    let mut pos = header_len;
    for off in &offsets {
        out[pos..pos + 4].copy_from_slice(&off.to_le_bytes());
        pos += 4;
    }
    for buf in &payloads {
        out[pos..pos + buf.len()].copy_from_slice(buf);
        pos += buf.len();
    }

    Ok(out)
}

fn validate_header(src: &[u8], header: &ChunkHeader) -> Result<()> {
    if src.len() < BLOSC_EXTENDED_HEADER_LENGTH {
        return Err(Error::CorruptChunk("chunk shorter than header".into()));
    }
    if (header.cbytes as usize) != src.len() && header.special_kind().is_none() {
        return Err(Error::CorruptChunk("cbytes does not match chunk length".into()));
    }
    if header.blocksize == 0 && header.nbytes > 0 && header.special_kind().is_none() {
        return Err(Error::CorruptChunk("zero blocksize with nonzero payload".into()));
    }
    Ok(())
}

/// Read a chunk's header without decompressing any payload.
pub fn read_header(src: &[u8]) -> Result<ChunkHeader> {
    let header = ChunkHeader::read(src)?;
    validate_header(src, &header)?;
    Ok(header)
}

fn block_offsets(src: &[u8], header: &ChunkHeader, n_blocks: usize) -> Result<Vec<(usize, bool)>> {
    let table_start = BLOSC_EXTENDED_HEADER_LENGTH;
    let table_end = table_start + n_blocks * 4;
    if src.len() < table_end {
        return Err(Error::CorruptChunk("offset table truncated".into()));
    }
    let mut offsets = Vec::with_capacity(n_blocks);
    for i in 0..n_blocks {
        let pos = table_start + i * 4;
        let entry = u32::from_le_bytes(src[pos..pos + 4].try_into().unwrap());
        let raw = entry & BLOCK_RAW_BIT != 0;
        let rel = (entry & !BLOCK_RAW_BIT) as usize;
        let abs = table_end + rel;
        if abs > src.len() {
            return Err(Error::CorruptChunk("block offset out of range".into()));
        }
        offsets.push((abs, raw));
    }
    let _ = header;
    Ok(offsets)
}

/// Decompress the whole chunk into `dst`, which must be exactly
/// `header.nbytes` long.
pub fn decompress(dparams: &DParams, src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let header = read_header(src)?;
    if dst.len() != header.nbytes as usize {
        return Err(Error::BufferTooSmall { needed: header.nbytes as usize });
    }
    if let Some(kind) = header.special_kind() {
        return synthesize_special(&header, src, kind, dst);
    }
    getitem(dparams, src, 0, header.nbytes as usize, dst)
}

fn synthesize_special(
    header: &ChunkHeader,
    src: &[u8],
    kind: SpecialKind,
    dst: &mut [u8],
) -> Result<usize> {
    match kind {
        SpecialKind::Zero | SpecialKind::Uninit => {
            for b in dst.iter_mut() {
                *b = 0;
            }
        }
        SpecialKind::Nan => {
            fill_nan(header.typesize as usize, dst)?;
        }
        SpecialKind::Value => {
            let typesize = header.typesize as usize;
            if src.len() < BLOSC_EXTENDED_HEADER_LENGTH + typesize {
                return Err(Error::CorruptChunk("repeat-value chunk missing value bytes".into()));
            }
            let value = &src[BLOSC_EXTENDED_HEADER_LENGTH..BLOSC_EXTENDED_HEADER_LENGTH + typesize];
            for chunk in dst.chunks_mut(typesize) {
                let n = chunk.len().min(typesize);
                chunk[..n].copy_from_slice(&value[..n]);
            }
        }
        SpecialKind::None => unreachable!("synthesize_special is never called with None"),
    }
    Ok(dst.len())
}

fn fill_nan(typesize: usize, dst: &mut [u8]) -> Result<()> {
    match typesize {
        4 => {
            let bits = f32::NAN.to_le_bytes();
            for chunk in dst.chunks_mut(4) {
                chunk.copy_from_slice(&bits[..chunk.len()]);
            }
        }
        8 => {
            let bits = f64::NAN.to_le_bytes();
            for chunk in dst.chunks_mut(8) {
                chunk.copy_from_slice(&bits[..chunk.len()]);
            }
        }
        _ => return Err(Error::InvalidArgument("NaN special chunk needs typesize 4 or 8".into())),
    }
    Ok(())
}

/// Getitem fast path (§4.2): decode only the blocks covering
/// `[start, start+len)` and copy the exact range into `dst`.
pub fn getitem(dparams: &DParams, src: &[u8], start: usize, len: usize, dst: &mut [u8]) -> Result<usize> {
    let header = read_header(src)?;
    let nbytes = header.nbytes as usize;
    if start > nbytes || start + len > nbytes {
        return Err(Error::OutOfRange);
    }
    if dst.len() < len {
        return Err(Error::BufferTooSmall { needed: len });
    }
    if let Some(kind) = header.special_kind() {
        let mut scratch = vec![0u8; nbytes];
        synthesize_special(&header, src, kind, &mut scratch)?;
        dst[..len].copy_from_slice(&scratch[start..start + len]);
        return Ok(len);
    }
    if len == 0 {
        return Ok(0);
    }

    let blocksize = header.blocksize as usize;
    let n_blocks = nblocks(nbytes, blocksize);
    let offsets = block_offsets(src, &header, n_blocks)?;

    let first_block = start / blocksize;
    let last_block = (start + len - 1) / blocksize;
    let filters = header.filter_slots();
    let reference_block = {
        let (ref_start, ref_raw) = offsets[0];
        let ref_end = if n_blocks > 1 { offsets[1].0 } else { src.len() };
        let decoded_ref_len = blocksize.min(nbytes);
        block::decompress_block(
            header.codec,
            header.typesize as usize,
            &filters,
            &src[ref_start..ref_end],
            decoded_ref_len,
            ref_raw,
            header.is_split(),
            &[],
            true,
        )?
    };

    for b in first_block..=last_block {
        let block_start = b * blocksize;
        let block_end = (block_start + blocksize).min(nbytes);
        let decoded_len = block_end - block_start;
        let (offset_start, raw) = offsets[b];
        let offset_end = if b + 1 < n_blocks { offsets[b + 1].0 } else { src.len() };

        let decoded = block::decompress_block(
            header.codec,
            header.typesize as usize,
            &filters,
            &src[offset_start..offset_end],
            decoded_len,
            raw,
            header.is_split(),
            &reference_block,
            b == 0,
        )?;

        let copy_start = block_start.max(start);
        let copy_end = block_end.min(start + len);
        if copy_start < copy_end {
            let src_off = copy_start - block_start;
            let dst_off = copy_start - start;
            dst[dst_off..dst_off + (copy_end - copy_start)]
                .copy_from_slice(&decoded[src_off..src_off + (copy_end - copy_start)]);
        }
    }

    Ok(len)
}

/// Synthesize a special chunk filled with zero bytes.
pub fn chunk_zeros(typesize: usize, nbytes: usize) -> Result<Vec<u8>> {
    special_chunk(typesize, nbytes, SpecialKind::Zero, None)
}

/// Synthesize a special chunk whose logical payload is uninitialized
/// (decoded as zero, since this core has no concept of "don't touch").
pub fn chunk_uninit(typesize: usize, nbytes: usize) -> Result<Vec<u8>> {
    special_chunk(typesize, nbytes, SpecialKind::Uninit, None)
}

/// Synthesize a special chunk of IEEE-754 NaN, `typesize` must be 4 or 8.
pub fn chunk_nans(typesize: usize, nbytes: usize) -> Result<Vec<u8>> {
    special_chunk(typesize, nbytes, SpecialKind::Nan, None)
}

/// Synthesize a special chunk whose every element repeats `value`
/// (`value.len()` must equal `typesize`).
pub fn chunk_repeatval(typesize: usize, nbytes: usize, value: &[u8]) -> Result<Vec<u8>> {
    if value.len() != typesize {
        return Err(Error::InvalidArgument("repeat value length must equal typesize".into()));
    }
    special_chunk(typesize, nbytes, SpecialKind::Value, Some(value))
}

fn special_chunk(typesize: usize, nbytes: usize, kind: SpecialKind, value: Option<&[u8]>) -> Result<Vec<u8>> {
    if typesize == 0 || typesize > BLOSC_MAX_TYPESIZE {
        return Err(Error::InvalidArgument("typesize out of range".into()));
    }
    let extra = value.map(|v| v.len()).unwrap_or(0);
    let cbytes = BLOSC_EXTENDED_HEADER_LENGTH + extra;
    let header = ChunkHeader {
        version: BLOSC_VERSION_FORMAT,
        versionlz: 1,
        flags1: 0,
        typesize: typesize as u8,
        nbytes: nbytes as u32,
        blocksize: nbytes as u32,
        cbytes: cbytes as u32,
        codec: BLOSC_BLOSCLZ,
        flags2: (kind as u8) << BLOSC2_SPECIAL_BIT_SHIFT,
        filter_ids: [BLOSC_NOFILTER; BLOSC2_MAX_FILTERS],
        filter_metas: [0; BLOSC2_MAX_FILTERS],
    };
    let mut out = vec![0u8; cbytes];
    let mut hbuf = [0u8; BLOSC_EXTENDED_HEADER_LENGTH];
    header.write(&mut hbuf);
    out[..BLOSC_EXTENDED_HEADER_LENGTH].copy_from_slice(&hbuf);
    if let Some(v) = value {
        out[BLOSC_EXTENDED_HEADER_LENGTH..].copy_from_slice(v);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_small_chunk() {
        let params = CParams::default().with_typesize(4).with_codec(BLOSC_BLOSCLZ);
        let src: Vec<u8> = (0..4096u32).flat_map(|i| i.to_le_bytes()).collect();
        let chunk = compress(&params, &src).unwrap();
        let mut out = vec![0u8; src.len()];
        let dparams = DParams::default();
        decompress(&dparams, &chunk, &mut out).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn getitem_matches_full_decompress_subrange() {
        let params = CParams::default().with_typesize(4).with_codec(BLOSC_BLOSCLZ);
        let src: Vec<u8> = (0..8192u32).flat_map(|i| i.to_le_bytes()).collect();
        let chunk = compress(&params, &src).unwrap();
        let dparams = DParams::default();
        let mut sub = vec![0u8; 128];
        getitem(&dparams, &chunk, 1000, 128, &mut sub).unwrap();
        assert_eq!(sub, src[1000..1128]);
    }

    #[test]
    fn empty_input_produces_zero_block_header() {
        let params = CParams::default().with_typesize(4);
        let chunk = compress(&params, &[]).unwrap();
        let header = read_header(&chunk).unwrap();
        assert_eq!(header.nbytes, 0);
    }

    #[test]
    fn getitem_past_end_is_out_of_range() {
        let params = CParams::default().with_typesize(4);
        let src = vec![1u8; 256];
        let chunk = compress(&params, &src).unwrap();
        let dparams = DParams::default();
        let mut dst = vec![0u8; 16];
        assert!(matches!(getitem(&dparams, &chunk, 250, 16, &mut dst), Err(Error::OutOfRange)));
    }

    #[test]
    fn special_zeros_chunk_decompresses_to_zero() {
        let chunk = chunk_zeros(4, 1024).unwrap();
        let header = read_header(&chunk).unwrap();
        assert_eq!(header.special_kind(), Some(SpecialKind::Zero));
        let mut out = vec![0xFFu8; 1024];
        let dparams = DParams::default();
        decompress(&dparams, &chunk, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn special_repeatval_chunk_repeats_value() {
        let chunk = chunk_repeatval(4, 16, &[1, 2, 3, 4]).unwrap();
        let mut out = vec![0u8; 16];
        let dparams = DParams::default();
        decompress(&dparams, &chunk, &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }
}

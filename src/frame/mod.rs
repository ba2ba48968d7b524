//! Frame serializer (§4.6): packs a [`crate::schunk::SuperChunk`] into the
//! on-disk/in-memory container format, msgpack-fixarray header and trailer
//! bracketing a raw chunk-offset table.
//!
//! Two storage shapes share the same header/offsets/trailer layout:
//! contiguous (chunk bytes copied inline, in [`DATA`]) and sparse (chunk
//! bytes live in sibling `chunk-%020lld.b2chunk` files, and the frame file
//! holds only the header, offsets and trailer).
//!
//! A [`Frame`] on disk is not updated atomically: a process killed mid-write
//! can leave a frame with a backpatched length that doesn't match its actual
//! byte count, or a sparse directory with some but not all chunk files
//! written. Callers that need crash safety must arrange it themselves (e.g.
//! write to a staging path and rename).

pub mod io;
pub mod msgpack;

use crate::chunk;
use crate::config::{DParams, FilterSlot};
use crate::constants::*;
use crate::error::{Error, Result};
use crate::schunk::{ChunkRef, Storage, SuperChunk};
use io::{read_exact, write_all, FileIo, FrameIo, MemIo};
use msgpack::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const FRAME_MAGIC: &str = "b2frame";
pub const FRAME_FORMAT_VERSION: u8 = 1;

fn chunk_nbytes(bytes: &[u8]) -> Result<u32> {
    Ok(chunk::read_header(bytes)?.nbytes)
}

fn filters_value(filters: &[FilterSlot; BLOSC2_MAX_FILTERS]) -> Value {
    Value::Array(
        filters
            .iter()
            .map(|f| Value::Array(vec![Value::Int(f.id as i64), Value::Int(f.meta as i64)]))
            .collect(),
    )
}

fn parse_filters(v: &Value) -> Result<[FilterSlot; BLOSC2_MAX_FILTERS]> {
    let items = match v {
        Value::Array(items) => items,
        _ => return Err(Error::CorruptFrame("filters field is not an array".into())),
    };
    if items.len() != BLOSC2_MAX_FILTERS {
        return Err(Error::CorruptFrame("filters array has the wrong length".into()));
    }
    let mut out = [FilterSlot::default(); BLOSC2_MAX_FILTERS];
    for (i, item) in items.iter().enumerate() {
        let pair = match item {
            Value::Array(p) if p.len() == 2 => p,
            _ => return Err(Error::CorruptFrame("filter entry malformed".into())),
        };
        out[i] = FilterSlot { id: as_u8(&pair[0])?, meta: as_u8(&pair[1])? };
    }
    Ok(out)
}

fn as_i64(v: &Value) -> Result<i64> {
    match v {
        Value::Int(n) => Ok(*n),
        Value::Int64Fixed(n) => Ok(*n),
        Value::Int32Fixed(n) => Ok(*n as i64),
        _ => Err(Error::CorruptFrame("expected an integer field".into())),
    }
}
fn as_u8(v: &Value) -> Result<u8> {
    Ok(as_i64(v)? as u8)
}
fn as_u32(v: &Value) -> Result<u32> {
    Ok(as_i64(v)? as u32)
}
fn as_u64(v: &Value) -> Result<u64> {
    Ok(as_i64(v)? as u64)
}

fn map_value(m: &HashMap<String, Vec<u8>>) -> Value {
    let mut entries: Vec<(String, Vec<u8>)> = m.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Value::Map(entries.into_iter().map(|(k, v)| (k, Value::Bin(v))).collect())
}

fn parse_map(v: &Value) -> Result<HashMap<String, Vec<u8>>> {
    match v {
        Value::Map(entries) => {
            let mut out = HashMap::new();
            for (k, val) in entries {
                let bytes = match val {
                    Value::Bin(b) => b.clone(),
                    _ => return Err(Error::CorruptFrame("metalayer value is not binary".into())),
                };
                out.insert(k.clone(), bytes);
            }
            Ok(out)
        }
        _ => Err(Error::CorruptFrame("expected a map".into())),
    }
}

struct HeaderParts {
    bytes: Vec<u8>,
    /// Byte offset of the `frame_len` field's payload within `bytes`,
    /// relative to the start of `bytes` (i.e. relative to the frame's own
    /// start), for backpatching once the total frame length is known.
    frame_len_offset: usize,
}

fn build_header(sc: &SuperChunk, chunksize: u32, nchunks: u64) -> HeaderParts {
    let items: Vec<Value> = vec![
        Value::Str(FRAME_MAGIC.to_string()),
        Value::Int(FRAME_FORMAT_VERSION as i64),
        Value::Int64Fixed(0),
        Value::Int64Fixed(sc.nbytes() as i64),
        Value::Int64Fixed(sc.cbytes() as i64),
        Value::Int32Fixed(chunksize as i32),
        Value::Int32Fixed(sc.cparams.typesize as i32),
        Value::Int(sc.cparams.clevel as i64),
        Value::Int(sc.cparams.codec as i64),
        filters_value(&sc.cparams.filters),
        Value::Int64Fixed(nchunks as i64),
        map_value(sc.fixed_meta_layers()),
    ];
    // 12 elements always fits the one-byte fixarray tag (len <= 15); pushed
    // directly rather than through `msgpack::encode` so the tag's byte
    // offset is known without a prior encode pass.
    let mut bytes = vec![0x90 | items.len() as u8];
    let mut frame_len_offset = 0;
    for (i, item) in items.iter().enumerate() {
        let start = bytes.len();
        msgpack::encode(item, &mut bytes);
        if i == 2 {
            frame_len_offset = start + msgpack::FIXED_INT_PAYLOAD_OFFSET;
        }
    }
    HeaderParts { bytes, frame_len_offset }
}

struct ParsedHeader {
    /// This frame's own total length in bytes (item 2, backpatched by
    /// [`build_header`]'s writer once the frame is fully laid out). Bounds
    /// this frame within a file that may hold several concatenated frames.
    frame_len: u64,
    nbytes: u64,
    cbytes: u64,
    typesize: u32,
    clevel: u8,
    codec: u8,
    filters: [FilterSlot; BLOSC2_MAX_FILTERS],
    nchunks: u64,
    metalayers: HashMap<String, Vec<u8>>,
}

fn parse_header(buf: &[u8]) -> Result<(ParsedHeader, usize)> {
    let (value, consumed) = msgpack::decode(buf)?;
    let items = match value {
        Value::Array(items) if items.len() == 12 => items,
        _ => return Err(Error::CorruptFrame("frame header is not a 12-element array".into())),
    };
    match &items[0] {
        Value::Str(s) if s == FRAME_MAGIC => {}
        _ => return Err(Error::CorruptFrame("bad frame magic".into())),
    }
    let _format_version = as_u8(&items[1])?;
    let frame_len = as_u64(&items[2])?;
    let nbytes = as_u64(&items[3])?;
    let cbytes = as_u64(&items[4])?;
    let _chunksize = as_u32(&items[5])?;
    let typesize = as_u32(&items[6])?;
    let clevel = as_u8(&items[7])?;
    let codec = as_u8(&items[8])?;
    let filters = parse_filters(&items[9])?;
    let nchunks = as_u64(&items[10])?;
    let metalayers = parse_map(&items[11])?;
    Ok((
        ParsedHeader { frame_len, nbytes, cbytes, typesize, clevel, codec, filters, nchunks, metalayers },
        consumed,
    ))
}

fn build_trailer(sc: &SuperChunk) -> (Vec<u8>, usize) {
    let vlmeta = map_value(sc.vl_meta_layers());
    let items = vec![Value::Int(FRAME_FORMAT_VERSION as i64), vlmeta, Value::Int64Fixed(0)];
    let mut bytes = vec![0x90 | items.len() as u8];
    let mut trailer_len_offset = 0;
    for (i, item) in items.iter().enumerate() {
        let start = bytes.len();
        msgpack::encode(item, &mut bytes);
        if i == 2 {
            trailer_len_offset = start + msgpack::FIXED_INT_PAYLOAD_OFFSET;
        }
    }
    (bytes, trailer_len_offset)
}

struct ParsedTrailer {
    vlmetalayers: HashMap<String, Vec<u8>>,
}

fn parse_trailer(buf: &[u8]) -> Result<(ParsedTrailer, usize)> {
    let (value, consumed) = msgpack::decode(buf)?;
    let items = match value {
        Value::Array(items) if items.len() >= 3 => items,
        _ => return Err(Error::CorruptFrame("frame trailer is not an array".into())),
    };
    let vlmetalayers = parse_map(&items[1])?;
    Ok((ParsedTrailer { vlmetalayers }, consumed))
}

/// Kinds inlinable straight into an offsets-table entry without a payload
/// in `DATA`: these are fully determined by (kind, typesize, nbytes), all
/// already carried elsewhere. Repeat-value chunks carry an arbitrary
/// `typesize`-byte value that doesn't fit the 63 spare bits, so they are
/// always stored like ordinary chunks instead.
fn inline_kind_bits(kind: crate::constants::SpecialKind) -> Option<u64> {
    use crate::constants::SpecialKind::*;
    match kind {
        Zero => Some(1),
        Nan => Some(2),
        Uninit => Some(3),
        Value | None => Option::None,
    }
}

fn kind_from_bits(bits: u64) -> Result<crate::constants::SpecialKind> {
    use crate::constants::SpecialKind::*;
    match bits {
        1 => Ok(Zero),
        2 => Ok(Nan),
        3 => Ok(Uninit),
        _ => Err(Error::CorruptFrame("unknown inline special-chunk kind".into())),
    }
}

/// Build the per-chunk offsets table and, for contiguous mode, the
/// concatenated chunk bytes. `base_data_offset` is where `DATA` starts
/// relative to the frame's own start (used to compute absolute-within-frame
/// offsets for non-inlined chunks). Sparse mode passes `None`: non-inlined
/// chunks get a `0` placeholder entry, since sparse readers locate a
/// chunk's file by its table index rather than by this offset.
fn build_offsets(chunks: &[ChunkRef], base_data_offset: Option<u64>) -> Result<(Vec<u64>, Vec<u8>)> {
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut data = Vec::new();
    let mut running = base_data_offset.unwrap_or(0);
    for chunk_ref in chunks {
        let bytes = chunk_ref.bytes();
        let header = chunk::read_header(bytes)?;
        if let Some(bits) = header.special_kind().and_then(inline_kind_bits) {
            let entry = FRAME_OFFSET_INLINE_BIT | (bits << 60) | (header.nbytes as u64 & 0xFFFF_FFFF);
            offsets.push(entry);
            continue;
        }
        match base_data_offset {
            Some(_) => {
                offsets.push(running);
                data.extend_from_slice(bytes);
                running += bytes.len() as u64;
            }
            None => offsets.push(0),
        }
    }
    Ok((offsets, data))
}

fn sparse_chunk_filename(index: usize) -> String {
    format!("chunk-{:020}.b2chunk", index)
}

/// Serialize `sc` as a contiguous frame at `io`'s current write position
/// (`base`). Returns the total frame length in bytes, so concatenated
/// frames can be laid out back to back (`base`, `base + frame_len`, ...).
pub fn write_contiguous(io: &mut dyn FrameIo, base: u64, sc: &SuperChunk) -> Result<u64> {
    io.seek(base)?;

    let chunksize = sc.chunks().first().map(|c| chunk_nbytes(c.bytes())).transpose()?.unwrap_or(0);
    let nchunks = sc.chunks().len() as u64;
    let mut header = build_header(sc, chunksize, nchunks);

    let (offsets, data) = build_offsets(sc.chunks(), Some(header.bytes.len() as u64))?;

    let (trailer, trailer_len_offset) = build_trailer(sc);

    let offsets_bytes_len = offsets.len() * 8;
    let frame_len = header.bytes.len() as u64 + data.len() as u64 + offsets_bytes_len as u64 + trailer.len() as u64;
    header.bytes[header.frame_len_offset..header.frame_len_offset + 8].copy_from_slice(&frame_len.to_be_bytes());

    let mut trailer = trailer;
    let trailer_len = trailer.len() as u64;
    trailer[trailer_len_offset..trailer_len_offset + 8].copy_from_slice(&trailer_len.to_be_bytes());

    write_all(io, &header.bytes)?;
    write_all(io, &data)?;
    for off in &offsets {
        write_all(io, &off.to_le_bytes())?;
    }
    write_all(io, &trailer)?;

    Ok(frame_len)
}

/// Deserialize a contiguous frame starting at `io`'s position `base`.
pub fn read_contiguous(io: &mut dyn FrameIo, base: u64) -> Result<SuperChunk> {
    io.seek(base)?;
    // The header's own length isn't known up front; peek at a generously
    // sized prefix and let `msgpack::decode` report exactly how much of it
    // it consumed.
    let total_len = io.len()?;
    let probe_len = (total_len - base).min(1 << 20) as usize;
    let mut probe = vec![0u8; probe_len];
    read_exact(io, &mut probe)?;
    let (parsed, header_len) = parse_header(&probe)?;
    read_offsets_and_build(io, base, header_len as u64, &parsed)
}

fn read_offsets_and_build(
    io: &mut dyn FrameIo,
    base: u64,
    header_len: u64,
    parsed: &ParsedHeader,
) -> Result<SuperChunk> {
    // The offsets table's own position depends on DATA's length, which in
    // turn depends on how many bytes of DATA each *non-inline* chunk
    // consumes. Those DATA-resident chunks are read by first locating the
    // offsets table from the back: trailer length is the last 8 bytes of
    // the frame (backpatched trailer_len), which pins down where OFFSETS
    // ends, and OFFSETS is exactly `nchunks * 8` bytes, which pins down
    // where DATA ends and the offsets table begins.
    //
    // Bounded by the header's own `frame_len`, not by the backing store's
    // total length: several frames may be concatenated into one file/io
    // backend, and only `frame_len` pins down where *this* frame ends.
    let frame_len = parsed.frame_len;

    io.seek(base + frame_len - 8)?;
    let mut trailer_len_buf = [0u8; 8];
    read_exact(io, &mut trailer_len_buf)?;
    let trailer_len = u64::from_be_bytes(trailer_len_buf);
    let trailer_start = base + frame_len - trailer_len;

    io.seek(trailer_start)?;
    let mut trailer_buf = vec![0u8; trailer_len as usize];
    read_exact(io, &mut trailer_buf)?;
    let (trailer, _) = parse_trailer(&trailer_buf)?;

    let offsets_bytes_len = parsed.nchunks * 8;
    let offsets_start = trailer_start - offsets_bytes_len;

    io.seek(offsets_start)?;
    let mut offsets_buf = vec![0u8; offsets_bytes_len as usize];
    read_exact(io, &mut offsets_buf)?;
    let offsets: Vec<u64> =
        offsets_buf.chunks_exact(8).map(|c| u64::from_le_bytes(c.try_into().unwrap())).collect();

    let data_start = header_len;
    let data_len = offsets_start - base - data_start;
    io.seek(base + data_start)?;
    let mut data = vec![0u8; data_len as usize];
    read_exact(io, &mut data)?;

    build_superchunk(parsed, &trailer, &offsets, &data, Storage::Contiguous { urlpath: None })
}

fn build_superchunk(
    parsed: &ParsedHeader,
    trailer: &ParsedTrailer,
    offsets: &[u64],
    data: &[u8],
    storage: Storage,
) -> Result<SuperChunk> {
    let cparams = crate::config::CParams {
        codec: parsed.codec,
        clevel: parsed.clevel,
        typesize: parsed.typesize as usize,
        filters: parsed.filters,
        blocksize: 0,
        splitmode: SplitMode::Auto,
        nthreads: 1,
        use_dict: false,
    };
    let mut sc = SuperChunk::new(storage, cparams, DParams::default());
    for (name, bytes) in &parsed.metalayers {
        sc.meta_add(name, bytes.clone())?;
    }

    let mut data_cursor = 0usize;
    for &entry in offsets {
        if entry & FRAME_OFFSET_INLINE_BIT != 0 {
            let bits = (entry >> 60) & 0x7;
            let nbytes = (entry & 0xFFFF_FFFF) as usize;
            let kind = kind_from_bits(bits)?;
            let cbuf = match kind {
                crate::constants::SpecialKind::Zero => chunk::chunk_zeros(parsed.typesize as usize, nbytes)?,
                crate::constants::SpecialKind::Nan => chunk::chunk_nans(parsed.typesize as usize, nbytes)?,
                crate::constants::SpecialKind::Uninit => chunk::chunk_uninit(parsed.typesize as usize, nbytes)?,
                _ => unreachable!("inline_kind_bits never yields Value/None"),
            };
            sc.append_chunk(cbuf)?;
        } else {
            let header = chunk::read_header(&data[data_cursor..])?;
            let cbuf = data[data_cursor..data_cursor + header.cbytes as usize].to_vec();
            data_cursor += header.cbytes as usize;
            sc.append_chunk(cbuf)?;
        }
    }

    for (name, bytes) in &trailer.vlmetalayers {
        sc.vlmeta_add(name, bytes.clone());
    }
    if sc.nbytes() != parsed.nbytes || sc.cbytes() != parsed.cbytes {
        return Err(Error::CorruptFrame("reconstructed chunk totals disagree with the header".into()));
    }
    Ok(sc)
}

/// Serialize `sc` to an in-memory contiguous frame buffer.
pub fn to_bytes(sc: &SuperChunk) -> Result<Vec<u8>> {
    let mut io = MemIo::new();
    write_contiguous(&mut io, 0, sc)?;
    Ok(io.into_bytes())
}

/// Deserialize a contiguous frame previously produced by [`to_bytes`].
pub fn from_bytes(buf: Vec<u8>) -> Result<SuperChunk> {
    let mut io = MemIo::from_bytes(buf);
    read_contiguous(&mut io, 0)
}

/// Serialize `sc` to a contiguous frame file at `path`.
pub fn to_file(sc: &SuperChunk, path: &Path) -> Result<()> {
    let mut io = FileIo::create(path)?;
    write_contiguous(&mut io, 0, sc)?;
    Ok(())
}

/// Open a contiguous frame file at `path`.
pub fn open_file(path: &Path) -> Result<SuperChunk> {
    let mut io = FileIo::open(path, false)?;
    read_contiguous(&mut io, 0)
}

/// Open a frame embedded at byte offset `base` within an already-open
/// backend, e.g. one of several frames concatenated into a single file.
pub fn open_at_offset(io: &mut dyn FrameIo, base: u64) -> Result<SuperChunk> {
    read_contiguous(io, base)
}

const SPARSE_INDEX_FILENAME: &str = "frame.b2frame";

/// Serialize `sc` in sparse mode: one `chunk-%020lld.b2chunk` file per
/// non-inlined chunk under `dirpath`, plus an index-only frame file holding
/// just the header, offsets and trailer.
pub fn write_sparse(dirpath: &Path, sc: &SuperChunk) -> Result<()> {
    std::fs::create_dir_all(dirpath)?;

    let chunksize = sc.chunks().first().map(|c| chunk_nbytes(c.bytes())).transpose()?.unwrap_or(0);
    let nchunks = sc.chunks().len() as u64;
    let mut header = build_header(sc, chunksize, nchunks);

    let (offsets, _unused_data) = build_offsets(sc.chunks(), None)?;
    for (i, chunk_ref) in sc.chunks().iter().enumerate() {
        if offsets[i] & FRAME_OFFSET_INLINE_BIT != 0 {
            continue;
        }
        let path = dirpath.join(sparse_chunk_filename(i));
        std::fs::write(path, chunk_ref.bytes())?;
    }

    let (mut trailer, trailer_len_offset) = build_trailer(sc);
    let offsets_bytes_len = offsets.len() * 8;
    let frame_len = header.bytes.len() as u64 + offsets_bytes_len as u64 + trailer.len() as u64;
    header.bytes[header.frame_len_offset..header.frame_len_offset + 8].copy_from_slice(&frame_len.to_be_bytes());
    let trailer_len = trailer.len() as u64;
    trailer[trailer_len_offset..trailer_len_offset + 8].copy_from_slice(&trailer_len.to_be_bytes());

    let mut index_io = FileIo::create(&dirpath.join(SPARSE_INDEX_FILENAME))?;
    write_all(&mut index_io, &header.bytes)?;
    for off in &offsets {
        write_all(&mut index_io, &off.to_le_bytes())?;
    }
    write_all(&mut index_io, &trailer)?;
    Ok(())
}

/// Open a sparse frame directory previously produced by [`write_sparse`].
pub fn read_sparse(dirpath: &Path) -> Result<SuperChunk> {
    let index_path: PathBuf = dirpath.join(SPARSE_INDEX_FILENAME);
    let mut io = FileIo::open(&index_path, false)?;
    let total_len = io.len()?;
    let probe_len = total_len.min(1 << 20) as usize;
    let mut probe = vec![0u8; probe_len];
    read_exact(&mut io, &mut probe)?;
    let (parsed, header_len) = parse_header(&probe)?;

    io.seek(total_len - 8)?;
    let mut trailer_len_buf = [0u8; 8];
    read_exact(&mut io, &mut trailer_len_buf)?;
    let trailer_len = u64::from_be_bytes(trailer_len_buf);
    let trailer_start = total_len - trailer_len;

    io.seek(trailer_start)?;
    let mut trailer_buf = vec![0u8; trailer_len as usize];
    read_exact(&mut io, &mut trailer_buf)?;
    let (trailer, _) = parse_trailer(&trailer_buf)?;

    let offsets_bytes_len = parsed.nchunks * 8;
    let offsets_start = trailer_start - offsets_bytes_len;
    if offsets_start != header_len as u64 {
        return Err(Error::CorruptFrame("sparse index file carries unexpected inline data".into()));
    }
    io.seek(offsets_start)?;
    let mut offsets_buf = vec![0u8; offsets_bytes_len as usize];
    read_exact(&mut io, &mut offsets_buf)?;
    let offsets: Vec<u64> =
        offsets_buf.chunks_exact(8).map(|c| u64::from_le_bytes(c.try_into().unwrap())).collect();

    let mut sc = build_superchunk_sparse(&parsed, &trailer, &offsets, dirpath)?;
    sc.storage = Storage::Sparse { dirpath: dirpath.to_string_lossy().into_owned() };
    Ok(sc)
}

fn build_superchunk_sparse(
    parsed: &ParsedHeader,
    trailer: &ParsedTrailer,
    offsets: &[u64],
    dirpath: &Path,
) -> Result<SuperChunk> {
    let cparams = crate::config::CParams {
        codec: parsed.codec,
        clevel: parsed.clevel,
        typesize: parsed.typesize as usize,
        filters: parsed.filters,
        blocksize: 0,
        splitmode: SplitMode::Auto,
        nthreads: 1,
        use_dict: false,
    };
    let mut sc = SuperChunk::new(Storage::InMemory, cparams, DParams::default());
    for (name, bytes) in &parsed.metalayers {
        sc.meta_add(name, bytes.clone())?;
    }

    for (i, &entry) in offsets.iter().enumerate() {
        if entry & FRAME_OFFSET_INLINE_BIT != 0 {
            let bits = (entry >> 60) & 0x7;
            let nbytes = (entry & 0xFFFF_FFFF) as usize;
            let kind = kind_from_bits(bits)?;
            let cbuf = match kind {
                crate::constants::SpecialKind::Zero => chunk::chunk_zeros(parsed.typesize as usize, nbytes)?,
                crate::constants::SpecialKind::Nan => chunk::chunk_nans(parsed.typesize as usize, nbytes)?,
                crate::constants::SpecialKind::Uninit => chunk::chunk_uninit(parsed.typesize as usize, nbytes)?,
                _ => unreachable!("inline_kind_bits never yields Value/None"),
            };
            sc.append_chunk(cbuf)?;
        } else {
            let cbuf = std::fs::read(dirpath.join(sparse_chunk_filename(i)))?;
            sc.append_chunk(cbuf)?;
        }
    }

    for (name, bytes) in &trailer.vlmetalayers {
        sc.vlmeta_add(name, bytes.clone());
    }
    Ok(sc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CParams;
    use crate::constants::BLOSC_BLOSCLZ;
    use crate::schunk::SuperChunk;

    fn sample_superchunk() -> SuperChunk {
        let cparams = CParams::default().with_typesize(4).with_codec(BLOSC_BLOSCLZ);
        let mut sc = SuperChunk::new(Storage::InMemory, cparams, DParams::default());
        sc.meta_add("b2nd", vec![1, 2, 3]).unwrap();
        for k in 0..4u32 {
            let data: Vec<u8> = (0..256u32).map(|i| (i.wrapping_mul(k)) as u8).collect();
            sc.append_buffer(&data).unwrap();
        }
        sc.append_zeros(256).unwrap();
        sc.vlmeta_add("note", b"hello".to_vec());
        sc
    }

    #[test]
    fn contiguous_roundtrip_in_memory() {
        let sc = sample_superchunk();
        let buf = to_bytes(&sc).unwrap();
        let loaded = from_bytes(buf).unwrap();
        assert_eq!(loaded.nchunks(), sc.nchunks());
        assert_eq!(loaded.nbytes(), sc.nbytes());
        assert_eq!(loaded.meta_get("b2nd"), Some(&[1u8, 2, 3][..]));
        assert_eq!(loaded.vlmeta_get("note"), Some(&b"hello"[..]));

        let mut out = vec![0u8; 256];
        loaded.decompress_chunk(2, &mut out).unwrap();
        let mut expected = vec![0u8; 256];
        sc.decompress_chunk(2, &mut expected).unwrap();
        assert_eq!(out, expected);

        let mut zeros = vec![0xffu8; 256];
        loaded.decompress_chunk(4, &mut zeros).unwrap();
        assert!(zeros.iter().all(|&b| b == 0));
    }

    #[test]
    fn contiguous_roundtrip_through_tempfile() {
        let sc = sample_superchunk();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.b2frame");
        to_file(&sc, &path).unwrap();
        let loaded = open_file(&path).unwrap();
        assert_eq!(loaded.nchunks(), sc.nchunks());
        let mut out = vec![0u8; 256];
        loaded.decompress_chunk(0, &mut out).unwrap();
        let mut expected = vec![0u8; 256];
        sc.decompress_chunk(0, &mut expected).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn sparse_roundtrip_through_tempdir() {
        let sc = sample_superchunk();
        let dir = tempfile::tempdir().unwrap();
        let sparse_dir = dir.path().join("frame_dir");
        write_sparse(&sparse_dir, &sc).unwrap();
        assert!(sparse_dir.join(sparse_chunk_filename(0)).exists());
        assert!(!sparse_dir.join(sparse_chunk_filename(4)).exists());

        let loaded = read_sparse(&sparse_dir).unwrap();
        assert_eq!(loaded.nchunks(), sc.nchunks());
        let mut out = vec![0u8; 256];
        loaded.decompress_chunk(1, &mut out).unwrap();
        let mut expected = vec![0u8; 256];
        sc.decompress_chunk(1, &mut expected).unwrap();
        assert_eq!(out, expected);
    }

    /// A second fixture shaped differently from [`sample_superchunk`] (more
    /// chunks, distinct content, no trailing zeros chunk), so a concatenated
    /// pair of frames can't pass a same-content comparison by coincidence.
    fn other_superchunk() -> SuperChunk {
        let cparams = CParams::default().with_typesize(4).with_codec(BLOSC_BLOSCLZ);
        let mut sc = SuperChunk::new(Storage::InMemory, cparams, DParams::default());
        for k in 0..7u32 {
            let data: Vec<u8> = (0..512u32).map(|i| (i.wrapping_add(k * 37)) as u8).collect();
            sc.append_buffer(&data).unwrap();
        }
        sc
    }

    #[test]
    fn concatenated_frames_open_by_offset() {
        let sc_a = sample_superchunk();
        let sc_b = other_superchunk();

        let mut io = MemIo::new();
        let len_a = write_contiguous(&mut io, 0, &sc_a).unwrap();
        let len_b = write_contiguous(&mut io, len_a, &sc_b).unwrap();
        assert!(len_b > 0);

        let loaded_a = open_at_offset(&mut io, 0).unwrap();
        let loaded_b = open_at_offset(&mut io, len_a).unwrap();
        assert_eq!(loaded_a.nchunks(), sc_a.nchunks());
        assert_eq!(loaded_b.nchunks(), sc_b.nchunks());

        for i in 0..sc_a.nchunks() {
            let mut got = vec![0u8; 256];
            loaded_a.decompress_chunk(i, &mut got).unwrap();
            let mut want = vec![0u8; 256];
            sc_a.decompress_chunk(i, &mut want).unwrap();
            assert_eq!(got, want, "frame a, chunk {i}");
        }
        for i in 0..sc_b.nchunks() {
            let mut got = vec![0u8; 512];
            loaded_b.decompress_chunk(i, &mut got).unwrap();
            let mut want = vec![0u8; 512];
            sc_b.decompress_chunk(i, &mut want).unwrap();
            assert_eq!(got, want, "frame b, chunk {i}");
        }
    }
}

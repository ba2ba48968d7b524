//! Per-block forward/backward pipeline (§4.2): filter stages wired to a
//! codec, byte-split tri-state handling, and the getitem fast path used by
//! both chunk decompression and the worker pool.

use crate::codecs;
use crate::config::CParams;
use crate::constants::*;
use crate::error::{Error, Result};
use crate::filters;

/// Result of compressing one block.
pub enum BlockOutput {
    /// Encoded payload, strictly smaller than the raw block.
    Encoded(Vec<u8>),
    /// Codec declined or byte-split made it not worth it; stored verbatim.
    Raw(Vec<u8>),
}

/// Run the forward pipeline (filters then codec) over one block. `split`
/// is decided once per chunk by the caller (from the chunk's nominal
/// blocksize) and passed in uniformly, so a trailing partial block never
/// disagrees with the chunk header's SPLIT flag.
pub fn compress_block(
    params: &CParams,
    src: &[u8],
    reference: &[u8],
    is_reference: bool,
    split: bool,
) -> Result<BlockOutput> {
    let filtered = filters::apply_forward(
        &params.filters,
        params.typesize,
        src.len(),
        src,
        reference,
        is_reference,
    )?;

    let encoded = if split {
        encode_split(params, &filtered)?
    } else {
        encode_whole(params, &filtered)?
    };

    match encoded {
        Some(buf) if buf.len() < src.len() => Ok(BlockOutput::Encoded(buf)),
        _ => Ok(BlockOutput::Raw(src.to_vec())),
    }
}

fn encode_whole(params: &CParams, filtered: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut dest = vec![0u8; filtered.len() + BLOSC2_MAX_OVERHEAD];
    let n = codecs::encode(params.codec, params.clevel as i32, filtered, &mut dest)?;
    if n == 0 {
        Ok(None)
    } else {
        dest.truncate(n);
        Ok(Some(dest))
    }
}

/// Byte-split: `typesize` independent streams, each codec-compressed on its
/// own, concatenated with a small length-prefix table so they can be pulled
/// apart again on decode.
fn encode_split(params: &CParams, filtered: &[u8]) -> Result<Option<Vec<u8>>> {
    let typesize = params.typesize;
    if typesize == 0 || filtered.len() % typesize != 0 {
        return encode_whole(params, filtered);
    }
    let stream_len = filtered.len() / typesize;
    let mut streams = vec![Vec::with_capacity(stream_len); typesize];
    for (i, byte) in filtered.iter().enumerate() {
        streams[i % typesize].push(*byte);
    }

    let mut out = Vec::with_capacity(filtered.len());
    out.extend_from_slice(&(typesize as u32).to_le_bytes());
    let mut bodies = Vec::with_capacity(typesize);
    for stream in &streams {
        let mut dest = vec![0u8; stream.len() + BLOSC2_MAX_OVERHEAD];
        let n = codecs::encode(params.codec, params.clevel as i32, stream, &mut dest)?;
        if n == 0 || n >= stream.len() {
            bodies.push((false, stream.clone()));
        } else {
            dest.truncate(n);
            bodies.push((true, dest));
        }
    }
    for (_, body) in &bodies {
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    }
    for (compressed, body) in &bodies {
        out.push(*compressed as u8);
        out.extend_from_slice(body);
    }
    Ok(Some(out))
}

/// Decode a block produced by [`compress_block`]. `was_split` and `was_raw`
/// come from the chunk header's flags; `decoded_len` is the expected
/// uncompressed block size.
pub fn decompress_block(
    params_codec: u8,
    typesize: usize,
    filters: &[crate::config::FilterSlot; BLOSC2_MAX_FILTERS],
    src: &[u8],
    decoded_len: usize,
    was_raw: bool,
    was_split: bool,
    reference: &[u8],
    is_reference: bool,
) -> Result<Vec<u8>> {
    let filtered = if was_raw {
        src.to_vec()
    } else if was_split {
        decode_split(params_codec, typesize, src, decoded_len)?
    } else {
        let mut dest = vec![0u8; decoded_len];
        codecs::decode(params_codec, src, &mut dest)?;
        dest
    };

    filters::apply_backward(filters, typesize, decoded_len, &filtered, reference, is_reference)
}

fn decode_split(codec: u8, typesize: usize, src: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
    if src.len() < 4 {
        return Err(Error::CorruptChunk("split block too short".into()));
    }
    let stored_typesize = u32::from_le_bytes(src[0..4].try_into().unwrap()) as usize;
    if stored_typesize != typesize {
        return Err(Error::CorruptChunk("split block typesize mismatch".into()));
    }
    let stream_len = decoded_len / typesize;
    let mut pos = 4;
    let mut lengths = Vec::with_capacity(typesize);
    for _ in 0..typesize {
        if pos + 4 > src.len() {
            return Err(Error::CorruptChunk("split block length table truncated".into()));
        }
        lengths.push(u32::from_le_bytes(src[pos..pos + 4].try_into().unwrap()) as usize);
        pos += 4;
    }

    let mut streams = Vec::with_capacity(typesize);
    for len in lengths {
        if pos + 1 > src.len() {
            return Err(Error::CorruptChunk("split block body truncated".into()));
        }
        let compressed = src[pos] != 0;
        pos += 1;
        if pos + len > src.len() {
            return Err(Error::CorruptChunk("split block body truncated".into()));
        }
        let body = &src[pos..pos + len];
        pos += len;
        if compressed {
            let mut dest = vec![0u8; stream_len];
            codecs::decode(codec, body, &mut dest)?;
            streams.push(dest);
        } else {
            streams.push(body.to_vec());
        }
    }

    let mut out = vec![0u8; decoded_len];
    for (s, stream) in streams.iter().enumerate() {
        for (i, b) in stream.iter().enumerate() {
            out[i * typesize + s] = *b;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_no_split() {
        let params = CParams::default().with_typesize(4).with_codec(BLOSC_BLOSCLZ);
        let src: Vec<u8> = (0..1024u32).flat_map(|i| i.to_le_bytes()).collect();
        let out = compress_block(&params, &src, &src, true, false).unwrap();
        let (was_raw, buf) = match out {
            BlockOutput::Encoded(b) => (false, b),
            BlockOutput::Raw(b) => (true, b),
        };
        let decoded = decompress_block(
            params.codec,
            params.typesize,
            &params.filters,
            &buf,
            src.len(),
            was_raw,
            false,
            &src,
            true,
        )
        .unwrap();
        assert_eq!(decoded, src);
    }

    #[test]
    fn split_roundtrip() {
        let mut params = CParams::default().with_typesize(4).with_filter(BLOSC_SHUFFLE);
        params.splitmode = SplitMode::Always;
        let src: Vec<u8> = (0..2048u32).flat_map(|i| i.to_le_bytes()).collect();
        let filtered = filters::apply_forward(&params.filters, 4, src.len(), &src, &src, true).unwrap();
        let split = encode_split(&params, &filtered).unwrap().unwrap();
        let decoded = decode_split(params.codec, 4, &split, filtered.len()).unwrap();
        assert_eq!(decoded, filtered);
    }
}

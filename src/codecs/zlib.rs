//! Zlib codec, backed by `flate2`'s raw deflate writer/reader (no zlib
//! header/adler32 — the chunk already stores both lengths and a separate
//! pipeline can add its own integrity checks).

use crate::error::{Error, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

pub fn compress(clevel: i32, input: &[u8], output: &mut [u8]) -> Result<usize> {
    let level = Compression::new(clevel.clamp(0, 9) as u32);
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(input.len()), level);
    encoder
        .write_all(input)
        .map_err(|e| Error::CodecError { id: crate::constants::BLOSC_ZLIB, status: e.raw_os_error().unwrap_or(-1) })?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::CodecError { id: crate::constants::BLOSC_ZLIB, status: e.raw_os_error().unwrap_or(-1) })?;
    if compressed.len() >= output.len() {
        return Ok(0);
    }
    output[..compressed.len()].copy_from_slice(&compressed);
    Ok(compressed.len())
}

pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize> {
    use flate2::write::ZlibDecoder;
    let mut decoder = ZlibDecoder::new(Vec::with_capacity(output.len()));
    decoder
        .write_all(input)
        .map_err(|_| Error::CorruptChunk("zlib stream decode failed".into()))?;
    let decompressed = decoder
        .finish()
        .map_err(|_| Error::CorruptChunk("zlib stream decode failed".into()))?;
    if decompressed.len() != output.len() {
        return Err(Error::CorruptChunk("zlib decoded size mismatch".into()));
    }
    output.copy_from_slice(&decompressed);
    Ok(output.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let input: Vec<u8> = (0..8192).map(|i| (i % 61) as u8).collect();
        let mut out = vec![0u8; input.len() * 2];
        let csize = compress(6, &input, &mut out).unwrap();
        assert!(csize > 0);
        let mut back = vec![0u8; input.len()];
        let dsize = decompress(&out[..csize], &mut back).unwrap();
        assert_eq!(dsize, input.len());
        assert_eq!(back, input);
    }
}

//! Snappy codec, backed by the `snap` crate's raw (non-framed) encoder.

use crate::error::{Error, Result};

pub fn compress(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let mut encoder = snap::raw::Encoder::new();
    let compressed = encoder
        .compress_vec(input)
        .map_err(|_| Error::CodecError { id: crate::constants::BLOSC_SNAPPY, status: -1 })?;
    if compressed.len() >= output.len() {
        return Ok(0);
    }
    output[..compressed.len()].copy_from_slice(&compressed);
    Ok(compressed.len())
}

pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let mut decoder = snap::raw::Decoder::new();
    let decompressed = decoder
        .decompress_vec(input)
        .map_err(|_| Error::CorruptChunk("snappy block decode failed".into()))?;
    if decompressed.len() != output.len() {
        return Err(Error::CorruptChunk("snappy decoded size mismatch".into()));
    }
    output.copy_from_slice(&decompressed);
    Ok(output.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let input: Vec<u8> = (0..8192).map(|i| (i % 19) as u8).collect();
        let mut out = vec![0u8; input.len() * 2];
        let csize = compress(&input, &mut out).unwrap();
        assert!(csize > 0);
        let mut back = vec![0u8; input.len()];
        let dsize = decompress(&out[..csize], &mut back).unwrap();
        assert_eq!(dsize, input.len());
        assert_eq!(back, input);
    }
}

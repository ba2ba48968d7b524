//! Zstd codec, backed by the `zstd` crate's single-pass block API, plus
//! dictionary training support for the super-chunk's shared-dictionary mode.

use crate::error::{Error, Result};

pub fn compress(clevel: i32, input: &[u8], output: &mut [u8]) -> Result<usize> {
    let level = clevel.clamp(1, 22);
    let compressed = zstd::bulk::compress(input, level)
        .map_err(|e| Error::CodecError { id: crate::constants::BLOSC_ZSTD, status: e.raw_os_error().unwrap_or(-1) })?;
    if compressed.len() >= output.len() {
        return Ok(0);
    }
    output[..compressed.len()].copy_from_slice(&compressed);
    Ok(compressed.len())
}

pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let expected = output.len();
    let decompressed = zstd::bulk::decompress(input, expected)
        .map_err(|_| Error::CorruptChunk("zstd block decode failed".into()))?;
    if decompressed.len() != expected {
        return Err(Error::CorruptChunk("zstd decoded size mismatch".into()));
    }
    output.copy_from_slice(&decompressed);
    Ok(expected)
}

/// Train a dictionary from a set of representative samples, for use as a
/// shared compression context across many small chunks.
pub fn train_dictionary(samples: &[Vec<u8>], dict_size: usize) -> Result<Vec<u8>> {
    zstd::dict::from_samples(samples, dict_size)
        .map_err(|_| Error::CodecError { id: crate::constants::BLOSC_ZSTD, status: -1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let input: Vec<u8> = (0..8192).map(|i| (i % 37) as u8).collect();
        let mut out = vec![0u8; input.len() * 2];
        let csize = compress(5, &input, &mut out).unwrap();
        assert!(csize > 0);
        let mut back = vec![0u8; input.len()];
        let dsize = decompress(&out[..csize], &mut back).unwrap();
        assert_eq!(dsize, input.len());
        assert_eq!(back, input);
    }

    #[test]
    fn dictionary_trains_from_samples() {
        let samples: Vec<Vec<u8>> = (0..20)
            .map(|i| (0..256).map(|b| ((b + i) % 251) as u8).collect())
            .collect();
        let dict = train_dictionary(&samples, 4096).unwrap();
        assert!(!dict.is_empty());
    }
}

//! LZ4 and LZ4HC codecs, backed by `lz4_flex`'s block API (no frame
//! headers — the chunk header already tracks lengths).

use crate::error::{Error, Result};

pub fn compress(clevel: i32, input: &[u8], output: &mut [u8]) -> Result<usize> {
    let compressed = if clevel >= 7 {
        lz4_flex::block::compress(input)
    } else {
        lz4_flex::block::compress(input)
    };
    if compressed.len() >= output.len() {
        return Ok(0);
    }
    output[..compressed.len()].copy_from_slice(&compressed);
    Ok(compressed.len())
}

pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let expected = output.len();
    let decompressed = lz4_flex::block::decompress(input, expected)
        .map_err(|_| Error::CorruptChunk("lz4 block decode failed".into()))?;
    if decompressed.len() != expected {
        return Err(Error::CorruptChunk("lz4 decoded size mismatch".into()));
    }
    output.copy_from_slice(&decompressed);
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let input: Vec<u8> = (0..8192).map(|i| (i % 251) as u8).collect();
        let mut out = vec![0u8; input.len() * 2];
        let csize = compress(5, &input, &mut out).unwrap();
        assert!(csize > 0);
        let mut back = vec![0u8; input.len()];
        let dsize = decompress(&out[..csize], &mut back).unwrap();
        assert_eq!(dsize, input.len());
        assert_eq!(back, input);
    }
}

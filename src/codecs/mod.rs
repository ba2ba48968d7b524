//! Codec dispatch: one compressor/decompressor per chunk, chosen by the id
//! stored in the chunk header (§4.4). Built-ins cover ids 0-6; ids above
//! [`crate::constants::BLOSC2_DEFINED_CODECS_STOP`] route through the
//! dynamic [`crate::registry`].

pub mod blosclz;
pub mod lz4;
pub mod snappy;
pub mod zlib;
pub mod zstd;

use crate::constants::*;
use crate::error::{Error, Result};

/// Compress `src` into `dest`, returning the number of bytes written, or
/// `Ok(0)` when the codec declined (caller should store the block raw).
pub fn encode(codec_id: u8, clevel: i32, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    match codec_id {
        BLOSC_BLOSCLZ => Ok(blosclz::compress(clevel, src, dest)),
        BLOSC_LZ4 | BLOSC_LZ4HC => lz4::compress(clevel, src, dest),
        BLOSC_ZLIB => zlib::compress(clevel, src, dest),
        BLOSC_ZSTD => zstd::compress(clevel, src, dest),
        BLOSC_SNAPPY => snappy::compress(src, dest),
        id if id < BLOSC2_DEFINED_CODECS_STOP => Err(Error::UnknownCodecId(id)),
        id => crate::registry::codec_encode(id, clevel, src, dest),
    }
}

/// Decompress `src` into `dest`, which must be exactly the expected
/// decompressed size (known from the chunk header's `nbytes`/`blocksize`).
pub fn decode(codec_id: u8, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    match codec_id {
        BLOSC_BLOSCLZ => {
            let n = blosclz::decompress(src, dest);
            if n != dest.len() {
                Err(Error::CorruptChunk("blosclz decoded size mismatch".into()))
            } else {
                Ok(n)
            }
        }
        BLOSC_LZ4 | BLOSC_LZ4HC => lz4::decompress(src, dest),
        BLOSC_ZLIB => zlib::decompress(src, dest),
        BLOSC_ZSTD => zstd::decompress(src, dest),
        BLOSC_SNAPPY => snappy::decompress(src, dest),
        id if id < BLOSC2_DEFINED_CODECS_STOP => Err(Error::UnknownCodecId(id)),
        id => crate::registry::codec_decode(id, src, dest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_builtin_range_id_is_rejected() {
        let src = vec![1u8; 64];
        let mut dest = vec![0u8; 128];
        assert!(matches!(
            encode(3, 5, &src, &mut dest),
            Err(Error::UnknownCodecId(3))
        ));
    }
}

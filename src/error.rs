//! Crate-wide error taxonomy.
//!
//! Every public operation returns [`Result<T>`] instead of a bare negative
//! status code. [`error_code`] maps a variant back to the stable numeric id
//! from the wire-level error taxonomy, for callers that need to interop with
//! the classic C-style integer codes.

use crate::constants::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("destination buffer too small (need at least {needed} bytes)")]
    BufferTooSmall { needed: usize },

    #[error("input exceeds the maximum chunk/super-chunk size")]
    BufferTooBig,

    #[error("corrupt chunk: {0}")]
    CorruptChunk(String),

    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    #[error("unknown codec id {0}")]
    UnknownCodecId(u8),

    #[error("unknown codec name {0:?}")]
    UnknownCodecName(String),

    #[error("unknown filter id {0}")]
    UnknownFilter(u8),

    #[error("unknown io backend {0:?}")]
    UnknownIoBackend(String),

    #[error("codec {id} returned error status {status}")]
    CodecError { id: u8, status: i32 },

    #[error("filter {id} (slot {slot}) returned error status {status}")]
    FilterError { id: u8, slot: usize, status: i32 },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("index or range out of bounds")]
    OutOfRange,

    #[error("metadata layer {0:?} is frozen")]
    FrozenMetadata(String),

    #[error("duplicate registry name {0:?}")]
    DuplicateName(String),

    #[error("duplicate registry id {0}")]
    DuplicateId(i32),

    #[error("allocation failed")]
    Allocation,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Map an [`Error`] to the stable numeric code from the wire-level taxonomy.
pub fn error_code(err: &Error) -> i32 {
    match err {
        Error::InvalidArgument(_) => BLOSC2_ERROR_INVALID_PARAM,
        Error::BufferTooSmall { .. } => BLOSC2_ERROR_FRAME_MORE_MALLOC,
        Error::BufferTooBig => BLOSC2_ERROR_2GB_LIMIT,
        Error::CorruptChunk(_) => BLOSC2_ERROR_INVALID_HEADER,
        Error::CorruptFrame(_) => BLOSC2_ERROR_FRAME_TYPE,
        Error::UnknownCodecId(_) | Error::UnknownCodecName(_) => BLOSC2_ERROR_CODEC_SUPPORT,
        Error::UnknownFilter(_) => BLOSC2_ERROR_CODEC_PARAM,
        Error::UnknownIoBackend(_) => BLOSC2_ERROR_PLUGIN_IO,
        Error::CodecError { .. } => BLOSC2_ERROR_CODEC_PARAM,
        Error::FilterError { .. } => BLOSC2_ERROR_CODEC_PARAM,
        Error::IoError(_) => BLOSC2_ERROR_FILE_READ,
        Error::OutOfRange => BLOSC2_ERROR_INVALID_INDEX,
        Error::FrozenMetadata(_) => BLOSC2_ERROR_METALAYER_NOT_FOUND,
        Error::DuplicateName(_) | Error::DuplicateId(_) => BLOSC2_ERROR_INVALID_PARAM,
        Error::Allocation => BLOSC2_ERROR_FRAME_MORE_MALLOC,
        Error::NotImplemented(_) => BLOSC2_ERROR_NOT_IMPLEMENTED,
    }
}

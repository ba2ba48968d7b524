//! A blocked, chunked compression core in the c-blosc2 mold: a codec/filter
//! pipeline operating on fixed-size blocks, chunks assembled from one or
//! more blocks with their own small header, a super-chunk holding an
//! ordered sequence of compressed chunks plus metadata layers, a frame
//! container serializing a super-chunk to a contiguous buffer/file or a
//! sparse per-chunk directory, and an N-D array layer (`b2nd`) mapping a
//! logical shape onto a super-chunk's chunk grid.
//!
//! Module layout mirrors the layering above:
//!
//! - [`constants`] — wire-format field offsets, flag bits, codec/filter ids
//! - [`error`] — the crate-wide [`error::Error`] taxonomy
//! - [`config`] — [`config::CParams`]/[`config::DParams`]
//! - [`filters`] — the forward/backward block filter pipeline
//! - [`codecs`] — built-in block compressors/decompressors
//! - [`registry`] — dynamic codec/filter/tune/io-backend plugin registries
//! - [`tune`] — block-size and split-mode heuristics
//! - [`block`] — single-block compress/decompress, including the split path
//! - [`pool`] — the worker-thread pool chunk compression fans blocks out to
//! - [`chunk`] — one chunk: header plus one or more compressed blocks
//! - [`schunk`] — [`schunk::SuperChunk`], an ordered sequence of chunks
//! - [`frame`] — contiguous/sparse on-disk serialization of a super-chunk
//! - [`b2nd`] — the N-D array layer on top of a super-chunk

pub mod constants;
pub mod error;
pub mod config;
pub mod filters;
pub mod codecs;
pub mod registry;
pub mod tune;
pub mod block;
pub mod pool;
pub mod chunk;
pub mod schunk;
pub mod frame;
pub mod b2nd;

pub use config::{CParams, DParams, FilterSlot};
pub use error::{Error, Result};
pub use schunk::{ChunkRef, Storage, SuperChunk};
pub use b2nd::{NdArray, create as ndarray_create, empty as ndarray_empty, from_cbuffer as ndarray_from_cbuffer, open as ndarray_open, from_cframe as ndarray_from_cframe, concatenate as ndarray_concatenate};

pub use constants::{
    BLOSC_BLOSCLZ, BLOSC_LZ4, BLOSC_LZ4HC, BLOSC_ZLIB, BLOSC_ZSTD, BLOSC_SNAPPY,
    BLOSC_NOFILTER, BLOSC_SHUFFLE, BLOSC_BITSHUFFLE, BLOSC_DELTA, BLOSC_TRUNC_PREC,
    BLOSC_FILTER_BYTEDELTA, B2ND_MAX_DIM,
};

//! Wire-format constants for chunks and frames.
//!
//! Mirrors the byte layout fixed in the container format: header field
//! offsets, flag bits, codec/filter ids and their reserved ranges, and the
//! special-chunk encoding. All multi-byte fields on the wire are
//! little-endian; nothing here reorders bytes, that happens at the point of
//! read/write.

/// Current on-disk chunk format version.
pub const BLOSC_VERSION_FORMAT: u8 = 2;

/// Classic (non-extended) chunk header length, in bytes.
pub const BLOSC_MIN_HEADER_LENGTH: usize = 16;
/// Extended chunk header length (filter ids + filter metas + reserved), in bytes.
pub const BLOSC_EXTENDED_HEADER_LENGTH: usize = 32;

/// Maximum logical (uncompressed) bytes in one chunk: 2 GiB - 1.
pub const BLOSC2_MAX_BUFFERSIZE: i64 = i32::MAX as i64;
/// Upper bound on the framing overhead a single chunk may add.
pub const BLOSC2_MAX_OVERHEAD: usize = BLOSC_EXTENDED_HEADER_LENGTH;
/// Largest typesize (element size in bytes) the format can express.
pub const BLOSC_MAX_TYPESIZE: usize = 255;
/// Minimum meaningful chunk buffer size.
pub const BLOSC_MIN_BUFFERSIZE: usize = 32;

/// Maximum number of filter slots in the pipeline.
pub const BLOSC2_MAX_FILTERS: usize = 6;
/// Maximum number of user-defined filters trackable per build.
pub const BLOSC2_MAX_UDFILTERS: usize = 4;
/// Dimensionality cap for N-D arrays.
pub const B2ND_MAX_DIM: usize = 8;
/// Maximum number of fixed metadata layers a super-chunk may hold.
pub const B2ND_MAX_METALAYERS: usize = 16;

/// L1 cache size heuristic used by the default tune.
pub const L1: usize = 32 * 1024;
/// L2 cache size heuristic used by the default tune.
pub const L2: usize = 256 * 1024;

// --- Chunk header byte offsets (classic + extended layout) ---
pub const CHUNK_VERSION: usize = 0x0;
pub const CHUNK_VERSIONLZ: usize = 0x1;
pub const CHUNK_FLAGS1: usize = 0x2;
pub const CHUNK_TYPESIZE: usize = 0x3;
pub const CHUNK_NBYTES: usize = 0x4;
pub const CHUNK_BLOCKSIZE: usize = 0x8;
pub const CHUNK_CBYTES: usize = 0xC;
pub const CHUNK_CODEC: usize = 0x10;
pub const CHUNK_FLAGS2: usize = 0x11;
pub const CHUNK_FILTER_IDS: usize = 0x12;
pub const CHUNK_FILTER_METAS: usize = 0x12 + BLOSC2_MAX_FILTERS;

// --- flags1 bits (byte offset 2) ---
pub const BLOSC_DOSHUFFLE: u8 = 0x1;
pub const BLOSC_MEMCPYED: u8 = 0x2;
pub const BLOSC_DOBITSHUFFLE: u8 = 0x4;
pub const BLOSC_DODELTA: u8 = 0x8;

// --- flags2 bits (byte offset 0x11) ---
/// Low 3 bits of flags2 hold the special-chunk kind.
pub const BLOSC2_SPECIAL_MASK: u8 = 0x7;
pub const BLOSC2_SPECIAL_BIT_SHIFT: u8 = 4;
/// Byte-split was requested/used for this chunk.
pub const BLOSC2_FLAG_SPLIT: u8 = 0x10;
/// Chunk payload is big-endian (rare; core treats this as opaque metadata).
pub const BLOSC2_BIGENDIAN: u8 = 0x80;

// --- filter ids ---
pub const BLOSC_NOFILTER: u8 = 0;
pub const BLOSC_SHUFFLE: u8 = 1;
pub const BLOSC_BITSHUFFLE: u8 = 2;
pub const BLOSC_DELTA: u8 = 3;
pub const BLOSC_TRUNC_PREC: u8 = 4;
pub const BLOSC_FILTER_BYTEDELTA: u8 = 5;

// --- codec ids (built-in range 0..=31) ---
pub const BLOSC_BLOSCLZ: u8 = 0;
pub const BLOSC_LZ4: u8 = 1;
pub const BLOSC_LZ4HC: u8 = 2;
pub const BLOSC_ZLIB: u8 = 4;
pub const BLOSC_ZSTD: u8 = 5;
pub const BLOSC_SNAPPY: u8 = 6;

/// Built-in ids occupy [0, 32); globally registered dynamic ids occupy
/// [32, 160); purely local/user ids occupy [160, 256).
pub const BLOSC2_DEFINED_CODECS_STOP: u8 = 32;
pub const BLOSC2_GLOBAL_REGISTERED_CODECS_STOP: u8 = 160;
pub const BLOSC2_DEFINED_FILTERS_STOP: u8 = 32;
pub const BLOSC2_GLOBAL_REGISTERED_FILTERS_STOP: u8 = 160;

// --- split modes ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Always,
    Never,
    Auto,
    ForwardCompat,
}

impl Default for SplitMode {
    fn default() -> Self {
        SplitMode::Auto
    }
}

/// Special-chunk kinds, encoded in the low 3 bits of `flags2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpecialKind {
    None = 0x0,
    Zero = 0x1,
    Nan = 0x2,
    Value = 0x3,
    Uninit = 0x4,
}

impl SpecialKind {
    pub fn from_bits(b: u8) -> Option<Self> {
        match b & BLOSC2_SPECIAL_MASK {
            0x0 => Some(SpecialKind::None),
            0x1 => Some(SpecialKind::Zero),
            0x2 => Some(SpecialKind::Nan),
            0x3 => Some(SpecialKind::Value),
            0x4 => Some(SpecialKind::Uninit),
            _ => None,
        }
    }
}

// --- frame header byte offsets ---
pub const FRAME_HEADER_MAGIC: usize = 2;
pub const FRAME_HEADER_LEN: usize = 11;
pub const FRAME_LEN: usize = 16;
pub const FRAME_FLAGS: usize = 25;
pub const FRAME_TYPE: usize = 26;
pub const FRAME_CODECS: usize = 27;
pub const FRAME_OTHER_FLAGS: usize = 28;
pub const FRAME_NBYTES: usize = 30;
pub const FRAME_CBYTES: usize = 39;
pub const FRAME_TYPESIZE: usize = 48;
pub const FRAME_BLOCKSIZE: usize = 53;
pub const FRAME_CHUNKSIZE: usize = 58;
pub const FRAME_NTHREADS_C: usize = 63;
pub const FRAME_NTHREADS_D: usize = 66;
pub const FRAME_HAS_VLMETALAYERS: usize = 68;
pub const FRAME_FILTER_PIPELINE: usize = 70;
pub const FRAME_FILTER_PIPELINE_MAX: usize = 8;
pub const FRAME_HEADER_MINLEN: usize = 87;

pub const FRAME_TRAILER_VERSION: u8 = 1;
pub const FRAME_TRAILER_MINLEN: usize = 25;

pub const FRAME_CONTIGUOUS_TYPE: u8 = 0;
pub const FRAME_DIRECTORY_TYPE: u8 = 1;

/// MSB of a frame chunk-offset entry flags the entry as an inline special chunk.
pub const FRAME_OFFSET_INLINE_BIT: u64 = 1 << 63;

// --- error code taxonomy (stable numeric ids, see error.rs) ---
pub const BLOSC2_ERROR_SUCCESS: i32 = 0;
pub const BLOSC2_ERROR_FAILURE: i32 = -1;
pub const BLOSC2_ERROR_INVALID_HEADER: i32 = -9;
pub const BLOSC2_ERROR_INVALID_PARAM: i32 = -10;
pub const BLOSC2_ERROR_CODEC_SUPPORT: i32 = -11;
pub const BLOSC2_ERROR_CODEC_PARAM: i32 = -12;
pub const BLOSC2_ERROR_CODEC_DICT: i32 = -13;
pub const BLOSC2_ERROR_VERSION_SUPPORT: i32 = -14;
pub const BLOSC2_ERROR_INVALID_NTHREADS: i32 = -15;
pub const BLOSC2_ERROR_POSTFILTER: i32 = -16;
pub const BLOSC2_ERROR_FRAME_TYPE: i32 = -17;
pub const BLOSC2_ERROR_FILE_OPEN: i32 = -18;
pub const BLOSC2_ERROR_FILE_WRITE: i32 = -19;
pub const BLOSC2_ERROR_FILE_READ: i32 = -20;
pub const BLOSC2_ERROR_FILE_TRUNCATE: i32 = -21;
pub const BLOSC2_ERROR_THREAD_CREATE: i32 = -22;
pub const BLOSC2_ERROR_POSTFILTER_PARAM: i32 = -23;
pub const BLOSC2_ERROR_FRAME_SPECIAL: i32 = -24;
pub const BLOSC2_ERROR_SCHUNK_SPECIAL: i32 = -25;
pub const BLOSC2_ERROR_PLUGIN_IO: i32 = -26;
pub const BLOSC2_ERROR_FILE_REMOVE: i32 = -27;
pub const BLOSC2_ERROR_NULL_POINTER: i32 = -28;
pub const BLOSC2_ERROR_INVALID_INDEX: i32 = -29;
pub const BLOSC2_ERROR_METALAYER_NOT_FOUND: i32 = -30;
pub const BLOSC2_ERROR_MAX_BUFSIZE_EXCEEDED: i32 = -31;
pub const BLOSC2_ERROR_NOT_IMPLEMENTED: i32 = -32;
pub const BLOSC2_ERROR_2GB_LIMIT: i32 = -33;
pub const BLOSC2_ERROR_FRAME_MORE_MALLOC: i32 = -34;
pub const BLOSC2_ERROR_FRAME_REALLOC: i32 = -35;
pub const BLOSC2_ERROR_TUNER: i32 = -36;

//! Dynamic plugin registries for codecs, filters, tune heuristics and I/O
//! backends (§9 "Global registries"). Built-in ids are dispatched directly
//! by [`crate::codecs`]/[`crate::filters`]; anything at or above
//! [`crate::constants::BLOSC2_DEFINED_CODECS_STOP`] (for codecs/filters) goes
//! through here. Registries are process-global, built lazily behind a
//! [`std::sync::OnceLock`], and are append-only at the id/name level: a
//! second registration under an id or name already taken is a
//! [`Error::DuplicateId`]/[`Error::DuplicateName`].

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// A pluggable compressor/decompressor, registered under a reserved id range.
pub trait Codec: Send + Sync {
    fn id(&self) -> u8;
    fn name(&self) -> &str;
    fn compress(&self, clevel: i32, src: &[u8], dest: &mut [u8]) -> Result<usize>;
    fn decompress(&self, src: &[u8], dest: &mut [u8]) -> Result<usize>;
}

/// A pluggable forward/backward block transform, registered alongside the
/// built-in filter pipeline stages.
pub trait Filter: Send + Sync {
    fn id(&self) -> u8;
    fn name(&self) -> &str;
    fn forward(&self, meta: u8, typesize: usize, blocksize: usize, src: &[u8], dest: &mut [u8]) -> Result<()>;
    fn backward(&self, meta: u8, typesize: usize, blocksize: usize, src: &[u8], dest: &mut [u8]) -> Result<()>;
}

/// A pluggable blocksize/splitmode heuristic, used in place of the default
/// tune (§4.8).
pub trait Tune: Send + Sync {
    fn name(&self) -> &str;
    fn next_blocksize(&self, typesize: usize, nbytes: usize, clevel: i32) -> usize;
}

/// A pluggable frame storage backend (§4.6), e.g. object storage or a
/// custom transport, registered by name rather than numeric id.
pub trait IoBackend: Send + Sync {
    fn name(&self) -> &str;
    fn open(&self, urn: &str, writable: bool) -> Result<Box<dyn ReadWriteSeek>>;
}

/// Combined read+write+seek bound, since frame I/O needs all three.
pub trait ReadWriteSeek: std::io::Read + std::io::Write + std::io::Seek {}
impl<T: std::io::Read + std::io::Write + std::io::Seek> ReadWriteSeek for T {}

struct IdRegistry<T: ?Sized> {
    by_id: HashMap<u8, Arc<T>>,
    by_name: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> IdRegistry<T> {
    fn new() -> Self {
        IdRegistry { by_id: HashMap::new(), by_name: HashMap::new() }
    }
}

fn codec_registry() -> &'static Mutex<IdRegistry<dyn Codec>> {
    static REG: OnceLock<Mutex<IdRegistry<dyn Codec>>> = OnceLock::new();
    REG.get_or_init(|| Mutex::new(IdRegistry::new()))
}

fn filter_registry() -> &'static Mutex<IdRegistry<dyn Filter>> {
    static REG: OnceLock<Mutex<IdRegistry<dyn Filter>>> = OnceLock::new();
    REG.get_or_init(|| Mutex::new(IdRegistry::new()))
}

fn tune_registry() -> &'static Mutex<HashMap<String, Arc<dyn Tune>>> {
    static REG: OnceLock<Mutex<HashMap<String, Arc<dyn Tune>>>> = OnceLock::new();
    REG.get_or_init(|| Mutex::new(HashMap::new()))
}

fn io_registry() -> &'static Mutex<HashMap<String, Arc<dyn IoBackend>>> {
    static REG: OnceLock<Mutex<HashMap<String, Arc<dyn IoBackend>>>> = OnceLock::new();
    REG.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Register a codec under its reserved id/name. Ids below
/// [`crate::constants::BLOSC2_DEFINED_CODECS_STOP`] are reserved for
/// built-ins and rejected here.
pub fn register_codec(codec: Arc<dyn Codec>) -> Result<()> {
    if codec.id() < crate::constants::BLOSC2_DEFINED_CODECS_STOP {
        return Err(Error::DuplicateId(codec.id() as i32));
    }
    let mut reg = codec_registry().lock().unwrap();
    if reg.by_id.contains_key(&codec.id()) {
        return Err(Error::DuplicateId(codec.id() as i32));
    }
    if reg.by_name.contains_key(codec.name()) {
        return Err(Error::DuplicateName(codec.name().to_string()));
    }
    reg.by_name.insert(codec.name().to_string(), codec.clone());
    reg.by_id.insert(codec.id(), codec);
    Ok(())
}

pub fn register_filter(filter: Arc<dyn Filter>) -> Result<()> {
    if filter.id() < crate::constants::BLOSC2_DEFINED_FILTERS_STOP {
        return Err(Error::DuplicateId(filter.id() as i32));
    }
    let mut reg = filter_registry().lock().unwrap();
    if reg.by_id.contains_key(&filter.id()) {
        return Err(Error::DuplicateId(filter.id() as i32));
    }
    if reg.by_name.contains_key(filter.name()) {
        return Err(Error::DuplicateName(filter.name().to_string()));
    }
    reg.by_name.insert(filter.name().to_string(), filter.clone());
    reg.by_id.insert(filter.id(), filter);
    Ok(())
}

pub fn register_tune(tune: Arc<dyn Tune>) -> Result<()> {
    let mut reg = tune_registry().lock().unwrap();
    if reg.contains_key(tune.name()) {
        return Err(Error::DuplicateName(tune.name().to_string()));
    }
    reg.insert(tune.name().to_string(), tune);
    Ok(())
}

pub fn register_io_backend(backend: Arc<dyn IoBackend>) -> Result<()> {
    let mut reg = io_registry().lock().unwrap();
    if reg.contains_key(backend.name()) {
        return Err(Error::DuplicateName(backend.name().to_string()));
    }
    reg.insert(backend.name().to_string(), backend);
    Ok(())
}

pub fn lookup_codec_by_name(name: &str) -> Result<Arc<dyn Codec>> {
    codec_registry()
        .lock()
        .unwrap()
        .by_name
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownCodecName(name.to_string()))
}

pub fn lookup_io_backend(name: &str) -> Result<Arc<dyn IoBackend>> {
    io_registry()
        .lock()
        .unwrap()
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownIoBackend(name.to_string()))
}

/// Dispatch to a dynamically-registered codec by id, used by
/// [`crate::codecs::encode`] for ids outside the built-in range.
pub fn codec_encode(id: u8, clevel: i32, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let codec = codec_registry()
        .lock()
        .unwrap()
        .by_id
        .get(&id)
        .cloned()
        .ok_or(Error::UnknownCodecId(id))?;
    codec.compress(clevel, src, dest)
}

pub fn codec_decode(id: u8, src: &[u8], dest: &mut [u8]) -> Result<usize> {
    let codec = codec_registry()
        .lock()
        .unwrap()
        .by_id
        .get(&id)
        .cloned()
        .ok_or(Error::UnknownCodecId(id))?;
    codec.decompress(src, dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;
    impl Codec for Doubler {
        fn id(&self) -> u8 { 200 }
        fn name(&self) -> &str { "test-doubler" }
        fn compress(&self, _clevel: i32, src: &[u8], dest: &mut [u8]) -> Result<usize> {
            dest[..src.len()].copy_from_slice(src);
            Ok(src.len())
        }
        fn decompress(&self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
            dest.copy_from_slice(src);
            Ok(src.len())
        }
    }

    #[test]
    fn register_and_dispatch_dynamic_codec() {
        let _ = register_codec(Arc::new(Doubler));
        let src = vec![7u8; 16];
        let mut dest = vec![0u8; 16];
        let n = codec_encode(200, 5, &src, &mut dest).unwrap();
        assert_eq!(n, 16);
        assert_eq!(dest, src);
    }

    #[test]
    fn builtin_range_id_is_rejected() {
        struct Fake;
        impl Codec for Fake {
            fn id(&self) -> u8 { 1 }
            fn name(&self) -> &str { "fake-lz4" }
            fn compress(&self, _: i32, _: &[u8], _: &mut [u8]) -> Result<usize> { Ok(0) }
            fn decompress(&self, _: &[u8], _: &mut [u8]) -> Result<usize> { Ok(0) }
        }
        assert!(register_codec(Arc::new(Fake)).is_err());
    }
}

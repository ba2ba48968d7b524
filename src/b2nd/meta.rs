//! Encoding for the `b2nd` fixed metadata layer (§4.7): a msgpack array
//! `[version, ndim, shape[ndim], chunkshape[ndim], blockshape[ndim],
//! dtype_format, dtype_string]`. The dtype string is opaque to the core;
//! callers attach whatever their own type system needs.

use crate::constants::B2ND_MAX_DIM;
use crate::error::{Error, Result};
use crate::frame::msgpack::{self, Value};

pub const B2ND_METALAYER_NAME: &str = "b2nd";
const B2ND_METALAYER_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub ndim: usize,
    pub shape: Vec<i64>,
    pub chunkshape: Vec<i64>,
    pub blockshape: Vec<i64>,
    pub dtype_format: u8,
    pub dtype: String,
}

/// Shape/chunkshape/blockshape entries are always encoded fixed-width so
/// that a later `shape` change (append, concatenate) re-encodes to the
/// exact same byte length and can go through `meta_update`'s in-place,
/// no-growth rewrite instead of needing the layer re-added from scratch.
fn int_array(values: &[i64]) -> Value {
    Value::Array(values.iter().map(|&v| Value::Int64Fixed(v)).collect())
}

pub fn encode(meta: &Metadata) -> Vec<u8> {
    let value = Value::Array(vec![
        Value::Int(B2ND_METALAYER_VERSION),
        Value::Int(meta.ndim as i64),
        int_array(&meta.shape),
        int_array(&meta.chunkshape),
        int_array(&meta.blockshape),
        Value::Int(meta.dtype_format as i64),
        Value::Str(meta.dtype.clone()),
    ]);
    let mut out = Vec::new();
    msgpack::encode(&value, &mut out);
    out
}

fn as_int_vec(v: &Value) -> Result<Vec<i64>> {
    match v {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Int(n) => Ok(*n),
                _ => Err(Error::CorruptFrame("b2nd metalayer shape entry is not an int".into())),
            })
            .collect(),
        _ => Err(Error::CorruptFrame("b2nd metalayer field is not an array".into())),
    }
}

pub fn decode(bytes: &[u8]) -> Result<Metadata> {
    let (value, _) = msgpack::decode(bytes)?;
    let items = match value {
        Value::Array(items) if items.len() == 7 => items,
        _ => return Err(Error::CorruptFrame("b2nd metalayer is not a 7-element array".into())),
    };
    let _version = match &items[0] {
        Value::Int(n) => *n,
        _ => return Err(Error::CorruptFrame("b2nd metalayer version is not an int".into())),
    };
    let ndim = match &items[1] {
        Value::Int(n) => *n as usize,
        _ => return Err(Error::CorruptFrame("b2nd metalayer ndim is not an int".into())),
    };
    if ndim == 0 || ndim > B2ND_MAX_DIM {
        return Err(Error::CorruptFrame("b2nd metalayer ndim out of range".into()));
    }
    let shape = as_int_vec(&items[2])?;
    let chunkshape = as_int_vec(&items[3])?;
    let blockshape = as_int_vec(&items[4])?;
    if shape.len() != ndim || chunkshape.len() != ndim || blockshape.len() != ndim {
        return Err(Error::CorruptFrame("b2nd metalayer shape length mismatch with ndim".into()));
    }
    let dtype_format = match &items[5] {
        Value::Int(n) => *n as u8,
        _ => return Err(Error::CorruptFrame("b2nd metalayer dtype_format is not an int".into())),
    };
    let dtype = match &items[6] {
        Value::Str(s) => s.clone(),
        _ => return Err(Error::CorruptFrame("b2nd metalayer dtype is not a string".into())),
    };
    Ok(Metadata { ndim, shape, chunkshape, blockshape, dtype_format, dtype })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_metadata() {
        let meta = Metadata {
            ndim: 3,
            shape: vec![10, 20, 30],
            chunkshape: vec![5, 10, 15],
            blockshape: vec![5, 5, 5],
            dtype_format: 0,
            dtype: "<f8".to_string(),
        };
        let bytes = encode(&meta);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn rejects_ndim_mismatch() {
        let meta = Metadata {
            ndim: 2,
            shape: vec![10, 20],
            chunkshape: vec![5, 10],
            blockshape: vec![5, 5],
            dtype_format: 0,
            dtype: "<i4".to_string(),
        };
        let mut bytes = encode(&meta);
        // Corrupt ndim to 3 without touching the shape arrays.
        bytes[1] = 3;
        assert!(decode(&bytes).is_err());
    }
}

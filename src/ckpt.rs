//! Checkpoint load/save.
//!
//! A checkpoint is a pickle stream whose top-level object is a dict of
//! parameter name → tensor record, where a record is a dict holding
//! `dtype` (name string), `shape` (list of ints) and `data` (raw bytes).

use crate::{
    error::CastError,
    weights::{Dtype, Tensor, WeightMap},
};
use serde_pickle::{DeOptions, HashableValue, SerOptions, Value};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Key some training frameworks nest resume metadata under.
const WRAPPER_KEY: &str = "state_dict";

/// Reads a checkpoint into a weight mapping.
///
/// A top-level `state_dict` entry, when present, is removed together with
/// its contents before decoding; sibling entries are kept. Only this
/// direction strips the wrapper — [`write`] never reintroduces one.
pub fn read(path: impl AsRef<Path>) -> Result<WeightMap, CastError> {
    let file = File::open(path)?;
    let value = serde_pickle::value_from_reader(BufReader::new(file), DeOptions::new())?;
    let Value::Dict(mut dict) = value else {
        return Err(CastError::NotAMapping);
    };
    dict.remove(&key(WRAPPER_KEY));

    let mut weights = WeightMap::new();
    for (name, record) in dict {
        let HashableValue::String(name) = name else {
            return Err(CastError::KeyNotAString);
        };
        let tensor = decode_record(&name, record)?;
        weights.insert(name, tensor);
    }
    Ok(weights)
}

/// Writes a weight mapping as a checkpoint, overwriting the destination.
/// No wrapper key is added.
pub fn write(path: impl AsRef<Path>, weights: &WeightMap) -> Result<(), CastError> {
    let dict = weights
        .iter()
        .map(|(name, tensor)| (key(name), encode_record(tensor)))
        .collect();
    let mut out = BufWriter::new(File::create(path)?);
    serde_pickle::value_to_writer(&mut out, &Value::Dict(dict), SerOptions::new())?;
    out.into_inner().map_err(|e| e.into_error())?;
    Ok(())
}

#[inline]
fn key(name: &str) -> HashableValue {
    HashableValue::String(name.to_string())
}

fn decode_record(name: &str, record: Value) -> Result<Tensor, CastError> {
    let malformed = || CastError::MalformedRecord(name.to_string());

    let Value::Dict(mut record) = record else {
        return Err(malformed());
    };
    let (Some(Value::String(dtype)), Some(shape), Some(Value::Bytes(data))) = (
        record.remove(&key("dtype")),
        record.remove(&key("shape")),
        record.remove(&key("data")),
    ) else {
        return Err(malformed());
    };

    let dims = match shape {
        Value::List(dims) | Value::Tuple(dims) => dims,
        _ => return Err(malformed()),
    };
    let shape = dims
        .into_iter()
        .map(|dim| match dim {
            Value::I64(dim) if dim >= 0 => Ok(dim as usize),
            _ => Err(malformed()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Tensor::new(Dtype::parse(&dtype)?, shape, data)
}

fn encode_record(tensor: &Tensor) -> Value {
    let mut record = BTreeMap::new();
    record.insert(key("dtype"), Value::String(tensor.dtype().name().to_string()));
    record.insert(
        key("shape"),
        Value::List(tensor.shape().iter().map(|&dim| Value::I64(dim as i64)).collect()),
    );
    record.insert(key("data"), Value::Bytes(tensor.data().to_vec()));
    Value::Dict(record)
}

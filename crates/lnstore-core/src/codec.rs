//! Record codec
//!
//! Records are stored as a CBOR map from attribute name to value. CBOR keeps
//! the format self-describing so attribute sets can change without a
//! migration. Decoding is strict about shape: anything that is not a text-keyed
//! map of the value kinds in [`Value`] is reported as a decode error, which the
//! adapter treats as corruption.

use std::collections::BTreeMap;

use serde_cbor::Value as Cbor;
use thiserror::Error;

use crate::value::{Record, Value};

/// Failure converting between a [`Record`] and its stored bytes.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot encode record: {0}")]
    Encode(String),
    #[error("cannot decode record: {0}")]
    Decode(String),
}

pub fn encode(record: &Record) -> Result<Vec<u8>, CodecError> {
    let map = record
        .iter()
        .map(|(attr, value)| (Cbor::Text(attr.clone()), to_cbor(value)))
        .collect::<BTreeMap<_, _>>();

    serde_cbor::to_vec(&Cbor::Map(map)).map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Record, CodecError> {
    let root: Cbor = serde_cbor::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;

    let map = match root {
        Cbor::Map(map) => map,
        other => {
            return Err(CodecError::Decode(format!(
                "expected a map at the top level, found {}",
                cbor_kind(&other)
            )))
        }
    };

    let mut record = Record::new();
    for (attr, value) in map {
        let attr = match attr {
            Cbor::Text(attr) => attr,
            other => {
                return Err(CodecError::Decode(format!(
                    "attribute names must be text, found {}",
                    cbor_kind(&other)
                )))
            }
        };

        // null stands in for an undefined attribute
        if let Cbor::Null = value {
            continue;
        }

        let value = from_cbor(value).map_err(|e| CodecError::Decode(format!("`{}`: {}", attr, e)))?;
        record.set(attr, value);
    }

    Ok(record)
}

fn to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Int(n) => Cbor::Integer(i128::from(*n)),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Bool(b) => Cbor::Bool(*b),
        Value::List(items) => Cbor::Array(items.iter().map(to_cbor).collect()),
    }
}

fn from_cbor(value: Cbor) -> Result<Value, String> {
    match value {
        Cbor::Integer(n) => i64::try_from(n)
            .map(Value::Int)
            .map_err(|_| format!("integer {} out of range", n)),
        Cbor::Text(s) => Ok(Value::Text(s)),
        Cbor::Bytes(b) => Ok(Value::Bytes(b)),
        Cbor::Bool(b) => Ok(Value::Bool(b)),
        Cbor::Array(items) => items.into_iter().map(from_cbor).collect::<Result<Vec<_>, _>>().map(Value::List),
        other => Err(format!("unsupported value kind {}", cbor_kind(&other))),
    }
}

fn cbor_kind(value: &Cbor) -> &'static str {
    match value {
        Cbor::Null => "null",
        Cbor::Bool(_) => "bool",
        Cbor::Integer(_) => "integer",
        Cbor::Float(_) => "float",
        Cbor::Bytes(_) => "bytes",
        Cbor::Text(_) => "text",
        Cbor::Array(_) => "array",
        Cbor::Map(_) => "map",
        _ => "tagged value",
    }
}

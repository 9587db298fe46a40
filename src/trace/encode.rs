//! Hex encodings for the wire format
//!
//! Words and gas are `0x`-prefixed minimal hex (no leading zeros except
//! `"0x0"`); byte strings are `0x`-prefixed lowercase hex of every byte.

use bytes::Bytes;
use primitive_types::{H160, U256};
use serde::ser::SerializeSeq;
use serde::Serializer;

pub(crate) fn word<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:#x}"))
}

pub(crate) fn words<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;

    for value in values {
        seq.serialize_element(&format!("{value:#x}"))?;
    }

    seq.end()
}

pub(crate) fn gas<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:#x}"))
}

pub(crate) fn address<S: Serializer>(value: &H160, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(value.as_bytes())))
}

pub(crate) fn byte_string<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(value)))
}

pub(crate) fn byte_string_opt<S: Serializer>(
    value: &Option<Bytes>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => byte_string(value, serializer),
        None => serializer.serialize_none(),
    }
}

//! Parameter buffer manager.
//!
//! A `ParamSet` collects the bind payloads for one statement execution.
//! Each slot owns its scratch bytes through the `ParamValue` enum, so
//! `reset` (or drop) releases every buffer exactly once regardless of
//! which type produced it.

#![allow(clippy::result_large_err)]

use pgbind_core::error::{BindError, BindErrorKind};
use pgbind_core::{Error, Result, Value};

use crate::types::encode::{
    Format, encode_bool, encode_float, encode_int, encode_interval, encode_time, encode_timestamp,
};
use crate::types::numeric::encode_numeric;
use crate::types::{ServerCaps, array, oid};

/// Scratch payload owned by one parameter slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Wire NULL
    Null,
    /// Binary-format payload
    Bytes(Vec<u8>),
    /// Text-format payload
    Text(String),
}

/// One bound parameter: declared type, format code and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundParam {
    /// Declared type OID (0 lets the server infer)
    pub oid: u32,
    /// Format code for this parameter
    pub format: Format,
    /// Owned payload
    pub value: ParamValue,
}

/// The per-execution parameter set.
#[derive(Debug, Default)]
pub struct ParamSet {
    params: Vec<BoundParam>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound slots.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Drop every slot and its scratch buffer.
    pub fn reset(&mut self) {
        self.params.clear();
    }

    /// Bind one value, appending one slot.
    ///
    /// On an unsupported value kind the slot is still consumed with a
    /// NULL placeholder before the error returns, so positional
    /// parameters after a failed bind stay aligned.
    pub fn add(&mut self, value: &Value, caps: &ServerCaps) -> Result<()> {
        match value {
            Value::Null => {
                self.push_null(0);
                Ok(())
            }

            Value::Bool(v) => {
                self.push_binary(oid::BOOL, encode_bool(*v));
                Ok(())
            }

            Value::Int(v) => {
                let (type_oid, bytes) = encode_int(*v);
                self.push_binary(type_oid, bytes);
                Ok(())
            }

            Value::Float(v) => {
                self.push_binary(oid::FLOAT8, encode_float(*v));
                Ok(())
            }

            Value::Number(s) => match encode_numeric(s) {
                Ok(bytes) => {
                    self.push_binary(oid::NUMERIC, bytes);
                    Ok(())
                }
                Err(e) => {
                    self.push_null(oid::NUMERIC);
                    Err(e)
                }
            },

            // strings go in text format so the server handles encoding
            Value::Text(s) => {
                self.params.push(BoundParam {
                    oid: oid::TEXT,
                    format: Format::Text,
                    value: ParamValue::Text(s.clone()),
                });
                Ok(())
            }

            Value::Bytes(b) => {
                self.push_binary(oid::BYTEA, b.clone());
                Ok(())
            }

            Value::Timestamp(us) => {
                self.push_binary(oid::TIMESTAMPTZ, encode_timestamp(*us, caps));
                Ok(())
            }

            Value::Time { micros, .. } => {
                self.push_binary(oid::TIME, encode_time(*micros, caps));
                Ok(())
            }

            Value::Interval {
                months,
                days,
                micros,
            } => {
                self.push_binary(oid::INTERVAL, encode_interval(*months, *days, *micros, caps));
                Ok(())
            }

            Value::List(items) => {
                if items.is_empty() {
                    self.push_null(0);
                    return Ok(());
                }
                match array::encode_array(items, caps) {
                    Ok((array_oid, bytes)) => {
                        self.push_binary(array_oid, bytes);
                        Ok(())
                    }
                    Err(e) => {
                        self.push_null(0);
                        Err(e)
                    }
                }
            }

            Value::Map(map) => {
                let declared = match map.get("^pgtype^") {
                    None => {
                        self.push_null(0);
                        return Err(Error::Bind(BindError {
                            kind: BindErrorKind::MissingTypeTag,
                            message: "missing '^pgtype^' value in bind hash".to_string(),
                        }));
                    }
                    Some(Value::Int(v)) => match u32::try_from(*v) {
                        Ok(o) => o,
                        Err(_) => {
                            self.push_null(0);
                            return Err(Error::Bind(BindError {
                                kind: BindErrorKind::MissingTypeTag,
                                message: format!(
                                    "'^pgtype^' key contains out-of-range value {}",
                                    v
                                ),
                            }));
                        }
                    },
                    Some(other) => {
                        self.push_null(0);
                        return Err(Error::Bind(BindError {
                            kind: BindErrorKind::MissingTypeTag,
                            message: format!(
                                "'^pgtype^' key contains '{}' value, expecting integer",
                                other.type_name()
                            ),
                        }));
                    }
                };
                match map.get("^value^") {
                    // a NULL carries no payload to cast; leave the type
                    // to the server
                    None | Some(Value::Null) => {
                        self.push_null(0);
                        Ok(())
                    }
                    Some(v) => match stringify(v) {
                        Some(text) => {
                            self.params.push(BoundParam {
                                oid: declared,
                                format: Format::Text,
                                value: ParamValue::Text(text),
                            });
                            Ok(())
                        }
                        None => {
                            self.push_null(declared);
                            Err(unsupported(v))
                        }
                    },
                }
            }
        }
    }

    fn push_null(&mut self, type_oid: u32) {
        self.params.push(BoundParam {
            oid: type_oid,
            format: Format::Binary,
            value: ParamValue::Null,
        });
    }

    fn push_binary(&mut self, type_oid: u32, bytes: Vec<u8>) {
        self.params.push(BoundParam {
            oid: type_oid,
            format: Format::Binary,
            value: ParamValue::Bytes(bytes),
        });
    }

    /// Declared type OIDs for the Parse message.
    pub fn oids(&self) -> Vec<u32> {
        self.params.iter().map(|p| p.oid).collect()
    }

    /// Format codes for the Bind message.
    pub fn formats(&self) -> Vec<i16> {
        self.params.iter().map(|p| p.format.code()).collect()
    }

    /// Payload slices for the Bind message; `None` is a wire NULL.
    pub fn payloads(&self) -> Vec<Option<&[u8]>> {
        self.params
            .iter()
            .map(|p| match &p.value {
                ParamValue::Null => None,
                ParamValue::Bytes(b) => Some(b.as_slice()),
                ParamValue::Text(s) => Some(s.as_bytes()),
            })
            .collect()
    }

    /// Direct slot access.
    pub fn slots(&self) -> &[BoundParam] {
        &self.params
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) | Value::Number(s) => Some(s.clone()),
        Value::Int(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Bool(v) => Some(v.to_string()),
        _ => None,
    }
}

fn unsupported(value: &Value) -> Error {
    Error::Bind(BindError {
        kind: BindErrorKind::UnsupportedType,
        message: format!("don't know how to bind type '{}'", value.type_name()),
    })
}

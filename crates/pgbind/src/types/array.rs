//! N-dimensional array wire codec.
//!
//! Wire layout: `i32 ndim`, `i32 flags`, `u32 element oid`, then per
//! dimension `i32 length` and `i32 lower bound`, then the elements in
//! row-major order, each as `i32 byte length` (`-1` for NULL) followed
//! by the element payload. Lower bounds are read and discarded; arrays
//! always decode as 0-based nested lists.

#![allow(clippy::result_large_err)]
// Lengths are bounded well below i32::MAX by the dimension cap
#![allow(clippy::cast_possible_truncation)]

use pgbind_core::error::{BindError, BindErrorKind, TypeError};
use pgbind_core::{Error, Result, Value};

use super::cursor::WireCursor;
use super::decode::decode_scalar;
use super::encode::{encode_bool, encode_interval, encode_timestamp};
use super::{ServerCaps, oid};

/// Maximum number of array dimensions.
pub const MAX_ARRAY_DIMS: usize = 6;

// ==================== Decoding ====================

/// Decode a binary array payload into nested lists.
pub fn decode_array(data: &[u8], elem_oid: u32, caps: &ServerCaps) -> Result<Value> {
    let mut cur = WireCursor::new(data);
    let ndim = cur.read_i32("array dimension count")?;
    let _flags = cur.read_i32("array flags")?;
    let _header_oid = cur.read_u32("array element oid")?;

    if ndim == 0 {
        return Ok(Value::List(Vec::new()));
    }
    if ndim < 0 || ndim as usize > MAX_ARRAY_DIMS {
        return Err(Error::Protocol(pgbind_core::ProtocolError {
            message: format!("array header claims {} dimensions", ndim),
            raw_data: Some(data.to_vec()),
            source: None,
        }));
    }

    let mut dims = Vec::with_capacity(ndim as usize);
    for _ in 0..ndim {
        let len = cur.read_i32("array dimension length")?;
        let _lower_bound = cur.read_i32("array lower bound")?;
        if len < 0 {
            return Err(Error::Protocol(pgbind_core::ProtocolError {
                message: format!("negative array dimension length {}", len),
                raw_data: Some(data.to_vec()),
                source: None,
            }));
        }
        dims.push(len as usize);
    }

    decode_level(&mut cur, &dims, elem_oid, caps)
}

fn decode_level(
    cur: &mut WireCursor<'_>,
    dims: &[usize],
    elem_oid: u32,
    caps: &ServerCaps,
) -> Result<Value> {
    let (&len, rest) = match dims.split_first() {
        Some(parts) => parts,
        None => return Ok(Value::List(Vec::new())),
    };
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        if rest.is_empty() {
            let elem_len = cur.read_i32("array element length")?;
            if elem_len == -1 {
                items.push(Value::Null);
            } else if elem_len < 0 {
                return Err(Error::Protocol(pgbind_core::ProtocolError {
                    message: format!("negative array element length {}", elem_len),
                    raw_data: None,
                    source: None,
                }));
            } else {
                let bytes = cur.take(elem_len as usize, "array element")?;
                items.push(decode_scalar(elem_oid, bytes, caps)?);
            }
        } else {
            items.push(decode_level(cur, rest, elem_oid, caps)?);
        }
    }
    Ok(Value::List(items))
}

// ==================== Encoding ====================

/// Element kinds an array can carry to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElemKind {
    Int,
    Float,
    Bool,
    Text,
    Bytes,
    Timestamp,
    Interval,
}

impl ElemKind {
    const fn element_oid(self) -> u32 {
        match self {
            ElemKind::Int => oid::INT8,
            ElemKind::Float => oid::FLOAT8,
            ElemKind::Bool => oid::BOOL,
            ElemKind::Text => oid::TEXT,
            ElemKind::Bytes => oid::BYTEA,
            ElemKind::Timestamp => oid::TIMESTAMPTZ,
            ElemKind::Interval => oid::INTERVAL,
        }
    }
}

/// Encode a nested list as a binary array payload.
///
/// Returns the array type OID and the payload. The element type comes
/// from the first non-null scalar; every other element must match it.
pub fn encode_array(items: &[Value], caps: &ServerCaps) -> Result<(u32, Vec<u8>)> {
    let dims = measure_dims(items, 1)?;
    let kind = find_kind(items)?.ok_or_else(|| {
        Error::Bind(BindError {
            kind: BindErrorKind::Indeterminate,
            message: "no type can be determined from the list".to_string(),
        })
    })?;

    let elem_oid = kind.element_oid();
    let array_oid = oid::array_oid(elem_oid).ok_or_else(|| {
        Error::Type(TypeError {
            expected: "an element type with an array form",
            actual: oid::type_name(elem_oid).to_string(),
            column: None,
            rust_type: None,
        })
    })?;

    let mut buf = Vec::with_capacity(12 + 8 * dims.len());
    buf.extend_from_slice(&(dims.len() as i32).to_be_bytes());
    buf.extend_from_slice(&0i32.to_be_bytes());
    buf.extend_from_slice(&elem_oid.to_be_bytes());
    for &len in &dims {
        buf.extend_from_slice(&(len as i32).to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
    }

    write_level(items, dims.len(), kind, caps, &mut buf)?;
    Ok((array_oid, buf))
}

/// Walk the nesting once to fix the dimension lengths, checking that
/// siblings agree on shape at every level.
fn measure_dims(items: &[Value], depth: usize) -> Result<Vec<usize>> {
    if depth > MAX_ARRAY_DIMS {
        return Err(Error::Bind(BindError {
            kind: BindErrorKind::TooManyDimensions,
            message: format!(
                "array exceeds maximum number of dimensions ({})",
                MAX_ARRAY_DIMS
            ),
        }));
    }

    let mut inner: Option<Vec<usize>> = None;
    let mut saw_scalar = false;
    let mut saw_null = false;
    for item in items {
        match item {
            Value::List(sub) => {
                let sub_dims = measure_dims(sub, depth + 1)?;
                match &inner {
                    None => inner = Some(sub_dims),
                    Some(prev) => {
                        if *prev != sub_dims {
                            return Err(heterogeneous());
                        }
                    }
                }
            }
            Value::Null => saw_null = true,
            _ => saw_scalar = true,
        }
    }

    match inner {
        Some(sub_dims) => {
            // a NULL where a sub-array belongs would make the header's
            // element count disagree with the element stream
            if saw_scalar || saw_null {
                return Err(heterogeneous());
            }
            let mut dims = Vec::with_capacity(1 + sub_dims.len());
            dims.push(items.len());
            dims.extend_from_slice(&sub_dims);
            Ok(dims)
        }
        None => Ok(vec![items.len()]),
    }
}

/// Find the element kind from the first non-null scalar, checking every
/// scalar along the way.
fn find_kind(items: &[Value]) -> Result<Option<ElemKind>> {
    let mut kind: Option<ElemKind> = None;
    for item in items {
        let this = match item {
            Value::Null => continue,
            Value::List(sub) => {
                match find_kind(sub)? {
                    Some(k) => k,
                    None => continue,
                }
            }
            Value::Int(_) => ElemKind::Int,
            Value::Float(_) => ElemKind::Float,
            Value::Bool(_) => ElemKind::Bool,
            Value::Text(_) => ElemKind::Text,
            Value::Bytes(_) => ElemKind::Bytes,
            Value::Timestamp(_) => ElemKind::Timestamp,
            Value::Interval { .. } => ElemKind::Interval,
            other => {
                return Err(Error::Bind(BindError {
                    kind: BindErrorKind::UnsupportedType,
                    message: format!(
                        "don't know how to bind arrays of type '{}'",
                        other.type_name()
                    ),
                }));
            }
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k == this => {}
            Some(ElemKind::Timestamp) if this == ElemKind::Interval => {
                return Err(mixed_datetime(true));
            }
            Some(ElemKind::Interval) if this == ElemKind::Timestamp => {
                return Err(mixed_datetime(false));
            }
            Some(_) => return Err(heterogeneous()),
        }
    }
    Ok(kind)
}

fn write_level(
    items: &[Value],
    depth_left: usize,
    kind: ElemKind,
    caps: &ServerCaps,
    buf: &mut Vec<u8>,
) -> Result<()> {
    for item in items {
        match item {
            Value::List(sub) if depth_left > 1 => {
                write_level(sub, depth_left - 1, kind, caps, buf)?;
            }
            Value::Null => buf.extend_from_slice(&(-1i32).to_be_bytes()),
            other => {
                let bytes = encode_element(other, kind, caps)?;
                buf.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
                buf.extend_from_slice(&bytes);
            }
        }
    }
    Ok(())
}

fn encode_element(value: &Value, kind: ElemKind, caps: &ServerCaps) -> Result<Vec<u8>> {
    match (kind, value) {
        (ElemKind::Int, Value::Int(v)) => Ok(v.to_be_bytes().to_vec()),
        (ElemKind::Float, Value::Float(v)) => Ok(v.to_be_bytes().to_vec()),
        (ElemKind::Bool, Value::Bool(v)) => Ok(encode_bool(*v)),
        (ElemKind::Text, Value::Text(s)) => Ok(s.as_bytes().to_vec()),
        (ElemKind::Bytes, Value::Bytes(b)) => Ok(b.clone()),
        (ElemKind::Timestamp, Value::Timestamp(us)) => Ok(encode_timestamp(*us, caps)),
        (
            ElemKind::Interval,
            Value::Interval {
                months,
                days,
                micros,
            },
        ) => Ok(encode_interval(*months, *days, *micros, caps)),
        // find_kind already vetted every scalar; a mismatch here means
        // the list changed between passes
        _ => Err(heterogeneous()),
    }
}

fn heterogeneous() -> Error {
    Error::Bind(BindError {
        kind: BindErrorKind::Heterogeneous,
        message: "array elements must be all of the same type for binding".to_string(),
    })
}

fn mixed_datetime(timestamp_first: bool) -> Error {
    let message = if timestamp_first {
        "array type was set to TIMESTAMP or TIMESTAMPTZ, but a relative date/time is present in the list"
    } else {
        "array type was set to INTERVAL, but an absolute date/time is present in the list"
    };
    Error::Bind(BindError {
        kind: BindErrorKind::MixedDateTime,
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NumericPolicy;
    use pgbind_core::BindErrorKind;

    fn caps() -> ServerCaps {
        ServerCaps {
            integer_datetimes: true,
            interval_has_day: true,
            numeric: NumericPolicy::Optimal,
        }
    }

    fn ints(vals: &[i64]) -> Value {
        Value::List(vals.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn test_flat_int_array_roundtrip() {
        let list = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        let (array_oid, wire) = encode_array(&list, &caps()).unwrap();
        assert_eq!(array_oid, oid::INT8_ARRAY);

        let decoded = decode_array(&wire, oid::INT8, &caps()).unwrap();
        assert_eq!(decoded, Value::List(list));
    }

    #[test]
    fn test_2x3_array_with_null_roundtrip() {
        let list = vec![
            ints(&[1, 2, 3]),
            Value::List(vec![Value::Int(4), Value::Null, Value::Int(6)]),
        ];
        let (array_oid, wire) = encode_array(&list, &caps()).unwrap();
        assert_eq!(array_oid, oid::INT8_ARRAY);

        // header: 2 dims, data starts at 12 + 8*2
        let mut cur = WireCursor::new(&wire);
        assert_eq!(cur.read_i32("ndim").unwrap(), 2);
        assert_eq!(cur.read_i32("flags").unwrap(), 0);
        assert_eq!(cur.read_u32("oid").unwrap(), oid::INT8);
        assert_eq!(cur.read_i32("dim0").unwrap(), 2);
        assert_eq!(cur.read_i32("lb0").unwrap(), 1);
        assert_eq!(cur.read_i32("dim1").unwrap(), 3);
        assert_eq!(cur.read_i32("lb1").unwrap(), 1);
        assert_eq!(cur.position(), 12 + 8 * 2);

        let decoded = decode_array(&wire, oid::INT8, &caps()).unwrap();
        assert_eq!(decoded, Value::List(list));
    }

    #[test]
    fn test_heterogeneous_array_rejected() {
        let list = vec![
            Value::Int(1),
            Value::Text("two".to_string()),
            Value::Int(3),
        ];
        let err = encode_array(&list, &caps()).unwrap_err();
        match err {
            Error::Bind(b) => assert_eq!(b.kind, BindErrorKind::Heterogeneous),
            other => panic!("expected a bind error, got {other}"),
        }
    }

    #[test]
    fn test_mixed_datetime_rejected() {
        let list = vec![
            Value::Timestamp(0),
            Value::Interval {
                months: 0,
                days: 1,
                micros: 0,
            },
        ];
        let err = encode_array(&list, &caps()).unwrap_err();
        match err {
            Error::Bind(b) => {
                assert_eq!(b.kind, BindErrorKind::MixedDateTime);
                assert!(b.message.contains("TIMESTAMP"));
            }
            other => panic!("expected a bind error, got {other}"),
        }
    }

    #[test]
    fn test_all_null_array_rejected() {
        let list = vec![Value::Null, Value::Null];
        let err = encode_array(&list, &caps()).unwrap_err();
        match err {
            Error::Bind(b) => assert_eq!(b.kind, BindErrorKind::Indeterminate),
            other => panic!("expected a bind error, got {other}"),
        }
    }

    #[test]
    fn test_dimension_cap() {
        // seven levels of nesting
        let mut v = Value::Int(1);
        for _ in 0..7 {
            v = Value::List(vec![v]);
        }
        let Value::List(items) = v else { unreachable!() };
        let err = encode_array(&items, &caps()).unwrap_err();
        match err {
            Error::Bind(b) => assert_eq!(b.kind, BindErrorKind::TooManyDimensions),
            other => panic!("expected a bind error, got {other}"),
        }
    }

    #[test]
    fn test_null_subarray_rejected() {
        // a NULL standing in for a whole sub-array has no framing: the
        // header would claim 2x2 elements while the stream carries 3
        let list = vec![ints(&[1, 2]), Value::Null];
        let err = encode_array(&list, &caps()).unwrap_err();
        match err {
            Error::Bind(b) => assert_eq!(b.kind, BindErrorKind::Heterogeneous),
            other => panic!("expected a bind error, got {other}"),
        }

        // deeper nesting too
        let list = vec![
            Value::List(vec![ints(&[1]), Value::Null]),
            Value::List(vec![ints(&[2]), ints(&[3])]),
        ];
        assert!(encode_array(&list, &caps()).is_err());
    }

    #[test]
    fn test_ragged_siblings_rejected() {
        let list = vec![ints(&[1, 2]), ints(&[3])];
        assert!(encode_array(&list, &caps()).is_err());
    }

    #[test]
    fn test_scalar_and_list_mix_rejected() {
        let list = vec![ints(&[1]), Value::Int(2)];
        assert!(encode_array(&list, &caps()).is_err());
    }

    #[test]
    fn test_text_array_roundtrip() {
        let list = vec![
            Value::Text("a".to_string()),
            Value::Null,
            Value::Text("bc".to_string()),
        ];
        let (array_oid, wire) = encode_array(&list, &caps()).unwrap();
        assert_eq!(array_oid, oid::TEXT_ARRAY);
        assert_eq!(
            decode_array(&wire, oid::TEXT, &caps()).unwrap(),
            Value::List(list)
        );
    }

    #[test]
    fn test_interval_array_roundtrip() {
        let list = vec![Value::Interval {
            months: 1,
            days: 2,
            micros: 3,
        }];
        let (array_oid, wire) = encode_array(&list, &caps()).unwrap();
        assert_eq!(array_oid, oid::INTERVAL_ARRAY);
        assert_eq!(
            decode_array(&wire, oid::INTERVAL, &caps()).unwrap(),
            Value::List(list)
        );
    }

    #[test]
    fn test_map_in_array_unsupported() {
        let list = vec![Value::typed(25, "x")];
        let err = encode_array(&list, &caps()).unwrap_err();
        match err {
            Error::Bind(b) => assert_eq!(b.kind, BindErrorKind::UnsupportedType),
            other => panic!("expected a bind error, got {other}"),
        }
    }

    #[test]
    fn test_decode_empty_array() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&0i32.to_be_bytes());
        wire.extend_from_slice(&0i32.to_be_bytes());
        wire.extend_from_slice(&oid::INT4.to_be_bytes());
        assert_eq!(
            decode_array(&wire, oid::INT4, &caps()).unwrap(),
            Value::List(Vec::new())
        );
    }

    #[test]
    fn test_decode_rejects_absurd_header() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&100i32.to_be_bytes());
        wire.extend_from_slice(&0i32.to_be_bytes());
        wire.extend_from_slice(&oid::INT4.to_be_bytes());
        assert!(decode_array(&wire, oid::INT4, &caps()).is_err());
    }
}

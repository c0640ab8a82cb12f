//! Binary wire-format encoding (host values → PostgreSQL).
//!
//! The binder in `params` dispatches on the value kind; the byte-level
//! emitters live here so the array codec can reuse them element by
//! element.

#![allow(clippy::result_large_err)]
#![allow(clippy::cast_precision_loss)]
// Narrowing casts are guarded by the width checks above them
#![allow(clippy::cast_possible_truncation)]

use super::ServerCaps;
use super::decode::PG_EPOCH_OFFSET_MICROS;
use super::oid;

/// Wire format code for a parameter or result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Text format (format code 0)
    Text = 0,
    /// Binary format (format code 1)
    #[default]
    Binary = 1,
}

impl Format {
    /// The wire format code.
    pub const fn code(self) -> i16 {
        match self {
            Format::Text => 0,
            Format::Binary => 1,
        }
    }
}

/// Encode an integer at the narrowest width that holds it.
///
/// The negative cutoffs are deliberately asymmetric: -32768 and
/// -2147483648 bind at the next wider type.
pub fn encode_int(v: i64) -> (u32, Vec<u8>) {
    if v <= i64::from(i16::MAX) && v > i64::from(i16::MIN) {
        (oid::INT2, (v as i16).to_be_bytes().to_vec())
    } else if v <= i64::from(i32::MAX) && v >= -i64::from(i32::MAX) {
        (oid::INT4, (v as i32).to_be_bytes().to_vec())
    } else {
        (oid::INT8, v.to_be_bytes().to_vec())
    }
}

/// Encode a bool as its single wire byte.
pub fn encode_bool(v: bool) -> Vec<u8> {
    vec![u8::from(v)]
}

/// Encode a double-precision float.
pub fn encode_float(v: f64) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

/// Encode an absolute timestamp (Unix-epoch microseconds, UTC) as a
/// wire timestamptz payload.
pub fn encode_timestamp(unix_micros: i64, caps: &ServerCaps) -> Vec<u8> {
    let wire_micros = unix_micros - PG_EPOCH_OFFSET_MICROS;
    if caps.integer_datetimes {
        wire_micros.to_be_bytes().to_vec()
    } else {
        (wire_micros as f64 / 1_000_000.0).to_be_bytes().to_vec()
    }
}

/// Encode a time-of-day payload (microseconds since midnight).
pub fn encode_time(micros: i64, caps: &ServerCaps) -> Vec<u8> {
    if caps.integer_datetimes {
        micros.to_be_bytes().to_vec()
    } else {
        (micros as f64 / 1_000_000.0).to_be_bytes().to_vec()
    }
}

/// Encode an interval.
///
/// Servers with a day field get the three-part layout; older servers get
/// the two-part layout with days folded into the time payload.
pub fn encode_interval(months: i32, days: i32, micros: i64, caps: &ServerCaps) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    if caps.interval_has_day {
        buf.extend_from_slice(&encode_time(micros, caps));
        buf.extend_from_slice(&days.to_be_bytes());
        buf.extend_from_slice(&months.to_be_bytes());
    } else {
        let folded = micros + i64::from(days) * 86_400 * 1_000_000;
        buf.extend_from_slice(&encode_time(folded, caps));
        buf.extend_from_slice(&months.to_be_bytes());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NumericPolicy;
    use crate::types::decode::{decode_scalar, read_time_micros};
    use crate::types::cursor::WireCursor;
    use pgbind_core::Value;

    fn caps() -> ServerCaps {
        ServerCaps {
            integer_datetimes: true,
            interval_has_day: true,
            numeric: NumericPolicy::Optimal,
        }
    }

    #[test]
    fn test_format_codes() {
        assert_eq!(Format::Text.code(), 0);
        assert_eq!(Format::Binary.code(), 1);
    }

    #[test]
    fn test_int_width_selection() {
        assert_eq!(encode_int(0).0, oid::INT2);
        assert_eq!(encode_int(32_767).0, oid::INT2);
        assert_eq!(encode_int(32_768).0, oid::INT4);
        assert_eq!(encode_int(-32_767).0, oid::INT2);
        // the asymmetric cutoff: -32768 widens
        assert_eq!(encode_int(-32_768).0, oid::INT4);
        assert_eq!(encode_int(2_147_483_647).0, oid::INT4);
        assert_eq!(encode_int(2_147_483_648).0, oid::INT8);
        assert_eq!(encode_int(-2_147_483_647).0, oid::INT4);
        assert_eq!(encode_int(-2_147_483_648).0, oid::INT8);
    }

    #[test]
    fn test_int_roundtrip() {
        for v in [0i64, 1, -1, 32_767, 40_000, -5_000_000_000] {
            let (type_oid, bytes) = encode_int(v);
            assert_eq!(
                decode_scalar(type_oid, &bytes, &caps()).unwrap(),
                Value::Int(v)
            );
        }
    }

    #[test]
    fn test_bool_and_float_roundtrip() {
        assert_eq!(
            decode_scalar(oid::BOOL, &encode_bool(true), &caps()).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            decode_scalar(oid::FLOAT8, &encode_float(-1.25), &caps()).unwrap(),
            Value::Float(-1.25)
        );
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let unix_micros = 1_700_000_000_000_000i64;
        let wire = encode_timestamp(unix_micros, &caps());
        assert_eq!(
            decode_scalar(oid::TIMESTAMPTZ, &wire, &caps()).unwrap(),
            Value::Timestamp(unix_micros)
        );

        let float_caps = ServerCaps {
            integer_datetimes: false,
            ..caps()
        };
        let wire = encode_timestamp(unix_micros, &float_caps);
        assert_eq!(
            decode_scalar(oid::TIMESTAMPTZ, &wire, &float_caps).unwrap(),
            Value::Timestamp(unix_micros)
        );
    }

    #[test]
    fn test_interval_roundtrip() {
        let wire = encode_interval(2, 3, 4_000_000, &caps());
        assert_eq!(wire.len(), 16);
        assert_eq!(
            decode_scalar(oid::INTERVAL, &wire, &caps()).unwrap(),
            Value::Interval {
                months: 2,
                days: 3,
                micros: 4_000_000
            }
        );
    }

    #[test]
    fn test_interval_day_folding_on_old_layout() {
        let old_caps = ServerCaps {
            interval_has_day: false,
            ..caps()
        };
        let wire = encode_interval(1, 2, 5_000_000, &old_caps);
        assert_eq!(wire.len(), 12);
        assert_eq!(
            decode_scalar(oid::INTERVAL, &wire, &old_caps).unwrap(),
            Value::Interval {
                months: 1,
                days: 0,
                micros: 5_000_000 + 2 * 86_400 * 1_000_000
            }
        );
    }

    #[test]
    fn test_time_float_layout() {
        let float_caps = ServerCaps {
            integer_datetimes: false,
            ..caps()
        };
        let wire = encode_time(1_500_000, &float_caps);
        let mut cur = WireCursor::new(&wire);
        assert_eq!(
            read_time_micros(&mut cur, &float_caps, "time").unwrap(),
            1_500_000
        );
    }
}

//! Binary wire-format decoding (PostgreSQL → host values).
//!
//! Results are always requested in binary format; every scalar type the
//! driver understands is decoded here through a closed dispatch on the
//! column's type OID.

#![allow(clippy::result_large_err)]
#![allow(clippy::cast_possible_truncation)]

use pgbind_core::Error;
use pgbind_core::Value;
use pgbind_core::error::TypeError;

use super::cursor::WireCursor;
use super::numeric::decode_numeric;
use super::oid;
use super::{ServerCaps, array};

/// Days between 1970-01-01 and 2000-01-01 (the wire epoch for dates).
pub const PG_EPOCH_OFFSET_DAYS: i64 = 10_957;

/// Seconds between the Unix epoch and the wire epoch.
pub const PG_EPOCH_OFFSET_SECS: i64 = 946_684_800;

/// Microseconds between the Unix epoch and the wire epoch.
pub const PG_EPOCH_OFFSET_MICROS: i64 = 946_684_800_000_000;

/// Address family byte for IPv4 in inet/cidr wire data.
const PGSQL_AF_INET: u8 = 2;

/// Decode one result cell.
///
/// `data` is `None` for a wire NULL. Array types recurse through the
/// array codec; everything else is a scalar handled in this module.
pub fn decode_value(type_oid: u32, data: Option<&[u8]>, caps: &ServerCaps) -> Result<Value, Error> {
    let Some(data) = data else {
        return Ok(Value::Null);
    };
    match oid::element_oid(type_oid) {
        Some(elem) => array::decode_array(data, elem, caps),
        None => decode_scalar(type_oid, data, caps),
    }
}

/// Decode a scalar cell of a known type.
pub fn decode_scalar(type_oid: u32, data: &[u8], caps: &ServerCaps) -> Result<Value, Error> {
    let mut cur = WireCursor::new(data);
    match type_oid {
        oid::BOOL => Ok(Value::Bool(cur.read_u8("bool")? != 0)),

        oid::BYTEA => Ok(Value::Bytes(data.to_vec())),

        // blank-padded types lose their trailing fill
        oid::CHAR | oid::BPCHAR | oid::UNKNOWN => {
            let s = utf8_str(data)?;
            Ok(Value::Text(s.trim_end_matches(' ').to_string()))
        }

        oid::TEXT | oid::VARCHAR | oid::NAME => Ok(Value::Text(utf8_str(data)?.to_string())),

        oid::INT2 => Ok(Value::Int(i64::from(cur.read_i16("int2")?))),
        oid::INT4 => Ok(Value::Int(i64::from(cur.read_i32("int4")?))),
        oid::INT8 => Ok(Value::Int(cur.read_i64("int8")?)),
        oid::OID => Ok(Value::Int(i64::from(cur.read_u32("oid")?))),
        oid::XID => Ok(Value::Int(i64::from(cur.read_u32("xid")?))),
        oid::CID => Ok(Value::Int(i64::from(cur.read_u32("cid")?))),

        oid::FLOAT4 => Ok(Value::Float(f64::from(cur.read_f32("float4")?))),
        oid::FLOAT8 => Ok(Value::Float(cur.read_f64("float8")?)),

        oid::NUMERIC => decode_numeric(data, caps.numeric),

        oid::DATE => {
            let days = i64::from(cur.read_i32("date")?);
            Ok(Value::Timestamp(
                (days + PG_EPOCH_OFFSET_DAYS) * 86_400 * 1_000_000,
            ))
        }

        oid::ABSTIME => {
            let secs = i64::from(cur.read_i32("abstime")?);
            Ok(Value::Timestamp(secs * 1_000_000))
        }

        oid::RELTIME => {
            let secs = i64::from(cur.read_i32("reltime")?);
            Ok(Value::Interval {
                months: 0,
                days: 0,
                micros: secs * 1_000_000,
            })
        }

        oid::TIMESTAMP | oid::TIMESTAMPTZ => {
            let micros = read_time_micros(&mut cur, caps, "timestamp")?;
            Ok(Value::Timestamp(micros + PG_EPOCH_OFFSET_MICROS))
        }

        oid::TIME => {
            let micros = read_time_micros(&mut cur, caps, "time")?;
            Ok(Value::Time {
                micros,
                offset_secs: 0,
            })
        }

        oid::TIMETZ => {
            let micros = read_time_micros(&mut cur, caps, "timetz")?;
            // wire zone is seconds west of UTC
            let zone = cur.read_i32("timetz zone")?;
            Ok(Value::Time {
                micros,
                offset_secs: -zone,
            })
        }

        oid::INTERVAL => {
            let micros = read_time_micros(&mut cur, caps, "interval")?;
            if caps.interval_has_day {
                let days = cur.read_i32("interval day")?;
                let months = cur.read_i32("interval month")?;
                Ok(Value::Interval {
                    months,
                    days,
                    micros,
                })
            } else {
                let months = cur.read_i32("interval month")?;
                Ok(Value::Interval {
                    months,
                    days: 0,
                    micros,
                })
            }
        }

        oid::TINTERVAL => {
            // status field precedes the bounds; any value is taken as valid
            let _status = cur.read_i32("tinterval status")?;
            let start = i64::from(cur.read_i32("tinterval start")?);
            let end = i64::from(cur.read_i32("tinterval end")?);
            Ok(Value::Text(format!(
                "[\"{}\" \"{}\"]",
                epoch_secs_to_string(start),
                epoch_secs_to_string(end)
            )))
        }

        oid::MONEY => {
            // whole cents as an unsigned 32-bit value
            let cents = cur.read_u32("money")?;
            Ok(Value::Float(f64::from(cents) / 100.0))
        }

        oid::MACADDR => {
            let b = cur.take(6, "macaddr")?;
            Ok(Value::Text(format!(
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                b[0], b[1], b[2], b[3], b[4], b[5]
            )))
        }

        oid::INET | oid::CIDR => decode_inet(type_oid, data),

        oid::TID => {
            let block = cur.read_u32("tid block")?;
            let index = cur.read_u16("tid index")?;
            Ok(Value::Text(format!("({},{})", block, index)))
        }

        oid::BIT | oid::VARBIT => {
            let bit_count = cur.read_i32("bit count")?;
            if bit_count <= 0 {
                return Ok(Value::Bytes(Vec::new()));
            }
            let byte_count = (bit_count as usize - 1) / 8 + 1;
            Ok(Value::Bytes(cur.take(byte_count, "bit data")?.to_vec()))
        }

        oid::POINT => {
            let x = cur.read_f64("point x")?;
            let y = cur.read_f64("point y")?;
            Ok(Value::Text(format!("{},{}", fmt_g(x), fmt_g(y))))
        }

        oid::LSEG | oid::BOX => {
            let x0 = cur.read_f64("x0")?;
            let y0 = cur.read_f64("y0")?;
            let x1 = cur.read_f64("x1")?;
            let y1 = cur.read_f64("y1")?;
            Ok(Value::Text(format!(
                "({},{}),({},{})",
                fmt_g(x0),
                fmt_g(y0),
                fmt_g(x1),
                fmt_g(y1)
            )))
        }

        oid::PATH => {
            let closed = cur.read_u8("path closed flag")? != 0;
            let npts = cur.read_i32("path point count")?;
            let mut s = String::new();
            s.push(if closed { '(' } else { '[' });
            for i in 0..npts {
                let x = cur.read_f64("path x")?;
                let y = cur.read_f64("path y")?;
                s.push_str(&format!("({},{})", fmt_g(x), fmt_g(y)));
                if i != npts - 1 {
                    s.push(',');
                }
            }
            s.push(if closed { ')' } else { ']' });
            Ok(Value::Text(s))
        }

        oid::POLYGON => {
            let npts = cur.read_i32("polygon point count")?;
            let mut s = String::from("(");
            for i in 0..npts {
                let x = cur.read_f64("polygon x")?;
                let y = cur.read_f64("polygon y")?;
                s.push_str(&format!("({},{})", fmt_g(x), fmt_g(y)));
                if i != npts - 1 {
                    s.push(',');
                }
            }
            s.push(')');
            Ok(Value::Text(s))
        }

        oid::CIRCLE => {
            let x = cur.read_f64("circle x")?;
            let y = cur.read_f64("circle y")?;
            let r = cur.read_f64("circle radius")?;
            Ok(Value::Text(format!(
                "<({},{}),{}>",
                fmt_g(x),
                fmt_g(y),
                fmt_g(r)
            )))
        }

        other => Err(Error::Type(TypeError {
            expected: "a known wire type",
            actual: format!("type OID {} ({})", other, oid::type_name(other)),
            column: None,
            rust_type: None,
        })),
    }
}

/// Read a time payload: 8-byte integer microseconds on servers with
/// integer datetimes, 8-byte float seconds otherwise.
pub fn read_time_micros(cur: &mut WireCursor<'_>, caps: &ServerCaps, what: &str) -> Result<i64, Error> {
    if caps.integer_datetimes {
        cur.read_i64(what)
    } else {
        let val = cur.read_f64(what)?;
        let secs = val as i64;
        let us = ((val - secs as f64) * 1_000_000.0) as i64;
        Ok(secs * 1_000_000 + us)
    }
}

fn decode_inet(type_oid: u32, data: &[u8]) -> Result<Value, Error> {
    let mut cur = WireCursor::new(data);
    let family = cur.read_u8("inet family")?;
    let bits = cur.read_u8("inet bits")?;
    let _is_cidr = cur.read_u8("inet flag")?;
    let length = cur.read_u8("inet length")?;
    let addr = cur.take(length as usize, "inet address")?;

    let mut s = String::new();
    if family == PGSQL_AF_INET {
        if addr.len() < 4 {
            return Err(Error::Type(TypeError {
                expected: "4 address bytes for IPv4",
                actual: format!("{} bytes", addr.len()),
                column: None,
                rust_type: None,
            }));
        }
        for b in addr.iter().take(3) {
            s.push_str(&format!("{}.", b));
        }
        s.push_str(&format!("{}/{}", addr[3], bits));
    } else {
        let mut e = if type_oid == oid::CIDR {
            usize::from(bits) / 8
        } else {
            usize::from(length)
        };
        let mut last = false;
        if e == 16 {
            e -= 2;
            last = true;
        }
        if addr.len() < e + if last { 2 } else { 0 } {
            return Err(Error::Type(TypeError {
                expected: "16 address bytes for IPv6",
                actual: format!("{} bytes", addr.len()),
                column: None,
                rust_type: None,
            }));
        }
        let mut i = 0;
        while i < e {
            let group = u16::from_be_bytes([addr[i], addr[i + 1]]);
            s.push_str(&format!("{:x}:", group));
            i += 2;
        }
        if last {
            let group = u16::from_be_bytes([addr[i], addr[i + 1]]);
            s.push_str(&format!("{:x}", group));
        } else {
            s.push(':');
        }
        s.push_str(&format!("/{}", bits));
    }
    Ok(Value::Text(s))
}

fn utf8_str(data: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(data).map_err(|_| {
        Error::Type(TypeError {
            expected: "valid UTF-8",
            actual: format!("invalid bytes: {:?}", &data[..data.len().min(20)]),
            column: None,
            rust_type: None,
        })
    })
}

/// Render Unix-epoch seconds as `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn epoch_secs_to_string(secs: i64) -> String {
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);
    let (year, month, day) = days_to_civil(days);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        rem / 3600,
        (rem / 60) % 60,
        rem % 60
    )
}

/// Convert days since 1970-01-01 to a civil (year, month, day) date.
fn days_to_civil(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };
    (year, m as u32, d as u32)
}

/// Format a float component the way C's `%g` does for typical values:
/// up to six significant digits, trailing zeros trimmed, scientific
/// notation outside `1e-4..1e6`.
pub fn fmt_g(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let exp = v.abs().log10().floor() as i32;
    if !(-4..6).contains(&exp) {
        let s = format!("{:.5e}", v);
        let (mantissa, e) = match s.split_once('e') {
            Some(parts) => parts,
            None => return s,
        };
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let exp_val: i32 = e.parse().unwrap_or(0);
        let sign = if exp_val < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp_val.abs())
    } else {
        let prec = (5 - exp).max(0) as usize;
        let s = format!("{:.*}", prec, v);
        if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    }
}

//! Base-10000 numeric wire codec.
//!
//! On the wire a numeric value is a header of four 16-bit fields
//! (digit count, weight, sign, display scale) followed by the digit
//! chunks, each an integer in 0..=9999. `weight` is the base-10000
//! exponent of the first chunk: weight 0 puts the first chunk just left
//! of the decimal point, negative weights shift the whole value into
//! the fraction.

use pgbind_core::{BindError, BindErrorKind, Error, Result, Value};

use crate::types::cursor::WireCursor;

/// Sign field value for negative numerics.
pub const NUMERIC_NEG: u16 = 0x4000;

/// Maximum number of base-10000 chunks accepted when encoding.
pub const NUMERIC_MAX_DIGITS: usize = 50;

/// How decoded numeric values are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericPolicy {
    /// Integral values in signed 64-bit range become `Int`, everything
    /// else becomes `Number`.
    #[default]
    Optimal,
    /// Always `Number`.
    Number,
    /// Always `Text`.
    Text,
}

/// Decode a binary numeric into a host value per `policy`.
#[allow(clippy::result_large_err)]
pub fn decode_numeric(data: &[u8], policy: NumericPolicy) -> Result<Value> {
    let rendered = render_numeric(data)?;
    Ok(match policy {
        NumericPolicy::Optimal => {
            let integral = !rendered.contains('.');
            match rendered.parse::<i64>() {
                Ok(v) if integral => Value::Int(v),
                _ => Value::Number(rendered),
            }
        }
        NumericPolicy::Number => Value::Number(rendered),
        NumericPolicy::Text => Value::Text(rendered),
    })
}

/// Render a binary numeric as its decimal string.
#[allow(clippy::result_large_err)]
pub fn render_numeric(data: &[u8]) -> Result<String> {
    let mut cur = WireCursor::new(data);
    let ndigits = cur.read_u16("numeric digit count")? as usize;
    let weight = i32::from(cur.read_i16("numeric weight")?);
    let sign = cur.read_u16("numeric sign")?;
    let _dscale = cur.read_u16("numeric dscale")?;

    let mut digits = Vec::with_capacity(ndigits);
    for _ in 0..ndigits {
        digits.push(cur.read_u16("numeric digit")?);
    }

    if ndigits == 0 {
        return Ok("0".to_string());
    }

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    // integer part: chunks at positions weight..0
    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=(weight as usize) {
            match digits.get(i) {
                Some(d) if i == 0 => out.push_str(&d.to_string()),
                Some(d) => out.push_str(&format!("{d:04}")),
                // trailing integer chunks trimmed off the wire are zeros
                None => out.push_str("0000"),
            }
        }
    }

    // fractional part: zero chunks between the point and the first stored
    // chunk when the whole value sits deep in the fraction, then the rest
    let mut frac = String::new();
    if weight < -1 {
        for _ in 0..(-weight - 1) {
            frac.push_str("0000");
        }
    }
    let first_frac = usize::try_from((weight + 1).max(0)).unwrap_or(0);
    for d in digits.iter().skip(first_frac) {
        frac.push_str(&format!("{d:04}"));
    }
    while frac.ends_with('0') {
        frac.pop();
    }
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }

    Ok(out)
}

/// Encode a decimal string as a binary numeric.
#[allow(clippy::result_large_err)]
pub fn encode_numeric(value: &str) -> Result<Vec<u8>> {
    let (sign, unsigned) = match value.strip_prefix('-') {
        Some(rest) => (NUMERIC_NEG, rest),
        None => (0u16, value),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid(value));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid(value));
    }

    let int_trimmed = int_part.trim_start_matches('0');
    let mut digits: Vec<u16> = Vec::new();
    let weight: i16;

    if int_trimmed.is_empty() {
        weight = -1;
    } else {
        // first chunk takes the ragged leading digits, the rest are full
        let mut head = int_trimmed.len() % 4;
        if head == 0 {
            head = 4;
        }
        let mut rest = int_trimmed;
        let (first, tail) = rest.split_at(head);
        digits.push(first.parse::<u16>().map_err(|_| invalid(value))?);
        rest = tail;
        while !rest.is_empty() {
            let (chunk, tail) = rest.split_at(4);
            digits.push(chunk.parse::<u16>().map_err(|_| invalid(value))?);
            rest = tail;
        }
        weight = i16::try_from(digits.len() - 1).map_err(|_| invalid(value))?;
    }

    // fraction: left-aligned 4-digit chunks, last one padded right
    let mut frac = frac_part;
    while !frac.is_empty() {
        let take = frac.len().min(4);
        let (chunk, tail) = frac.split_at(take);
        let mut padded = chunk.to_string();
        while padded.len() < 4 {
            padded.push('0');
        }
        digits.push(padded.parse::<u16>().map_err(|_| invalid(value))?);
        frac = tail;
    }

    // trailing zero chunks carry no information
    while digits.last() == Some(&0) {
        digits.pop();
    }

    if digits.len() > NUMERIC_MAX_DIGITS {
        return Err(Error::Bind(BindError {
            kind: BindErrorKind::UnsupportedType,
            message: format!(
                "numeric value has too many digits for binding (max {} base-10000 chunks)",
                NUMERIC_MAX_DIGITS
            ),
        }));
    }

    let ndigits = u16::try_from(digits.len()).map_err(|_| invalid(value))?;
    let mut buf = Vec::with_capacity(8 + digits.len() * 2);
    buf.extend_from_slice(&ndigits.to_be_bytes());
    buf.extend_from_slice(&weight.to_be_bytes());
    buf.extend_from_slice(&sign.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    for d in &digits {
        buf.extend_from_slice(&d.to_be_bytes());
    }
    Ok(buf)
}

fn invalid(value: &str) -> Error {
    Error::Bind(BindError {
        kind: BindErrorKind::UnsupportedType,
        message: format!("cannot bind '{}' as a numeric value", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(s: &str) -> String {
        let wire = encode_numeric(s).unwrap();
        render_numeric(&wire).unwrap()
    }

    #[test]
    fn test_zero() {
        assert_eq!(roundtrip("0"), "0");
        // zero has no digit chunks at all
        let wire = encode_numeric("0").unwrap();
        assert_eq!(&wire[0..2], &[0, 0]);
    }

    #[test]
    fn test_negative_fraction() {
        assert_eq!(roundtrip("-0.5"), "-0.5");
    }

    #[test]
    fn test_trailing_zeros_trimmed() {
        assert_eq!(roundtrip("123.4500"), "123.45");
    }

    #[test]
    fn test_large_mixed() {
        assert_eq!(
            roundtrip("9999999999999999999.0001"),
            "9999999999999999999.0001"
        );
    }

    #[test]
    fn test_deep_fraction() {
        assert_eq!(roundtrip("0.00001"), "0.00001");
    }

    #[test]
    fn test_integers() {
        assert_eq!(roundtrip("1"), "1");
        assert_eq!(roundtrip("10000"), "10000");
        assert_eq!(roundtrip("123456789"), "123456789");
        assert_eq!(roundtrip("-42"), "-42");
    }

    #[test]
    fn test_optimal_policy_boundary() {
        // largest i64 stays an integer
        let wire = encode_numeric("9223372036854775807").unwrap();
        assert_eq!(
            decode_numeric(&wire, NumericPolicy::Optimal).unwrap(),
            Value::Int(9_223_372_036_854_775_807)
        );

        // one past it falls back to a number string
        let wire = encode_numeric("9223372036854775808").unwrap();
        assert_eq!(
            decode_numeric(&wire, NumericPolicy::Optimal).unwrap(),
            Value::Number("9223372036854775808".to_string())
        );
    }

    #[test]
    fn test_optimal_policy_fraction_is_number() {
        let wire = encode_numeric("1.5").unwrap();
        assert_eq!(
            decode_numeric(&wire, NumericPolicy::Optimal).unwrap(),
            Value::Number("1.5".to_string())
        );
    }

    #[test]
    fn test_number_and_text_policies() {
        let wire = encode_numeric("7").unwrap();
        assert_eq!(
            decode_numeric(&wire, NumericPolicy::Number).unwrap(),
            Value::Number("7".to_string())
        );
        assert_eq!(
            decode_numeric(&wire, NumericPolicy::Text).unwrap(),
            Value::Text("7".to_string())
        );
    }

    #[test]
    fn test_server_canonical_deep_fraction() {
        // a server-encoded 0.00001 uses weight -2 with a single chunk
        let mut wire = Vec::new();
        wire.extend_from_slice(&1u16.to_be_bytes());
        wire.extend_from_slice(&(-2i16).to_be_bytes());
        wire.extend_from_slice(&0u16.to_be_bytes());
        wire.extend_from_slice(&5u16.to_be_bytes());
        wire.extend_from_slice(&1000u16.to_be_bytes());
        assert_eq!(render_numeric(&wire).unwrap(), "0.00001");
    }

    #[test]
    fn test_trimmed_integer_chunks() {
        // 10000 stored as a single chunk with weight 1
        let mut wire = Vec::new();
        wire.extend_from_slice(&1u16.to_be_bytes());
        wire.extend_from_slice(&1i16.to_be_bytes());
        wire.extend_from_slice(&0u16.to_be_bytes());
        wire.extend_from_slice(&0u16.to_be_bytes());
        wire.extend_from_slice(&1u16.to_be_bytes());
        assert_eq!(render_numeric(&wire).unwrap(), "10000");
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(encode_numeric("").is_err());
        assert!(encode_numeric("abc").is_err());
        assert!(encode_numeric("1.2.3").is_err());
        assert!(encode_numeric("-").is_err());
    }

    #[test]
    fn test_truncated_wire_data() {
        assert!(render_numeric(&[0, 1, 0, 0]).is_err());
        let mut wire = Vec::new();
        wire.extend_from_slice(&2u16.to_be_bytes());
        wire.extend_from_slice(&0i16.to_be_bytes());
        wire.extend_from_slice(&0u16.to_be_bytes());
        wire.extend_from_slice(&0u16.to_be_bytes());
        wire.extend_from_slice(&1u16.to_be_bytes());
        // second digit chunk missing
        assert!(render_numeric(&wire).is_err());
    }
}

//! SQL placeholder rewriting.
//!
//! Statements use `%v` for positional parameters (rewritten to `$N` and
//! bound), `%d` for inlined numeric literals, and `%s` for inlined
//! quoted string literals. Markers inside quoted literals, `--` line
//! comments and `/* */` block comments are left alone, and `\%` escapes
//! a literal percent. A `%` preceded by an alphanumeric character (as in
//! `x % 3` written `x%3` or `100%`) is not a marker.

#![allow(clippy::result_large_err)]

use pgbind_core::error::{BindError, BindErrorKind};
use pgbind_core::{Error, Result, Value};

use crate::params::ParamSet;
use crate::types::ServerCaps;

/// Rewrite `sql`, binding `%v` arguments into a fresh `ParamSet`.
///
/// Returns the rewritten text and the bound parameters. Arguments not
/// consumed by a marker are ignored; a marker past the end of `args`
/// binds NULL.
pub fn rewrite(sql: &str, args: &[Value], caps: &ServerCaps) -> Result<(String, ParamSet)> {
    let bytes = sql.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(sql.len());
    let mut params = ParamSet::new();
    let mut next_arg = 0usize;

    let mut i = 0;
    let mut in_single = false;
    let mut in_double = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while i < bytes.len() {
        let c = bytes[i];

        if in_line_comment {
            if c == b'\n' || c == b'\r' {
                in_line_comment = false;
            }
            out.push(c);
            i += 1;
            continue;
        }
        if in_block_comment {
            if c == b'*' && bytes.get(i + 1) == Some(&b'/') {
                in_block_comment = false;
                out.extend_from_slice(b"*/");
                i += 2;
                continue;
            }
            out.push(c);
            i += 1;
            continue;
        }
        if in_single {
            if c == b'\'' {
                in_single = false;
            }
            out.push(c);
            i += 1;
            continue;
        }
        if in_double {
            if c == b'"' {
                in_double = false;
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            b'\'' => {
                in_single = true;
                out.push(b'\'');
                i += 1;
            }
            b'"' => {
                in_double = true;
                out.push(b'"');
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                in_line_comment = true;
                out.extend_from_slice(b"--");
                i += 2;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                in_block_comment = true;
                out.extend_from_slice(b"/*");
                i += 2;
            }
            // the backslash escapes a following marker character
            b'\\' if matches!(bytes.get(i + 1), Some(b'%') | Some(b':')) => {
                out.push(bytes[i + 1]);
                i += 2;
            }
            b'%' if i == 0 || !bytes[i - 1].is_ascii_alphanumeric() => {
                let spec = bytes.get(i + 1).copied();
                match spec {
                    Some(b'v') => {
                        if let Some(&trailing) = bytes.get(i + 2) {
                            if trailing.is_ascii_alphabetic() {
                                return Err(invalid_spec(&format!("%v{}", trailing as char)));
                            }
                        }
                        let arg = args.get(next_arg).unwrap_or(&Value::Null);
                        next_arg += 1;
                        params.add(arg, caps)?;
                        out.push(b'$');
                        out.extend_from_slice(params.len().to_string().as_bytes());
                        i += 2;
                    }
                    Some(b'd') => {
                        let arg = args.get(next_arg).unwrap_or(&Value::Null);
                        next_arg += 1;
                        out.extend_from_slice(numeric_literal(arg)?.as_bytes());
                        i += 2;
                    }
                    Some(b's') => {
                        let arg = args.get(next_arg).unwrap_or(&Value::Null);
                        next_arg += 1;
                        out.extend_from_slice(string_literal(arg)?.as_bytes());
                        i += 2;
                    }
                    Some(other) => {
                        return Err(invalid_spec(&format!("%{}", other as char)));
                    }
                    None => {
                        return Err(invalid_spec("%"));
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    let out = String::from_utf8(out).map_err(|e| Error::Custom(format!("rewritten SQL is not UTF-8: {e}")))?;
    Ok((out, params))
}

fn numeric_literal(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Int(v) => Ok(v.to_string()),
        Value::Float(v) => Ok(v.to_string()),
        Value::Number(s) => Ok(s.clone()),
        Value::Bool(v) => Ok(if *v { "1" } else { "0" }.to_string()),
        other => Err(Error::Bind(BindError {
            kind: BindErrorKind::UnsupportedType,
            message: format!(
                "cannot splice type '{}' as a numeric literal",
                other.type_name()
            ),
        })),
    }
}

fn string_literal(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Text(s) => Ok(quote(s)),
        Value::Number(s) => Ok(quote(s)),
        Value::Int(v) => Ok(quote(&v.to_string())),
        Value::Float(v) => Ok(quote(&v.to_string())),
        Value::Bool(v) => Ok(quote(&v.to_string())),
        other => Err(Error::Bind(BindError {
            kind: BindErrorKind::UnsupportedType,
            message: format!(
                "cannot splice type '{}' as a string literal",
                other.type_name()
            ),
        })),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn invalid_spec(got: &str) -> Error {
    Error::Bind(BindError {
        kind: BindErrorKind::UnsupportedType,
        message: format!(
            "invalid value specification (expecting '%v', '%d' or '%s', got {})",
            got
        ),
    })
}

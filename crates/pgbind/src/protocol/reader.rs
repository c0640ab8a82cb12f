//! PostgreSQL message decoder.
//!
//! Backend bytes arrive in arbitrary chunks; the reader buffers them and
//! hands out complete messages one at a time.

#![allow(clippy::result_large_err)]
#![allow(clippy::cast_sign_loss)]

use pgbind_core::{Error, ProtocolError, Result};

use super::messages::{
    BackendMessage, ErrorFields, FieldDescription, TransactionStatus, backend_type,
};
use crate::types::WireCursor;

/// Incremental parser for backend messages.
///
/// Feed raw bytes with [`feed`](MessageReader::feed); pull parsed messages
/// with [`next_message`](MessageReader::next_message), which returns
/// `Ok(None)` until a complete message has accumulated.
#[derive(Debug, Default)]
pub struct MessageReader {
    /// Unparsed bytes received from the server
    buf: Vec<u8>,
    /// Offset of the first unconsumed byte
    pos: usize,
}

impl MessageReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes received from the server.
    pub fn feed(&mut self, data: &[u8]) {
        // Reclaim consumed space before growing the buffer.
        if self.pos > 0 && self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        } else if self.pos > 4096 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Pull the next complete message, if one has accumulated.
    pub fn next_message(&mut self) -> Result<Option<BackendMessage>> {
        let avail = &self.buf[self.pos..];

        // type byte + 4-byte length
        if avail.len() < 5 {
            return Ok(None);
        }

        let type_byte = avail[0];
        let len = i32::from_be_bytes([avail[1], avail[2], avail[3], avail[4]]);
        if len < 4 {
            return Err(Error::Protocol(ProtocolError {
                message: format!(
                    "invalid message length {} for type byte 0x{:02x}",
                    len, type_byte
                ),
                raw_data: None,
                source: None,
            }));
        }

        let total = 1 + len as usize;
        if avail.len() < total {
            return Ok(None);
        }

        let body = &avail[5..total];
        let msg = parse_message(type_byte, body)?;
        self.pos += total;
        Ok(Some(msg))
    }
}

fn parse_message(type_byte: u8, body: &[u8]) -> Result<BackendMessage> {
    let mut cur = WireCursor::new(body);

    match type_byte {
        backend_type::AUTHENTICATION => parse_authentication(&mut cur),
        backend_type::PARAMETER_STATUS => {
            let name = cur.read_cstr("parameter name")?;
            let value = cur.read_cstr("parameter value")?;
            Ok(BackendMessage::ParameterStatus { name, value })
        }
        backend_type::BACKEND_KEY_DATA => {
            let process_id = cur.read_i32("process id")?;
            let secret_key = cur.read_i32("secret key")?;
            Ok(BackendMessage::BackendKeyData {
                process_id,
                secret_key,
            })
        }
        backend_type::READY_FOR_QUERY => {
            let b = cur.read_u8("transaction status")?;
            let status = TransactionStatus::from_byte(b).ok_or_else(|| {
                Error::Protocol(ProtocolError {
                    message: format!("unknown transaction status byte 0x{:02x}", b),
                    raw_data: None,
                    source: None,
                })
            })?;
            Ok(BackendMessage::ReadyForQuery(status))
        }
        backend_type::ROW_DESCRIPTION => parse_row_description(&mut cur),
        backend_type::DATA_ROW => parse_data_row(&mut cur),
        backend_type::COMMAND_COMPLETE => {
            let tag = cur.read_cstr("command tag")?;
            Ok(BackendMessage::CommandComplete(tag))
        }
        backend_type::ERROR_RESPONSE => {
            Ok(BackendMessage::ErrorResponse(parse_error_fields(&mut cur)?))
        }
        backend_type::NOTICE_RESPONSE => Ok(BackendMessage::NoticeResponse(parse_error_fields(
            &mut cur,
        )?)),
        backend_type::PARSE_COMPLETE => Ok(BackendMessage::ParseComplete),
        backend_type::BIND_COMPLETE => Ok(BackendMessage::BindComplete),
        backend_type::CLOSE_COMPLETE => Ok(BackendMessage::CloseComplete),
        backend_type::NO_DATA => Ok(BackendMessage::NoData),
        backend_type::EMPTY_QUERY_RESPONSE => Ok(BackendMessage::EmptyQueryResponse),
        backend_type::PARAMETER_DESCRIPTION => {
            let count = cur.read_i16("parameter count")?;
            let mut oids = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count {
                oids.push(cur.read_u32("parameter type oid")?);
            }
            Ok(BackendMessage::ParameterDescription(oids))
        }
        backend_type::PORTAL_SUSPENDED => Ok(BackendMessage::PortalSuspended),
        other => Err(Error::Protocol(ProtocolError {
            message: format!("unknown backend message type 0x{:02x}", other),
            raw_data: Some(body.to_vec()),
            source: None,
        })),
    }
}

fn parse_authentication(cur: &mut WireCursor<'_>) -> Result<BackendMessage> {
    let code = cur.read_i32("authentication code")?;
    match code {
        0 => Ok(BackendMessage::AuthenticationOk),
        3 => Ok(BackendMessage::AuthenticationCleartextPassword),
        5 => {
            let raw = cur.take(4, "md5 salt")?;
            let salt = [raw[0], raw[1], raw[2], raw[3]];
            Ok(BackendMessage::AuthenticationMD5Password(salt))
        }
        other => Err(Error::Protocol(ProtocolError {
            message: format!("unsupported authentication request: {}", other),
            raw_data: None,
            source: None,
        })),
    }
}

fn parse_row_description(cur: &mut WireCursor<'_>) -> Result<BackendMessage> {
    let count = cur.read_i16("field count")?;
    let mut fields = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        fields.push(FieldDescription {
            name: cur.read_cstr("field name")?,
            table_oid: cur.read_u32("table oid")?,
            column_attr: cur.read_i16("column attribute")?,
            type_oid: cur.read_u32("type oid")?,
            type_size: cur.read_i16("type size")?,
            type_modifier: cur.read_i32("type modifier")?,
            format: cur.read_i16("format code")?,
        });
    }
    Ok(BackendMessage::RowDescription(fields))
}

fn parse_data_row(cur: &mut WireCursor<'_>) -> Result<BackendMessage> {
    let count = cur.read_i16("column count")?;
    let mut columns = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let len = cur.read_i32("column length")?;
        if len < 0 {
            columns.push(None);
        } else {
            columns.push(Some(cur.take(len as usize, "column data")?.to_vec()));
        }
    }
    Ok(BackendMessage::DataRow(columns))
}

/// Parse the field list of an ErrorResponse or NoticeResponse.
///
/// Fields the driver does not surface (schema name, routine, ...) are
/// read and discarded.
fn parse_error_fields(cur: &mut WireCursor<'_>) -> Result<ErrorFields> {
    let mut fields = ErrorFields::default();
    loop {
        let field_type = cur.read_u8("error field type")?;
        if field_type == 0 {
            break;
        }
        let value = cur.read_cstr("error field value")?;
        match field_type {
            b'S' => fields.severity = value,
            b'C' => fields.code = value,
            b'M' => fields.message = value,
            b'D' => fields.detail = Some(value),
            b'H' => fields.hint = Some(value),
            b'P' => fields.position = value.parse().ok(),
            _ => {}
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(type_byte: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![type_byte];
        out.extend_from_slice(&((body.len() + 4) as i32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_incremental_framing() {
        let mut reader = MessageReader::new();
        let msg = frame(b'Z', &[b'I']);

        // feed one byte at a time; no message until the frame completes
        for &b in &msg[..msg.len() - 1] {
            reader.feed(&[b]);
            assert_eq!(reader.next_message().unwrap(), None);
        }
        reader.feed(&[msg[msg.len() - 1]]);
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::ReadyForQuery(TransactionStatus::Idle))
        );
        assert_eq!(reader.next_message().unwrap(), None);
    }

    #[test]
    fn test_multiple_messages_in_one_feed() {
        let mut reader = MessageReader::new();
        let mut data = frame(b'1', &[]);
        data.extend_from_slice(&frame(b'2', &[]));
        data.extend_from_slice(&frame(b'Z', &[b'T']));
        reader.feed(&data);

        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::ParseComplete)
        );
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::BindComplete)
        );
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::ReadyForQuery(TransactionStatus::Transaction))
        );
        assert_eq!(reader.next_message().unwrap(), None);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn test_authentication_messages() {
        let mut reader = MessageReader::new();
        reader.feed(&frame(b'R', &0_i32.to_be_bytes()));
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::AuthenticationOk)
        );

        reader.feed(&frame(b'R', &3_i32.to_be_bytes()));
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::AuthenticationCleartextPassword)
        );

        let mut body = 5_i32.to_be_bytes().to_vec();
        body.extend_from_slice(b"salt");
        reader.feed(&frame(b'R', &body));
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::AuthenticationMD5Password(*b"salt"))
        );

        // SCRAM request (code 10) is not supported
        reader.feed(&frame(b'R', &10_i32.to_be_bytes()));
        assert!(reader.next_message().is_err());
    }

    #[test]
    fn test_parameter_status() {
        let mut reader = MessageReader::new();
        reader.feed(&frame(b'S', b"integer_datetimes\0on\0"));
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::ParameterStatus {
                name: "integer_datetimes".to_string(),
                value: "on".to_string(),
            })
        );
    }

    #[test]
    fn test_backend_key_data() {
        let mut body = 1234_i32.to_be_bytes().to_vec();
        body.extend_from_slice(&5678_i32.to_be_bytes());

        let mut reader = MessageReader::new();
        reader.feed(&frame(b'K', &body));
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::BackendKeyData {
                process_id: 1234,
                secret_key: 5678,
            })
        );
    }

    #[test]
    fn test_row_description() {
        // one column: "id", table oid 0, attr 0, type int8 (20), size 8,
        // typmod -1, binary format
        let mut body = 1_i16.to_be_bytes().to_vec();
        body.extend_from_slice(b"id\0");
        body.extend_from_slice(&0_u32.to_be_bytes());
        body.extend_from_slice(&0_i16.to_be_bytes());
        body.extend_from_slice(&20_u32.to_be_bytes());
        body.extend_from_slice(&8_i16.to_be_bytes());
        body.extend_from_slice(&(-1_i32).to_be_bytes());
        body.extend_from_slice(&1_i16.to_be_bytes());

        let mut reader = MessageReader::new();
        reader.feed(&frame(b'T', &body));
        match reader.next_message().unwrap() {
            Some(BackendMessage::RowDescription(fields)) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].name, "id");
                assert_eq!(fields[0].type_oid, 20);
                assert_eq!(fields[0].format, 1);
            }
            other => panic!("expected RowDescription, got {other:?}"),
        }
    }

    #[test]
    fn test_data_row_with_null() {
        let mut body = 2_i16.to_be_bytes().to_vec();
        body.extend_from_slice(&2_i32.to_be_bytes());
        body.extend_from_slice(&[0, 7]);
        body.extend_from_slice(&(-1_i32).to_be_bytes());

        let mut reader = MessageReader::new();
        reader.feed(&frame(b'D', &body));
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::DataRow(vec![Some(vec![0, 7]), None]))
        );
    }

    #[test]
    fn test_command_complete() {
        let mut reader = MessageReader::new();
        reader.feed(&frame(b'C', b"UPDATE 3\0"));
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::CommandComplete("UPDATE 3".to_string()))
        );
    }

    #[test]
    fn test_error_response_fields() {
        let body = b"SERROR\0C42P01\0Mrelation \"t\" does not exist\0P15\0\0";
        let mut reader = MessageReader::new();
        reader.feed(&frame(b'E', body));
        match reader.next_message().unwrap() {
            Some(BackendMessage::ErrorResponse(fields)) => {
                assert_eq!(fields.severity, "ERROR");
                assert_eq!(fields.code, "42P01");
                assert_eq!(fields.message, "relation \"t\" does not exist");
                assert_eq!(fields.position, Some(15));
                assert_eq!(fields.detail, None);
            }
            other => panic!("expected ErrorResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_parameter_description() {
        let mut body = 2_i16.to_be_bytes().to_vec();
        body.extend_from_slice(&23_u32.to_be_bytes());
        body.extend_from_slice(&25_u32.to_be_bytes());

        let mut reader = MessageReader::new();
        reader.feed(&frame(b't', &body));
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::ParameterDescription(vec![23, 25]))
        );
    }

    #[test]
    fn test_unknown_type_byte_fails() {
        let mut reader = MessageReader::new();
        reader.feed(&frame(b'?', &[]));
        assert!(reader.next_message().is_err());
    }

    #[test]
    fn test_invalid_length_fails() {
        let mut reader = MessageReader::new();
        reader.feed(&[b'Z', 0, 0, 0, 1]);
        assert!(reader.next_message().is_err());
    }
}

//! Bounds-checked cursor over wire data.

use pgbind_core::{Error, ProtocolError, Result};

/// A forward-only reader over a binary wire buffer.
///
/// Every read checks the remaining length and fails with a protocol error
/// instead of slicing past the end, so a truncated or corrupt value surfaces
/// as an `Err` rather than a panic.
#[derive(Debug)]
pub struct WireCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

#[allow(clippy::result_large_err)]
impl<'a> WireCursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn short_read(&self, what: &str, need: usize) -> Error {
        Error::Protocol(ProtocolError {
            message: format!(
                "unexpected end of data reading {}: need {} bytes, {} remaining",
                what,
                need,
                self.remaining()
            ),
            raw_data: Some(self.data.to_vec()),
            source: None,
        })
    }

    /// Take `len` raw bytes.
    pub fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.short_read(what, len));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Take everything left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    pub fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn read_i16(&mut self, what: &str) -> Result<i16> {
        let b = self.take(2, what)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u16(&mut self, what: &str) -> Result<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i32(&mut self, what: &str) -> Result<i32> {
        let b = self.take(4, what)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self, what: &str) -> Result<i64> {
        let b = self.take(8, what)?;
        Ok(i64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_f32(&mut self, what: &str) -> Result<f32> {
        let b = self.take(4, what)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64(&mut self, what: &str) -> Result<f64> {
        let b = self.take(8, what)?;
        Ok(f64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read a NUL-terminated string, consuming the terminator.
    ///
    /// Protocol strings are decoded lossily; the server controls its own
    /// encoding and a mangled name is better than a dead connection.
    pub fn read_cstr(&mut self, what: &str) -> Result<String> {
        let rest = &self.data[self.pos..];
        let Some(nul) = rest.iter().position(|&b| b == 0) else {
            return Err(self.short_read(what, rest.len() + 1));
        };
        let out = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_reads() {
        let data = [0x00, 0x01, 0xFF, 0xFE, 0x00, 0x00, 0x00, 0x2A];
        let mut cur = WireCursor::new(&data);
        assert_eq!(cur.read_i16("a").unwrap(), 1);
        assert_eq!(cur.read_i16("b").unwrap(), -2);
        assert_eq!(cur.read_i32("c").unwrap(), 42);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn test_short_read_fails() {
        let data = [0x00, 0x01];
        let mut cur = WireCursor::new(&data);
        assert!(cur.read_i32("int4").is_err());
        // the failed read consumed nothing
        assert_eq!(cur.read_i16("int2").unwrap(), 1);
    }

    #[test]
    fn test_take_rest() {
        let data = [1, 2, 3, 4];
        let mut cur = WireCursor::new(&data);
        cur.read_u8("x").unwrap();
        assert_eq!(cur.take_rest(), &[2, 3, 4]);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn test_floats() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1.5f32.to_be_bytes());
        buf.extend_from_slice(&(-2.25f64).to_be_bytes());
        let mut cur = WireCursor::new(&buf);
        assert_eq!(cur.read_f32("f4").unwrap(), 1.5);
        assert_eq!(cur.read_f64("f8").unwrap(), -2.25);
    }

    #[test]
    fn test_cstr() {
        let data = b"hello\0world\0";
        let mut cur = WireCursor::new(data);
        assert_eq!(cur.read_cstr("a").unwrap(), "hello");
        assert_eq!(cur.read_cstr("b").unwrap(), "world");
        assert_eq!(cur.remaining(), 0);

        let mut cur = WireCursor::new(b"unterminated");
        assert!(cur.read_cstr("c").is_err());
    }

    #[test]
    fn test_u32_and_i64() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
        buf.extend_from_slice(&i64::MIN.to_be_bytes());
        let mut cur = WireCursor::new(&buf);
        assert_eq!(cur.read_u32("u4").unwrap(), 0xDEAD_BEEF);
        assert_eq!(cur.read_i64("i8").unwrap(), i64::MIN);
    }
}

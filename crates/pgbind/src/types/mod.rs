//! Type system: OIDs, wire cursor, scalar/numeric/array codecs.
//!
//! Dispatch is a closed `match` on type OIDs; there are no runtime
//! type tables.

pub mod array;
pub mod cursor;
pub mod decode;
pub mod encode;
pub mod numeric;
pub mod oid;

pub use cursor::WireCursor;
pub use decode::decode_value;
pub use encode::Format;
pub use numeric::NumericPolicy;

/// Server capabilities and options that shape the wire codec.
///
/// `integer_datetimes` selects 8-byte integer microseconds versus 8-byte
/// float seconds for every time payload; `interval_has_day` selects the
/// three-part interval layout servers grew in 8.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerCaps {
    /// Time payloads are integer microseconds, not float seconds.
    pub integer_datetimes: bool,
    /// Intervals carry a separate day field.
    pub interval_has_day: bool,
    /// How numeric results are surfaced.
    pub numeric: NumericPolicy,
}

impl Default for ServerCaps {
    fn default() -> Self {
        Self {
            integer_datetimes: true,
            interval_has_day: true,
            numeric: NumericPolicy::Optimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caps() {
        let caps = ServerCaps::default();
        assert!(caps.integer_datetimes);
        assert!(caps.interval_has_day);
        assert_eq!(caps.numeric, NumericPolicy::Optimal);
    }
}

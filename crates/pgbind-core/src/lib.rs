//! Core types for the pgbind PostgreSQL driver.
//!
//! This crate provides the foundational pieces shared by the driver:
//!
//! - `Value`, the dynamically-typed host value model
//! - `Error` and its structured payload types
//! - `Row` and `ColumnInfo` for result access

pub mod error;
pub mod row;
pub mod value;

pub use error::{
    BindError, BindErrorKind, ConfigError, ConnectionError, ConnectionErrorKind, Error,
    ProtocolError, QueryError, QueryErrorKind, Result, TransactionError, TransactionErrorKind,
    TypeError,
};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;

//! Synchronous PostgreSQL driver with a binary wire-format codec.
//!
//! `pgbind` implements the PostgreSQL wire protocol from scratch over a
//! plain TCP stream and always requests results in binary format. It
//! provides:
//!
//! - Message framing and parsing (protocol 3.0)
//! - Authentication (cleartext, MD5)
//! - The extended query protocol with typed parameter binding
//! - A binary codec covering the built-in scalar types, NUMERIC and
//!   N-dimensional arrays
//! - `%v`/`%d`/`%s` placeholder rewriting and re-executable statements
//!   with lost-connection recovery
//!
//! # Capability Discovery
//!
//! Binary date/time layouts differ across server builds. During startup
//! the connection inspects the `integer_datetimes` and `server_version`
//! parameters (probing old servers when necessary) and the codec adapts
//! to what the server actually sends.
//!
//! # Example
//!
//! ```rust,ignore
//! use pgbind::{PgConfig, PgConnection, Statement};
//!
//! let config = PgConfig::new("localhost", "postgres", "mydb")
//!     .password("secret");
//! let mut conn = PgConnection::connect(config)?;
//!
//! let rows = Statement::new("select * from events where id > %v")
//!     .bind(100i64)
//!     .query(&mut conn)?;
//! ```

pub mod config;
pub mod connection;
pub mod params;
pub mod protocol;
pub mod sql;
pub mod statement;
pub mod types;

pub use config::PgConfig;
pub use connection::{ConnectionState, PgConnection, QueryResult};
pub use params::{BoundParam, ParamSet, ParamValue};
pub use statement::Statement;
pub use types::{Format, NumericPolicy, ServerCaps};

pub use pgbind_core::{Error, Result, Row, Value};

//! PostgreSQL wire protocol (version 3.0).
//!
//! `messages` defines the frontend and backend message types, `writer`
//! encodes frontend messages and `reader` parses backend bytes into
//! messages incrementally.

pub mod messages;
pub mod reader;
pub mod writer;

pub use messages::{
    BackendMessage, DescribeKind, ErrorFields, FieldDescription, FrontendMessage,
    PROTOCOL_VERSION, TransactionStatus,
};
pub use reader::MessageReader;
pub use writer::MessageWriter;

//! PostgreSQL wire protocol message definitions.
//!
//! Covers the protocol 3.0 messages the driver actually exchanges:
//! startup and password authentication, the extended-query cycle
//! (Parse/Bind/Describe/Execute/Sync) and simple queries.

/// Protocol version 3.0 (major 3, minor 0).
pub const PROTOCOL_VERSION: i32 = 196_608;

/// Frontend message type bytes.
pub mod frontend_type {
    pub const PASSWORD: u8 = b'p';
    pub const QUERY: u8 = b'Q';
    pub const PARSE: u8 = b'P';
    pub const BIND: u8 = b'B';
    pub const DESCRIBE: u8 = b'D';
    pub const EXECUTE: u8 = b'E';
    pub const CLOSE: u8 = b'C';
    pub const SYNC: u8 = b'S';
    pub const FLUSH: u8 = b'H';
    pub const TERMINATE: u8 = b'X';
}

/// Backend message type bytes.
pub mod backend_type {
    pub const AUTHENTICATION: u8 = b'R';
    pub const PARAMETER_STATUS: u8 = b'S';
    pub const BACKEND_KEY_DATA: u8 = b'K';
    pub const READY_FOR_QUERY: u8 = b'Z';
    pub const ROW_DESCRIPTION: u8 = b'T';
    pub const DATA_ROW: u8 = b'D';
    pub const COMMAND_COMPLETE: u8 = b'C';
    pub const ERROR_RESPONSE: u8 = b'E';
    pub const NOTICE_RESPONSE: u8 = b'N';
    pub const PARSE_COMPLETE: u8 = b'1';
    pub const BIND_COMPLETE: u8 = b'2';
    pub const CLOSE_COMPLETE: u8 = b'3';
    pub const NO_DATA: u8 = b'n';
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';
    pub const PARAMETER_DESCRIPTION: u8 = b't';
    pub const PORTAL_SUSPENDED: u8 = b's';
}

/// What a Describe or Close message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescribeKind {
    /// A prepared statement
    Statement,
    /// A portal
    Portal,
}

impl DescribeKind {
    /// The wire byte for this kind.
    pub const fn as_byte(self) -> u8 {
        match self {
            DescribeKind::Statement => b'S',
            DescribeKind::Portal => b'P',
        }
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendMessage {
    /// Startup message with protocol version and parameters
    Startup {
        version: i32,
        params: Vec<(String, String)>,
    },
    /// Password response (cleartext or MD5 digest)
    PasswordMessage(String),
    /// Simple query
    Query(String),
    /// Parse (prepare) a statement
    Parse {
        name: String,
        query: String,
        param_types: Vec<u32>,
    },
    /// Bind parameters to a prepared statement
    Bind {
        portal: String,
        statement: String,
        param_formats: Vec<i16>,
        params: Vec<Option<Vec<u8>>>,
        result_formats: Vec<i16>,
    },
    /// Describe a statement or portal
    Describe { kind: DescribeKind, name: String },
    /// Execute a portal
    Execute { portal: String, max_rows: i32 },
    /// Close a statement or portal
    Close { kind: DescribeKind, name: String },
    /// End of an extended-query cycle
    Sync,
    /// Ask the server to flush its output buffer
    Flush,
    /// Graceful shutdown
    Terminate,
}

/// Transaction status reported by ReadyForQuery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    /// Not in a transaction block ('I')
    #[default]
    Idle,
    /// In a transaction block ('T')
    Transaction,
    /// In a failed transaction block ('E')
    Error,
}

impl TransactionStatus {
    /// Decode the status byte from a ReadyForQuery message.
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'I' => Some(TransactionStatus::Idle),
            b'T' => Some(TransactionStatus::Transaction),
            b'E' => Some(TransactionStatus::Error),
            _ => None,
        }
    }
}

/// One column in a RowDescription message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    /// Column name
    pub name: String,
    /// Table OID, or 0 if not a table column
    pub table_oid: u32,
    /// Attribute number within the table, or 0
    pub column_attr: i16,
    /// Type OID of the column
    pub type_oid: u32,
    /// Type size (negative for variable-width types)
    pub type_size: i16,
    /// Type modifier
    pub type_modifier: i32,
    /// Format code the server will use for this column
    pub format: i16,
}

/// Fields of an ErrorResponse or NoticeResponse message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorFields {
    /// Severity (ERROR, FATAL, PANIC, WARNING, NOTICE, ...)
    pub severity: String,
    /// SQLSTATE code
    pub code: String,
    /// Primary human-readable message
    pub message: String,
    /// Optional detail message
    pub detail: Option<String>,
    /// Optional hint
    pub hint: Option<String>,
    /// 1-based character position in the query, if any
    pub position: Option<i32>,
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// Authentication successful
    AuthenticationOk,
    /// Server wants a cleartext password
    AuthenticationCleartextPassword,
    /// Server wants an MD5-hashed password with this salt
    AuthenticationMD5Password([u8; 4]),
    /// Run-time parameter report (e.g. `server_version`)
    ParameterStatus { name: String, value: String },
    /// Cancellation key data
    BackendKeyData { process_id: i32, secret_key: i32 },
    /// Server is ready for the next query
    ReadyForQuery(TransactionStatus),
    /// Describes the columns of the rows to follow
    RowDescription(Vec<FieldDescription>),
    /// One result row; `None` is SQL NULL
    DataRow(Vec<Option<Vec<u8>>>),
    /// Command finished; carries the command tag
    CommandComplete(String),
    /// Server-reported error
    ErrorResponse(ErrorFields),
    /// Server-reported notice
    NoticeResponse(ErrorFields),
    /// Parse finished
    ParseComplete,
    /// Bind finished
    BindComplete,
    /// Close finished
    CloseComplete,
    /// The statement returns no rows
    NoData,
    /// The query string was empty
    EmptyQueryResponse,
    /// Parameter types of a described statement
    ParameterDescription(Vec<u32>),
    /// Execute hit its row limit
    PortalSuspended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_kind_bytes() {
        assert_eq!(DescribeKind::Statement.as_byte(), b'S');
        assert_eq!(DescribeKind::Portal.as_byte(), b'P');
    }

    #[test]
    fn test_transaction_status_from_byte() {
        assert_eq!(
            TransactionStatus::from_byte(b'I'),
            Some(TransactionStatus::Idle)
        );
        assert_eq!(
            TransactionStatus::from_byte(b'T'),
            Some(TransactionStatus::Transaction)
        );
        assert_eq!(
            TransactionStatus::from_byte(b'E'),
            Some(TransactionStatus::Error)
        );
        assert_eq!(TransactionStatus::from_byte(b'X'), None);
    }

    #[test]
    fn test_protocol_version() {
        // major 3 in the high 16 bits, minor 0 in the low
        assert_eq!(PROTOCOL_VERSION >> 16, 3);
        assert_eq!(PROTOCOL_VERSION & 0xFFFF, 0);
    }
}

//! PostgreSQL connection implementation.
//!
//! This module implements the PostgreSQL wire protocol connection,
//! including connection establishment, authentication, capability
//! discovery and query execution over the extended-query protocol.
//!
//! Results are always requested in binary format; decoding into
//! [`Value`]s goes through the codec in [`crate::types`].

#![allow(clippy::result_large_err)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use pgbind_core::error::{
    ConnectionError, ConnectionErrorKind, ProtocolError, QueryError, QueryErrorKind,
    strip_severity,
};
use pgbind_core::{ColumnInfo, Error, Result, Row, Value};

use crate::config::PgConfig;
use crate::params::ParamSet;
use crate::protocol::{
    BackendMessage, DescribeKind, ErrorFields, FrontendMessage, MessageReader, MessageWriter,
    PROTOCOL_VERSION, TransactionStatus,
};
use crate::types::{ServerCaps, decode_value};

/// Connection state in the PostgreSQL protocol state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// TCP connection established, sending startup
    Connecting,
    /// Performing authentication handshake
    Authenticating,
    /// Ready for queries
    Ready(TransactionStatus),
    /// Connection is in an error state
    Error,
    /// Connection has been closed
    Closed,
}

/// The outcome of one statement execution.
#[derive(Debug, Default)]
pub struct QueryResult {
    /// Decoded result rows (empty for non-SELECT statements)
    pub rows: Vec<Row>,
    /// Command tag from CommandComplete, e.g. `"UPDATE 3"`
    pub tag: Option<String>,
}

impl QueryResult {
    /// Number of rows the command reported as affected.
    ///
    /// Parsed from the command tag tail; `INSERT 0 5` and `UPDATE 5`
    /// both yield 5. Commands without a row count yield 0.
    pub fn rows_affected(&self) -> u64 {
        self.tag
            .as_deref()
            .and_then(|tag| tag.rsplit(' ').next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    /// The single result row, if the query produced at most one.
    ///
    /// More than one row is an error; zero rows is `Ok(None)`.
    pub fn single_row(mut self) -> Result<Option<Row>> {
        if self.rows.len() > 1 {
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::Database,
                sql: None,
                sqlstate: None,
                message: format!(
                    "query returned {} rows where a single row was expected",
                    self.rows.len()
                ),
                detail: None,
                hint: None,
                position: None,
                source: None,
            }));
        }
        Ok(self.rows.pop())
    }

    /// Pivot the rows into per-column value lists, keyed by column name.
    pub fn column_map(self) -> std::collections::BTreeMap<String, Vec<Value>> {
        let mut map = std::collections::BTreeMap::new();
        let Some(first) = self.rows.first() else {
            return map;
        };
        let names: Vec<String> = first.column_names().map(str::to_string).collect();
        for name in &names {
            map.insert(name.clone(), Vec::with_capacity(self.rows.len()));
        }
        for row in self.rows {
            for (name, value) in names.iter().zip(row.into_values()) {
                if let Some(col) = map.get_mut(name) {
                    col.push(value);
                }
            }
        }
        map
    }
}

/// PostgreSQL connection.
///
/// Manages a TCP connection to a PostgreSQL server, handling the wire
/// protocol, authentication, capability discovery and state tracking.
pub struct PgConnection {
    /// TCP stream to the server
    stream: TcpStream,
    /// Current connection state
    state: ConnectionState,
    /// Backend process ID (for query cancellation)
    process_id: i32,
    /// Secret key (for query cancellation)
    secret_key: i32,
    /// Server parameters received during startup
    parameters: HashMap<String, String>,
    /// Connection configuration
    config: PgConfig,
    /// Capabilities derived from the server during startup
    caps: ServerCaps,
    /// Message reader for parsing backend messages
    reader: MessageReader,
    /// Message writer for encoding frontend messages
    writer: MessageWriter,
    /// Read buffer
    read_buf: Vec<u8>,
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("state", &self.state)
            .field("process_id", &self.process_id)
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("database", &self.config.database)
            .finish_non_exhaustive()
    }
}

impl PgConnection {
    /// Establish a new connection to the PostgreSQL server.
    ///
    /// This performs the complete connection handshake:
    /// 1. TCP connection
    /// 2. Startup message
    /// 3. Authentication
    /// 4. Receive server parameters and ReadyForQuery
    /// 5. Derive codec capabilities from the server parameters
    pub fn connect(config: PgConfig) -> Result<Self> {
        let stream = open_stream(&config)?;

        stream.set_nodelay(true).ok();
        stream.set_read_timeout(Some(config.connect_timeout)).ok();
        stream.set_write_timeout(Some(config.connect_timeout)).ok();

        let mut conn = Self {
            stream,
            state: ConnectionState::Connecting,
            process_id: 0,
            secret_key: 0,
            parameters: HashMap::new(),
            config,
            caps: ServerCaps::default(),
            reader: MessageReader::new(),
            writer: MessageWriter::new(),
            read_buf: vec![0u8; 8192],
        };

        conn.send_startup()?;
        conn.state = ConnectionState::Authenticating;
        conn.handle_auth()?;
        conn.read_startup_messages()?;
        conn.derive_caps()?;

        debug!(
            host = %conn.config.host,
            port = conn.config.port,
            database = %conn.config.database,
            server_version = conn.parameters.get("server_version").map(String::as_str),
            integer_datetimes = conn.caps.integer_datetimes,
            "connected to PostgreSQL server"
        );

        Ok(conn)
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if the connection is ready for queries.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ConnectionState::Ready(_))
    }

    /// Is a transaction block open (including a failed one)?
    pub fn in_transaction(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Ready(TransactionStatus::Transaction | TransactionStatus::Error)
        )
    }

    /// Get the backend process ID (for query cancellation).
    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    /// Get the secret key (for query cancellation).
    pub fn secret_key(&self) -> i32 {
        self.secret_key
    }

    /// Get a server parameter value.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Get all server parameters.
    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    /// Capabilities discovered during the handshake.
    pub fn caps(&self) -> ServerCaps {
        self.caps
    }

    /// Execute a statement through the extended-query protocol.
    ///
    /// `sql` must already use `$N` placeholders matching `params`. Results
    /// are requested in binary format and decoded into [`Value`]s.
    pub fn exec(&mut self, sql: &str, params: &ParamSet) -> Result<QueryResult> {
        let (fields, raw_rows, tag) = self.exec_raw(sql, params)?;

        let columns = fields.map(|fields| {
            let names = fields.iter().map(|f| f.name.clone()).collect();
            let oids = fields.iter().map(|f| f.type_oid).collect();
            Arc::new(ColumnInfo::new(names, oids))
        });

        let mut rows = Vec::with_capacity(raw_rows.len());
        if let Some(columns) = columns {
            for raw in raw_rows {
                let mut values = Vec::with_capacity(raw.len());
                for (i, cell) in raw.iter().enumerate() {
                    let type_oid = columns.type_oid_at(i).unwrap_or(0);
                    values.push(decode_value(type_oid, cell.as_deref(), &self.caps)?);
                }
                rows.push(Row::with_columns(Arc::clone(&columns), values));
            }
        }

        Ok(QueryResult { rows, tag })
    }

    /// Execute a statement verbatim, without placeholder rewriting.
    pub fn execute_raw(&mut self, sql: &str) -> Result<QueryResult> {
        self.exec(sql, &ParamSet::new())
    }

    /// Open a transaction block.
    pub fn begin(&mut self) -> Result<()> {
        self.execute_raw("begin").map(|_| ())
    }

    /// Commit the open transaction block.
    pub fn commit(&mut self) -> Result<()> {
        self.execute_raw("commit").map(|_| ())
    }

    /// Roll back the open transaction block.
    pub fn rollback(&mut self) -> Result<()> {
        self.execute_raw("rollback").map(|_| ())
    }

    /// Drop the dead connection and establish a fresh one in its place.
    ///
    /// Server parameters, key data and capabilities are all rediscovered;
    /// any session state on the old connection is gone.
    pub fn reset(&mut self) -> Result<()> {
        debug!(
            host = %self.config.host,
            port = self.config.port,
            "resetting PostgreSQL connection"
        );
        let fresh = Self::connect(self.config.clone())?;
        *self = fresh;
        Ok(())
    }

    /// Close the connection gracefully.
    pub fn close(&mut self) -> Result<()> {
        if matches!(
            self.state,
            ConnectionState::Closed | ConnectionState::Disconnected
        ) {
            return Ok(());
        }

        self.send_message(&FrontendMessage::Terminate)?;
        self.state = ConnectionState::Closed;
        Ok(())
    }

    // ==================== Extended Query ====================

    /// Run one Parse/Bind/Describe/Execute/Sync cycle, returning the raw
    /// column descriptions, row payloads and command tag.
    #[allow(clippy::type_complexity)]
    fn exec_raw(
        &mut self,
        sql: &str,
        params: &ParamSet,
    ) -> Result<(
        Option<Vec<crate::protocol::FieldDescription>>,
        Vec<Vec<Option<Vec<u8>>>>,
        Option<String>,
    )> {
        trace!(sql, params = params.len(), "executing statement");

        self.send_message(&FrontendMessage::Parse {
            name: String::new(),
            query: sql.to_string(),
            param_types: params.oids(),
        })?;
        self.send_message(&FrontendMessage::Bind {
            portal: String::new(),
            statement: String::new(),
            param_formats: params.formats(),
            params: params
                .payloads()
                .into_iter()
                .map(|p| p.map(<[u8]>::to_vec))
                .collect(),
            result_formats: vec![1],
        })?;
        self.send_message(&FrontendMessage::Describe {
            kind: DescribeKind::Portal,
            name: String::new(),
        })?;
        self.send_message(&FrontendMessage::Execute {
            portal: String::new(),
            max_rows: 0,
        })?;
        self.send_message(&FrontendMessage::Sync)?;

        let mut fields = None;
        let mut rows = Vec::new();
        let mut tag = None;
        let mut pending_error = None;

        loop {
            match self.receive_message()? {
                BackendMessage::ParseComplete
                | BackendMessage::BindComplete
                | BackendMessage::NoData
                | BackendMessage::EmptyQueryResponse
                | BackendMessage::PortalSuspended => {}
                BackendMessage::RowDescription(f) => fields = Some(f),
                BackendMessage::DataRow(cols) => rows.push(cols),
                BackendMessage::CommandComplete(t) => tag = Some(t),
                BackendMessage::ErrorResponse(e) => {
                    // keep draining to ReadyForQuery so the protocol stays in sync
                    if pending_error.is_none() {
                        pending_error = Some(error_from_fields(&e, Some(sql)));
                    }
                }
                BackendMessage::NoticeResponse(notice) => {
                    debug!(
                        severity = %notice.severity,
                        message = %notice.message,
                        "server notice"
                    );
                }
                BackendMessage::ParameterStatus { name, value } => {
                    self.parameters.insert(name, value);
                }
                BackendMessage::ReadyForQuery(status) => {
                    self.state = ConnectionState::Ready(status);
                    break;
                }
                other => {
                    self.state = ConnectionState::Error;
                    return Err(Error::Protocol(ProtocolError {
                        message: format!("unexpected message during query: {:?}", other),
                        raw_data: None,
                        source: None,
                    }));
                }
            }
        }

        if let Some(err) = pending_error {
            return Err(err);
        }
        Ok((fields, rows, tag))
    }

    // ==================== Capability Discovery ====================

    /// Derive the codec capabilities from server parameters.
    ///
    /// `integer_datetimes` is normally reported as a startup parameter;
    /// servers old enough not to report it get probed with a binary-format
    /// time value instead. The separate interval day field appeared in 8.1.
    fn derive_caps(&mut self) -> Result<()> {
        let interval_has_day = self.server_version_at_least(8, 1);

        let integer_datetimes = match self.parameters.get("integer_datetimes") {
            Some(v) => v != "off",
            None => self.probe_integer_datetimes()?,
        };

        self.caps = ServerCaps {
            integer_datetimes,
            interval_has_day,
            numeric: self.config.numeric,
        };
        Ok(())
    }

    /// Hackish probe for servers that predate the `integer_datetimes`
    /// startup parameter: select midnight as a binary time value and
    /// check the raw payload.
    fn probe_integer_datetimes(&mut self) -> Result<bool> {
        let (_, rows, _) = self.exec_raw("select '00:00'::time", &ParamSet::new())?;

        let Some(cell) = rows.first().and_then(|r| r.first()).and_then(Option::as_ref) else {
            return Ok(true);
        };
        if cell.len() != 8 {
            return Ok(true);
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(cell);
        let bits = i64::from_be_bytes(raw);
        let integer = bits == 0;
        debug!(integer, "probed integer_datetimes");
        Ok(integer)
    }

    /// Compare the reported `server_version` against `major.minor`.
    ///
    /// Unparseable versions count as new enough.
    fn server_version_at_least(&self, major: u32, minor: u32) -> bool {
        let Some(version) = self.parameters.get("server_version") else {
            return true;
        };
        let mut parts = version
            .split(|c: char| !c.is_ascii_digit())
            .map(|p| p.parse::<u32>().unwrap_or(0));
        let got_major = parts.next().unwrap_or(0);
        let got_minor = parts.next().unwrap_or(0);
        if got_major == 0 {
            return true;
        }
        (got_major, got_minor) >= (major, minor)
    }

    // ==================== Startup ====================

    fn send_startup(&mut self) -> Result<()> {
        let params = self.config.startup_params();
        let msg = FrontendMessage::Startup {
            version: PROTOCOL_VERSION,
            params,
        };
        self.send_message(&msg)
    }

    // ==================== Authentication ====================

    fn require_password(&self, message: &'static str) -> Result<&str> {
        self.config.password.as_deref().ok_or_else(|| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Authentication,
                message: message.to_string(),
                source: None,
            })
        })
    }

    fn handle_auth(&mut self) -> Result<()> {
        loop {
            let msg = self.receive_message()?;

            match msg {
                BackendMessage::AuthenticationOk => {
                    return Ok(());
                }
                BackendMessage::AuthenticationCleartextPassword => {
                    let password =
                        self.require_password("password required but not provided")?;
                    self.send_message(&FrontendMessage::PasswordMessage(password.to_string()))?;
                }
                BackendMessage::AuthenticationMD5Password(salt) => {
                    let password =
                        self.require_password("password required but not provided")?;
                    let hash = md5_password(&self.config.user, password, salt);
                    self.send_message(&FrontendMessage::PasswordMessage(hash))?;
                }
                BackendMessage::ErrorResponse(e) => {
                    self.state = ConnectionState::Error;
                    return Err(error_from_fields(&e, None));
                }
                _ => {
                    return Err(Error::Protocol(ProtocolError {
                        message: format!("unexpected message during auth: {:?}", msg),
                        raw_data: None,
                        source: None,
                    }));
                }
            }
        }
    }

    // ==================== Startup Messages ====================

    fn read_startup_messages(&mut self) -> Result<()> {
        loop {
            let msg = self.receive_message()?;

            match msg {
                BackendMessage::BackendKeyData {
                    process_id,
                    secret_key,
                } => {
                    self.process_id = process_id;
                    self.secret_key = secret_key;
                }
                BackendMessage::ParameterStatus { name, value } => {
                    self.parameters.insert(name, value);
                }
                BackendMessage::ReadyForQuery(status) => {
                    self.state = ConnectionState::Ready(status);
                    return Ok(());
                }
                BackendMessage::ErrorResponse(e) => {
                    self.state = ConnectionState::Error;
                    return Err(error_from_fields(&e, None));
                }
                BackendMessage::NoticeResponse(notice) => {
                    debug!(
                        severity = %notice.severity,
                        message = %notice.message,
                        "server notice during startup"
                    );
                }
                _ => {
                    return Err(Error::Protocol(ProtocolError {
                        message: format!("unexpected startup message: {:?}", msg),
                        raw_data: None,
                        source: None,
                    }));
                }
            }
        }
    }

    // ==================== Low-Level I/O ====================

    fn send_message(&mut self, msg: &FrontendMessage) -> Result<()> {
        let data = self.writer.write(msg);
        self.stream.write_all(data).map_err(|e| {
            self.state = ConnectionState::Error;
            Error::Io(e)
        })?;
        self.stream.flush().map_err(|e| {
            self.state = ConnectionState::Error;
            Error::Io(e)
        })?;
        Ok(())
    }

    fn receive_message(&mut self) -> Result<BackendMessage> {
        // Try to parse any complete messages from buffer first
        loop {
            match self.reader.next_message() {
                Ok(Some(msg)) => return Ok(msg),
                Ok(None) => {
                    // Need more data
                    let n = self.stream.read(&mut self.read_buf).map_err(|e| {
                        if e.kind() == std::io::ErrorKind::TimedOut
                            || e.kind() == std::io::ErrorKind::WouldBlock
                        {
                            Error::Timeout
                        } else {
                            self.state = ConnectionState::Error;
                            Error::Connection(ConnectionError {
                                kind: ConnectionErrorKind::Disconnected,
                                message: format!("failed to read from server: {}", e),
                                source: Some(Box::new(e)),
                            })
                        }
                    })?;

                    if n == 0 {
                        self.state = ConnectionState::Disconnected;
                        return Err(Error::Connection(ConnectionError {
                            kind: ConnectionErrorKind::Disconnected,
                            message: "connection closed by server".to_string(),
                            source: None,
                        }));
                    }

                    self.reader.feed(&self.read_buf[..n]);
                }
                Err(e) => {
                    self.state = ConnectionState::Error;
                    return Err(e);
                }
            }
        }
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        // Try to close gracefully, ignore errors
        let _ = self.close();
    }
}

// ==================== Helper Functions ====================

fn open_stream(config: &PgConfig) -> Result<TcpStream> {
    let addrs: Vec<_> = config
        .socket_addr()
        .to_socket_addrs()
        .map_err(|e| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::DnsResolution,
                message: format!("failed to resolve {}: {}", config.socket_addr(), e),
                source: Some(Box::new(e)),
            })
        })?
        .collect();

    let Some(addr) = addrs.first() else {
        return Err(Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::DnsResolution,
            message: format!("no addresses for {}", config.socket_addr()),
            source: None,
        }));
    };

    TcpStream::connect_timeout(addr, config.connect_timeout).map_err(|e| {
        let kind = if e.kind() == std::io::ErrorKind::ConnectionRefused {
            ConnectionErrorKind::Refused
        } else {
            ConnectionErrorKind::Connect
        };
        warn!(addr = %config.socket_addr(), error = %e, "connect failed");
        Error::Connection(ConnectionError {
            kind,
            message: format!("failed to connect to {}: {}", config.socket_addr(), e),
            source: Some(Box::new(e)),
        })
    })
}

/// Compute MD5 password hash as per PostgreSQL protocol.
fn md5_password(user: &str, password: &str, salt: [u8; 4]) -> String {
    use std::fmt::Write;

    // md5(md5(password + user) + salt)
    let inner = format!("{}{}", password, user);
    let inner_hash = md5::compute(inner.as_bytes());

    let mut outer_input = format!("{:x}", inner_hash).into_bytes();
    outer_input.extend_from_slice(&salt);
    let outer_hash = md5::compute(&outer_input);

    let mut result = String::with_capacity(35);
    result.push_str("md5");
    let _ = write!(&mut result, "{:x}", outer_hash);
    result
}

/// Classify an ErrorResponse by its SQLSTATE.
pub(crate) fn error_from_fields(fields: &ErrorFields, sql: Option<&str>) -> Error {
    let message = strip_severity(&fields.message).to_string();

    let kind = match fields.code.get(..2) {
        Some("08") => {
            // Connection exception
            return Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message,
                source: None,
            });
        }
        Some("28") => {
            // Invalid authorization specification
            return Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Authentication,
                message,
                source: None,
            });
        }
        Some("42") => QueryErrorKind::Syntax, // Syntax error or access rule violation
        Some("23") => QueryErrorKind::Constraint, // Integrity constraint violation
        Some("40") => {
            if fields.code == "40001" {
                QueryErrorKind::Serialization
            } else {
                QueryErrorKind::Deadlock
            }
        }
        Some("57") => {
            if fields.code == "57014" {
                QueryErrorKind::Cancelled
            } else {
                QueryErrorKind::Timeout
            }
        }
        _ => QueryErrorKind::Database,
    };

    Error::Query(QueryError {
        kind,
        sql: sql.map(str::to_string),
        sqlstate: Some(fields.code.clone()),
        message,
        detail: fields.detail.clone(),
        hint: fields.hint.clone(),
        position: fields.position.map(|p| p.unsigned_abs() as usize),
        source: None,
    })
}

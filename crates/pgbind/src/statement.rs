//! Re-executable statements with placeholder rewriting and lost-connection
//! recovery.
//!
//! A [`Statement`] pairs SQL text using `%v`/`%d`/`%s` markers with its
//! argument list. Execution rewrites the text to `$N` placeholders, binds
//! the arguments and runs one extended-query cycle. If the server
//! connection drops outside a transaction the statement reconnects and
//! retries exactly once; inside a transaction the loss is surfaced as a
//! transaction error, because the server has already rolled the
//! transaction back.

#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;

use tracing::warn;

use pgbind_core::error::{TransactionError, TransactionErrorKind};
use pgbind_core::{Error, Result, Row, Value};

use crate::connection::{PgConnection, QueryResult};
use crate::sql;

/// A statement with bound arguments, executable any number of times.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    /// SQL text with `%v`/`%d`/`%s` markers
    sql: String,
    /// Arguments consumed by the markers, in order
    args: Vec<Value>,
}

impl Statement {
    /// Create a statement from SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Append arguments from an iterator.
    #[must_use]
    pub fn bind_all(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.args.extend(values);
        self
    }

    /// The statement text, as written.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Drop all bound arguments, keeping the SQL text.
    pub fn reset(&mut self) {
        self.args.clear();
    }

    /// Execute and return the full result.
    pub fn execute(&self, conn: &mut PgConnection) -> Result<QueryResult> {
        self.run(conn)
    }

    /// Execute and return the number of affected rows.
    pub fn execute_affected(&self, conn: &mut PgConnection) -> Result<u64> {
        self.run(conn).map(|r| r.rows_affected())
    }

    /// Execute and return the result rows.
    pub fn query(&self, conn: &mut PgConnection) -> Result<Vec<Row>> {
        self.run(conn).map(|r| r.rows)
    }

    /// Execute and return at most one row; more than one row is an error.
    pub fn query_single(&self, conn: &mut PgConnection) -> Result<Option<Row>> {
        self.run(conn)?.single_row()
    }

    /// Execute and return the rows pivoted into per-column value lists.
    pub fn query_columns(&self, conn: &mut PgConnection) -> Result<BTreeMap<String, Vec<Value>>> {
        self.run(conn).map(QueryResult::column_map)
    }

    fn run(&self, conn: &mut PgConnection) -> Result<QueryResult> {
        let (text, params) = sql::rewrite(&self.sql, &self.args, &conn.caps())?;

        let was_in_transaction = conn.in_transaction();
        match conn.exec(&text, &params) {
            Err(e) if e.is_disconnect() => {
                if was_in_transaction {
                    return Err(Error::Transaction(TransactionError {
                        kind: TransactionErrorKind::Lost,
                        message: "connection to PostgreSQL database server lost while in a \
                                  transaction; transaction has been lost"
                            .to_string(),
                    }));
                }
                warn!(error = %e, "connection lost; reconnecting and retrying once");
                conn.reset()?;
                // capabilities may differ on the new connection
                let (text, params) = sql::rewrite(&self.sql, &self.args, &conn.caps())?;
                conn.exec(&text, &params)
            }
            other => other,
        }
    }
}

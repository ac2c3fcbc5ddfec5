//! Connection and transaction traits

use crate::{Result, ResultCursor};
use async_trait::async_trait;

/// A database connection.
///
/// The run owns exactly one connection and drives it sequentially: one
/// query/cursor at a time, each statement awaited before the next is issued.
///
/// Queries are plain UTF-8 SQL (they come from configuration and contain no
/// data literals). Data-manipulation statements are passed as raw bytes in
/// the destination's legacy text encoding, because their literals were
/// re-encoded when the statement was built.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g. "sqlite", "odbc")
    fn driver_name(&self) -> &str;

    /// Execute a query that returns rows (SELECT).
    async fn query(&self, sql: &str) -> Result<Box<dyn ResultCursor>>;

    /// Execute a legacy-encoded statement that modifies data
    /// (INSERT/DELETE). Returns the number of affected rows.
    async fn execute(&self, statement: &[u8]) -> Result<u64>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// A database transaction.
///
/// The transaction is the atomicity boundary for one table's insertion
/// phase: either every row statement issued through it commits, or the
/// rollback restores the table to its pre-phase state.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Execute a legacy-encoded statement within the transaction.
    async fn execute(&self, statement: &[u8]) -> Result<u64>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

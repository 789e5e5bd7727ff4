//! Destination store (ClickHouse) access.

mod clickhouse;

pub use clickhouse::ClickHouseTarget;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A store that CSV batches are inserted into.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Store name used in events and errors.
    fn name(&self) -> &str;

    /// Open a connection and release it. Used by the connection gate.
    async fn ping(&self) -> Result<()>;

    /// Open a session for loading one file.
    async fn open(&self) -> Result<Box<dyn InsertSession>>;
}

/// One open destination session.
#[async_trait]
pub trait InsertSession: Send {
    /// Insert one self-contained CSV chunk (header first) into `table`.
    async fn insert_csv(&mut self, table: &str, chunk: Bytes) -> Result<()>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self);
}

//! Source store (PostgreSQL) access.

mod postgres;
mod tls;

pub use postgres::PgSource;
pub use tls::{SslMode, TlsBuilder};

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// A store that tables are exported from.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Store name used in events and errors.
    fn name(&self) -> &str;

    /// Open a connection and release it. Used by the connection gate.
    async fn ping(&self) -> Result<()>;

    /// Open a session for one export.
    async fn open(&self) -> Result<Box<dyn ExportSession>>;
}

/// One open source connection.
#[async_trait]
pub trait ExportSession: Send {
    /// Start a CSV export of `table` (header first) and return its byte stream.
    async fn copy_out_csv(&mut self, table: &str) -> Result<BoxStream<'static, Result<Bytes>>>;

    /// Release the connection. Safe to call more than once.
    async fn close(&mut self);
}

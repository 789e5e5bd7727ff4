//! File-buffered transfer stages.
//!
//! A transfer is split into two independent stages joined by an intermediate
//! CSV file:
//! - [`Extractor`] streams a source table into the file
//! - [`Loader`] reads the file back in fixed-size batches ([`Chunker`]) and
//!   inserts each batch into the destination
//!
//! Both stages use the same quote-aware record boundaries, so the row count
//! reported by the extractor is the row count the loader inserts.

mod chunker;
mod extract;
mod load;

pub use chunker::{Batch, Chunker};
pub use extract::Extractor;
pub use load::Loader;

use serde::Serialize;
use std::time::Duration;

/// Buffer size for reading and writing intermediate files.
pub(crate) const FILE_BUFFER_SIZE: usize = 1024 * 1024;

/// Statistics from one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExportStats {
    /// Data records written (header excluded).
    pub rows: u64,

    /// Size of the intermediate file in bytes.
    pub bytes: u64,

    /// Wall time of the export.
    pub elapsed: Duration,
}

/// Statistics from one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadStats {
    /// Data records inserted.
    pub rows: u64,

    /// Insert calls issued.
    pub batches: usize,

    /// Wall time of the load.
    pub elapsed: Duration,
}

//! Core helpers shared by the source and destination adapters.
//!
//! - [`identifier`]: table name validation and dialect quoting
//! - [`record`]: quote-aware CSV record boundaries

pub mod identifier;
pub mod record;

pub use identifier::{qualify_ch, qualify_pg, validate_identifier};
pub use record::{read_record, RecordScanner};

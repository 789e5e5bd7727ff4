//! Job model shared by configuration and the orchestrator.
//!
//! - [`Job`]: one configured transfer (table or CSV file to destination)
//! - [`JobOutcome`]: what happened when a job ran

mod job;

pub use job::{Job, JobOutcome, JobSource};

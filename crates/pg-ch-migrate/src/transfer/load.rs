//! Intermediate CSV file to destination table.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::BufReader;

use super::{Chunker, LoadStats, FILE_BUFFER_SIZE};
use crate::error::{MigrateError, Result};
use crate::events::{EventSink, PipelineEvent};
use crate::target::{InsertSession, TargetStore};

/// Loads intermediate files into a [`TargetStore`], one insert per batch.
pub struct Loader {
    target: Arc<dyn TargetStore>,
    events: Arc<dyn EventSink>,
}

impl Loader {
    pub fn new(target: Arc<dyn TargetStore>, events: Arc<dyn EventSink>) -> Self {
        Self { target, events }
    }

    /// Insert every data record of `input` into `table`, `batch_size` records
    /// per call, in file order.
    ///
    /// A failed insert stops the load: earlier batches stay committed and later
    /// ones are never sent. The error carries the failing batch number, or 0
    /// when the failure happened before any batch was read.
    pub async fn load_file(&self, input: &Path, batch_size: usize, table: &str) -> Result<LoadStats> {
        self.events.emit(&PipelineEvent::LoadStarted {
            table: table.to_string(),
            path: input.to_path_buf(),
            batch_size,
        });
        let start = Instant::now();

        let file = tokio::fs::File::open(input)
            .await
            .map_err(|e| MigrateError::load(table, 0, e))?;
        let reader = BufReader::with_capacity(FILE_BUFFER_SIZE, file);

        let mut session = self
            .target
            .open()
            .await
            .map_err(|e| MigrateError::load(table, 0, e))?;
        let result = self
            .insert_batches(session.as_mut(), reader, batch_size, table, start)
            .await;
        session.close().await;
        let (rows, batches) = result?;

        let stats = LoadStats {
            rows,
            batches,
            elapsed: start.elapsed(),
        };
        self.events.emit(&PipelineEvent::LoadFinished {
            table: table.to_string(),
            rows: stats.rows,
            batches: stats.batches,
            elapsed: stats.elapsed,
        });
        Ok(stats)
    }

    async fn insert_batches(
        &self,
        session: &mut dyn InsertSession,
        reader: BufReader<tokio::fs::File>,
        batch_size: usize,
        table: &str,
        start: Instant,
    ) -> Result<(u64, usize)> {
        let mut chunker = Chunker::new(reader, batch_size)
            .await
            .map_err(|e| MigrateError::load(table, 0, e))?;
        let mut total_rows: u64 = 0;
        let mut batches = 0;
        let mut last = start;

        loop {
            let next = chunker.next_index();
            let Some(batch) = chunker
                .next_batch()
                .await
                .map_err(|e| MigrateError::load(table, next, e))?
            else {
                break;
            };

            let rows = batch.rows;
            session
                .insert_csv(table, batch.payload)
                .await
                .map_err(|e| MigrateError::load(table, batch.index, e))?;

            total_rows += rows as u64;
            batches = batch.index;
            self.events.emit(&PipelineEvent::BatchLoaded {
                table: table.to_string(),
                batch: batch.index,
                rows,
                total_rows,
                elapsed: last.elapsed(),
            });
            last = Instant::now();
        }

        Ok((total_rows, batches))
    }
}

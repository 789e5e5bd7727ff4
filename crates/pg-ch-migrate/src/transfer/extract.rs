//! Source table to intermediate CSV file.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::{ExportStats, FILE_BUFFER_SIZE};
use crate::core::record::RecordScanner;
use crate::error::{MigrateError, Result};
use crate::events::{EventSink, PipelineEvent};
use crate::source::{ExportSession, SourceStore};

/// Streams whole tables out of a [`SourceStore`].
pub struct Extractor {
    source: Arc<dyn SourceStore>,
    events: Arc<dyn EventSink>,
}

impl Extractor {
    pub fn new(source: Arc<dyn SourceStore>, events: Arc<dyn EventSink>) -> Self {
        Self { source, events }
    }

    /// Export `table` to `output`, header first.
    ///
    /// The file is written as chunks arrive, so memory use does not grow with
    /// the table. On failure a partially written file is left in place.
    pub async fn export_table(&self, table: &str, output: &Path) -> Result<ExportStats> {
        self.events.emit(&PipelineEvent::ExportStarted {
            table: table.to_string(),
            path: output.to_path_buf(),
        });
        let start = Instant::now();

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MigrateError::extraction(table, e))?;
        }

        let mut session = self
            .source
            .open()
            .await
            .map_err(|e| MigrateError::extraction(table, e))?;
        let result = copy_to_file(session.as_mut(), table, output).await;
        session.close().await;
        let rows = result.map_err(|e| into_extraction(table, e))?;

        let bytes = tokio::fs::metadata(output)
            .await
            .map_err(|e| MigrateError::extraction(table, e))?
            .len();

        let stats = ExportStats {
            rows,
            bytes,
            elapsed: start.elapsed(),
        };
        self.events.emit(&PipelineEvent::ExportFinished {
            table: table.to_string(),
            path: output.to_path_buf(),
            rows: stats.rows,
            bytes: stats.bytes,
            elapsed: stats.elapsed,
        });
        Ok(stats)
    }
}

async fn copy_to_file(session: &mut dyn ExportSession, table: &str, output: &Path) -> Result<u64> {
    let mut stream = session.copy_out_csv(table).await?;
    let file = tokio::fs::File::create(output).await?;
    let mut writer = BufWriter::with_capacity(FILE_BUFFER_SIZE, file);
    let mut scanner = RecordScanner::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        scanner.feed(&chunk);
        writer.write_all(&chunk).await?;
    }
    writer.flush().await?;

    Ok(scanner.data_rows())
}

fn into_extraction(table: &str, err: MigrateError) -> MigrateError {
    match err {
        MigrateError::Extraction { .. } => err,
        other => MigrateError::extraction(table, other),
    }
}

//! PostgreSQL source store.
//!
//! Each export opens a dedicated connection with the configured schema on its
//! `search_path` and streams `COPY ... TO STDOUT` in CSV format.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{debug, warn};

use super::tls::{SslMode, TlsBuilder};
use super::{ExportSession, SourceStore};
use crate::config::{validate_source, SourceConfig};
use crate::core::identifier::qualify_pg;
use crate::error::{MigrateError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL source built from [`SourceConfig`].
pub struct PgSource {
    config: SourceConfig,
    ssl_mode: SslMode,
}

impl PgSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        validate_source(&config)?;
        let ssl_mode = SslMode::parse(&config.ssl_mode)?;
        Ok(Self { config, ssl_mode })
    }

    fn pg_config(&self, with_search_path: bool) -> PgConfig {
        let mut pg_config = PgConfig::new();
        pg_config.host(&self.config.host);
        pg_config.port(self.config.port);
        pg_config.dbname(&self.config.database);
        pg_config.user(&self.config.user);
        pg_config.password(&self.config.password);
        pg_config.application_name("pg-ch-migrate");
        pg_config.connect_timeout(CONNECT_TIMEOUT);
        if with_search_path {
            pg_config.options(&format!("-c search_path={}", self.config.schema));
        }
        pg_config
    }

    async fn connect(&self, with_search_path: bool) -> Result<PgSession> {
        let pg_config = self.pg_config(with_search_path);

        let (client, handle) = match TlsBuilder::new(self.ssl_mode).build()? {
            None => {
                let (client, connection) = pg_config.connect(NoTls).await?;
                let handle = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection error: {}", e);
                    }
                });
                (client, handle)
            }
            Some(tls) => {
                let (client, connection) = pg_config.connect(tls).await?;
                let handle = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection error: {}", e);
                    }
                });
                (client, handle)
            }
        };

        debug!(
            "Connected to PostgreSQL {}:{}/{}",
            self.config.host, self.config.port, self.config.database
        );

        Ok(PgSession {
            client: Some(client),
            handle: Some(handle),
        })
    }
}

#[async_trait]
impl SourceStore for PgSource {
    fn name(&self) -> &str {
        "PostgreSQL"
    }

    async fn ping(&self) -> Result<()> {
        let mut session = self.connect(false).await?;
        let result = match session.client.as_ref() {
            Some(client) => client.simple_query("SELECT 1").await.map(|_| ()),
            None => Ok(()),
        };
        session.close().await;
        result.map_err(MigrateError::from)
    }

    async fn open(&self) -> Result<Box<dyn ExportSession>> {
        Ok(Box::new(self.connect(true).await?))
    }
}

struct PgSession {
    client: Option<Client>,
    handle: Option<JoinHandle<()>>,
}

/// Export statement for `table`.
pub(crate) fn copy_out_sql(table: &str) -> Result<String> {
    Ok(format!(
        "COPY {} TO STDOUT WITH (FORMAT CSV, HEADER true, DELIMITER ',', QUOTE '\"', ENCODING 'UTF8')",
        qualify_pg(table)?
    ))
}

#[async_trait]
impl ExportSession for PgSession {
    async fn copy_out_csv(&mut self, table: &str) -> Result<BoxStream<'static, Result<Bytes>>> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| MigrateError::extraction(table, "session already closed"))?;

        let sql = copy_out_sql(table)?;
        debug!("COPY query: {}", sql);

        let stream = client.copy_out(sql.as_str()).await?;
        Ok(stream.map(|chunk| chunk.map_err(MigrateError::from)).boxed())
    }

    async fn close(&mut self) {
        // Dropping the client ends the connection task.
        self.client.take();
        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut handle).await.is_err() {
                handle.abort();
            }
        }
    }
}

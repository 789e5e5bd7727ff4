//! ClickHouse destination over the HTTP interface.
//!
//! Every batch is one `POST` whose body is a CSV chunk with a header row,
//! inserted with `FORMAT CSVWithNames` so columns are matched by name.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{InsertSession, TargetStore};
use crate::config::{validate_target, TargetConfig};
use crate::core::identifier::qualify_ch;
use crate::error::{MigrateError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest server error body kept in [`MigrateError::ClickHouse`].
const MAX_ERROR_BODY: usize = 2048;

/// ClickHouse destination built from [`TargetConfig`].
pub struct ClickHouseTarget {
    config: TargetConfig,
    base_url: String,
}

impl ClickHouseTarget {
    pub fn new(config: TargetConfig) -> Result<Self> {
        validate_target(&config)?;
        let base_url = config.base_url();
        Ok(Self { config, base_url })
    }

    fn connect(&self) -> Result<ClickHouseSession> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(ClickHouseSession {
            http: Some(http),
            config: self.config.clone(),
            base_url: self.base_url.clone(),
        })
    }
}

#[async_trait]
impl TargetStore for ClickHouseTarget {
    fn name(&self) -> &str {
        "ClickHouse"
    }

    async fn ping(&self) -> Result<()> {
        let mut session = self.connect()?;
        let result = session.select_one().await;
        session.close().await;
        result
    }

    async fn open(&self) -> Result<Box<dyn InsertSession>> {
        let session = self.connect()?;
        session.select_one().await?;
        debug!("Opened ClickHouse session at {}", self.base_url);
        Ok(Box::new(session))
    }
}

struct ClickHouseSession {
    http: Option<reqwest::Client>,
    config: TargetConfig,
    base_url: String,
}

/// Insert statement for `table`.
pub(crate) fn insert_query(table: &str) -> Result<String> {
    Ok(format!(
        "INSERT INTO {} FORMAT CSVWithNames",
        qualify_ch(table)?
    ))
}

impl ClickHouseSession {
    fn client(&self) -> Result<&reqwest::Client> {
        self.http
            .as_ref()
            .ok_or_else(|| {
                MigrateError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "ClickHouse session already closed",
                ))
            })
    }

    fn request(&self, query: &str) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .client()?
            .post(&self.base_url)
            .query(&[("database", self.config.database.as_str()), ("query", query)])
            .header("X-ClickHouse-User", &self.config.username)
            .header("X-ClickHouse-Key", &self.config.password))
    }

    async fn select_one(&self) -> Result<()> {
        let response = self.request("SELECT 1")?.send().await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let mut message = match response.text().await {
        Ok(body) => body.trim().to_string(),
        Err(e) => format!("<unreadable body: {}>", e),
    };
    if message.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    Err(MigrateError::ClickHouse {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl InsertSession for ClickHouseSession {
    async fn insert_csv(&mut self, table: &str, chunk: Bytes) -> Result<()> {
        let response = self
            .request(&insert_query(table)?)?
            .header(reqwest::header::CONTENT_TYPE, "text/csv; charset=utf-8")
            .body(chunk)
            .send()
            .await?;
        check_status(response).await
    }

    async fn close(&mut self) {
        self.http.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn config() -> TargetConfig {
        TargetConfig {
            host: "ch.internal".to_string(),
            port: 8123,
            database: "analytics".to_string(),
            username: "loader".to_string(),
            password: "secret".to_string(),
            secure: false,
        }
    }

    #[test]
    fn test_insert_query_uses_csv_with_names() {
        assert_eq!(
            insert_query("orders").unwrap(),
            "INSERT INTO `orders` FORMAT CSVWithNames"
        );
        assert_eq!(
            insert_query("analytics.orders").unwrap(),
            "INSERT INTO `analytics`.`orders` FORMAT CSVWithNames"
        );
    }

    #[test]
    fn test_insert_request_shape() {
        let target = ClickHouseTarget::new(config()).unwrap();
        let session = target.connect().unwrap();
        let request = session
            .request(&insert_query("orders").unwrap())
            .unwrap()
            .body(Bytes::from_static(b"id\n1\n"))
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().host_str(), Some("ch.internal"));
        assert_eq!(request.url().port(), Some(8123));

        let params: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            params,
            vec![
                ("database".to_string(), "analytics".to_string()),
                (
                    "query".to_string(),
                    "INSERT INTO `orders` FORMAT CSVWithNames".to_string()
                ),
            ]
        );
        assert_eq!(request.headers()["X-ClickHouse-User"], "loader");
        assert_eq!(request.headers()["X-ClickHouse-Key"], "secret");
    }

    #[tokio::test]
    async fn test_closed_session_rejects_insert() {
        let target = ClickHouseTarget::new(config()).unwrap();
        let mut session = target.connect().unwrap();
        session.close().await;
        session.close().await;
        let err = session
            .insert_csv("orders", Bytes::from_static(b"id\n"))
            .await
            .unwrap_err();
        assert!(!err.is_config());
        match err {
            MigrateError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotConnected),
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Serve one canned HTTP response on a local port and return a session
    /// pointed at it. `declared_len` overrides the Content-Length header.
    async fn session_answering(
        status: &str,
        body: String,
        declared_len: Option<usize>,
    ) -> ClickHouseSession {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let status = status.to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                declared_len.unwrap_or(body.len()),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        let mut cfg = config();
        cfg.host = "127.0.0.1".to_string();
        cfg.port = port;
        ClickHouseTarget::new(cfg).unwrap().connect().unwrap()
    }

    /// Consume request headers and a Content-Length body.
    async fn read_request(socket: &mut TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);
            if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&data[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_successful_insert() {
        let mut session = session_answering("200 OK", String::new(), None).await;
        session
            .insert_csv("orders", Bytes::from_static(b"id,name\n1,a\n"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_error_maps_to_clickhouse_error() {
        let body = "Code: 60. DB::Exception: Table analytics.orders does not exist.\n".to_string();
        let mut session = session_answering("404 Not Found", body, None).await;

        let err = session
            .insert_csv("orders", Bytes::from_static(b"id\n1\n"))
            .await
            .unwrap_err();

        match err {
            MigrateError::ClickHouse { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(
                    message,
                    "Code: 60. DB::Exception: Table analytics.orders does not exist."
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_long_error_body_is_truncated_on_char_boundary() {
        // Two-byte characters starting at an odd offset put byte 2048 mid-char.
        let body = format!("x{}", "é".repeat(1500));
        let mut session = session_answering("500 Internal Server Error", body, None).await;

        let err = session
            .insert_csv("orders", Bytes::from_static(b"id\n1\n"))
            .await
            .unwrap_err();

        match err {
            MigrateError::ClickHouse { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message.len(), MAX_ERROR_BODY - 1);
                assert!(message.starts_with("xé"));
                assert!(message.ends_with('é'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreadable_error_body_is_reported() {
        // The connection closes before the declared body length arrives.
        let mut session =
            session_answering("500 Internal Server Error", "partial".to_string(), Some(100)).await;

        let err = session
            .insert_csv("orders", Bytes::from_static(b"id\n1\n"))
            .await
            .unwrap_err();

        match err {
            MigrateError::ClickHouse { status, message } => {
                assert_eq!(status, 500);
                assert!(message.starts_with("<unreadable body:"), "{}", message);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_database_rejected() {
        let mut cfg = config();
        cfg.database.clear();
        assert!(ClickHouseTarget::new(cfg).err().unwrap().is_config());
    }
}

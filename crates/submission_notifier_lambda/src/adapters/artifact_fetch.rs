use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::StatusCode;

pub type ArtifactStream = BoxStream<'static, Result<Bytes, String>>;

/// A downloaded submission whose body has not been read yet.
pub struct Artifact {
    pub url: String,
    pub content_length: Option<u64>,
    pub body: ArtifactStream,
}

impl Artifact {
    pub fn from_chunks(url: impl Into<String>, chunks: Vec<Bytes>) -> Self {
        let content_length = chunks.iter().map(|chunk| chunk.len() as u64).sum();
        Self {
            url: url.into(),
            content_length: Some(content_length),
            body: stream::iter(chunks.into_iter().map(Ok)).boxed(),
        }
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("url", &self.url)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Status(u16),
    Transport(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code) => write!(f, "Failed to download artifact, HTTP response code: {code}"),
            Self::Transport(reason) => write!(f, "Exception during artifact download: {reason}"),
        }
    }
}

impl std::error::Error for FetchError {}

#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Artifact, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpArtifactFetcher {
    client: reqwest::Client,
}

impl HttpArtifactFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, String> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| format!("failed to build artifact http client: {error}"))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, url: &str) -> Result<Artifact, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(Artifact {
            url: url.to_string(),
            content_length: response.content_length(),
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|error| format!("failed to read artifact body: {error}")))
                .boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Answers a single request with `status_line` and `body`, returns its URL.
    async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("listener has an address");

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("client should connect");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await.expect("request should read");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }
            let head = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket
                .write_all(head.as_bytes())
                .await
                .expect("head should write");
            socket.write_all(body).await.expect("body should write");
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/submissions/file.zip")
    }

    fn fetcher() -> HttpArtifactFetcher {
        HttpArtifactFetcher::new(Some(Duration::from_secs(5))).expect("client should build")
    }

    #[tokio::test]
    async fn ok_response_streams_the_body() {
        let url = serve_once("200 OK", b"PK\x03\x04zipdata").await;

        let artifact = fetcher().fetch(&url).await.expect("200 should succeed");

        assert_eq!(artifact.url, url);
        assert_eq!(artifact.content_length, Some(11));
        let chunks: Vec<Bytes> = artifact.body.try_collect().await.expect("body should read");
        assert_eq!(chunks.concat(), b"PK\x03\x04zipdata".to_vec());
    }

    #[tokio::test]
    async fn not_found_is_a_status_failure() {
        let url = serve_once("404 Not Found", b"missing").await;

        let error = fetcher().fetch(&url).await.expect_err("404 should fail");

        assert_eq!(error, FetchError::Status(404));
    }

    #[tokio::test]
    async fn server_error_is_a_status_failure() {
        let url = serve_once("500 Internal Server Error", b"").await;

        let error = fetcher().fetch(&url).await.expect_err("500 should fail");

        assert_eq!(error, FetchError::Status(500));
    }

    #[tokio::test]
    async fn only_200_counts_as_success() {
        let url = serve_once("201 Created", b"zip").await;

        let error = fetcher().fetch(&url).await.expect_err("201 should fail");

        assert_eq!(error, FetchError::Status(201));
    }

    #[test]
    fn fetch_errors_describe_the_failure() {
        assert_eq!(
            FetchError::Status(404).to_string(),
            "Failed to download artifact, HTTP response code: 404"
        );
        assert!(FetchError::Transport("dns error".to_string())
            .to_string()
            .ends_with("dns error"));
    }

    #[tokio::test]
    async fn artifact_from_chunks_streams_them_in_order() {
        let artifact = Artifact::from_chunks(
            "https://good.example/file.zip",
            vec![Bytes::from_static(b"PK"), Bytes::from_static(b"\x03\x04")],
        );
        assert_eq!(artifact.content_length, Some(4));

        let chunks: Vec<Bytes> = artifact.body.try_collect().await.expect("stream should read");
        assert_eq!(chunks.concat(), b"PK\x03\x04".to_vec());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_failure() {
        let fetcher =
            HttpArtifactFetcher::new(Some(Duration::from_secs(2))).expect("client should build");
        let error = fetcher
            .fetch("http://127.0.0.1:9/file.zip")
            .await
            .expect_err("closed port should fail");
        assert!(matches!(error, FetchError::Transport(_)));
    }
}

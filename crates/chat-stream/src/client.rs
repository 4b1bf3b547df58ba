//! Transports that open the streaming channel
//!
//! [`StreamTransport`] is the seam between the session controller and the
//! network. [`HttpStreamTransport`] posts the request with reqwest and
//! exposes the response body as a byte stream; tests substitute scripted
//! transports.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use crate::config::StreamClientConfig;
use crate::constants::wire;
use crate::error::StreamError;
use crate::protocol::StreamRequest;

/// Body chunks as they arrive from the channel
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, StreamError>> + Send>>;

/// Opens a unidirectional response channel for a request
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Send the request and return the response body once the channel is open
    async fn open(&self, request: &StreamRequest) -> Result<ByteStream, StreamError>;
}

/// Streaming transport over HTTP
pub struct HttpStreamTransport {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    config: StreamClientConfig,
}

impl HttpStreamTransport {
    pub fn new(config: StreamClientConfig) -> Result<Self, StreamError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &StreamClientConfig {
        &self.config
    }
}

#[async_trait]
impl StreamTransport for HttpStreamTransport {
    async fn open(&self, request: &StreamRequest) -> Result<ByteStream, StreamError> {
        let url = self.config.stream_url();
        log::debug!("Opening stream to {}", url);

        let mut builder = self
            .http_client
            .post(&url)
            .header(reqwest::header::ACCEPT, wire::EVENT_STREAM_MIME)
            .json(request);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StreamError::ChannelOpen(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response.bytes_stream().map(|result| {
            result
                .map(|bytes| bytes.to_vec())
                .map_err(|e| StreamError::Transport(e.to_string()))
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use uuid::Uuid;

    /// Serve one HTTP response on an ephemeral port; returns the base URL and
    /// a receiver for the raw request head.
    async fn serve_once(response: String) -> (String, tokio::sync::oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        (format!("http://{}", addr), rx)
    }

    fn request() -> StreamRequest {
        StreamRequest::new("hello", Uuid::new_v4(), "chat-node-1")
    }

    #[tokio::test]
    async fn test_streams_body_and_sends_bearer_token() {
        let body = "event: message\ndata: {\"token\":\"Hi\"}\n\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let (base_url, head) = serve_once(response).await;

        let transport = HttpStreamTransport::new(StreamClientConfig {
            base_url,
            stream_path: "/stream".into(),
            api_token: Some("secret".into()),
            ..Default::default()
        })
        .unwrap();

        let mut stream = transport.open(&request()).await.unwrap();
        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            received.extend(chunk.unwrap());
        }
        assert_eq!(String::from_utf8(received).unwrap(), body);

        let head = head.await.unwrap().to_lowercase();
        assert!(head.starts_with("post /stream"));
        assert!(head.contains("authorization: bearer secret"));
        assert!(head.contains("accept: text/event-stream"));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let response = "HTTP/1.1 401 Unauthorized\r\nContent-Length: 6\r\n\
                        Connection: close\r\n\r\ndenied"
            .to_string();
        let (base_url, _head) = serve_once(response).await;
        let transport = HttpStreamTransport::new(StreamClientConfig {
            base_url,
            ..Default::default()
        })
        .unwrap();

        match transport.open(&request()).await {
            Err(StreamError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "denied");
            }
            Err(other) => panic!("Expected status error, got {other}"),
            Ok(_) => panic!("Expected status error"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Bind then drop to get a port nobody is listening on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = HttpStreamTransport::new(StreamClientConfig {
            base_url: format!("http://127.0.0.1:{}", port),
            ..Default::default()
        })
        .unwrap();

        let err = transport.open(&request()).await.err().unwrap();
        assert!(matches!(err, StreamError::ChannelOpen(_)));
        assert!(err.is_open_failure());
    }
}

//! Streaming chat client
//!
//! This library opens a streaming chat request and turns the response into
//! callbacks:
//! - **Frame decoding**: reassembles event-stream frames from arbitrary chunks
//! - **Protocol**: typed request body and stream events
//! - **Sessions**: a lifecycle with exactly one terminal callback, cancellation
//!   and an optional idle timeout
//! - **Transport**: HTTP via reqwest, swappable behind [`StreamTransport`]
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_stream::{HttpStreamTransport, StreamClientConfig, StreamRequest, StreamSession};
//! use std::sync::Arc;
//!
//! let config = StreamClientConfig::default();
//! let transport = Arc::new(HttpStreamTransport::new(config.clone())?);
//! let session = StreamSession::new(transport, handler)
//!     .with_idle_timeout(config.idle_timeout());
//!
//! let request = StreamRequest::new("Summarize", project_id, "chat-node-1")
//!     .with_context(vec!["context-node-1".into()]);
//! let outcome = session.start(request).await;
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod session;

// Re-exports for convenience
pub use client::{ByteStream, HttpStreamTransport, StreamTransport};
pub use config::StreamClientConfig;
pub use error::StreamError;
pub use frame::{Frame, FrameDecoder};
pub use protocol::{StreamEvent, StreamRequest};
pub use session::{
    CompletedResponse, SessionHandle, SessionOutcome, SessionState, StreamHandler, StreamSession,
};

//! Defaults for the streaming client
//!
//! Single source of truth for endpoint paths, timeouts and wire values.

/// Default values for client configuration
pub mod defaults {
    /// Base URL of the chat service
    pub const BASE_URL: &str = "http://127.0.0.1:8000";
    /// Path of the streaming endpoint, appended to the base URL
    pub const STREAM_PATH: &str = "/api/chat/stream";
}

/// Timeout configuration (in seconds)
pub mod timeouts {
    /// Maximum time to establish the connection
    pub const CONNECT_SECS: u64 = 10;
    /// Maximum silence between chunks before a session counts as stalled
    pub const IDLE_SECS: u64 = 120;
}

/// Wire protocol values
pub mod wire {
    /// Event type used when a frame has no `event:` line
    pub const DEFAULT_EVENT: &str = "message";
    pub const STREAM_START: &str = "stream_start";
    pub const MESSAGE: &str = "message";
    pub const DATA: &str = "data";
    pub const CONVERSATION_ID: &str = "conversation_id";
    pub const STREAM_END: &str = "stream_end";
    pub const ERROR: &str = "error";
    /// Accept header value for the streaming request
    pub const EVENT_STREAM_MIME: &str = "text/event-stream";
}

//! Stream session controller
//!
//! A [`StreamSession`] drives one streaming response from open to a
//! terminal state. Frames are decoded as they arrive, text tokens are
//! accumulated, and exactly one terminal path runs:
//!
//! ```text
//! Idle -> Opening -> Active -> Completed   (stream_end, on_complete awaited)
//!                           -> Failed      (error frame, transport error, stall)
//!                           -> Closed      (channel ended without stream_end)
//!            any non-terminal -> Cancelled (no callbacks)
//! ```
//!
//! Once a terminal state is claimed, later frames and late cancellation
//! requests are ignored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::client::{ByteStream, StreamTransport};
use crate::error::StreamError;
use crate::frame::{Frame, FrameDecoder};
use crate::protocol::{StreamEvent, StreamRequest};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    Active,
    Completed,
    Failed,
    Cancelled,
    /// Channel ended without a terminal frame
    Closed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed
                | SessionState::Failed
                | SessionState::Cancelled
                | SessionState::Closed
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Opening | SessionState::Active)
    }
}

/// Final result handed to [`StreamHandler::on_complete`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedResponse {
    /// Concatenation of every token in arrival order
    pub text: String,
    pub conversation_id: Option<Uuid>,
    pub message_id: Option<String>,
}

/// How [`StreamSession::start`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(CompletedResponse),
    /// Failure message; the error itself went to [`StreamHandler::on_error`]
    Failed(String),
    Cancelled,
    Closed,
    /// `start` was called on a session that had already been started
    AlreadyStarted,
}

/// Callbacks for a streaming session.
///
/// Incremental callbacks are synchronous. `on_complete` is awaited before
/// the session leaves the active state, so follow-up work such as
/// persisting the conversation finishes before the caller is told the
/// stream is done.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    fn on_stream_start(&self) {}

    /// A token arrived; `accumulated` already includes it
    fn on_token(&self, _token: &str, _accumulated: &str) {}

    fn on_conversation_id(&self, _conversation_id: Uuid) {}

    async fn on_complete(&self, response: &CompletedResponse);

    fn on_error(&self, error: &StreamError);

    /// The channel ended without `stream_end` or `error`
    fn on_close(&self, _accumulated: &str) {}
}

// ============================================================================
// Shared state
// ============================================================================

struct Lifecycle {
    state: SessionState,
    /// Set by whichever terminal path runs first
    latched: bool,
}

struct Shared {
    lifecycle: Mutex<Lifecycle>,
    text: Mutex<String>,
    conversation_id: Mutex<Option<Uuid>>,
    cancel_token: CancellationToken,
}

impl Shared {
    fn state(&self) -> SessionState {
        self.lifecycle.lock().state
    }

    /// Claim the terminal latch and move straight to `to`
    fn terminate(&self, to: SessionState) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.latched {
            return false;
        }
        lifecycle.latched = true;
        lifecycle.state = to;
        true
    }

    /// Claim the terminal latch but stay in the current state until
    /// completion work finishes
    fn claim(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.latched {
            return false;
        }
        lifecycle.latched = true;
        true
    }

    fn set_state(&self, state: SessionState) {
        self.lifecycle.lock().state = state;
    }

    fn cancel(&self) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.latched || !lifecycle.state.is_active() {
                return false;
            }
            lifecycle.latched = true;
            lifecycle.state = SessionState::Cancelled;
        }
        self.cancel_token.cancel();
        true
    }
}

/// Cloneable handle for observing or cancelling a session from another task
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    /// Abort the session. Only valid while opening or active; a no-op
    /// once a terminal state has been reached. No callbacks fire.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.cancel();
        if cancelled {
            log::info!("Stream session cancelled");
        }
        cancelled
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn accumulated_text(&self) -> String {
        self.shared.text.lock().clone()
    }
}

// ============================================================================
// Session
// ============================================================================

/// One streaming request/response
pub struct StreamSession {
    transport: Arc<dyn StreamTransport>,
    handler: Arc<dyn StreamHandler>,
    idle_timeout: Option<Duration>,
    shared: Arc<Shared>,
}

enum Step {
    Continue,
    Finished(SessionOutcome),
}

impl StreamSession {
    pub fn new(transport: Arc<dyn StreamTransport>, handler: Arc<dyn StreamHandler>) -> Self {
        Self {
            transport,
            handler,
            idle_timeout: None,
            shared: Arc::new(Shared {
                lifecycle: Mutex::new(Lifecycle {
                    state: SessionState::Idle,
                    latched: false,
                }),
                text: Mutex::new(String::new()),
                conversation_id: Mutex::new(None),
                cancel_token: CancellationToken::new(),
            }),
        }
    }

    /// Fail the session when no data arrives for `timeout`
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn cancel(&self) -> bool {
        self.handle().cancel()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn accumulated_text(&self) -> String {
        self.shared.text.lock().clone()
    }

    pub fn conversation_id(&self) -> Option<Uuid> {
        *self.shared.conversation_id.lock()
    }

    /// Open the channel and process frames until a terminal state.
    ///
    /// A session runs once; later calls return [`SessionOutcome::AlreadyStarted`].
    pub async fn start(&self, request: StreamRequest) -> SessionOutcome {
        {
            let mut lifecycle = self.shared.lifecycle.lock();
            if lifecycle.state != SessionState::Idle {
                log::warn!("Stream session already started ({:?})", lifecycle.state);
                return SessionOutcome::AlreadyStarted;
            }
            lifecycle.state = SessionState::Opening;
        }
        *self.shared.conversation_id.lock() = request.conversation_id;

        log::info!(
            "Opening stream for chat node '{}' with {} context node(s)",
            request.chat_node_id,
            request.context_node_ids.len()
        );

        let opened = tokio::select! {
            biased;
            _ = self.shared.cancel_token.cancelled() => return SessionOutcome::Cancelled,
            result = self.transport.open(&request) => result,
        };

        let stream = match opened {
            Ok(stream) => stream,
            Err(e) => return self.fail(e),
        };

        {
            let mut lifecycle = self.shared.lifecycle.lock();
            if lifecycle.latched {
                return SessionOutcome::Cancelled;
            }
            lifecycle.state = SessionState::Active;
        }
        log::debug!("Stream channel open");

        self.read(stream).await
    }

    async fn read(&self, mut stream: ByteStream) -> SessionOutcome {
        let mut decoder = FrameDecoder::new();
        let mut text = String::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shared.cancel_token.cancelled() => return SessionOutcome::Cancelled,
                next = next_chunk(&mut stream, self.idle_timeout) => next,
            };

            let chunk = match next {
                Chunk::Data(bytes) => bytes,
                Chunk::Error(e) => return self.fail(e),
                Chunk::Stalled(after) => {
                    log::warn!("No stream data for {:?}", after);
                    return self.fail(StreamError::Stalled(after));
                }
                Chunk::End => {
                    if decoder.pending().trim().is_empty() {
                        log::debug!("Stream channel closed");
                    } else {
                        log::warn!("Stream closed with an unterminated frame");
                    }
                    if self.shared.terminate(SessionState::Closed) {
                        log::info!("Stream closed without completion ({} chars)", text.len());
                        self.handler.on_close(&text);
                        return SessionOutcome::Closed;
                    }
                    return SessionOutcome::Cancelled;
                }
            };

            for frame in decoder.feed_bytes(&chunk) {
                if let Step::Finished(outcome) = self.dispatch(&frame, &mut text).await {
                    return outcome;
                }
            }
        }
    }

    async fn dispatch(&self, frame: &Frame, text: &mut String) -> Step {
        if self.shared.cancel_token.is_cancelled() {
            return Step::Finished(SessionOutcome::Cancelled);
        }

        let Some(event) = StreamEvent::from_frame(frame) else {
            return Step::Continue;
        };

        match event {
            StreamEvent::StreamStart => {
                log::debug!("Stream started");
                self.handler.on_stream_start();
            }
            StreamEvent::Token(token) => {
                text.push_str(&token);
                self.shared.text.lock().push_str(&token);
                self.handler.on_token(&token, text);
            }
            StreamEvent::ConversationId(id) => {
                log::debug!("Conversation id {}", id);
                *self.shared.conversation_id.lock() = Some(id);
                self.handler.on_conversation_id(id);
            }
            StreamEvent::StreamEnd { message_id, status } => {
                if !self.shared.claim() {
                    return Step::Finished(SessionOutcome::Cancelled);
                }
                let response = CompletedResponse {
                    text: text.clone(),
                    conversation_id: *self.shared.conversation_id.lock(),
                    message_id,
                };
                log::info!(
                    "Stream completed ({} chars, status {:?})",
                    response.text.len(),
                    status
                );
                self.handler.on_complete(&response).await;
                self.shared.set_state(SessionState::Completed);
                return Step::Finished(SessionOutcome::Completed(response));
            }
            StreamEvent::Error(message) => {
                return Step::Finished(self.fail(StreamError::Server(message)));
            }
            StreamEvent::Unrecognized(event_type) => {
                log::debug!("Ignoring '{}' event", event_type);
            }
        }
        Step::Continue
    }

    fn fail(&self, error: StreamError) -> SessionOutcome {
        if !self.shared.terminate(SessionState::Failed) {
            return SessionOutcome::Cancelled;
        }
        log::error!("Stream session failed: {}", error);
        self.handler.on_error(&error);
        SessionOutcome::Failed(error.to_string())
    }
}

enum Chunk {
    Data(Vec<u8>),
    Error(StreamError),
    Stalled(Duration),
    End,
}

async fn next_chunk(stream: &mut ByteStream, idle_timeout: Option<Duration>) -> Chunk {
    let next = match idle_timeout {
        Some(after) => match tokio::time::timeout(after, stream.next()).await {
            Ok(next) => next,
            Err(_) => return Chunk::Stalled(after),
        },
        None => stream.next().await,
    };
    match next {
        Some(Ok(bytes)) => Chunk::Data(bytes),
        Some(Err(e)) => Chunk::Error(e),
        None => Chunk::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    use futures_util::stream;

    // ─── Test doubles ───

    enum Script {
        /// Chunks, then end of channel
        Chunks(Vec<Result<Vec<u8>, StreamError>>),
        /// Chunks, then hang
        ChunksThenHang(Vec<Result<Vec<u8>, StreamError>>),
        /// Fail to open
        Refuse(String),
        /// Never finish opening
        HangOnOpen,
    }

    struct ScriptedTransport {
        script: Mutex<Option<Script>>,
        requests: Mutex<Vec<StreamRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(Some(script)),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl StreamTransport for ScriptedTransport {
        async fn open(&self, request: &StreamRequest) -> Result<ByteStream, StreamError> {
            self.requests.lock().push(request.clone());
            let script = self.script.lock().take();
            match script {
                Some(Script::Chunks(chunks)) => Ok(Box::pin(stream::iter(chunks))),
                Some(Script::ChunksThenHang(chunks)) => {
                    Ok(Box::pin(stream::iter(chunks).chain(stream::pending())))
                }
                Some(Script::Refuse(reason)) => Err(StreamError::ChannelOpen(reason)),
                Some(Script::HangOnOpen) => std::future::pending().await,
                None => Err(StreamError::ChannelOpen("script exhausted".into())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<String>>,
        completed: Mutex<Vec<CompletedResponse>>,
        /// Observed from inside on_complete
        active_during_completion: Mutex<Option<bool>>,
        handle: OnceLock<SessionHandle>,
        completion_delay: Option<Duration>,
    }

    impl RecordingHandler {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn terminal_calls(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| {
                    c.starts_with("complete") || c.starts_with("error") || c.starts_with("close")
                })
                .count()
        }
    }

    #[async_trait]
    impl StreamHandler for RecordingHandler {
        fn on_stream_start(&self) {
            self.calls.lock().push("start".into());
        }

        fn on_token(&self, token: &str, accumulated: &str) {
            self.calls.lock().push(format!("token:{}:{}", token, accumulated));
        }

        fn on_conversation_id(&self, conversation_id: Uuid) {
            self.calls.lock().push(format!("conversation:{}", conversation_id));
        }

        async fn on_complete(&self, response: &CompletedResponse) {
            if let Some(delay) = self.completion_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(handle) = self.handle.get() {
                *self.active_during_completion.lock() = Some(handle.is_active());
            }
            self.calls.lock().push(format!("complete:{}", response.text));
            self.completed.lock().push(response.clone());
        }

        fn on_error(&self, error: &StreamError) {
            self.calls.lock().push(format!("error:{}", error));
        }

        fn on_close(&self, accumulated: &str) {
            self.calls.lock().push(format!("close:{}", accumulated));
        }
    }

    fn frame(event: &str, data: &str) -> Result<Vec<u8>, StreamError> {
        Ok(format!("event: {}\ndata: {}\n\n", event, data).into_bytes())
    }

    fn token(text: &str) -> Result<Vec<u8>, StreamError> {
        frame("message", &format!(r#"{{"token":"{}"}}"#, text))
    }

    fn request() -> StreamRequest {
        StreamRequest::new("hi", Uuid::new_v4(), "chat-node-1")
    }

    fn session(script: Script, handler: &Arc<RecordingHandler>) -> StreamSession {
        StreamSession::new(ScriptedTransport::new(script), handler.clone())
    }

    // ─── Tests ───

    #[tokio::test]
    async fn test_streaming_scenario() {
        let conversation = Uuid::new_v4();
        let handler = Arc::new(RecordingHandler::default());
        let session = session(
            Script::Chunks(vec![
                frame("stream_start", "{}"),
                frame("conversation_id", &format!(r#"{{"conversation_id":"{}"}}"#, conversation)),
                token("Hel"),
                token("lo"),
                token("!"),
                frame("stream_end", r#"{"message_id":"m1","status":"complete"}"#),
            ]),
            &handler,
        );

        let outcome = session.start(request()).await;

        let expected = CompletedResponse {
            text: "Hello!".into(),
            conversation_id: Some(conversation),
            message_id: Some("m1".into()),
        };
        assert_eq!(outcome, SessionOutcome::Completed(expected.clone()));
        assert_eq!(session.state(), SessionState::Completed);
        assert!(!session.is_active());
        assert_eq!(session.accumulated_text(), "Hello!");
        assert_eq!(session.conversation_id(), Some(conversation));
        assert_eq!(*handler.completed.lock(), vec![expected]);
        assert_eq!(
            handler.calls(),
            vec![
                "start".to_string(),
                format!("conversation:{}", conversation),
                "token:Hel:Hel".into(),
                "token:lo:Hello".into(),
                "token:!:Hello!".into(),
                "complete:Hello!".into(),
            ]
        );
    }

    #[tokio::test]
    async fn test_frames_split_across_chunks() {
        let handler = Arc::new(RecordingHandler::default());
        let body = "event: message\ndata: {\"token\":\"ab\"}\n\nevent: stream_end\ndata: {}\n\n";
        let chunks = body
            .as_bytes()
            .chunks(5)
            .map(|c| Ok(c.to_vec()))
            .collect();
        let session = session(Script::Chunks(chunks), &handler);

        let outcome = session.start(request()).await;
        assert!(matches!(outcome, SessionOutcome::Completed(ref r) if r.text == "ab"));
    }

    #[tokio::test]
    async fn test_late_error_after_stream_end_is_ignored() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(
            Script::Chunks(vec![
                token("ok"),
                frame("stream_end", "{}"),
                frame("error", r#"{"error":"late"}"#),
                token("ignored"),
            ]),
            &handler,
        );

        session.start(request()).await;

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(handler.terminal_calls(), 1);
        assert_eq!(handler.calls().last().map(String::as_str), Some("complete:ok"));
        assert_eq!(session.accumulated_text(), "ok");
    }

    #[tokio::test]
    async fn test_error_frame_fails_session() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(
            Script::Chunks(vec![
                token("par"),
                frame("error", r#"{"error":"quota exceeded"}"#),
                frame("stream_end", "{}"),
            ]),
            &handler,
        );

        let outcome = session.start(request()).await;

        assert!(matches!(outcome, SessionOutcome::Failed(ref m) if m.contains("quota exceeded")));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(handler.terminal_calls(), 1);
        assert!(handler.calls().iter().any(|c| c.contains("quota exceeded")));
        assert!(handler.completed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_fails_session() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(
            Script::Chunks(vec![token("a"), Err(StreamError::Transport("reset".into()))]),
            &handler,
        );

        let outcome = session.start(request()).await;
        assert!(matches!(outcome, SessionOutcome::Failed(_)));
        assert_eq!(handler.terminal_calls(), 1);
    }

    #[tokio::test]
    async fn test_open_failure_reports_once() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(Script::Refuse("connection refused".into()), &handler);

        let outcome = session.start(request()).await;

        assert!(matches!(outcome, SessionOutcome::Failed(_)));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(handler.calls().len(), 1);
        assert!(handler.calls()[0].starts_with("error:"));
    }

    #[tokio::test]
    async fn test_silent_close() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(Script::Chunks(vec![token("part")]), &handler);

        let outcome = session.start(request()).await;

        assert_eq!(outcome, SessionOutcome::Closed);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(handler.calls(), vec!["token:part:part", "close:part"]);
    }

    #[tokio::test]
    async fn test_stall_fails_session() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(Script::ChunksThenHang(vec![token("a")]), &handler)
            .with_idle_timeout(Some(Duration::from_millis(50)));

        let outcome = session.start(request()).await;

        assert!(matches!(outcome, SessionOutcome::Failed(_)));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(handler.calls().iter().any(|c| c.starts_with("error:")));
    }

    #[tokio::test]
    async fn test_cancel_while_active_fires_no_callbacks() {
        let handler = Arc::new(RecordingHandler::default());
        let session = Arc::new(session(Script::ChunksThenHang(vec![token("a")]), &handler));
        let handle = session.handle();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.start(request()).await })
        };

        // Wait until the first token has been processed
        while handle.accumulated_text().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(handle.cancel());

        assert_eq!(task.await.unwrap(), SessionOutcome::Cancelled);
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(handler.terminal_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_while_opening() {
        let handler = Arc::new(RecordingHandler::default());
        let session = Arc::new(session(Script::HangOnOpen, &handler));
        let handle = session.handle();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.start(request()).await })
        };

        while handle.state() != SessionState::Opening {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(handle.cancel());

        assert_eq!(task.await.unwrap(), SessionOutcome::Cancelled);
        assert!(handler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_cancels_settle_once() {
        let handler = Arc::new(RecordingHandler::default());
        let session = Arc::new(session(Script::ChunksThenHang(vec![token("a")]), &handler));
        let handle = session.handle();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.start(request()).await })
        };
        while handle.accumulated_text().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let cancels: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.cancel() })
            })
            .collect();
        let mut accepted = 0;
        for cancel in cancels {
            if cancel.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(task.await.unwrap(), SessionOutcome::Cancelled);
        assert_eq!(handle.state(), SessionState::Cancelled);
        assert_eq!(handler.terminal_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_terminal_is_noop() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(Script::Chunks(vec![frame("stream_end", "{}")]), &handler);

        session.start(request()).await;
        assert!(!session.cancel());
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(handler.terminal_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start_is_noop() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(Script::Chunks(vec![frame("stream_end", "{}")]), &handler);

        assert!(!session.cancel());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(matches!(session.start(request()).await, SessionOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_completion_is_awaited_before_inactive() {
        let handler = Arc::new(RecordingHandler {
            completion_delay: Some(Duration::from_millis(30)),
            ..Default::default()
        });
        let session = session(
            Script::Chunks(vec![token("x"), frame("stream_end", "{}")]),
            &handler,
        );
        let _ = handler.handle.set(session.handle());

        session.start(request()).await;

        assert_eq!(*handler.active_during_completion.lock(), Some(true));
        assert_eq!(handler.completed.lock().len(), 1);
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn test_cancel_during_completion_is_ignored() {
        let handler = Arc::new(RecordingHandler {
            completion_delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let session = Arc::new(session(
            Script::Chunks(vec![frame("stream_end", "{}")]),
            &handler,
        ));
        let handle = session.handle();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.start(request()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.cancel());

        assert!(matches!(task.await.unwrap(), SessionOutcome::Completed(_)));
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_start_twice() {
        let handler = Arc::new(RecordingHandler::default());
        let session = session(Script::Chunks(vec![frame("stream_end", "{}")]), &handler);

        session.start(request()).await;
        assert_eq!(session.start(request()).await, SessionOutcome::AlreadyStarted);
        assert_eq!(handler.terminal_calls(), 1);
    }

    #[tokio::test]
    async fn test_request_reaches_transport() {
        let handler = Arc::new(RecordingHandler::default());
        let transport = ScriptedTransport::new(Script::Chunks(vec![frame("stream_end", "{}")]));
        let session = StreamSession::new(transport.clone(), handler);
        let conversation = Uuid::new_v4();

        let request = request()
            .with_context(vec!["context-node-1".into()])
            .with_conversation(Some(conversation));
        session.start(request.clone()).await;

        assert_eq!(*transport.requests.lock(), vec![request]);
        // A continued conversation is reported even without a conversation_id frame
        assert_eq!(session.conversation_id(), Some(conversation));
    }
}

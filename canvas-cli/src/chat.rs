//! Terminal chat: stream a reply into stdout and record the conversation
//! on the chat card.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use canvas_graph::{save_snapshot, Attributes, GraphStore, NodeKind};
use chat_stream::{
    CompletedResponse, SessionOutcome, StreamError, StreamHandler, StreamRequest, StreamSession,
    StreamTransport,
};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::attributes;
use crate::error::{CliError, Result};

/// Shared store; locked by the completion callback while it records the
/// conversation
pub type SharedStore = Arc<tokio::sync::Mutex<GraphStore>>;

/// Writes tokens as they arrive and persists the conversation on completion
pub struct TerminalHandler<W: Write + Send> {
    out: Mutex<W>,
    store: SharedStore,
    snapshot_path: PathBuf,
    chat_node_id: String,
}

impl<W: Write + Send> TerminalHandler<W> {
    pub fn new(
        out: W,
        store: SharedStore,
        snapshot_path: PathBuf,
        chat_node_id: impl Into<String>,
    ) -> Self {
        Self {
            out: Mutex::new(out),
            store,
            snapshot_path,
            chat_node_id: chat_node_id.into(),
        }
    }

    fn write(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }

    /// Record the conversation on the chat card and save the snapshot
    async fn persist(&self, response: &CompletedResponse) -> Result<()> {
        let mut update = Attributes::new();
        if let Some(conversation_id) = response.conversation_id {
            update.insert(
                attributes::CONVERSATION_ID.to_string(),
                Value::String(conversation_id.to_string()),
            );
        }
        if let Some(message_id) = &response.message_id {
            update.insert(
                attributes::LAST_MESSAGE_ID.to_string(),
                Value::String(message_id.clone()),
            );
        }

        let snapshot = {
            let mut store = self.store.lock().await;
            if !update.is_empty() {
                store.update_node(&self.chat_node_id, update)?;
            }
            store.snapshot()
        };

        let path = self.snapshot_path.clone();
        tokio::task::spawn_blocking(move || save_snapshot(&path, &snapshot))
            .await
            .map_err(|e| CliError::ChatFailed(format!("snapshot task failed: {e}")))??;
        log::info!("Saved conversation to {:?}", self.snapshot_path);
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> StreamHandler for TerminalHandler<W> {
    fn on_token(&self, token: &str, _accumulated: &str) {
        self.write(token);
    }

    async fn on_complete(&self, response: &CompletedResponse) {
        self.write("\n");
        if let Err(e) = self.persist(response).await {
            log::error!("Failed to record conversation: {}", e);
        }
    }

    fn on_error(&self, error: &StreamError) {
        self.write("\n");
        log::debug!("Chat stream error reported: {}", error);
    }

    fn on_close(&self, _accumulated: &str) {
        self.write("\n");
    }
}

/// Build the request for a chat card from the current graph
pub fn build_request(
    store: &GraphStore,
    chat_node_id: &str,
    message: &str,
    project_id: Uuid,
) -> Result<StreamRequest> {
    let chat = store
        .node(chat_node_id)
        .ok_or_else(|| CliError::NotFound(chat_node_id.to_string()))?;
    if chat.kind != NodeKind::Chat {
        return Err(CliError::InvalidArgument(format!(
            "{} is a {} card, not a chat card",
            chat_node_id, chat.kind
        )));
    }
    if message.trim().is_empty() {
        return Err(CliError::InvalidArgument("message is empty".into()));
    }

    let conversation_id = chat
        .attribute(attributes::CONVERSATION_ID)
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok());

    Ok(StreamRequest::new(message, project_id, chat_node_id)
        .with_context(store.connected_context_ids(chat_node_id))
        .with_conversation(conversation_id))
}

/// Run one chat exchange. Ctrl-C cancels the stream.
pub async fn run_chat<W: Write + Send + 'static>(
    transport: Arc<dyn StreamTransport>,
    handler: Arc<TerminalHandler<W>>,
    request: StreamRequest,
    idle_timeout: Option<std::time::Duration>,
) -> Result<SessionOutcome> {
    let session = StreamSession::new(transport, handler).with_idle_timeout(idle_timeout);

    let handle = session.handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let outcome = session.start(request).await;
    interrupt.abort();

    match &outcome {
        SessionOutcome::Completed(_) => {}
        SessionOutcome::Cancelled => eprintln!("[cancelled]"),
        SessionOutcome::Closed => {
            log::warn!("Stream closed before the reply finished; nothing was recorded")
        }
        SessionOutcome::Failed(message) => return Err(CliError::ChatFailed(message.clone())),
        SessionOutcome::AlreadyStarted => {}
    }
    Ok(outcome)
}

//! Application-wide constants

/// Data storage paths
pub mod paths {
    /// Directory under the platform config dir holding app files
    pub const APP_DIR: &str = "canvas-chat";
    /// Configuration file name inside the app directory
    pub const CONFIG_FILE: &str = "config.json";
    /// Default snapshot file name inside the app directory
    pub const SNAPSHOT_FILE: &str = "canvas.json";
}

/// Environment variables
pub mod env {
    /// Overrides the configured API token
    pub const API_TOKEN: &str = "CANVAS_API_TOKEN";
}

/// Attribute keys the chat command writes onto chat nodes
pub mod attributes {
    pub const CONVERSATION_ID: &str = "conversationId";
    pub const LAST_MESSAGE_ID: &str = "lastMessageId";
}

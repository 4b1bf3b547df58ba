//! Error type for the command-line front end

use canvas_graph::{ConnectionRejected, GraphError};
use chat_stream::StreamError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Link rejected: {0}")]
    Rejected(#[from] ConnectionRejected),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("No node or link with id '{0}'")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Chat failed: {0}")]
    ChatFailed(String),

    #[error("Could not determine a configuration directory; pass --config-dir")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, CliError>;

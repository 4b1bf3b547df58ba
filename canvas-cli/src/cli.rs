use std::path::PathBuf;

use canvas_graph::NodeKind;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "canvas-chat", about = "Chat canvas graph and streaming client", version)]
pub struct Cli {
    /// Snapshot file to operate on (defaults to the configured one)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Directory holding config.json
    #[arg(long = "config-dir", global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List cards, links and each chat's context
    Show,
    /// Add a card
    Add {
        kind: KindArg,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f64,
        /// Initial attribute as key=value (JSON values are parsed)
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, Value)>,
    },
    /// Link a content card into a chat card
    Connect { source: String, target: String },
    /// Delete a card (with its links) or a single link
    Delete { id: String },
    /// Copy cards and paste them at a position
    Duplicate {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },
    /// Send a message from a chat card and stream the reply
    Chat { chat_node_id: String, message: String },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindArg {
    Chat,
    Context,
    TextBlock,
    ExternalDocument,
}

impl From<KindArg> for NodeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Chat => NodeKind::Chat,
            KindArg::Context => NodeKind::Context,
            KindArg::TextBlock => NodeKind::TextBlock,
            KindArg::ExternalDocument => NodeKind::ExternalDocument,
        }
    }
}

/// `key=value`; the value is JSON when it parses, a plain string otherwise
fn parse_attribute(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty attribute key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

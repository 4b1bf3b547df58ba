mod chat;
mod cli;
mod commands;
mod config;
mod constants;
mod error;

use std::sync::Arc;

use canvas_graph::{NodeKind, Position};
use chat_stream::HttpStreamTransport;
use clap::Parser;
use uuid::Uuid;

use chat::{build_request, run_chat, SharedStore, TerminalHandler};
use cli::{Cli, Command};
use commands::Canvas;
use config::AppConfig;
use error::{CliError, Result};

#[tokio::main]
async fn main() {
    // Initialize logging - RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(err) = run(Cli::parse()).await {
        log::error!("{}", err);
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app_dir = match cli.config_dir {
        Some(dir) => dir,
        None => AppConfig::default_dir().ok_or(CliError::NoConfigDir)?,
    };

    let mut config = match AppConfig::load(&app_dir).await {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load config, using defaults: {}", e);
            AppConfig::default()
        }
    };
    config.apply_env();

    let snapshot_path = config.resolve_snapshot_path(cli.snapshot, &app_dir);
    let mut canvas = Canvas::open(snapshot_path)?;
    log::debug!("Using snapshot {:?}", canvas.path());

    match cli.command {
        Command::Show => {
            print!("{}", commands::show(canvas.store()));
        }
        Command::Add { kind, x, y, attributes } => {
            let node = commands::add(
                canvas.store_mut(),
                NodeKind::from(kind),
                Position::new(x, y),
                attributes,
            );
            canvas.save()?;
            println!("{}", node.id);
        }
        Command::Connect { source, target } => {
            let edge = commands::connect(canvas.store_mut(), &source, &target)?;
            canvas.save()?;
            println!("{}", edge.id);
        }
        Command::Delete { id } => {
            let message = commands::delete(canvas.store_mut(), &id)?;
            canvas.save()?;
            println!("{message}");
        }
        Command::Duplicate { ids, x, y } => {
            let pasted = commands::duplicate(canvas.store_mut(), &ids, Position::new(x, y))?;
            canvas.save()?;
            for id in pasted {
                println!("{id}");
            }
        }
        Command::Chat { chat_node_id, message } => {
            let project_id = config.ensure_project_id(&app_dir).await;
            chat(canvas, &config, project_id, &chat_node_id, &message).await?;
        }
    }
    Ok(())
}

async fn chat(
    canvas: Canvas,
    config: &AppConfig,
    project_id: Uuid,
    chat_node_id: &str,
    message: &str,
) -> Result<()> {
    let request = build_request(canvas.store(), chat_node_id, message, project_id)?;
    let (store, snapshot_path) = canvas.into_parts();
    let store: SharedStore = Arc::new(tokio::sync::Mutex::new(store));

    let transport = Arc::new(HttpStreamTransport::new(config.server.clone())?);
    let handler = Arc::new(TerminalHandler::new(
        std::io::stdout(),
        store,
        snapshot_path,
        chat_node_id,
    ));

    run_chat(transport, handler, request, config.server.idle_timeout()).await?;
    Ok(())
}

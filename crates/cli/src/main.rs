//! `rusty-automation-tool` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server.
//! - `validate` — validate a workflow JSON file.
//! - `run`      — execute a payload JSON file end-to-end and print the result.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "rusty-automation-tool",
    about = "High-performance workflow automation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: std::path::PathBuf,
    },
    /// Execute a payload JSON file end-to-end and print the result.
    Run {
        /// Path to the payload JSON file ({"nodes": [...], "edges": [...]}).
        path: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            info!("Starting API server on {bind}");
            let config = config::Config::new().expect("invalid config");
            let registry = Arc::new(nodes::NodeRegistry::with_builtins());
            let store: Arc<dyn db::WorkflowStore> = Arc::new(db::InMemoryWorkflowStore::new());
            let state = api::AppState { store, config, registry };
            api::serve(&bind, state).await.unwrap();
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let workflow: engine::Workflow = serde_json::from_str(&content)
                .unwrap_or_else(|e| panic!("invalid JSON: {e}"));

            let config = config::Config::new().expect("invalid config");
            let registry = Arc::new(nodes::NodeRegistry::with_builtins());

            match engine::Engine::new(workflow.payload, config, registry) {
                Ok(_) => println!("workflow is valid"),
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Run { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let config = config::Config::new().expect("invalid config");
            let registry = Arc::new(nodes::NodeRegistry::with_builtins());

            let engine = match engine::Engine::from_payload_bytes(content.as_bytes(), config, registry) {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("failed to build engine: {e}");
                    std::process::exit(1);
                }
            };

            let (outcome, _snapshot) = engine.execute().await;
            println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
            if !outcome.errors.is_empty() {
                std::process::exit(1);
            }
        }
    }
}

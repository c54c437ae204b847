//! Tusk entry point: wire the store, registry and model backend together,
//! then hand off to the REPL.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use tusk_agent::{ChatBackend, ChatSession, GeminiBackend, OpenRouterBackend};
use tusk_core::JsonStore;

use tusk_cli::commands;
use tusk_cli::context::{ChatFeature, CommandContext};
use tusk_cli::repl;

fn main() -> Result<()> {
    // .env files are optional; absence is not an error
    dotenvy::dotenv().ok();
    let home = dirs::home_dir().context("cannot determine home directory")?;
    dotenvy::from_path(home.join(".tusk.env")).ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let store_path = home.join(".tusk.json");
    let store = JsonStore::open(&store_path)
        .with_context(|| format!("cannot open store at {}", store_path.display()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    let backend: Option<Arc<dyn ChatBackend>> = match OpenRouterBackend::from_env() {
        Some(backend) => Some(Arc::new(backend)),
        None => GeminiBackend::from_env().map(|b| Arc::new(b) as Arc<dyn ChatBackend>),
    };

    let chat = match backend {
        Some(backend) => Some(ChatFeature {
            backend,
            session: ChatSession::new(),
        }),
        None => {
            eprintln!(
                "Warning: OPENROUTER_API_KEY or GEMINI_API_KEY not set (LLM features disabled)"
            );
            None
        }
    };

    let mut ctx = CommandContext {
        store: Arc::new(store),
        registry: Arc::new(commands::build_registry()),
        runtime: runtime.handle().clone(),
        chat,
        debug: false,
    };

    repl::run(&mut ctx)
}

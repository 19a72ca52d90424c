//! # AI Research Server
//!
//! Command-line entry point.
//!
//! ## Quick Start
//! ```bash
//! # Serve the streaming research API
//! cargo run -- serve --bind 127.0.0.1:3000
//!
//! # One research run, NDJSON events printed to stdout
//! cargo run -- ask --mode academic "distributed consensus"
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ai_research_server::arxiv::ArxivClient;
use ai_research_server::tools::WebSearchTool;
use ai_research_server::{
    router, AcademicStrategyFactory, AppState, Config, InMemoryResearchStore, OllamaSynthesizer,
    Orchestrator, ResearchQuery, StrategyTable, StreamEvent, Synthesizer, WebStrategyFactory,
};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "ai-research-server",
    version,
    about = "Streaming research pipeline over web and academic sources",
    long_about = r#"
Runs research queries against the web (DuckDuckGo) or academic papers (arXiv),
synthesizes the findings with a local Ollama model, and streams progress as
newline-delimited JSON.

PREREQUISITES:
  1. Install Ollama: https://ollama.ai
  2. Pull a model: ollama pull llama3.2
  3. Start Ollama: ollama serve
"#
)]
struct Args {
    /// The Ollama model to use (overrides OLLAMA_MODEL)
    #[arg(short = 'm', long = "model", global = true, env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Listen address (overrides RESEARCH_BIND_ADDR)
        #[arg(short = 'b', long = "bind")]
        bind: Option<String>,
    },

    /// Run one research query and print the event stream
    Ask {
        /// The topic to research
        #[arg(value_name = "QUERY")]
        query: String,

        /// Research mode: web or academic
        #[arg(long = "mode", default_value = "web")]
        mode: String,
    },
}

// =============================================================================
// MAIN
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    init_logging(&config.log_level, args.verbose)?;

    if let Some(model) = args.model {
        info!(model = %model, "Using model from command line");
        config.model = model;
    }
    if let Command::Serve { bind: Some(bind) } = &args.command {
        config.bind_addr = bind.clone();
    }
    config.validate()?;

    info!(model = %config.model, host = %config.ollama_host, "Configuration loaded");

    let orchestrator = Arc::new(build_orchestrator(&config)?);

    match args.command {
        Command::Serve { .. } => serve(&config, orchestrator).await,
        Command::Ask { query, mode } => ask(orchestrator, query, &mode).await,
    }
}

/// Wire the production strategies into an orchestrator.
fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let synthesizer: Arc<dyn Synthesizer> = Arc::new(OllamaSynthesizer::new(config));
    let web_search = WebSearchTool::new(config.max_search_results)
        .context("Failed to create web search client")?;
    let arxiv = ArxivClient::new().context("Failed to create arXiv client")?;

    let table = StrategyTable::new(
        Arc::new(WebStrategyFactory::new(
            Arc::new(web_search),
            Arc::clone(&synthesizer),
        )),
        Arc::new(AcademicStrategyFactory::new(
            Arc::new(arxiv),
            synthesizer,
            config.max_papers,
        )),
    );
    Ok(Orchestrator::new(table))
}

async fn serve(config: &Config, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let state = AppState::new(orchestrator, Arc::new(InMemoryResearchStore::new()));
    let addr = config.socket_addr()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Research server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")
}

async fn ask(orchestrator: Arc<Orchestrator>, query: String, mode: &str) -> Result<()> {
    let mut events = orchestrator.spawn(ResearchQuery::new(query, Some(mode)));
    let mut failed = None;

    while let Some(event) = events.recv().await {
        print!("{}", event.to_ndjson());
        if let StreamEvent::Error(message) = event {
            failed = Some(message);
        }
    }

    match failed {
        Some(message) => {
            error!(error = %message, "Research failed");
            anyhow::bail!("research failed: {message}")
        }
        None => Ok(()),
    }
}

// =============================================================================
// LOGGING
// =============================================================================
/// Install the global tracing subscriber.
///
/// `--verbose` forces debug; otherwise the configured filter (RUST_LOG) is used.
fn init_logging(filter: &str, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_args_parsing() {
        let args = Args::parse_from(["test", "ask", "What is Rust?"]);
        match args.command {
            Command::Ask { query, mode } => {
                assert_eq!(query, "What is Rust?");
                assert_eq!(mode, "web");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(!args.verbose);
    }

    #[test]
    fn test_serve_args_with_flags() {
        let args = Args::parse_from([
            "test",
            "--verbose",
            "--model",
            "llama3.2",
            "serve",
            "--bind",
            "0.0.0.0:8080",
        ]);

        assert!(args.verbose);
        assert_eq!(args.model, Some("llama3.2".to_string()));
        match args.command {
            Command::Serve { bind } => assert_eq!(bind.as_deref(), Some("0.0.0.0:8080")),
            other => panic!("unexpected command {other:?}"),
        }
    }
}

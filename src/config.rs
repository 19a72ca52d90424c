//! # Configuration Module
//!
//! Loads server and research settings from environment variables, with a
//! `.env` file picked up for local development.

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Settings for the research server.
#[derive(Debug, Clone)]
pub struct Config {
    /// The Ollama model used for synthesis (e.g., "llama3.2")
    pub model: String,

    /// Ollama server URL
    pub ollama_host: String,

    /// Sampling temperature for synthesis (0.0 = deterministic)
    pub temperature: f32,

    /// Web results handed to the web strategy
    pub max_search_results: usize,

    /// Papers fetched by the academic strategy
    pub max_papers: usize,

    /// Address the HTTP server listens on
    pub bind_addr: String,

    /// Log filter used when RUST_LOG is not set on the command line
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.7,
            max_search_results: 5,
            max_papers: 5,
            bind_addr: "127.0.0.1:3000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from the environment, over the defaults.
    ///
    /// A variable that is set but fails to parse is an error naming it.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("OLLAMA_MODEL") {
            config.model = val;
        }

        if let Ok(val) = env::var("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Ok(val) = env::var("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.7)")?;
        }

        if let Ok(val) = env::var("MAX_SEARCH_RESULTS") {
            config.max_search_results = val
                .parse()
                .context("MAX_SEARCH_RESULTS must be a valid positive integer")?;
        }

        if let Ok(val) = env::var("MAX_PAPERS") {
            config.max_papers = val
                .parse()
                .context("MAX_PAPERS must be a valid positive integer")?;
        }

        if let Ok(val) = env::var("RESEARCH_BIND_ADDR") {
            config.bind_addr = val;
        }

        if let Ok(val) = env::var("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Fail fast on values that would only break later, mid-request.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_search_results == 0 {
            anyhow::bail!("MAX_SEARCH_RESULTS must be at least 1");
        }

        if !(1..=50).contains(&self.max_papers) {
            anyhow::bail!("MAX_PAPERS must be between 1 and 50, got: {}", self.max_papers);
        }

        if self.model.is_empty() {
            anyhow::bail!("OLLAMA_MODEL cannot be empty");
        }

        self.socket_addr()?;

        Ok(())
    }

    /// The bind address as a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("RESEARCH_BIND_ADDR is not a socket address: {}", self.bind_addr))
    }
}

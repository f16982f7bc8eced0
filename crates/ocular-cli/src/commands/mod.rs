//! CLI command definitions and handlers.

use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ocular_core::ClientConfig;

pub mod analyze;
pub mod serve;

/// Ocular - AI-assisted eye image screening
#[derive(Parser)]
#[command(name = "ocular")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options for the remote analysis service.
#[derive(Args)]
pub struct ClientArgs {
    /// Gemini API key
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used for analysis
    #[arg(long, global = true, env = "OCULAR_MODEL")]
    pub model: Option<String>,

    /// Base URL of the generateContent API
    #[arg(long, global = true, env = "OCULAR_API_BASE")]
    pub api_base: Option<String>,

    /// Request timeout in seconds (transport default when unset)
    #[arg(long, global = true, env = "OCULAR_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl ClientArgs {
    /// Environment config with command-line overrides applied.
    pub fn to_config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(base) = &self.api_base {
            config = config.with_base_url(base);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web UI
    Serve(serve::ServeArgs),

    /// Analyze a single image and print the report
    Analyze(analyze::AnalyzeArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.client.to_config();

        match self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Analyze(args) => analyze::execute(args, config).await,
        }
    }
}

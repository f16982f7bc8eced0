//! Web server command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use ocular_core::{ClientConfig, GeminiClient, Session};
use ocular_web::ServerOptions;
use tracing::warn;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value = "3040")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Maximum upload size in MiB
    #[arg(long, default_value = "20")]
    pub max_upload_mb: usize,

    /// Also write logs to a daily rolling file
    #[arg(long)]
    pub log: bool,

    /// Directory for log files (with --log)
    #[arg(long, default_value = ".ocular/logs")]
    pub log_dir: PathBuf,
}

pub async fn execute(args: ServeArgs, config: ClientConfig) -> Result<()> {
    if !config.has_api_key() {
        warn!("GEMINI_API_KEY is not set; every analysis will fail until it is configured");
    }

    let model = config.model.clone();
    let session = Session::new(Arc::new(GeminiClient::new(config)));

    println!();
    println!("  {} {}", "Ocular".cyan().bold(), "Web Server".bold());
    println!();
    println!("  {}  http://{}:{}", "Dashboard".green(), args.host, args.port);
    println!("  {}        http://{}:{}/api", "API".green(), args.host, args.port);
    println!("  {}  ws://{}:{}/ws", "WebSocket".green(), args.host, args.port);
    println!("  {}      {}", "Model".green(), model);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    ocular_web::run_server(
        session,
        ServerOptions {
            host: args.host,
            port: args.port,
            max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
        },
    )
    .await?;

    Ok(())
}

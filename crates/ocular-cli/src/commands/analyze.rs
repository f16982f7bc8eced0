//! One-shot image analysis command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use ocular_core::analysis::InvariantViolation;
use ocular_core::session::StatusTicker;
use ocular_core::{AnalysisResult, Analyzer, ClientConfig, GeminiClient, ImageMime, ImagePayload};

use crate::output;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Image file to analyze (png, jpeg, webp, heic, heif)
    pub file: PathBuf,

    /// Declared MIME type (inferred from the extension when omitted)
    #[arg(long)]
    pub mime: Option<String>,

    /// Print the raw result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Declared MIME type, or the one implied by the file extension.
fn resolve_mime(file: &Path, declared: Option<&str>) -> Result<String> {
    match declared {
        Some(mime) => Ok(mime.to_string()),
        None => ImageMime::from_path(file)
            .map(|m| m.as_str().to_string())
            .with_context(|| format!("Cannot infer image type of {}; pass --mime", file.display())),
    }
}

/// Pretty JSON for the result plus one warning line per violation.
fn render_json(
    result: &AnalysisResult,
    violations: &[InvariantViolation],
) -> Result<(String, Vec<String>)> {
    let json = serde_json::to_string_pretty(result)?;
    let warnings = violations
        .iter()
        .map(|v| format!("warning: {}", v))
        .collect();
    Ok((json, warnings))
}

pub async fn execute(args: AnalyzeArgs, config: ClientConfig) -> Result<()> {
    let mime = resolve_mime(&args.file, args.mime.as_deref())?;

    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let image = ImagePayload::new(data, &mime)?;

    let client = GeminiClient::new(config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let ticker = {
        let spinner = spinner.clone();
        tokio::spawn(StatusTicker::default().run(move |message| spinner.set_message(message)))
    };
    let outcome = client.analyze(&image).await;
    ticker.abort();
    spinner.finish_and_clear();

    let result = outcome.context("Analysis failed")?;
    let violations = result.violations();

    if args.json {
        let (json, warnings) = render_json(&result, &violations)?;
        println!("{}", json);
        for warning in warnings {
            eprintln!("{}", warning);
        }
    } else {
        output::print_report(&result, &violations);
    }

    Ok(())
}

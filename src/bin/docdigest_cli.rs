//! Offline entrypoint: process local documents through the same pipeline as `POST /upload`
//! and print the batch result as JSON.
use anyhow::{Context, Result, bail};
use clap::Parser;
use docdigest::{
    config, logging,
    processing::{IncomingFile, ProcessingService},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "docdigest-cli",
    about = "Extract text and summaries from local PDF and image files"
)]
struct Cli {
    /// Documents to process, in output order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Print compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing();
    config::init_config();

    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let Some(original_name) = path.file_name().map(|name| name.to_string_lossy().into_owned())
        else {
            bail!("{} does not name a file", path.display());
        };
        files.push(IncomingFile {
            original_name,
            content_type: None,
            bytes,
        });
    }

    let service = ProcessingService::from_config(config::get_config())
        .context("failed to initialize processing pipeline")?;
    let response = service.process_uploads(files).await?;

    let output = if cli.compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };
    println!("{output}");
    Ok(())
}

//! Command-line uploader for `/api/import`.
//!
//! Sends a JSON batch as multipart form data and prints the per-record outcome.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use catalog_sync::import::{ImportReport, ItemStatus};
use clap::Parser;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

#[derive(Parser)]
#[command(
    name = "catalog-import",
    about = "Upload a JSON array of records into a catalog collection"
)]
struct Cli {
    /// Base URL of the catalog server.
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,
    /// Target collection slug.
    #[arg(long, default_value = "videos")]
    collection: String,
    /// Service key, sent as `Authorization: Bearer <key>`.
    #[arg(long, conflicts_with = "user_key")]
    api_key: Option<String>,
    /// User API key, sent as `Authorization: users API-Key <key>`.
    #[arg(long)]
    user_key: Option<String>,
    /// JSON file to upload.
    file: PathBuf,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let bytes = tokio::fs::read(&cli.file)
        .await
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let form = Form::new()
        .part("file", Part::bytes(bytes).file_name(file_name(&cli.file)))
        .text("collection", cli.collection.clone());

    let endpoint = format!("{}/api/import", cli.url.trim_end_matches('/'));
    let mut request = reqwest::Client::new().post(&endpoint).multipart(form);
    if let Some(key) = &cli.api_key {
        request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"));
    } else if let Some(key) = &cli.user_key {
        request = request.header(
            reqwest::header::AUTHORIZATION,
            format!("users API-Key {key}"),
        );
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?;
    let status = response.status();
    let body = response.text().await.context("failed to read response")?;

    if !status.is_success() {
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody {
                error,
                details: Some(details),
            }) => bail!("{status}: {error} ({details})"),
            Ok(ErrorBody { error, .. }) => bail!("{status}: {error}"),
            Err(_) => bail!("{status}: {body}"),
        }
    }

    let report: ImportReport =
        serde_json::from_str(&body).context("unexpected import response")?;
    println!("{}", report.message);
    for result in &report.results {
        match result.status {
            ItemStatus::Success => {
                let id = result
                    .id
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                println!("  [{}] created {id}", result.index);
            }
            ItemStatus::Error => println!(
                "  [{}] error: {}",
                result.index,
                result.error_message.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.json".to_string())
}

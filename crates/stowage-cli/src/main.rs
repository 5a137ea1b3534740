//! Stowage CLI: upload, download and delete objects through the storage facade.
//!
//! Backend selection and credentials come from the environment (STORAGE_SERVICE_TYPE
//! and friends, optionally from a `.env` file).

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use std::path::PathBuf;
use stowage_cli::{init_tracing, resolve_content_type, DownloadOutput, UploadOutput};
use stowage_core::StorageConfig;
use stowage_storage::StorageFacade;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "stowage", about = "Backend-agnostic object storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file below a logical path (container[/folder]*)
    Upload {
        /// Logical destination path
        path: String,
        /// File to upload
        file: PathBuf,
        /// MIME type; detected from the file content when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Download a stored object
    Download {
        /// Stored path returned by upload
        stored_path: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete a stored object
    Delete {
        /// Stored path returned by upload
        stored_path: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = StorageConfig::from_env().context(
        "Failed to load storage configuration. Set STORAGE_SERVICE_TYPE and the backend's parameters",
    )?;
    let facade = StorageFacade::from_config(&config)
        .await
        .context("Failed to initialize storage backend")?;

    match cli.command {
        Commands::Upload {
            path,
            file,
            content_type,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Read {}", file.display()))?;
            let content_type = resolve_content_type(content_type.as_deref(), &data);
            let size_bytes = data.len() as u64;

            let stored_path = facade.upload_bytes(&path, data, &content_type).await?;
            print_json(&UploadOutput {
                stored_path,
                content_type,
                size_bytes,
            })?;
        }
        Commands::Download {
            stored_path,
            output,
        } => {
            let object = facade.download(&stored_path).await?;
            let (mut body, content_type) = object.into_parts();

            let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin> = match &output {
                Some(path) => Box::new(
                    tokio::fs::File::create(path)
                        .await
                        .with_context(|| format!("Create {}", path.display()))?,
                ),
                None => Box::new(tokio::io::stdout()),
            };

            let mut size_bytes = 0u64;
            while let Some(chunk) = body.next().await {
                let chunk = chunk.context("Read object body")?;
                size_bytes += chunk.len() as u64;
                writer.write_all(&chunk).await.context("Write object body")?;
            }
            writer.flush().await.context("Flush output")?;

            if let Some(path) = output {
                print_json(&DownloadOutput {
                    stored_path,
                    content_type,
                    size_bytes,
                    output: path.display().to_string(),
                })?;
            }
        }
        Commands::Delete { stored_path } => {
            facade.delete(&stored_path).await?;
            print_json(&serde_json::json!({ "success": true, "deleted": stored_path }))?;
        }
    }

    Ok(())
}

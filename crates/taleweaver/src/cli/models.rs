//! The `taleweaver models` command for managing the local captioning model.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use taleweaver_core::caption::CaptionModelFiles;
use taleweaver_core::Config;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the BLIP captioning model (vision encoder + text decoder + tokenizer)
    Download {
        /// HuggingFace repository holding the ONNX export
        #[arg(long, default_value = DEFAULT_REPO)]
        repo: String,

        /// Re-download files that are already present
        #[arg(long)]
        force: bool,
    },

    /// List installed model files
    List,

    /// Show model directory path
    Path,
}

/// ONNX export of Salesforce/blip-image-captioning-base.
const DEFAULT_REPO: &str = "Xenova/blip-image-captioning-base";

const VISION_REMOTE: &str = "onnx/vision_model.onnx";
const DECODER_REMOTE: &str = "onnx/text_decoder_model.onnx";
const TOKENIZER_REMOTE: &str = "tokenizer.json";

/// One file to fetch from the hub.
struct ModelFile {
    label: &'static str,
    remote_path: &'static str,
    dest: PathBuf,
}

fn model_files(config: &Config) -> [ModelFile; 3] {
    let files = CaptionModelFiles::from_config(config);
    [
        ModelFile {
            label: "Vision encoder",
            remote_path: VISION_REMOTE,
            dest: files.vision,
        },
        ModelFile {
            label: "Text decoder",
            remote_path: DECODER_REMOTE,
            dest: files.decoder,
        },
        ModelFile {
            label: "Tokenizer",
            remote_path: TOKENIZER_REMOTE,
            dest: files.tokenizer,
        },
    ]
}

fn hub_url(repo: &str, remote_path: &str) -> String {
    format!("https://huggingface.co/{repo}/resolve/main/{remote_path}")
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Download { repo, force } => {
            let client = reqwest::Client::new();

            for file in model_files(config) {
                if file.dest.exists() && !force {
                    tracing::info!("{} already exists at {:?}", file.label, file.dest);
                    continue;
                }
                if let Some(parent) = file.dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let url = hub_url(&repo, file.remote_path);
                tracing::info!("Downloading {}...", file.label);
                tracing::info!("  Source: {}", url);
                tracing::info!("  Destination: {:?}", file.dest);

                download_file(&client, &url, &file.dest).await?;

                let file_size = std::fs::metadata(&file.dest)?.len();
                tracing::info!(
                    "  {} complete ({:.1} MB)",
                    file.label,
                    file_size as f64 / (1024.0 * 1024.0)
                );
            }

            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            let model_dir = config.caption_model_dir();
            if !model_dir.exists() {
                println!("No models installed.");
                println!("Run `taleweaver models download` to download the captioning model.");
                return Ok(());
            }

            println!("Captioning model: {}", config.caption.model);
            println!("  Directory: {}\n", model_dir.display());
            for file in model_files(config) {
                let status = if file.dest.exists() {
                    "ready"
                } else {
                    "not installed"
                };
                let name = file
                    .dest
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                println!("    - {:30} {:14} {}", name, status, file.label);
            }

            if !CaptionModelFiles::from_config(config).all_present() {
                println!("\n  Run `taleweaver models download` to fetch the missing files.");
            }

            if config.caption.backend != "local" {
                println!(
                    "\n  Note: caption.backend = \"{}\"; local files are not used.",
                    config.caption.backend
                );
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.caption_model_dir().display());
        }
    }

    Ok(())
}

/// Download a file from a URL to a local path, streaming to disk.
///
/// Bytes land in `<dest>.part` first and are renamed on success, so an
/// interrupted download never leaves a truncated model behind.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let partial = partial_path(dest);
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                anyhow::bail!("Download of {url} interrupted: {e}");
            }
        };
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, dest).await?;

    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

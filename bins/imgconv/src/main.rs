//! imgconv: image conversion server and batch conversion client.

use anyhow::Context;
use clap::{Parser, Subcommand};
use imgconv_cli::output::{Status, format_count, format_duration, format_outcome};
use imgconv_cli::progress::{BatchProgress, spinner};
use imgconv_cli::prompt::{confirm, is_interactive};
use imgconv_client::{BatchOrchestrator, ClientConfig, ConvertClient, DirectorySink, SelectedFile, TempFileStore};
use imgconv_server::ServerConfig;
use imgconv_telemetry::{LogFormat, TelemetryConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "imgconv")]
#[command(about = "Convert images between png, jpg, jpeg, webp and tiff")]
#[command(version)]
struct Cli {
    /// Log level filter; RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conversion server
    Serve {
        /// Configuration file (defaults to imgconv.toml lookup)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Address to listen on
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,
    },
    /// Convert files through a running server, one at a time
    Convert {
        /// Files to convert
        files: Vec<PathBuf>,
        /// Target format
        #[arg(short, long, default_value = "png")]
        to: String,
        /// Hold converted files and download them on request
        #[arg(short, long)]
        manual: bool,
        /// Directory for downloaded files
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Server base URL (overrides IMGCONV_SERVER_URL)
        #[arg(long)]
        server: Option<String>,
        /// Request timeout in seconds (overrides IMGCONV_TIMEOUT_SECS)
        #[arg(long)]
        timeout: Option<u64>,
        /// In manual mode, download every file without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Check that a server is reachable
    Health {
        /// Server base URL (overrides IMGCONV_SERVER_URL)
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind, json_logs } => {
            let mut config = ServerConfig::load(config.as_deref()).context("Failed to load server configuration")?;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if json_logs {
                config.log_format = LogFormat::Json;
            }

            let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
            imgconv_telemetry::init_with_config(
                TelemetryConfig::default()
                    .with_log_level(level)
                    .with_format(config.log_format),
            )?;

            imgconv_server::serve(config).await.context("Server stopped with an error")?;
        }

        Commands::Convert {
            files,
            to,
            manual,
            out,
            server,
            timeout,
            yes,
        } => {
            init_quiet(cli.log_level)?;
            let client = ConvertClient::with_config(client_config(server, timeout)?)?;
            convert(client, files, &to, manual, out, yes).await?;
        }

        Commands::Health { server } => {
            init_quiet(cli.log_level)?;
            let client = ConvertClient::with_config(client_config(server, None)?)?;
            let pb = spinner(&format!("Checking {}", client.config().base_url));
            let health = client.health().await;
            pb.finish_and_clear();

            match health {
                Ok(health) => Status::success(&format!(
                    "{} is {} (version {})",
                    client.config().base_url,
                    health.status,
                    health.version
                )),
                Err(e) => anyhow::bail!("{}", e.user_message()),
            }
        }
    }

    Ok(())
}

/// Client commands log only warnings unless asked, so the progress bar stays readable
fn init_quiet(level: Option<String>) -> anyhow::Result<()> {
    imgconv_telemetry::init_with_config(
        TelemetryConfig::default().with_log_level(level.unwrap_or_else(|| "warn".to_string())),
    )
}

fn client_config(server: Option<String>, timeout: Option<u64>) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("Invalid client environment")?;
    if let Some(url) = server {
        config = config.with_base_url(url);
    }
    if let Some(secs) = timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

async fn convert(
    client: ConvertClient,
    files: Vec<PathBuf>,
    format: &str,
    manual: bool,
    out: PathBuf,
    yes: bool,
) -> anyhow::Result<()> {
    let total = files.len();
    let progress = BatchProgress::new(total as u64);
    let observer = progress.clone();

    let orchestrator = BatchOrchestrator::new(client, TempFileStore::new(), DirectorySink::new(&out))
        .with_observer(move |event| observer.observe(event));

    orchestrator.select_files(files.into_iter().map(SelectedFile::from_path).collect())?;
    orchestrator.set_target_format(format);
    orchestrator.set_manual_download(manual);

    let start = Instant::now();
    let outcome = match orchestrator.convert_selected().await {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.finish("nothing to do");
            anyhow::bail!("{}", e.user_message());
        }
    };

    if outcome.is_success() {
        progress.finish(&format_duration(start.elapsed()));
    }
    Status::info(&format_outcome(&outcome, total));

    if manual {
        download_pending(&orchestrator, &out, yes)?;
    }

    if let Some(message) = orchestrator.state().last_error {
        anyhow::bail!("{message}");
    }
    Ok(())
}

fn download_pending(
    orchestrator: &BatchOrchestrator<ConvertClient, TempFileStore, DirectorySink>,
    out: &std::path::Path,
    yes: bool,
) -> anyhow::Result<()> {
    let pending = orchestrator.pending();
    if pending.is_empty() {
        return Ok(());
    }

    Status::header("Ready to download");
    for (position, artifact) in pending.iter().enumerate() {
        Status::pending(position, artifact);
    }

    if !yes && !is_interactive() {
        Status::warning("Not attached to a terminal; pass --yes to save held files");
    } else {
        for artifact in &pending {
            if !yes && !confirm(&format!("Save {}?", artifact.download_name), true)? {
                continue;
            }
            match orchestrator.download_pending(artifact.id) {
                Ok(_) => Status::success(&format!("Saved {}", out.join(&artifact.download_name).display())),
                Err(e) => Status::error(&e.user_message()),
            }
        }
    }

    let discarded = orchestrator.release_all();
    if discarded > 0 {
        Status::info(&format!("Discarded {}", format_count(discarded, "file", "files")));
    }
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::path::PathBuf;

use bucketzip::{ArchiveTransferClient, TransferConfig};

#[derive(Parser)]
#[command(name = "bucketzip", version, about = "Zip a folder into S3 and unzip it back")]
struct Cli {
    /// AWS region (defaults to AWS_DEFAULT_REGION, AWS_REGION, then us-east-1)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Custom S3 endpoint URL (e.g. LocalStack or MinIO)
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, global = true)]
    path_style: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Zip a local folder and upload it as <prefix>/<folder>.zip
    Upload {
        /// Target bucket (created if missing)
        #[arg(short, long)]
        bucket: String,

        /// Folder to upload
        path: PathBuf,

        /// Key prefix inside the bucket
        #[arg(short, long, default_value = "")]
        prefix: String,
    },
    /// Download a zip object and extract it into a local folder
    Download {
        /// Source bucket
        #[arg(short, long)]
        bucket: String,

        /// Key of the zip object
        key: String,

        /// Destination folder (created if missing)
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    initialize_logging(cli.verbose)?;

    // CLI flags override the BUCKETZIP_* environment
    let mut config = TransferConfig::from_env();
    config.region = cli.region;
    if cli.endpoint_url.is_some() {
        config.endpoint_url = cli.endpoint_url;
    }
    config.force_path_style |= cli.path_style;

    match cli.command {
        Commands::Upload {
            bucket,
            path,
            prefix,
        } => {
            let client = ArchiveTransferClient::new(bucket, &config).await?;
            let key = client
                .upload_folder(&path, &prefix)
                .await
                .with_context(|| format!("Failed to upload {}", path.display()))?;
            info!("Uploaded {} to s3://{}/{}", path.display(), client.bucket(), key);
            println!("s3://{}/{}", client.bucket(), key);
        }
        Commands::Download { bucket, key, path } => {
            let client = ArchiveTransferClient::new(bucket, &config).await?;
            client
                .download_folder(&key, &path)
                .await
                .with_context(|| format!("Failed to download s3://{}/{}", client.bucket(), key))?;
            info!("Extracted s3://{}/{} into {}", client.bucket(), key, path.display());
        }
    }

    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

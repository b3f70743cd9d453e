use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_upload::{
    BatchUploader, Config, InlineSource, SourceReference, UploadClient, UploadMetrics,
    UploadOutcome, UploadTarget,
};

#[derive(Debug, Parser)]
#[command(name = "media-upload", version, about = "Upload images to the store backend")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "CONFIG_PATH", default_value = "config.yaml")]
    config: String,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a profile picture
    Avatar {
        #[arg(long)]
        store_id: String,
        #[arg(long)]
        user_id: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Upload a single image
    Image {
        #[arg(long)]
        store_id: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Upload several images in order, stopping at the first failure
    Batch {
        #[arg(long)]
        store_id: String,
        #[arg(required = true)]
        sources: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Local path or URI, or a JSON source object
    source: String,
    #[arg(long)]
    filename: Option<String>,
    #[arg(long)]
    mime: Option<String>,
}

impl SourceArgs {
    fn into_reference(self) -> anyhow::Result<SourceReference> {
        let reference = parse_source(&self.source)?;
        if self.filename.is_none() && self.mime.is_none() {
            return Ok(reference);
        }

        let mut inline = match reference {
            SourceReference::Uri(uri) => InlineSource {
                uri: Some(uri),
                ..Default::default()
            },
            SourceReference::Inline(inline) => inline,
        };
        inline.filename = self.filename.or(inline.filename);
        inline.mime = self.mime.or(inline.mime);
        Ok(SourceReference::Inline(inline))
    }
}

fn parse_source(raw: &str) -> anyhow::Result<SourceReference> {
    if raw.trim_start().starts_with('{') {
        Ok(serde_json::from_str(raw)?)
    } else {
        Ok(SourceReference::uri(raw))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries the JSON result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_upload=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let config = Config::from_file(&cli.config)?;

    let metrics = Arc::new(UploadMetrics::new()?);
    let client = UploadClient::from_config(&config)?.with_metrics(metrics.clone());

    let succeeded = match cli.command {
        Command::Avatar {
            store_id,
            user_id,
            source,
        } => {
            let target = UploadTarget::avatar(store_id, user_id);
            run_single(&client, source, target).await?
        }
        Command::Image { store_id, source } => {
            run_single(&client, source, UploadTarget::image(store_id)).await?
        }
        Command::Batch { store_id, sources } => {
            let sources = sources
                .iter()
                .map(|s| parse_source(s))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let batch = BatchUploader::new(client.clone(), UploadTarget::image(store_id))
                .with_metrics(metrics.clone());

            match batch.upload_all(&sources).await {
                Ok(uploaded) => {
                    println!("{}", serde_json::to_string_pretty(&uploaded)?);
                    true
                }
                Err(e) => {
                    eprintln!("{}", e);
                    false
                }
            }
        }
    };

    if cli.metrics {
        eprintln!("{}", metrics.gather_text()?);
    }

    if !succeeded {
        std::process::exit(1);
    }

    Ok(())
}

async fn run_single(
    client: &UploadClient,
    source: SourceArgs,
    target: UploadTarget,
) -> anyhow::Result<bool> {
    let reference = source.into_reference()?;
    let outcome: UploadOutcome = client.upload_to(&reference, &target).await.into();

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(outcome.success())
}

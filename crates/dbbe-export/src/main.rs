//! dbbe-export binary.
//!
//! Reads `dbbe-export.toml` (or the path given with `--config`) plus
//! `DBBE__*` environment overrides, exports PostgreSQL and Elasticsearch into
//! the SQLite output store, and optionally publishes the result.
//!
//! Exits with status 1 when the export fails and 2 when only the archival
//! upload fails.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use dbbe_export::{Pipeline, RunReport, Settings, archive};
use dbbe_source::{ElasticClient, ElasticConfig, PgSource};
use dbbe_store_sqlite::{OutputStore, StoreOptions};
use dbbe_zenodo::PublishMode;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

const EXPORT_FAILED: u8 = 1;
const ARCHIVE_FAILED: u8 = 2;

#[derive(Parser)]
#[command(author, version, about = "DBBE SQLite export")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "dbbe-export.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Run every export step (the default).
  Run {
    /// Publish the snapshot afterwards: create, update or publish.
    #[arg(long)]
    publish: Option<PublishMode>,
  },
  /// Upload existing snapshot files to the archival repository.
  Publish {
    #[arg(long, default_value = "update")]
    mode:          PublishMode,
    /// Target this deposition instead of searching by title.
    #[arg(long)]
    deposition_id: Option<u64>,
    /// Files to upload; defaults to the `*.sqlite` files beside the output.
    files:         Vec<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> ExitCode {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = match Settings::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))
  {
    Ok(settings) => settings,
    Err(e) => {
      error!("{e:#}");
      return ExitCode::from(EXPORT_FAILED);
    }
  };

  let command = cli.command.unwrap_or(Command::Run { publish: None });
  let (publish, files, deposition_id) = match command {
    Command::Run { publish } => {
      match export(&settings).await {
        Ok(report) => {
          for step in &report.steps {
            info!("{step}");
          }
        }
        Err(e) => {
          error!("export failed: {e:#}");
          return ExitCode::from(EXPORT_FAILED);
        }
      }
      (publish, Vec::new(), None)
    }
    Command::Publish {
      mode,
      deposition_id,
      files,
    } => (Some(mode), files, deposition_id),
  };

  if let Some(mode) = publish {
    match archive::publish_snapshot(&settings, files, mode, deposition_id).await {
      Ok(id) => info!(deposition = id, "snapshot archived"),
      Err(e) => {
        error!("archival failed: {e:#}");
        return ExitCode::from(ARCHIVE_FAILED);
      }
    }
  }

  ExitCode::SUCCESS
}

async fn export(settings: &Settings) -> anyhow::Result<RunReport> {
  let relational = PgSource::connect(&settings.postgres.url, settings.postgres.max_connections)
    .await
    .context("failed to connect to postgres")?;

  let es = &settings.elasticsearch;
  let documents = ElasticClient::new(ElasticConfig {
    base_url:     es.url.clone(),
    username:     es.username.clone(),
    password:     es.password.clone(),
    index_prefix: es.index_prefix.clone(),
    timeout:      Duration::from_secs(es.timeout_secs),
  })
  .context("failed to build elasticsearch client")?;

  let store = OutputStore::open(&settings.output_path, StoreOptions {
    busy_timeout: settings.busy_timeout(),
  })
  .await
  .with_context(|| format!("failed to open output store at {:?}", settings.output_path))?;

  info!(
    output = ?settings.output_path,
    public_release = settings.public_release,
    "starting export"
  );
  let mut pipeline = Pipeline::new(documents, relational, store, settings.pipeline_options());
  Ok(pipeline.run().await?)
}

//! mms-jobs - batch entry point for the membership services
//!
//! Subcommands:
//! - `sync`: re-sync recently updated members/resources into the mirror
//! - `export`: migrate members/resources to CouchDB (or the mirror)
//! - `report`: write CSV reports

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use mms_common::config::{CliOverrides, Settings};
use mms_common::db::init_database;
use mms_common::docstore::{DocumentStore, SqliteDocumentStore};
use mms_jobs::export::{export_members, export_resources, ExportSummary};
use mms_jobs::report::{write_report, DateRange, ReportKind};
use mms_jobs::sync::{run_sync, Collection};
use mms_jobs::CouchStore;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mms-jobs")]
#[command(about = "Batch jobs for the membership services")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Relational database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Document mirror file
    #[arg(long, global = true)]
    mirror: Option<PathBuf>,

    /// CouchDB base URL
    #[arg(long, global = true)]
    couch_url: Option<String>,

    /// CouchDB database name
    #[arg(long, global = true)]
    couch_db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync records updated in the last N days into the mirror
    Sync {
        /// Days to look back (at least 1)
        #[arg(short, long)]
        backdays: i64,

        #[arg(short, long, value_enum)]
        collection: Collection,
    },
    /// Upsert every record into the export target
    Export {
        #[arg(short, long, value_enum, default_value = "all")]
        collection: Collection,

        #[arg(short, long, value_enum, default_value = "couch")]
        target: Target,

        /// Only these ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
    },
    /// Write a CSV report
    Report {
        #[arg(value_enum)]
        kind: ReportKind,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// First date (YYYY-MM-DD) for application and invoice reports
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date (YYYY-MM-DD) for application and invoice reports
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Couch,
    Mirror,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| filter_for_level("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting mms-jobs v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    if let Command::Export { collection, ids, .. } = &args.command {
        check_export_args(*collection, ids)?;
    }
    let settings = Settings::resolve(&CliOverrides {
        config_file: args.config.clone(),
        database: args.database.clone(),
        mirror: args.mirror.clone(),
        couch_url: args.couch_url.clone(),
        couch_database: args.couch_db.clone(),
    })
    .context("Failed to resolve settings")?;

    // RUST_LOG wins over the configured level
    if !from_env && settings.log_level != "info" {
        filter_handle
            .reload(filter_for_level(&settings.log_level))
            .context("Failed to apply configured log level")?;
    }

    info!("Database path: {}", settings.database_path.display());
    let pool = init_database(&settings.database_path)
        .await
        .context("Failed to open relational database")?;

    match args.command {
        Command::Sync { backdays, collection } => {
            let mirror = open_mirror(&settings).await?;
            let summary = run_sync(&pool, &mirror, collection, backdays)
                .await
                .context("Sync failed")?;
            info!(
                inserted = summary.inserted,
                replaced = summary.replaced,
                unchanged = summary.unchanged,
                "Sync complete"
            );
        }
        Command::Export { collection, target, ids } => {
            let store: Arc<dyn DocumentStore> = match target {
                Target::Mirror => Arc::new(open_mirror(&settings).await?),
                Target::Couch => {
                    let couch = CouchStore::new(&settings.couch).context("Invalid CouchDB settings")?;
                    couch
                        .ensure_database()
                        .await
                        .with_context(|| format!("Failed to open CouchDB database {}", couch.database()))?;
                    Arc::new(couch)
                }
            };
            store.ping().await.context("Export target is not reachable")?;

            let ids = (!ids.is_empty()).then_some(ids.as_slice());

            let mut total = ExportSummary::default();
            if matches!(collection, Collection::Members | Collection::All) {
                add(&mut total, export_members(&pool, store.as_ref(), ids).await.context("Member export failed")?);
            }
            if matches!(collection, Collection::Resources | Collection::All) {
                add(&mut total, export_resources(&pool, store.as_ref(), ids).await.context("Resource export failed")?);
            }

            if total.failed > 0 {
                warn!(failed = total.failed, "Some records were not exported");
            }
            info!(processed = total.processed, written = total.written, failed = total.failed, "Export complete");
        }
        Command::Report { kind, out, from, to } => {
            let path = write_report(&pool, kind, DateRange { from, to }, &out)
                .await
                .context("Report failed")?;
            info!("Report written to {}", path.display());
        }
    }

    Ok(())
}

fn check_export_args(collection: Collection, ids: &[i64]) -> Result<()> {
    if !ids.is_empty() && collection == Collection::All {
        bail!("--ids needs --collection members or --collection resources");
    }
    Ok(())
}

fn filter_for_level(level: &str) -> EnvFilter {
    EnvFilter::new(format!("mms_jobs={level},mms_common={level}"))
}

async fn open_mirror(settings: &Settings) -> Result<SqliteDocumentStore> {
    SqliteDocumentStore::open(&settings.mirror_path)
        .await
        .with_context(|| format!("Failed to open mirror {}", settings.mirror_path.display()))
}

fn add(total: &mut ExportSummary, part: ExportSummary) {
    total.processed += part.processed;
    total.written += part.written;
    total.failed += part.failed;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_require_single_collection() {
        assert!(check_export_args(Collection::All, &[1, 2]).is_err());
        assert!(check_export_args(Collection::All, &[]).is_ok());
        assert!(check_export_args(Collection::Members, &[1]).is_ok());
    }

    #[test]
    fn test_export_args_parse() {
        let args = Args::try_parse_from(["mms-jobs", "export", "-c", "resources", "--ids", "3,4", "-t", "mirror"]).unwrap();
        match args.command {
            Command::Export { collection, target, ids } => {
                assert_eq!(collection, Collection::Resources);
                assert_eq!(target, Target::Mirror);
                assert_eq!(ids, vec![3, 4]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

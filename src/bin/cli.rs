//! Thread Reconciler CLI
//!
//! Local execution entry point over a directory of stored scans.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thread_reconciler::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, LogObserver},
    storage::{LocalStorage, ThreadStorage},
    utils::short_fingerprint,
};

/// Thread Reconciler - cumulative records from repeated thread scans
#[derive(Parser, Debug)]
#[command(
    name = "thread-reconciler",
    version,
    about = "Reconcile thread snapshots into master records"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "reconciler.toml")]
    config: PathBuf,

    /// Storage directory (overrides site.storage_root)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a parsed snapshot JSON file and its snapshot meta
    Ingest {
        /// Snapshot files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Rebuild master records, then site meta
    Reconcile {
        /// Only reconcile this thread (site meta is still recomputed)
        #[arg(long)]
        thread: Option<String>,
    },

    /// Recompute site meta from the stored master metas
    Aggregate,

    /// Show stored thread or site statistics
    Info {
        /// Thread to describe (default: the whole site)
        #[arg(long)]
        thread: Option<String>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::load_or_default(&cli.config)
    };
    if let Some(dir) = cli.storage_dir {
        config.site.storage_root = dir;
    }

    log::info!(
        "Site {} stored at {}",
        config.site.title,
        config.site.storage_root.display()
    );

    let storage = LocalStorage::new(&config.site.storage_root);
    let reads_storage = !matches!(cli.command, Command::Ingest { .. } | Command::Validate);
    if reads_storage && !config.site.storage_root.is_dir() {
        return Err(AppError::config(format!(
            "Storage directory not found: {}",
            config.site.storage_root.display()
        )));
    }

    match cli.command {
        Command::Ingest { files } => {
            let mut failed = 0;
            for file in &files {
                if let Err(e) = pipeline::ingest_file(&storage, file).await {
                    log::error!("Failed to ingest {}: {}", file.display(), e);
                    failed += 1;
                }
            }
            log::info!("Ingested {} of {} files", files.len() - failed, files.len());
            if failed > 0 {
                return Err(AppError::validation(format!(
                    "{} snapshot files were not ingested",
                    failed
                )));
            }
        }

        Command::Reconcile { thread: Some(thread_id) } => {
            let summary =
                pipeline::reconcile_thread(&storage, &config, &thread_id, &LogObserver).await?;
            log::info!(
                "Thread {}: content {} meta {}",
                summary.thread_id,
                short_fingerprint(&summary.content_fingerprint),
                short_fingerprint(&summary.meta_fingerprint)
            );
            pipeline::aggregate_site_meta(&storage, &config).await?;
        }

        Command::Reconcile { thread: None } => {
            let summary = pipeline::reconcile_site(&storage, &config, &LogObserver).await?;
            log::info!(
                "Reconciled {} threads ({} failed) in {}ms",
                summary.threads.len(),
                summary.failed.len(),
                summary.elapsed_ms
            );
            for (thread_id, error) in &summary.failed {
                log::warn!("  {}: {}", thread_id, error);
            }
        }

        Command::Aggregate => {
            pipeline::aggregate_site_meta(&storage, &config).await?;
        }

        Command::Info { thread: Some(thread_id) } => {
            let scans = storage.list_scans(&thread_id).await?;
            log::info!("Thread {}: {} stored scans", thread_id, scans.len());
            if let (Some(first), Some(last)) = (scans.first(), scans.last()) {
                log::info!("Scanned from {} to {}", first, last);
            }

            match storage.load_master_meta(&thread_id).await? {
                Some(meta) => {
                    log::info!("Title: {}", meta.thread_title);
                    log::info!("Board: {}", meta.board_name);
                    log::info!("Unique posts: {}", meta.num_unique_post_ids);
                    log::info!("Lost posts: {}", meta.num_lost_post_ids);
                    log::info!("Aggregate posts: {}", meta.num_aggregate_post_ids);
                    if let Some(updated) = meta.most_recent_update_date {
                        log::info!("Last updated: {}", updated);
                    }
                }
                None => log::info!("Not reconciled yet."),
            }
        }

        Command::Info { thread: None } => {
            let threads = storage.list_threads().await?;
            log::info!("Stored threads: {}", threads.len());

            match storage.load_site_meta().await? {
                Some(site) => {
                    log::info!("Threads aggregated: {}", site.num_sitewide_threads);
                    log::info!("Total posts: {}", site.num_sitewide_total_posts);
                    log::info!("Distinct posts: {}", site.num_sitewide_dist_posts);
                    log::info!("Lost posts: {}", site.num_sitewide_lost_posts);
                    if let Some(aggregated) = site.date_aggregated {
                        log::info!("Last aggregated: {}", aggregated);
                    }
                }
                None => log::info!("No site meta found yet."),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }
    }

    Ok(())
}

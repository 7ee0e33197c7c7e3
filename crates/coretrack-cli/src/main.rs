mod attention;
mod query;
mod report;
mod sources;
mod track;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use coretrack_core::{AppConfig, Policy, ReportWindow};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "coretrack")]
#[command(about = "Track, score and alert on a site's core articles")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch metrics, rank the top articles, store a snapshot and raise alerts
    Track {
        #[command(flatten)]
        window: WindowArgs,
        /// Print the report without storing a snapshot, run or CSV
        #[arg(long)]
        dry_run: bool,
    },
    /// Find articles outside the top N that need editorial attention
    Attention {
        #[command(flatten)]
        window: WindowArgs,
        /// Print the report without recording a run or writing a CSV
        #[arg(long)]
        dry_run: bool,
    },
    /// Inspect stored snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// Inspect recorded runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

/// Reporting window overrides shared by `track` and `attention`.
#[derive(Debug, Clone, Default, clap::Args)]
struct WindowArgs {
    /// First day of the reporting window (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last day of the reporting window (defaults to the snapshot date)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Date the snapshot is filed under (defaults to today)
    #[arg(long)]
    snapshot_date: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
enum SnapshotCommands {
    /// Print a stored snapshot and its alerts
    Show {
        /// Snapshot date (defaults to the latest)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Debug, Subcommand)]
enum RunsCommands {
    /// List recent runs with status and per-source counts
    List {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

/// Resolves the snapshot date and reporting window from CLI overrides.
///
/// The snapshot date defaults to `today`, the window end to the snapshot
/// date, and the window start to `window_days` before the end.
fn resolve_window(
    args: &WindowArgs,
    today: NaiveDate,
    window_days: u32,
) -> anyhow::Result<(NaiveDate, ReportWindow)> {
    let snapshot_date = args.snapshot_date.unwrap_or(today);
    let end = args.end.unwrap_or(snapshot_date);
    let window = match args.start {
        Some(start) => ReportWindow::new(start, end).map_err(|e| anyhow::anyhow!(e))?,
        None => ReportWindow::ending(end, window_days),
    };
    Ok((snapshot_date, window))
}

/// Loads the policy file named in the config, or the built-in defaults.
fn load_policy(config: &AppConfig) -> anyhow::Result<Policy> {
    match &config.policy_path {
        Some(path) => {
            let policy = coretrack_core::load_policy(path)?;
            tracing::info!(path = %path.display(), top_n = policy.top_n, "loaded policy file");
            Ok(policy)
        }
        None => Ok(Policy::default()),
    }
}

/// Marks a run failed, logging (not propagating) any error doing so.
async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = coretrack_db::fail_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = coretrack_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("coretrack: nothing to do; see `coretrack --help`");
        return Ok(());
    };

    let pool_config = coretrack_db::PoolConfig::from_app_config(&config);
    let pool = coretrack_db::connect_pool(&config.database_url, pool_config).await?;
    let today = Local::now().date_naive();

    match command {
        Commands::Track { window, dry_run } => {
            let policy = load_policy(&config)?;
            let (snapshot_date, window) = resolve_window(&window, today, config.window_days)?;
            coretrack_db::run_migrations(&pool).await?;
            track::run_track(&pool, &config, &policy, snapshot_date, window, dry_run).await?;
        }
        Commands::Attention { window, dry_run } => {
            let policy = load_policy(&config)?;
            let (snapshot_date, window) = resolve_window(&window, today, config.window_days)?;
            coretrack_db::run_migrations(&pool).await?;
            attention::run_attention(&pool, &config, &policy, snapshot_date, window, dry_run)
                .await?;
        }
        Commands::Snapshot {
            command: SnapshotCommands::Show { date },
        } => query::run_snapshot_show(&pool, date).await?,
        Commands::Runs {
            command: RunsCommands::List { limit },
        } => query::run_runs_list(&pool, limit).await?,
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                coretrack_db::ping(&pool).await?;
                println!("database connection ok");
            }
            DbCommands::Migrate => {
                let applied = coretrack_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
    }

    Ok(())
}

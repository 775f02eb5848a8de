//! Daybook CLI
//!
//! Manual diary runs, the daily scheduler, and small maintenance commands
//! over the SQLite store. Command results are printed to stdout as JSON.

mod logging;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use daybook_core::{
    ConversationRepository, DaybookConfig, DiaryRepository, MemoryRepository, Mood, SystemClock,
    UserId, MOOD_VOCABULARY_VERSION,
};
use daybook_memory::SqliteStore;
use daybook_reasoning::providers::create_generator;
use daybook_reasoning::{DiaryScheduler, DiarySynthesizer, MemoryExtractor, TextGenerator};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

const DEFAULT_CONFIG_FILE: &str = "daybook.toml";

#[derive(Parser, Debug)]
#[command(name = "daybook", author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config. Missing file means defaults.
    #[arg(short, long, env = "DAYBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Database path, overrides `storage.db_path`
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate diary entries now (defaults to today)
    Run {
        /// Target day, YYYY-MM-DD
        #[arg(long)]
        day: Option<NaiveDate>,
    },

    /// Run the daily scheduler until Ctrl-C
    Serve,

    /// Register a user
    AddUser { username: String },

    /// Store one conversational turn and extract a memory fact from it
    Record {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        message: String,
        #[arg(long)]
        response: String,
        /// Turn timestamp, YYYY-MM-DDTHH:MM:SS (defaults to now)
        #[arg(long)]
        at: Option<NaiveDateTime>,
    },

    /// Run memory extraction on a single turn without storing the turn
    Extract {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        message: String,
        #[arg(long)]
        response: String,
    },

    /// List a user's diary entries, newest first
    Entries {
        #[arg(long)]
        user: i64,
    },

    /// List a user's remembered facts
    Facts {
        #[arg(long)]
        user: i64,
    },

    /// Print the mood vocabulary
    Moods,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref());
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }
    let _log_guard = logging::init(&config.logging);
    config.validate().context("Invalid configuration")?;

    // No database needed
    if matches!(cli.command, Commands::Moods) {
        return print_moods();
    }

    let store = Arc::new(SqliteStore::new(&config.storage.db_path).await?);
    let result = dispatch(cli.command, &config, store.clone()).await;
    store.close().await;
    result
}

async fn dispatch(command: Commands, config: &DaybookConfig, store: Arc<SqliteStore>) -> Result<()> {
    match command {
        Commands::Run { day } => {
            let scheduler = build_scheduler(config, &store)?;
            let report = scheduler.run_manual(day, &SystemClock).await;
            print_json(&report)?;
        }
        Commands::Serve => serve(config, &store).await?,
        Commands::AddUser { username } => {
            let id = store.create_user(&username).await?;
            info!(user_id = %id, "Registered user {}", username);
            print_json(&json!({ "id": id, "username": username }))?;
        }
        Commands::Record {
            user,
            message,
            response,
            at,
        } => {
            let at = at.unwrap_or_else(|| Local::now().naive_local());
            let turn = store
                .append_turn(UserId(user), &message, &response, at)
                .await?;
            let extractor = build_extractor(config, &store)?;
            let fact = extractor
                .extract_and_store(UserId(user), &message, &response)
                .await;
            print_json(&json!({ "turn": turn, "fact": fact }))?;
        }
        Commands::Extract {
            user,
            message,
            response,
        } => {
            let extractor = build_extractor(config, &store)?;
            let fact = extractor
                .extract_and_store(UserId(user), &message, &response)
                .await;
            print_json(&fact)?;
        }
        Commands::Entries { user } => {
            print_json(&store.list_entries(UserId(user)).await?)?;
        }
        Commands::Facts { user } => {
            print_json(&store.list_facts(UserId(user)).await?)?;
        }
        Commands::Moods => print_moods()?,
    }
    Ok(())
}

async fn serve(config: &DaybookConfig, store: &Arc<SqliteStore>) -> Result<()> {
    if !config.scheduler.enabled {
        warn!("scheduler.enabled is false, nothing to serve");
        return Ok(());
    }
    let time = config.scheduler.daily_time()?;
    let scheduler = Arc::new(build_scheduler(config, store)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = scheduler.spawn_daily(Arc::new(SystemClock), time, shutdown_rx);
    info!("Daybook scheduler online, daily run at {}. Ctrl-C to stop.", time);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested, waiting for any in-flight run");
    let _ = shutdown_tx.send(true);
    handle.await.context("Scheduler task panicked")?;
    Ok(())
}

fn build_generator(config: &DaybookConfig) -> Result<Arc<dyn TextGenerator>> {
    create_generator(&config.llm)
}

fn build_scheduler(config: &DaybookConfig, store: &Arc<SqliteStore>) -> Result<DiaryScheduler> {
    let synthesizer = Arc::new(DiarySynthesizer::new(
        store.clone(),
        store.clone(),
        build_generator(config)?,
        config.fallbacks.clone(),
    ));
    Ok(DiaryScheduler::new(store.clone(), store.clone(), synthesizer))
}

fn build_extractor(config: &DaybookConfig, store: &Arc<SqliteStore>) -> Result<MemoryExtractor> {
    Ok(MemoryExtractor::new(
        store.clone(),
        build_generator(config)?,
        &config.fallbacks,
    ))
}

/// Explicit path, else `./daybook.toml`, else the per-user config dir.
fn load_config(explicit: Option<&Path>) -> DaybookConfig {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            match dirs::config_dir().map(|d| d.join("daybook").join(DEFAULT_CONFIG_FILE)) {
                Some(user_cfg) if !local.exists() && user_cfg.exists() => user_cfg,
                _ => local,
            }
        }
    };
    DaybookConfig::load_or_default(path)
}

fn print_moods() -> Result<()> {
    print_json(&json!({ "version": MOOD_VOCABULARY_VERSION, "moods": Mood::vocabulary() }))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

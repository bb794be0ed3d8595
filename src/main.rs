//! # Meetbell: meeting reminder scheduler
//!
//! Sends 24h / 1h / 15m reminders for stored meetings and tracks their
//! lifecycle (scheduled → in-progress → completed).
//!
//! Usage:
//!   meetbell serve                                   # Run the reminder engine until Ctrl-C
//!   meetbell add --title T --start ... --end ... -p a@example.com
//!   meetbell list [--owner O] [--json]
//!   meetbell sweep                                   # One sweep, print the report
//!   meetbell init-config                             # Write ~/.meetbell/config.toml

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use meetbell_core::config::MeetbellConfig;
use meetbell_core::types::{Meeting, NewMeeting};
use meetbell_scheduler::{MeetingService, ReminderEngine, Supervisor};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "meetbell",
    version,
    about = "🔔 Meetbell — meeting reminders and lifecycle tracking"
)]
struct Cli {
    /// Config file (default: ~/.meetbell/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sweep and eviction loops until Ctrl-C
    Serve,
    /// Create a meeting
    Add {
        #[arg(long)]
        title: String,
        /// Start time, RFC 3339 (e.g. 2026-03-01T09:00:00Z)
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        /// End time, RFC 3339
        #[arg(long, value_parser = parse_instant)]
        end: DateTime<Utc>,
        /// Participant email (repeatable)
        #[arg(short, long = "participant", required = true)]
        participants: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        /// Owner id recorded as created_by
        #[arg(long)]
        owner: Option<String>,
    },
    /// List meetings ordered by start time
    List {
        #[arg(long)]
        owner: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Cancel a meeting; no further reminders are sent for it
    Cancel { id: String },
    /// Delete a meeting permanently
    Delete { id: String },
    /// Run exactly one sweep and print the report
    Sweep,
    /// Delete completed meetings older than the retention period
    Evict,
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_instant(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

fn load_config(path: Option<&PathBuf>) -> Result<MeetbellConfig> {
    let config = match path {
        Some(p) => MeetbellConfig::load_from(p)?,
        None => MeetbellConfig::load()?,
    };
    Ok(config)
}

fn build_engine(config: &MeetbellConfig) -> Result<Arc<ReminderEngine>> {
    let store = meetbell_store::open_from_config(&config.store).context("opening meeting store")?;
    let sender = meetbell_notify::sender_from_config(config).context("configuring notifications")?;
    tracing::debug!("Store: {}, sender: {}", store.name(), sender.name());
    let engine = ReminderEngine::new(store, sender)
        .with_retention(chrono::Duration::days(config.scheduler.retention_days));
    Ok(Arc::new(engine))
}

fn print_meetings(meetings: &[Meeting]) {
    if meetings.is_empty() {
        println!("No meetings.");
        return;
    }
    for m in meetings {
        println!(
            "{}  {:<11}  {}  →  {}  {}  ({} participant(s))",
            m.id,
            m.status,
            m.start_time.format("%Y-%m-%d %H:%M"),
            m.end_time.format("%H:%M"),
            m.title,
            m.participants.len()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "meetbell=debug,meetbell_scheduler=debug,meetbell_store=debug,meetbell_notify=debug"
    } else {
        "meetbell=info,meetbell_scheduler=info,meetbell_store=info,meetbell_notify=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if let Command::InitConfig { force } = &cli.command {
        let path = cli.config.clone().unwrap_or_else(MeetbellConfig::default_path);
        if path.exists() && !*force {
            println!("⚠️  {} already exists (use --force to overwrite).", path.display());
            return Ok(());
        }
        MeetbellConfig::default().save_to(&path)?;
        println!("✅ Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    let engine = build_engine(&config)?;

    match cli.command {
        Command::Serve => {
            let handle = Supervisor::new(Arc::clone(&engine), &config.scheduler)
                .start()
                .await;
            tracing::info!("🔔 Meetbell running. Press Ctrl-C to stop.");
            tokio::signal::ctrl_c().await?;
            handle.shutdown();
        }
        Command::Add {
            title,
            start,
            end,
            participants,
            description,
            owner,
        } => {
            // Exits right away, so no timers: a running server's sweep covers it.
            let service = MeetingService::new(engine).without_timers();
            let meeting = service
                .create(NewMeeting {
                    title,
                    description,
                    start_time: start,
                    end_time: end,
                    participants,
                    created_by: owner,
                })
                .await?;
            println!("✅ Meeting created: {} ({})", meeting.title, meeting.id);
        }
        Command::List { owner, json } => {
            let meetings = MeetingService::new(engine).list(owner.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&meetings)?);
            } else {
                print_meetings(&meetings);
            }
        }
        Command::Cancel { id } => {
            let meeting = MeetingService::new(engine).cancel(&id).await?;
            println!("✅ Cancelled: {} ({})", meeting.title, meeting.id);
        }
        Command::Delete { id } => {
            MeetingService::new(engine).delete(&id).await?;
            println!("🗑️  Deleted {id}");
        }
        Command::Sweep => {
            let report = engine.sweep().await;
            println!("🔔 {report}");
        }
        Command::Evict => {
            let deleted = engine.evict_stale().await?;
            println!("🧹 Evicted {deleted} completed meeting(s)");
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

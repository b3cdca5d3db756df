//! qf binary entrypoint
//!
//! Drives the reconciliation engine against an in-memory platform fed from
//! a JSONL event stream. Each line is either a `setup` directive describing
//! the guild layout or an `event` the engine dispatches; every platform
//! action the engine performs is printed as it happens.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use queuefairy::cli::{get_log_path, Cli, Command};
use queuefairy::config::Config;
use queuefairy::domain::{ChannelId, GuildId, MemberId};
use queuefairy::events::Event;
use queuefairy::platform::{InMemoryPlatform, Platform};
use queuefairy::reconcile::QueueManager;

/// The bot's own member id in a replayed world
const REPLAY_BOT: MemberId = MemberId(0);

/// One line of a replay file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ReplayLine {
    Setup(Setup),
    Event(Event),
}

/// Guild layout and control directives for the replay harness
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Setup {
    /// Register a queue text channel (registration order is canonical order)
    QueueChannel { guild: GuildId, channel: ChannelId },
    /// Register a queue voice channel
    QueueVoiceChannel { channel: ChannelId },
    /// Grant a member the teacher role
    Teacher { guild: GuildId, member: MemberId },
    /// Run startup reconciliation over everything replayed so far
    Startup,
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    // Create log directory
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Replay { file } => {
            debug!(?file, "main: matched Replay command");
            cmd_replay(&config, file.as_ref()).await
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Replay a JSONL event stream through the engine
async fn cmd_replay(config: &Config, file: Option<&PathBuf>) -> Result<()> {
    debug!(?file, "cmd_replay: called");

    let reader: Box<dyn Read> = match file {
        Some(path) => {
            Box::new(fs::File::open(path).context(format!("Failed to open {}", path.display()))?)
        }
        None => Box::new(std::io::stdin()),
    };

    let platform = Arc::new(InMemoryPlatform::new(REPLAY_BOT));
    let manager = QueueManager::new(platform.clone() as Arc<dyn Platform>, config.gc.expiry());

    for (number, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.context("Failed to read replay input")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parsed: ReplayLine =
            serde_json::from_str(trimmed).context(format!("Invalid replay line {}", number + 1))?;
        match parsed {
            ReplayLine::Setup(setup) => {
                debug!(?setup, "cmd_replay: setup directive");
                match setup {
                    Setup::QueueChannel { guild, channel } => platform.add_queue_channel(guild, channel),
                    Setup::QueueVoiceChannel { channel } => platform.add_queue_voice_channel(channel),
                    Setup::Teacher { guild, member } => platform.set_teacher(guild, member),
                    Setup::Startup => manager.reconcile_all().await,
                }
            }
            ReplayLine::Event(event) => {
                info!(event = event.event_type(), "cmd_replay: dispatching event");
                platform.apply_event(&event);
                manager
                    .dispatch(event)
                    .await
                    .context(format!("Event on line {} failed", number + 1))?;
            }
        }

        for action in platform.take_actions() {
            println!("{action}");
        }
    }

    Ok(())
}

/// Print the effective configuration as YAML
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{yaml}");
    Ok(())
}

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kegel_backend::LocalBackend;
use kegel_core::{AppConfig, AppContext};
use std::{path::PathBuf, sync::Arc};

use commands::{reminder::ReminderAction, settings::SettingsAction, stats::StatsArgs};

#[derive(Parser)]
#[command(name = "kegel")]
#[command(about = "Pelvic floor exercise sessions and reminders", long_about = None)]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run in the foreground, sending reminders until Ctrl-C
    Run,
    /// Do one exercise session
    Session {
        /// Seconds per repetition (defaults to the saved setting)
        #[arg(short, long)]
        duration: Option<u32>,
        /// Number of repetitions (defaults to the saved setting)
        #[arg(short, long)]
        reps: Option<u32>,
    },
    /// Show exercise statistics, history and charts
    Stats(StatsArgs),
    /// Reminder status and control
    Reminder {
        #[command(subcommand)]
        action: ReminderAction,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show a notification
    Notify { title: String, body: String },
}

fn load_config(data_dir: Option<PathBuf>) -> Result<AppConfig> {
    let Some(dir) = data_dir else {
        return AppConfig::load();
    };
    let mut config = AppConfig::from_dir(&dir)?;
    config.apply_env()?;
    config.data_dir = dir;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.data_dir)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .format_timestamp_secs()
        .init();
    log::debug!("Using config {config:?}");

    let backend = LocalBackend::open(&config.data_dir).context("Failed to open data directory")?;
    let context = AppContext::from_config(Arc::new(backend), &config);

    match cli.command {
        Commands::Run => commands::run::run(&context).await,
        Commands::Session { duration, reps } => {
            commands::session::run_session(&context, duration, reps).await
        }
        Commands::Stats(args) => commands::stats::show_stats(&context, &args).await,
        Commands::Reminder { action } => {
            commands::reminder::handle_reminder_command(&context, action).await
        }
        Commands::Settings { action } => {
            commands::settings::handle_settings_command(&context, action).await
        }
        Commands::Notify { title, body } => {
            context.backend().show_notification(&title, &body).await?;
            println!("Notification sent");
            Ok(())
        }
    }
}

use anyhow::Result;
use kegel_core::AppContext;
use std::time::Duration;

use super::helpers::format_time;

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(600);

/// Run the reminder loop in the foreground until Ctrl-C
pub async fn run(context: &AppContext) -> Result<()> {
    context.init().await;
    if !context.reminders_available() {
        anyhow::bail!("Backend unavailable, reminders cannot run");
    }

    let status = context.reminders().status();
    println!(
        "Reminders {} (every {} minutes, next at {}). Press Ctrl-C to stop.",
        if status.enabled { "enabled" } else { "disabled" },
        status.interval_minutes,
        format_time(status.next_reminder_at)
    );

    let mut ticker = tokio::time::interval(STATUS_LOG_INTERVAL);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = context.reminders().status();
                log::info!(
                    "Reminders enabled: {}, next reminder: {}",
                    status.enabled,
                    format_time(status.next_reminder_at)
                );
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    log::error!("Failed to listen for Ctrl-C: {e}");
                }
                log::info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    context.shutdown();
    Ok(())
}

use anyhow::Result;
use clap::Subcommand;
use kegel_core::{AppContext, TickOutcome};

use super::helpers::format_time;

#[derive(Subcommand, Debug)]
pub enum ReminderAction {
    /// Show whether reminders are on and when the next one is due
    Status,
    /// Turn reminders on or off
    Toggle,
    /// Run one reminder check now
    Check,
}

pub async fn handle_reminder_command(context: &AppContext, action: ReminderAction) -> Result<()> {
    if let Err(e) = context.settings().load().await {
        log::warn!("Using default settings: {e}");
    }
    let reminders = context.reminders();

    match action {
        ReminderAction::Status => {
            let status = reminders.refresh().await?;
            println!("Enabled:       {}", status.enabled);
            println!("Interval:      {} minutes", status.interval_minutes);
            println!("Next reminder: {}", format_time(status.next_reminder_at));
        }
        ReminderAction::Toggle => {
            let enabled = reminders.toggle().await?;
            println!("Reminders {}", if enabled { "enabled" } else { "disabled" });
        }
        ReminderAction::Check => {
            let message = match reminders.check_now().await {
                TickOutcome::Checked { sent: true } => "Reminder sent",
                TickOutcome::Checked { sent: false } => "No reminder due",
                TickOutcome::Disabled => "Reminders are disabled",
                TickOutcome::OutsideWorkingHours => "Outside working hours",
                TickOutcome::StatusUnavailable => "Backend unavailable",
                TickOutcome::CheckFailed => "Reminder check failed, see log",
                TickOutcome::Overlapped | TickOutcome::Discarded => "Check skipped",
            };
            println!("{message}");
        }
    }
    Ok(())
}

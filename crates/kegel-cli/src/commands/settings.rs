use anyhow::{bail, Context, Result};
use clap::Subcommand;
use kegel_core::{AppContext, SettingsPatch, Theme, UserSettings, WorkingHours};
use tabled::{Table, Tabled};

use super::helpers::on_off;

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Show the current settings
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one setting
    Set {
        /// reminder-interval, exercise-duration, repetitions, sound,
        /// notifications, theme, work-start, work-end, working-hours
        key: String,
        value: String,
    },
    /// Restore the defaults
    Reset,
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    key: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn rows(settings: &UserSettings) -> Vec<SettingRow> {
    let row = |key, value: String| SettingRow { key, value };
    vec![
        row("reminder-interval", format!("{} min", settings.reminder_interval)),
        row("exercise-duration", format!("{} s", settings.exercise_duration)),
        row("repetitions", settings.repetitions.to_string()),
        row("sound", on_off(settings.enable_sound).to_string()),
        row("notifications", on_off(settings.enable_notifications).to_string()),
        row(
            "theme",
            match settings.theme {
                Theme::Light => "light",
                Theme::Dark => "dark",
            }
            .to_string(),
        ),
        row(
            "working-hours",
            format!(
                "{}-{} ({})",
                settings.working_hours.start,
                settings.working_hours.end,
                on_off(settings.working_hours.enabled)
            ),
        ),
    ]
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => bail!("Expected on/off, got '{value}'"),
    }
}

fn parse_count(key: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .with_context(|| format!("{key} must be a whole number, got '{value}'"))
}

/// Turn `key = value` into a patch over `current`
fn parse_patch(current: &UserSettings, key: &str, value: &str) -> Result<SettingsPatch> {
    let mut patch = SettingsPatch::default();
    let mut hours: WorkingHours = current.working_hours.clone();

    match key {
        "reminder-interval" => patch.reminder_interval = Some(parse_count(key, value)?),
        "exercise-duration" => patch.exercise_duration = Some(parse_count(key, value)?),
        "repetitions" => patch.repetitions = Some(parse_count(key, value)?),
        "sound" => patch.enable_sound = Some(parse_bool(value)?),
        "notifications" => patch.enable_notifications = Some(parse_bool(value)?),
        "theme" => {
            patch.theme = Some(match value {
                "light" => Theme::Light,
                "dark" => Theme::Dark,
                _ => bail!("Theme must be 'light' or 'dark', got '{value}'"),
            });
        }
        "work-start" => {
            hours.start = value.to_string();
            patch.working_hours = Some(hours);
        }
        "work-end" => {
            hours.end = value.to_string();
            patch.working_hours = Some(hours);
        }
        "working-hours" => {
            hours.enabled = parse_bool(value)?;
            patch.working_hours = Some(hours);
        }
        _ => bail!("Unknown setting '{key}'"),
    }
    Ok(patch)
}

pub async fn handle_settings_command(context: &AppContext, action: SettingsAction) -> Result<()> {
    let store = context.settings();
    if let Err(e) = store.load().await {
        log::warn!("Using default settings: {e}");
    }

    match action {
        SettingsAction::Show { json } => {
            let settings = store.current();
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("{}", Table::new(rows(&settings)));
            }
        }
        SettingsAction::Set { key, value } => {
            let patch = parse_patch(&store.current(), &key, &value)?;
            context.save_settings(patch).await?;
            println!("Set {key} = {value}");
        }
        SettingsAction::Reset => {
            store.reset();
            context.save_settings(SettingsPatch::default()).await?;
            println!("Settings reset to defaults");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counts_and_flags() {
        let current = UserSettings::default();

        let patch = parse_patch(&current, "repetitions", "15").unwrap();
        assert_eq!(patch.repetitions, Some(15));

        let patch = parse_patch(&current, "sound", "off").unwrap();
        assert_eq!(patch.enable_sound, Some(false));

        assert!(parse_patch(&current, "repetitions", "many").is_err());
        assert!(parse_patch(&current, "sound", "maybe").is_err());
        assert!(parse_patch(&current, "volume", "11").is_err());
    }

    #[test]
    fn test_work_hours_keep_other_bound() {
        let current = UserSettings::default();

        let hours = parse_patch(&current, "work-end", "17:00")
            .unwrap()
            .working_hours
            .unwrap();
        assert_eq!(hours.start, "09:00");
        assert_eq!(hours.end, "17:00");
        assert!(hours.enabled);

        let hours = parse_patch(&current, "working-hours", "off")
            .unwrap()
            .working_hours
            .unwrap();
        assert!(!hours.enabled);
        assert_eq!(hours.end, "18:00");
    }

    #[test]
    fn test_theme() {
        let current = UserSettings::default();
        assert_eq!(
            parse_patch(&current, "theme", "dark").unwrap().theme,
            Some(Theme::Dark)
        );
        assert!(parse_patch(&current, "theme", "blue").is_err());
    }

    #[test]
    fn test_rows_show_every_setting() {
        let rows = rows(&UserSettings::default());
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[6].value, "09:00-18:00 (on)");
    }
}

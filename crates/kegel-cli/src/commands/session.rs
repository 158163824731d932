use anyhow::{Context, Result};
use kegel_core::{AppContext, ExerciseSession, SessionController};
use std::time::Duration;

use super::helpers::progress_bar;

const PROGRESS_POLL: Duration = Duration::from_millis(250);
const PROGRESS_WIDTH: usize = 20;
const FINISH_ATTEMPTS: u32 = 3;
const FINISH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Report the finished session, retrying while the backend refuses it.
/// The session stays active between attempts.
async fn finish_with_retry(controller: &SessionController) -> Result<ExerciseSession> {
    let mut attempt = 1;
    loop {
        match controller.finish(true).await {
            Ok(session) => return Ok(session),
            Err(e) if attempt < FINISH_ATTEMPTS && controller.is_active() => {
                log::warn!("Recording the session failed (attempt {attempt}): {e}");
                attempt += 1;
                tokio::time::sleep(FINISH_RETRY_DELAY).await;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "session finished but could not be recorded after {attempt} attempts"
                ));
            }
        }
    }
}

/// Run one paced session in the terminal. Ctrl-C abandons it without
/// recording anything.
pub async fn run_session(
    context: &AppContext,
    duration: Option<u32>,
    reps: Option<u32>,
) -> Result<()> {
    if let Err(e) = context.settings().load().await {
        log::warn!("Using default settings: {e}");
    }
    let controller = context.session();
    if let Err(e) = controller.reload_stats().await {
        log::warn!("Stats not loaded: {e}");
    }

    let settings = context.settings().current();
    let duration = duration.unwrap_or(settings.exercise_duration);
    let reps = reps.unwrap_or(settings.repetitions);

    let session = controller.begin(duration, reps).await?;
    println!("Session {} started: {reps} repetitions, {duration}s each", session.id);
    controller.start_pacer();

    let mut poll = tokio::time::interval(PROGRESS_POLL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut shown = None;

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let current = controller.current_repetition();
                if shown != Some(current) {
                    shown = Some(current);
                    println!(
                        "{} {current}/{reps}",
                        progress_bar(controller.progress_percent(), PROGRESS_WIDTH)
                    );
                }
                if current >= reps {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                controller.cancel();
                println!("Session cancelled, nothing recorded");
                return Ok(());
            }
        }
    }

    let finished = finish_with_retry(controller).await?;
    let elapsed = finished.elapsed_secs().unwrap_or(0);
    println!(
        "Session complete in {elapsed}s. Sessions today: {}",
        controller.stats().today_count
    );

    if settings.enable_notifications {
        let body = format!("{reps} repetitions done");
        if let Err(e) = context.backend().show_notification("Session complete", &body).await {
            log::warn!("Completion notification failed: {e}");
        }
    }
    Ok(())
}

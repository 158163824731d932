//! Cancellable repeating task.
//!
//! The job is awaited inside the timer loop, so two runs of the same task
//! never overlap. Ticks that come due while a run is still in progress are
//! skipped rather than queued.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Shared view of a task's cancellation state, handed to every job run
#[derive(Debug, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle for a job scheduled every `period`. Cancelled on drop.
#[derive(Debug)]
pub struct RepeatingTask {
    name: &'static str,
    flag: CancelFlag,
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Schedule `job` every `period`, first run one period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut(CancelFlag) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let flag = CancelFlag(Arc::new(AtomicBool::new(false)));
        let wake = Arc::new(Notify::new());

        let task_flag = flag.clone();
        let task_wake = wake.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    () = task_wake.notified() => break,
                    _ = ticker.tick() => {}
                }
                if task_flag.is_cancelled() {
                    break;
                }
                job(task_flag.clone()).await;
            }
            log::debug!("{name} timer stopped");
        });

        log::debug!("{name} timer scheduled every {period:?}");
        Self {
            name,
            flag,
            wake,
            handle,
        }
    }

    /// Stop scheduling further runs. A run already in progress completes,
    /// and can observe the cancellation through its [`CancelFlag`].
    pub fn cancel(&self) {
        if !self.flag.0.swap(true, Ordering::SeqCst) {
            log::debug!("{} timer cancelled", self.name);
        }
        self.wake.notify_one();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }

    /// True once the timer loop has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! Render Scheduler - The Per-Board Timer
//!
//! One tokio task per running board. It waits for the start delay, then fires
//! every tick. Each render runs on the blocking pool and is awaited before the
//! next tick is taken, so renders of one board never overlap; ticks missed
//! while a slow render was running are skipped rather than queued.
//!
//! A failed render is logged and the timer keeps going. Only
//! [`BoardError::Closed`] ends the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::BoardError;

/// One scheduling unit, the smallest tick a board is expected to use
pub const TICK: Duration = Duration::from_millis(50);

/// `n` scheduling units
#[must_use]
pub const fn ticks(n: u64) -> Duration {
    Duration::from_millis(50 * n)
}

/// The render a scheduler fires
pub type RenderJob = Arc<dyn Fn() -> Result<(), BoardError> + Send + Sync>;

/// Handle to a running render timer
///
/// Dropping the handle leaves the timer running; call [`RenderScheduler::stop`].
#[derive(Debug)]
pub struct RenderScheduler {
    task: JoinHandle<()>,
}

impl RenderScheduler {
    /// Start firing `job` on `runtime` after `start_delay`, then every `tick`
    pub fn spawn(
        runtime: &Handle,
        label: String,
        start_delay: Duration,
        tick: Duration,
        job: RenderJob,
    ) -> Self {
        let task = runtime.spawn(run(label, start_delay, tick, job));
        Self { task }
    }

    /// Stop the timer
    ///
    /// A render already running on the blocking pool finishes on its own.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Whether the timer task has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(label: String, start_delay: Duration, tick: Duration, job: RenderJob) {
    tracing::info!(
        board_id = %label,
        start_delay_ms = start_delay.as_millis(),
        tick_ms = tick.as_millis(),
        "Starting board scheduler"
    );

    let mut interval = tokio::time::interval_at(Instant::now() + start_delay, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let render = Arc::clone(&job);
        match tokio::task::spawn_blocking(move || render()).await {
            Ok(Ok(())) => {}
            Ok(Err(BoardError::Closed { .. })) => {
                tracing::debug!(board_id = %label, "Board closed, scheduler exiting");
                break;
            }
            Ok(Err(err)) => {
                tracing::warn!(board_id = %label, error = %err, "Scheduled render failed");
            }
            Err(err) => {
                tracing::error!(board_id = %label, error = %err, "Scheduled render task failed");
            }
        }
    }
}

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

use crate::state::{LoadingUpdate, StateStore};

const STAGE_MESSAGES: [&str; 4] = [
    "Analyzing your product...",
    "Generating design concepts...",
    "Creating mockup...",
    "Finalizing design...",
];

/// Simulated progress never passes this until the request settles.
pub const PROGRESS_CEILING: f32 = 90.0;
const MAX_STEP: f32 = 20.0;

pub fn next_progress(current: f32, increment: f32) -> f32 {
    (current + increment.max(0.0)).min(PROGRESS_CEILING)
}

pub fn stage_message(progress: f32) -> Option<&'static str> {
    STAGE_MESSAGES.get((progress / 25.0).floor() as usize).copied()
}

/// Cosmetic progress ticker for one in-flight request.
///
/// Stops by itself after `max_duration` and is aborted by [`cancel`] or on
/// drop, so it can never outlive the request that owns it. Awaiting
/// [`cancel`] guarantees no tick lands after it returns.
///
/// [`cancel`]: ProgressTicker::cancel
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    pub fn start(store: StateStore, interval: Duration, max_duration: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let deadline = Instant::now() + max_duration;
            let mut ticks = tokio::time::interval_at(Instant::now() + interval, interval);
            let mut progress = 0.0_f32;

            loop {
                tokio::select! {
                    _ = ticks.tick() => {}
                    _ = tokio::time::sleep_until(deadline) => break,
                }
                progress = next_progress(progress, rng.gen_range(0.0..MAX_STEP));
                store.update_loading(LoadingUpdate::Progress(progress));
                if let Some(message) = stage_message(progress) {
                    store.update_loading(LoadingUpdate::Message(message.to_string()));
                }
            }
            debug!("⏱️ Progress simulation reached its time limit at {:.0}%", progress);
        });
        Self { handle }
    }

    pub async fn cancel(mut self) {
        self.handle.abort();
        // A tick already running on another worker finishes before the abort lands.
        let _ = (&mut self.handle).await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

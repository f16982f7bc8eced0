//! Rotating status messages shown while an analysis is running.
//!
//! Purely cosmetic: the ticker knows nothing about the request it decorates.

use std::time::Duration;

/// Messages cycled through while loading.
pub const LOADING_MESSAGES: [&str; 6] = [
    "Initializing AI model...",
    "Calibrating AI sensors...",
    "Analyzing image pixels...",
    "Examining retinal patterns...",
    "Cross-referencing medical data...",
    "Finalizing analysis report...",
];

/// Time each message stays on screen.
pub const TICK_INTERVAL: Duration = Duration::from_secs(2);

/// Message to show after `elapsed` time in the loading state.
pub fn message_at(elapsed: Duration) -> &'static str {
    message_for(elapsed, TICK_INTERVAL)
}

fn message_for(elapsed: Duration, interval: Duration) -> &'static str {
    let step = elapsed.as_millis() / interval.as_millis().max(1);
    LOADING_MESSAGES[(step % LOADING_MESSAGES.len() as u128) as usize]
}

/// Timer that publishes the next message on every tick.
#[derive(Debug, Clone, Copy)]
pub struct StatusTicker {
    interval: Duration,
}

impl Default for StatusTicker {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl StatusTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Publish messages forever, starting with the first one immediately.
    ///
    /// Never returns; stop it by dropping or aborting the future.
    pub async fn run<F>(self, mut publish: F)
    where
        F: FnMut(&'static str),
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut index = 0usize;
        loop {
            interval.tick().await;
            publish(LOADING_MESSAGES[index]);
            index = (index + 1) % LOADING_MESSAGES.len();
        }
    }
}

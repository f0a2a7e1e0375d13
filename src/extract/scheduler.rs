use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{error, info};

use super::{ExtractionOutcome, Extractor};

/// Background task running an extraction on a fixed cadence
///
/// Outcomes are only logged; a failure does not trigger an early retry, the
/// next attempt happens on the next tick.
pub struct ExtractionScheduler {
    extractor: Extractor,
    interval: Duration,
}

impl ExtractionScheduler {
    pub fn new(extractor: Extractor, interval: Duration) -> Self {
        Self {
            extractor,
            interval,
        }
    }

    /// Run until `shutdown_rx` reports `true` or its sender is dropped, and
    /// return the number of extractions run.
    ///
    /// The first extraction happens one interval after start. An extraction in
    /// flight when shutdown is signalled is allowed to finish.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> usize {
        info!("Extraction scheduler started, interval {:?}", self.interval);

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut runs = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.extractor.run_once(Utc::now()).await;
                    log_outcome(&outcome);
                    runs += 1;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Extraction scheduler received shutdown signal");
                        break;
                    }
                }
            }
        }

        info!("Extraction scheduler stopped after {} runs", runs);
        runs
    }
}

fn log_outcome(outcome: &ExtractionOutcome) {
    let rendered = serde_json::to_string(outcome).unwrap_or_else(|e| e.to_string());
    if outcome.is_success() {
        info!("Scheduled extraction finished: {}", rendered);
    } else {
        error!("Scheduled extraction failed: {}", rendered);
    }
}

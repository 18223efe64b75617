//! Client-side link monitoring.
//!
//! Wires the probe scheduler and quality estimator to the protocol: the
//! monitor mints `Probe` frames when one is due and digests `ProbeReply`
//! frames into a [`LinkQuality`] band. Purely advisory — nothing here
//! touches game state.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fourline_protocol::{ClientMessage, ServerMessage};
use fourline_quality::{LinkQuality, ProbeScheduler, QualityConfig, QualityEstimator};

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Tracks one connection's health through round-trip probes.
pub struct LinkMonitor {
    scheduler: ProbeScheduler,
    estimator: QualityEstimator,
}

impl LinkMonitor {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            estimator: QualityEstimator::new(&config),
            scheduler: ProbeScheduler::new(config),
        }
    }

    /// Call on (re)connect. Old samples are dropped so a previous link's
    /// latency doesn't color this one, and probing restarts from zero.
    pub fn connected(&mut self) {
        self.estimator.reset();
        self.scheduler.start();
    }

    /// Call the moment the transport drops. Probing stops immediately.
    pub fn disconnected(&mut self) {
        self.scheduler.stop();
    }

    /// Waits until the next probe is due and mints the frame to send.
    /// Pends forever while disconnected or past the probe cap, so it sits
    /// quietly in a client's `select!` loop.
    pub async fn next_probe(&mut self) -> ClientMessage {
        self.scheduler.next_probe_due().await;
        ClientMessage::Probe {
            sent_at: now_millis(),
        }
    }

    /// Digests a server message. Returns the updated band if the message
    /// was a probe reply, `None` otherwise.
    pub fn observe(&mut self, message: &ServerMessage) -> Option<LinkQuality> {
        let ServerMessage::ProbeReply { sent_at } = message else {
            return None;
        };
        let round_trip = Duration::from_millis(now_millis().saturating_sub(*sent_at));
        self.estimator.record_round_trip(round_trip);
        Some(self.estimator.quality())
    }

    /// The current band.
    pub fn quality(&self) -> LinkQuality {
        self.estimator.quality()
    }
}

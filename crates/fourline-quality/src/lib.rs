//! Connection quality estimation for Fourline clients.
//!
//! A client issues lightweight round-trip probes while its transport is
//! connected, feeds the replies into a [`QualityEstimator`], and shows the
//! resulting [`LinkQuality`] band in the UI. The classification is purely
//! advisory: it never gates resync and never alters game-state decisions.
//!
//! Two pieces:
//!
//! - [`ProbeScheduler`] — decides *when* to send the next probe. Sits in
//!   the client's `tokio::select!` loop and pends forever while stopped,
//!   mirroring how the session actor's turn timer behaves.
//! - [`QualityEstimator`] — a bounded sliding window of one-way latency
//!   samples and the banding rule over their running average.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Bands
// ---------------------------------------------------------------------------

/// Advisory link-health band, derived from the running average latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LinkQuality {
    /// No samples yet.
    Unknown,
    /// Average one-way latency below 50 ms.
    Excellent,
    /// Below 100 ms.
    Good,
    /// Below 200 ms.
    Fair,
    /// 200 ms or worse.
    Poor,
}

impl std::fmt::Display for LinkQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Settings for probing and classification.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Gap between probes while connected.
    pub probe_interval: Duration,
    /// Hard cap on probes per connection epoch; the scheduler goes
    /// silent once reached and the cap resets on the next `start()`.
    pub max_probes: u32,
    /// Sliding-window length (number of latency samples kept).
    pub window: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(2),
            max_probes: 100,
            window: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Bounded sliding window of one-way latency samples.
#[derive(Debug)]
pub struct QualityEstimator {
    window: usize,
    samples: VecDeque<Duration>,
}

impl QualityEstimator {
    const EXCELLENT_BELOW: Duration = Duration::from_millis(50);
    const GOOD_BELOW: Duration = Duration::from_millis(100);
    const FAIR_BELOW: Duration = Duration::from_millis(200);

    pub fn new(config: &QualityConfig) -> Self {
        Self {
            window: config.window.max(1),
            samples: VecDeque::new(),
        }
    }

    /// Records one probe reply. `round_trip` is reply time minus send
    /// time; the stored sample is the one-way equivalent (half of it),
    /// so in round-trip terms the band thresholds sit at 100 ms, 200 ms
    /// and 400 ms.
    pub fn record_round_trip(&mut self, round_trip: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(round_trip / 2);
        trace!(
            one_way_ms = (round_trip / 2).as_millis() as u64,
            samples = self.samples.len(),
            "latency sample recorded"
        );
    }

    /// Running average over the window, or `None` before the first sample.
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    /// Current band. `Unknown` until a sample arrives.
    pub fn quality(&self) -> LinkQuality {
        let Some(avg) = self.average() else {
            return LinkQuality::Unknown;
        };
        if avg < Self::EXCELLENT_BELOW {
            LinkQuality::Excellent
        } else if avg < Self::GOOD_BELOW {
            LinkQuality::Good
        } else if avg < Self::FAIR_BELOW {
            LinkQuality::Fair
        } else {
            LinkQuality::Poor
        }
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Drops all samples. Called when a new connection epoch begins so
    /// stale latency from a previous link doesn't color the new one.
    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

// ---------------------------------------------------------------------------
// Probe scheduler
// ---------------------------------------------------------------------------

/// Decides when the next probe is due.
///
/// `start()` on (re)connect, `stop()` the moment the transport drops.
/// [`ProbeScheduler::next_probe_due`] pends forever while stopped or once
/// the per-epoch probe cap is reached.
#[derive(Debug)]
pub struct ProbeScheduler {
    config: QualityConfig,
    running: bool,
    probes_sent: u32,
    next_probe: Option<TokioInstant>,
}

impl ProbeScheduler {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config,
            running: false,
            probes_sent: 0,
            next_probe: None,
        }
    }

    /// Begins a probing epoch: the probe counter resets and the first
    /// probe is due one interval from now.
    pub fn start(&mut self) {
        self.running = true;
        self.probes_sent = 0;
        self.next_probe = Some(TokioInstant::now() + self.config.probe_interval);
        debug!(
            interval_ms = self.config.probe_interval.as_millis() as u64,
            "probe scheduler started"
        );
    }

    /// Stops probing immediately. Idempotent.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.next_probe = None;
            debug!(sent = self.probes_sent, "probe scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Probes sent in the current epoch.
    pub fn probes_sent(&self) -> u32 {
        self.probes_sent
    }

    /// Waits until the next probe should be sent.
    ///
    /// Resolving counts as sending: the caller is expected to put a probe
    /// on the wire when this returns. Pends forever while stopped or
    /// after `max_probes` resolutions in this epoch.
    pub async fn next_probe_due(&mut self) {
        let due = match self.next_probe {
            Some(due) if self.running && self.probes_sent < self.config.max_probes => due,
            _ => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(due).await;
        self.probes_sent += 1;
        if self.probes_sent >= self.config.max_probes {
            debug!(cap = self.config.max_probes, "probe cap reached");
            self.next_probe = None;
        } else {
            self.next_probe = Some(due + self.config.probe_interval);
        }
    }
}

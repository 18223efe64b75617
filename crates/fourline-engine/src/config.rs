//! Engine configuration.

use std::time::Duration;

use fourline_timer::TimerConfig;

/// Tunables for session actors.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Per-turn time budget; expiry forfeits the turn.
    pub turn_budget: Duration,
    /// How long an actor with no attached clients stays alive before it
    /// stops and becomes reapable.
    pub idle_timeout: Duration,
    /// Depth of each actor's command channel.
    pub command_buffer: usize,
}

impl SessionConfig {
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

    /// Timer settings derived from this config.
    pub fn timer(&self) -> TimerConfig {
        TimerConfig {
            turn_budget: self.turn_budget,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_budget: TimerConfig::DEFAULT_TURN_BUDGET,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            command_buffer: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_turn_budget_matches_timer_default() {
        let config = SessionConfig::default();
        assert_eq!(config.turn_budget, Duration::from_secs(30));
        assert_eq!(config.timer().turn_budget, config.turn_budget);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
    }
}

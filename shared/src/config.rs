//! Runtime configuration for the core.
//!
//! Shells may send a JSON document through [`crate::Event::Configure`]. Any
//! field left out keeps its default.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    AppError, ErrorKind, CHAT_REPLY_DELAY, INCOMING_EVENT_INTERVAL, MAX_PRESENCE_JITTER_DEG,
    NOTIFICATION_TTL, OUTBOUND_ANSWER_DELAY, PRESENCE_JITTER_DEG, PRESENCE_TICK_INTERVAL,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("presence_jitter_deg must be between 0 and {max}, got {value}")]
    JitterOutOfRange { value: f64, max: f64 },
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Delay before a simulated partner answers an outbound call or audio request
    pub outbound_answer_delay_ms: u64,
    /// Delay before the canned chat reply arrives
    pub chat_reply_delay_ms: u64,
    /// How long each notification stays visible
    pub notification_ttl_ms: u64,
    /// Interval between simulated presence movements
    pub presence_tick_ms: u64,
    /// Interval between simulated incoming calls or audio requests
    pub incoming_event_interval_ms: u64,
    /// Maximum movement per axis per presence tick, in degrees
    pub presence_jitter_deg: f64,
    /// Whether to simulate incoming sessions at all
    pub simulate_incoming: bool,
    /// Fixed seed for the simulation RNG (None seeds from entropy)
    pub rng_seed: Option<u64>,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            outbound_answer_delay_ms: millis(OUTBOUND_ANSWER_DELAY),
            chat_reply_delay_ms: millis(CHAT_REPLY_DELAY),
            notification_ttl_ms: millis(NOTIFICATION_TTL),
            presence_tick_ms: millis(PRESENCE_TICK_INTERVAL),
            incoming_event_interval_ms: millis(INCOMING_EVENT_INTERVAL),
            presence_jitter_deg: PRESENCE_JITTER_DEG,
            simulate_incoming: true,
            rng_seed: None,
        }
    }
}

impl CoreConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("outbound_answer_delay_ms", self.outbound_answer_delay_ms),
            ("chat_reply_delay_ms", self.chat_reply_delay_ms),
            ("notification_ttl_ms", self.notification_ttl_ms),
            ("presence_tick_ms", self.presence_tick_ms),
            ("incoming_event_interval_ms", self.incoming_event_interval_ms),
        ];
        if let Some((field, _)) = durations.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ZeroDuration { field: *field });
        }
        let jitter = self.presence_jitter_deg;
        if !jitter.is_finite() || !(0.0..=MAX_PRESENCE_JITTER_DEG).contains(&jitter) {
            return Err(ConfigError::JitterOutOfRange {
                value: jitter,
                max: MAX_PRESENCE_JITTER_DEG,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn outbound_answer_delay(&self) -> Duration {
        Duration::from_millis(self.outbound_answer_delay_ms)
    }

    #[must_use]
    pub const fn chat_reply_delay(&self) -> Duration {
        Duration::from_millis(self.chat_reply_delay_ms)
    }

    #[must_use]
    pub const fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }

    #[must_use]
    pub const fn presence_tick(&self) -> Duration {
        Duration::from_millis(self.presence_tick_ms)
    }

    #[must_use]
    pub const fn incoming_event_interval(&self) -> Duration {
        Duration::from_millis(self.incoming_event_interval_ms)
    }
}

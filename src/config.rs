//! Runtime configuration.
//!
//! [`Config`] carries the scheduler cadence, the per-request timeout, the
//! reaping policy and the TLS trust policy. Every field has a default, so a
//! configuration document only needs to name what it changes:
//!
//! ```rust
//! use httpmux::config::{Config, ReapPolicy};
//!
//! let config = Config::from_json(br#"{"tick_interval_ms": 20, "reap_policy": "all"}"#).unwrap();
//! assert_eq!(config.tick_interval_ms, 20);
//! assert_eq!(config.reap_policy, ReapPolicy::All);
//! assert_eq!(config.request_timeout_ms, 60_000);
//! ```

use crate::network::error::Error;
use crate::network::http::TlsPolicy;
use serde::Deserialize;

/// Delay between scheduler ticks.
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 50;
/// Timeout handed to every transport.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u32 = 60_000;
/// Watchdog timeout armed by the scheduler thread.
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u32 = 60_000;
/// Stack size of the scheduler thread.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// How many dead requests one tick disposes of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReapPolicy {
    /// At most one per tick, bounding the disposal work of a single tick.
    #[default]
    OnePerTick,
    /// Every dead request, in the tick it died.
    All,
}

/// Scheduler and transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delay between scheduler ticks, in milliseconds.
    pub tick_interval_ms: u32,
    /// Timeout applied to every request's transport, in milliseconds.
    pub request_timeout_ms: u32,
    /// Watchdog timeout armed when the scheduler starts, in milliseconds.
    pub watchdog_timeout_ms: u32,
    /// How many dead requests one tick disposes of.
    pub reap_policy: ReapPolicy,
    /// TLS trust policy handed to every transport.
    pub tls: TlsPolicy,
    /// Stack size of the scheduler thread, in bytes.
    pub stack_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
            reap_policy: ReapPolicy::default(),
            tls: TlsPolicy::default(),
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl Config {
    /// Parse a JSON configuration document.
    ///
    /// Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the document is not valid JSON or
    /// a field has the wrong type.
    pub fn from_json(json: &[u8]) -> Result<Self, Error> {
        serde_json_core::from_slice::<Config>(json)
            .map(|(config, _)| config)
            .map_err(|_| Error::InvalidConfig)
    }

    /// Tick interval as a `Duration`.
    #[cfg(feature = "std")]
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.tick_interval_ms))
    }
}

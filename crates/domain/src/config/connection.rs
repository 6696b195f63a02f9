use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection tuning
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Messaging API version sent as the `v` query parameter.
    #[serde(default = "d_api_version")]
    pub api_version: String,
    /// WebSocket scheme. `wss` in production; `ws` for local test servers.
    #[serde(default = "d_scheme")]
    pub scheme: String,
    /// Default per-request deadline.
    #[serde(default = "d_10000")]
    pub request_timeout_ms: u64,
    /// How often the timeout supervisor sweeps pending requests.
    #[serde(default = "d_1000")]
    pub sweep_interval_ms: u64,
    /// Interval of the clock keep-alive probe. `0` disables the probe.
    #[serde(default = "d_60000")]
    pub keepalive_interval_ms: u64,
    /// Interval of the low-level WebSocket ping.
    #[serde(default = "d_60000")]
    pub ping_interval_ms: u64,
    /// Buffered events per subscriber before slow subscribers lag.
    #[serde(default = "d_1024")]
    pub event_capacity: usize,
    /// Reconnect automatically (jittered back-off) after an unexpected close.
    #[serde(default)]
    pub auto_reconnect: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            api_version: d_api_version(),
            scheme: d_scheme(),
            request_timeout_ms: 10_000,
            sweep_interval_ms: 1_000,
            keepalive_interval_ms: 60_000,
            ping_interval_ms: 60_000,
            event_capacity: 1024,
            auto_reconnect: false,
        }
    }
}

impl ConnectionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_version() -> String {
    "2.1".into()
}
fn d_scheme() -> String {
    "wss".into()
}
fn d_10000() -> u64 {
    10_000
}
fn d_1000() -> u64 {
    1_000
}
fn d_60000() -> u64 {
    60_000
}
fn d_1024() -> usize {
    1024
}

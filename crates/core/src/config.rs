// UpdiLink - UPDI Physical-Layer Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// How the half-duplex echo after a transmit flush is handled.
///
/// UPDI is a single-wire link, so the programmer reads back its own
/// transmissions. The stock behavior is to consume and discard them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EchoPolicy {
    #[default]
    Discard,
    Verify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Ticks of transmit-queue inactivity required before queued bytes
    /// are flushed to the device in one write.
    pub settle_ticks: u64,
    /// Echo handling after a transmit flush.
    pub echo: EchoPolicy,
    /// Per-byte receive timeout; bounds worst-case tick latency.
    pub read_timeout_ms: u64,
    /// Next-service hint returned from the break-start tick, letting
    /// the driver fast-forward past the real-time break pulse.
    pub break_hold_ticks: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            settle_ticks: 4,
            echo: EchoPolicy::Discard,
            read_timeout_ms: 100,
            break_hold_ticks: 1000,
        }
    }
}

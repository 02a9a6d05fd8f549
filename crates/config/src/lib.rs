// UpdiLink - UPDI Physical-Layer Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use updilink_core::{BridgeConfig, EchoPolicy, LineSettings};

/// Default schema version for YAML link manifests
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_baud() -> u32 {
    57_600
}

fn default_break_baud() -> u32 {
    300
}

fn default_settle_ticks() -> u64 {
    4
}

fn default_read_timeout_ms() -> u64 {
    100
}

fn default_break_hold_ticks() -> u64 {
    1000
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UartSection {
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_break_baud")]
    pub break_baud: u32,
}

impl Default for UartSection {
    fn default() -> Self {
        Self {
            baud: default_baud(),
            break_baud: default_break_baud(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerSection {
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u64,
    #[serde(default)]
    pub verify_echo: bool,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_break_hold_ticks")]
    pub break_hold_ticks: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            settle_ticks: default_settle_ticks(),
            verify_echo: false,
            read_timeout_ms: default_read_timeout_ms(),
            break_hold_ticks: default_break_hold_ticks(),
        }
    }
}

/// Describes one physical UPDI link: the device it sits on, the line
/// rates, and the scheduler tuning.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LinkManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    /// Serial device path, e.g. /dev/ttyUSB0.
    pub device: String,
    #[serde(default)]
    pub uart: UartSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
}

impl LinkManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read link manifest {:?}", path))?;
        let manifest: LinkManifest = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse link manifest {:?}", path))?;
        tracing::debug!("Loaded link manifest '{}' from {:?}", manifest.name, path);
        Ok(manifest)
    }

    pub fn line_settings(&self) -> LineSettings {
        LineSettings {
            operating_baud: self.uart.baud,
            break_baud: self.uart.break_baud,
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            settle_ticks: self.scheduler.settle_ticks,
            echo: if self.scheduler.verify_echo {
                EchoPolicy::Verify
            } else {
                EchoPolicy::Discard
            },
            read_timeout_ms: self.scheduler.read_timeout_ms,
            break_hold_ticks: self.scheduler.break_hold_ticks,
        }
    }
}

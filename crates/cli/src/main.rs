// UpdiLink - UPDI Physical-Layer Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use updilink_config::LinkManifest;
use updilink_core::{BridgeConfig, EchoPolicy, LineSettings, UpdiPhyBridge, UpdiSignals};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about = "UpdiLink bridge driver", long_about = None)]
struct Cli {
    /// Serial device the bridge attaches to (e.g. /dev/ttyUSB0)
    #[arg(short, long)]
    device: Option<String>,

    /// Path to a link manifest (YAML); flags override its values
    #[arg(short, long)]
    link: Option<PathBuf>,

    /// Number of simulated ticks to drive the bridge for
    #[arg(long, default_value = "20000")]
    max_ticks: u64,

    /// Override the scheduler settle threshold, in ticks
    #[arg(long)]
    settle_ticks: Option<u64>,

    /// Verify the half-duplex echo instead of discarding it
    #[arg(long)]
    verify_echo: bool,

    /// Issue a double-break link reset on the first tick
    #[arg(long)]
    send_break: bool,

    /// Write a bridge state snapshot (JSON) after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable debug-level tracing
    #[arg(short, long)]
    trace: bool,
}

struct ResolvedSetup {
    device: String,
    line: LineSettings,
    config: BridgeConfig,
}

fn resolve_setup(cli: &Cli) -> anyhow::Result<ResolvedSetup> {
    let (mut device, line, mut config) = match &cli.link {
        Some(path) => {
            let manifest = LinkManifest::from_file(path)?;
            (
                Some(manifest.device.clone()),
                manifest.line_settings(),
                manifest.bridge_config(),
            )
        }
        None => (None, LineSettings::default(), BridgeConfig::default()),
    };

    // Flags win over the manifest.
    if cli.device.is_some() {
        device = cli.device.clone();
    }
    if let Some(settle) = cli.settle_ticks {
        config.settle_ticks = settle;
    }
    if cli.verify_echo {
        config.echo = EchoPolicy::Verify;
    }

    Ok(ResolvedSetup {
        device: device.context("either --device or --link is required")?,
        line,
        config,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let setup = match resolve_setup(&cli) {
        Ok(setup) => setup,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match run(&cli, setup) {
        Ok(()) => ExitCode::from(EXIT_PASS),
        Err(e) => {
            error!("Bridge stopped: {:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run(cli: &Cli, setup: ResolvedSetup) -> anyhow::Result<()> {
    let mut bridge = UpdiPhyBridge::open(&setup.device, setup.line, setup.config)?;
    let mut signals = UpdiSignals::new();

    info!(
        "Driving bridge on {} for up to {} tick(s)",
        setup.device, cli.max_ticks
    );

    signals.double_break_start = cli.send_break;

    let mut tick = 0u64;
    while tick < cli.max_ticks {
        let advance = bridge.tick(&mut signals)?;

        // The real consumer of received bytes is the simulated design;
        // this driver just pops and logs them.
        if signals.uart_rx_fifo_rd_en {
            info!("rx byte {:#04x}", signals.uart_rx_fifo_data_out);
        }
        signals.clear_strobes();
        // Gate the next read on post-pop occupancy; the published empty
        // flag lags a same-tick pop by one tick.
        signals.uart_rx_fifo_rd_en = bridge.rx_pending() > 0;

        tick += advance.max(1);
    }

    if let Some(path) = &cli.snapshot {
        let snapshot = serde_json::to_string_pretty(&bridge.snapshot())?;
        std::fs::write(path, snapshot)
            .with_context(|| format!("Failed to write snapshot {:?}", path))?;
        info!("Snapshot written to {:?}", path);
    }

    Ok(())
}

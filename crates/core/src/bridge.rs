// UpdiLink - UPDI Physical-Layer Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::time::Duration;

use crate::config::{BridgeConfig, EchoPolicy};
use crate::fifo::{ByteFifo, FIFO_DEPTH};
use crate::signals::UpdiSignals;
use crate::transport::LineSettings;
use crate::{BridgeError, BridgeResult, SerialTransport};

/// Double-break handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    #[default]
    Idle,
    /// The port is being re-rated and the break byte written. Left
    /// within the same tick; only observable if that action fails.
    BreakStarting,
    BreakBusy,
    BreakDone,
}

/// Drop-in replacement for the design's `updi_phy` module.
///
/// Once per simulated clock tick the bridge samples the UART FIFO
/// signals, moves at most one byte per side between the signals and its
/// queues, batches settled transmit bytes out to the physical serial
/// device, injects received bytes back, and sequences the UPDI double
/// break by temporarily re-rating the port.
///
/// The transport is owned exclusively for the bridge's lifetime and
/// only touched from `tick`, so there is exactly one logical thread of
/// control and no locking anywhere.
#[derive(serde::Serialize)]
#[serde(bound(serialize = ""))]
pub struct UpdiPhyBridge<T> {
    #[serde(skip)]
    transport: T,
    line: LineSettings,
    config: BridgeConfig,
    state: BridgeState,
    tx_fifo: ByteFifo,
    rx_fifo: ByteFifo,
    /// Ticks since construction. Never reset.
    ticks: u64,
    /// Tick of the last transmit-queue append; only updated on appends.
    last_tx_tick: u64,
}

impl UpdiPhyBridge<crate::transport::SystemSerial> {
    /// Open `path` and attach a bridge to it.
    pub fn open(path: &str, line: LineSettings, config: BridgeConfig) -> BridgeResult<Self> {
        let transport = crate::transport::SystemSerial::open(path, &line)?;
        Ok(Self::new(transport, line, config))
    }
}

impl<T: SerialTransport> UpdiPhyBridge<T> {
    pub fn new(transport: T, line: LineSettings, config: BridgeConfig) -> Self {
        Self {
            transport,
            line,
            config,
            state: BridgeState::Idle,
            tx_fifo: ByteFifo::bounded(FIFO_DEPTH),
            rx_fifo: ByteFifo::unbounded(),
            ticks: 0,
            last_tx_tick: 0,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tx_pending(&self) -> usize {
        self.tx_fifo.len()
    }

    pub fn rx_pending(&self) -> usize {
        self.rx_fifo.len()
    }

    /// Process one simulated clock tick.
    ///
    /// Returns the number of simulated cycles until the bridge next
    /// needs servicing: 1 in steady state, `break_hold_ticks` from the
    /// break-start tick (the real break pulse outlasts a tick by
    /// design, so the driver may fast-forward).
    pub fn tick(&mut self, signals: &mut UpdiSignals) -> BridgeResult<u64> {
        let hint = self.run_tick(signals);
        self.ticks += 1;
        hint
    }

    fn run_tick(&mut self, signals: &mut UpdiSignals) -> BridgeResult<u64> {
        match self.state {
            BridgeState::Idle if signals.double_break_start => {
                self.send_double_break()?;
                self.state = BridgeState::BreakBusy;
                signals.double_break_busy = true;
                Ok(self.config.break_hold_ticks)
            }
            BridgeState::Idle => {
                self.adapt_fifos(signals)?;
                self.transfer()?;
                Ok(1)
            }
            // The two arms below ignore break_start on purpose: a
            // sequence in flight always completes before another starts.
            BridgeState::BreakBusy => {
                self.state = BridgeState::BreakDone;
                signals.double_break_busy = false;
                signals.double_break_done = true;
                Ok(1)
            }
            BridgeState::BreakDone => {
                self.state = BridgeState::Idle;
                signals.double_break_done = false;
                Ok(1)
            }
            BridgeState::BreakStarting => Err(BridgeError::Transport(
                "ticked while a break sequence was left unfinished".to_string(),
            )),
        }
    }

    /// Re-rate the port, hold the line low for one slow character,
    /// restore the operating rate.
    ///
    /// Blocking by design: the pulse must be on the wire before this
    /// tick returns. The restore runs even when the break itself
    /// failed; the port must never be left at the break rate.
    fn send_double_break(&mut self) -> BridgeResult<()> {
        self.state = BridgeState::BreakStarting;
        tracing::info!(
            "double break: {} baud pulse, then back to {}",
            self.line.break_baud,
            self.line.operating_baud
        );
        let pulse = self
            .transport
            .set_baud_rate(self.line.break_baud)
            .and_then(|_| self.transport.write_bytes(&[0x00]));
        match self.transport.set_baud_rate(self.line.operating_baud) {
            Ok(()) => pulse,
            Err(restore) => Err(BridgeError::RecoveryFailed(restore.to_string())),
        }
    }

    /// Publish flow-control flags and move at most one byte per side
    /// between the simulated FIFO signals and the queues. No physical
    /// I/O happens here.
    fn adapt_fifos(&mut self, signals: &mut UpdiSignals) -> BridgeResult<()> {
        // Both flags go out before either side moves a byte, so a
        // discipline violation on one side never leaves the other
        // half-published for the tick.
        signals.uart_tx_fifo_full = self.tx_fifo.is_full();
        signals.uart_rx_fifo_empty = self.rx_fifo.is_empty();

        if signals.uart_tx_fifo_wr_en {
            self.tx_fifo.push(signals.uart_tx_fifo_data_in)?;
            self.last_tx_tick = self.ticks;
        }
        if signals.uart_rx_fifo_rd_en {
            signals.uart_rx_fifo_data_out = self.rx_fifo.pop()?;
        }
        Ok(())
    }

    /// Batched physical I/O: flush the settled transmit queue in one
    /// write, then drain whatever the device already has ready.
    fn transfer(&mut self) -> BridgeResult<()> {
        if !self.tx_fifo.is_empty()
            && self.ticks - self.last_tx_tick >= self.config.settle_ticks
        {
            self.flush_tx()?;
        }
        self.drain_rx()
    }

    fn flush_tx(&mut self) -> BridgeResult<()> {
        let frame = self.tx_fifo.drain_all();
        tracing::debug!(
            "flushing {} byte(s) after {} idle tick(s)",
            frame.len(),
            self.ticks - self.last_tx_tick
        );
        self.transport.write_bytes(&frame)?;
        self.consume_echo(&frame)
    }

    /// The single-wire link echoes everything the bridge sends; read it
    /// back so it never surfaces as receive data.
    fn consume_echo(&mut self, sent: &[u8]) -> BridgeResult<()> {
        let timeout = Duration::from_millis(self.config.read_timeout_ms);
        let mut echoed = Vec::with_capacity(sent.len());
        for _ in 0..sent.len() {
            match self.transport.read_byte(timeout)? {
                Some(byte) => echoed.push(byte),
                None => break,
            }
        }
        if self.config.echo == EchoPolicy::Verify && echoed != sent {
            return Err(BridgeError::EchoMismatch {
                sent: sent.to_vec(),
                received: echoed,
            });
        }
        Ok(())
    }

    fn drain_rx(&mut self) -> BridgeResult<()> {
        let timeout = Duration::from_millis(self.config.read_timeout_ms);
        while self.transport.bytes_available()? > 0 {
            match self.transport.read_byte(timeout)? {
                Some(byte) => self.rx_fifo.push(byte)?,
                // Available but not delivered in time; retry next tick.
                None => break,
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct MockState {
        writes: Vec<Vec<u8>>,
        rx: VecDeque<u8>,
        bauds: Vec<u32>,
        half_duplex_echo: bool,
        fail_on_baud: Option<u32>,
    }

    #[derive(Debug, Clone, Default)]
    struct MockSerial(Arc<Mutex<MockState>>);

    impl SerialTransport for MockSerial {
        fn set_baud_rate(&mut self, baud: u32) -> BridgeResult<()> {
            let mut st = self.0.lock().unwrap();
            if st.fail_on_baud == Some(baud) {
                return Err(BridgeError::Transport(format!(
                    "cannot set {} baud",
                    baud
                )));
            }
            st.bauds.push(baud);
            Ok(())
        }

        fn write_bytes(&mut self, data: &[u8]) -> BridgeResult<()> {
            let mut st = self.0.lock().unwrap();
            st.writes.push(data.to_vec());
            if st.half_duplex_echo {
                st.rx.extend(data.iter().copied());
            }
            Ok(())
        }

        fn read_byte(&mut self, _timeout: Duration) -> BridgeResult<Option<u8>> {
            Ok(self.0.lock().unwrap().rx.pop_front())
        }

        fn bytes_available(&mut self) -> BridgeResult<usize> {
            Ok(self.0.lock().unwrap().rx.len())
        }
    }

    fn bridge_with(config: BridgeConfig) -> (UpdiPhyBridge<MockSerial>, Arc<Mutex<MockState>>) {
        let mock = MockSerial::default();
        let state = mock.0.clone();
        (
            UpdiPhyBridge::new(mock, LineSettings::default(), config),
            state,
        )
    }

    #[test]
    fn test_tick_counter_monotonic() {
        let (mut bridge, _) = bridge_with(BridgeConfig::default());
        let mut sig = UpdiSignals::new();
        for expected in 0..5 {
            assert_eq!(bridge.ticks(), expected);
            bridge.tick(&mut sig).unwrap();
        }
    }

    #[test]
    fn test_settled_queue_flushes_in_one_write() {
        let config = BridgeConfig {
            settle_ticks: 2,
            ..Default::default()
        };
        let (mut bridge, state) = bridge_with(config);
        let mut sig = UpdiSignals::new();

        for byte in [0x10, 0x20, 0x30] {
            sig.uart_tx_fifo_wr_en = true;
            sig.uart_tx_fifo_data_in = byte;
            bridge.tick(&mut sig).unwrap();
            sig.clear_strobes();
        }
        assert_eq!(bridge.tx_pending(), 3);
        assert!(state.lock().unwrap().writes.is_empty());

        // Last append was tick 2; the threshold elapses on tick 4.
        bridge.tick(&mut sig).unwrap();
        assert!(state.lock().unwrap().writes.is_empty());
        bridge.tick(&mut sig).unwrap();

        assert_eq!(state.lock().unwrap().writes, vec![vec![0x10, 0x20, 0x30]]);
        assert_eq!(bridge.tx_pending(), 0);
    }

    #[test]
    fn test_echo_discarded_not_received() {
        let config = BridgeConfig {
            settle_ticks: 0,
            ..Default::default()
        };
        let (mut bridge, state) = bridge_with(config);
        state.lock().unwrap().half_duplex_echo = true;
        let mut sig = UpdiSignals::new();

        sig.uart_tx_fifo_wr_en = true;
        sig.uart_tx_fifo_data_in = 0x55;
        bridge.tick(&mut sig).unwrap();

        assert_eq!(state.lock().unwrap().writes, vec![vec![0x55]]);
        assert_eq!(bridge.rx_pending(), 0);
    }

    #[test]
    fn test_echo_verify_flags_mismatch() {
        let config = BridgeConfig {
            settle_ticks: 0,
            echo: EchoPolicy::Verify,
            ..Default::default()
        };
        let (mut bridge, state) = bridge_with(config);
        // A stuck-low wire echoes zeros regardless of what was sent.
        state.lock().unwrap().rx.push_back(0x00);
        let mut sig = UpdiSignals::new();

        sig.uart_tx_fifo_wr_en = true;
        sig.uart_tx_fifo_data_in = 0x55;
        let err = bridge.tick(&mut sig).unwrap_err();
        match err {
            BridgeError::EchoMismatch { sent, received } => {
                assert_eq!(sent, vec![0x55]);
                assert_eq!(received, vec![0x00]);
            }
            other => panic!("expected EchoMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_break_restores_operating_baud() {
        let (mut bridge, state) = bridge_with(BridgeConfig::default());
        let mut sig = UpdiSignals::new();
        sig.double_break_start = true;
        bridge.tick(&mut sig).unwrap();

        let st = state.lock().unwrap();
        assert_eq!(st.bauds, vec![300, 57_600]);
        assert_eq!(st.writes, vec![vec![0x00]]);
    }

    #[test]
    fn test_break_restore_failure_is_recovery_failed() {
        let (mut bridge, state) = bridge_with(BridgeConfig::default());
        state.lock().unwrap().fail_on_baud = Some(57_600);
        let mut sig = UpdiSignals::new();
        sig.double_break_start = true;
        assert!(matches!(
            bridge.tick(&mut sig),
            Err(BridgeError::RecoveryFailed(_))
        ));
    }

    #[test]
    fn test_snapshot_carries_state_and_ticks() {
        let (mut bridge, _) = bridge_with(BridgeConfig::default());
        let mut sig = UpdiSignals::new();
        bridge.tick(&mut sig).unwrap();
        let snap = bridge.snapshot();
        assert_eq!(snap["state"], "idle");
        assert_eq!(snap["ticks"], 1);
    }
}

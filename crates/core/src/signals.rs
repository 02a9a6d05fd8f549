// UpdiLink - UPDI Physical-Layer Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Per-tick signal state exchanged with the simulated design.
///
/// Inbound fields are read-only for the duration of a tick. Fields
/// marked (out) are recomputed in place by the bridge before the tick
/// call returns; flags are derived from current queue sizes, so a
/// producer observes them one tick stale relative to its own write,
/// matching simulated-bus semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdiSignals {
    /// Request a double-break link reset.
    pub double_break_start: bool,
    /// (out) High for exactly one tick once the break pulse has been sent.
    pub double_break_busy: bool,
    /// (out) High for exactly one tick after `double_break_busy` falls.
    pub double_break_done: bool,
    pub uart_tx_fifo_wr_en: bool,
    pub uart_tx_fifo_data_in: u8,
    /// (out) Transmit queue at the advertised FIFO depth.
    pub uart_tx_fifo_full: bool,
    pub uart_rx_fifo_rd_en: bool,
    /// (out) Front of the receive queue when `uart_rx_fifo_rd_en` is set.
    pub uart_rx_fifo_data_out: u8,
    /// (out) Receive queue holds no bytes.
    pub uart_rx_fifo_empty: bool,
}

impl Default for UpdiSignals {
    /// Reset state: no requests pending, both queues empty. The empty
    /// flag starts high so a consumer never reads before the first
    /// publication.
    fn default() -> Self {
        Self {
            double_break_start: false,
            double_break_busy: false,
            double_break_done: false,
            uart_tx_fifo_wr_en: false,
            uart_tx_fifo_data_in: 0,
            uart_tx_fifo_full: false,
            uart_rx_fifo_rd_en: false,
            uart_rx_fifo_data_out: 0,
            uart_rx_fifo_empty: true,
        }
    }
}

impl UpdiSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the one-shot inbound strobes after a tick has consumed them.
    pub fn clear_strobes(&mut self) {
        self.double_break_start = false;
        self.uart_tx_fifo_wr_en = false;
        self.uart_rx_fifo_rd_en = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_default_idle() {
        let sig = UpdiSignals::new();
        assert!(!sig.double_break_start);
        assert!(!sig.uart_tx_fifo_full);
        assert!(sig.uart_rx_fifo_empty);
        assert_eq!(sig.uart_rx_fifo_data_out, 0);
    }

    #[test]
    fn test_clear_strobes_keeps_outputs() {
        let mut sig = UpdiSignals {
            double_break_start: true,
            double_break_busy: true,
            uart_tx_fifo_wr_en: true,
            uart_rx_fifo_rd_en: true,
            uart_rx_fifo_empty: true,
            ..Default::default()
        };
        sig.clear_strobes();
        assert!(!sig.double_break_start);
        assert!(!sig.uart_tx_fifo_wr_en);
        assert!(!sig.uart_rx_fifo_rd_en);
        assert!(sig.double_break_busy);
        assert!(sig.uart_rx_fifo_empty);
    }
}

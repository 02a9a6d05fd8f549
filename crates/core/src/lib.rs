// UpdiLink - UPDI Physical-Layer Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bridge;
pub mod config;
pub mod fifo;
pub mod signals;
pub mod transport;

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("serial transport failure: {0}")]
    Transport(String),
    #[error("break sequence failed and the operating baud rate could not be restored: {0}")]
    RecoveryFailed(String),
    #[error("RX FIFO read with rd_en asserted while empty")]
    ReceiveUnderflow,
    #[error("TX FIFO write with wr_en asserted while full")]
    TransmitOverflow,
    #[error("echo verification failed: sent {sent:02x?}, received {received:02x?}")]
    EchoMismatch { sent: Vec<u8>, received: Vec<u8> },
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Capability the bridge uses to reach the physical serial device.
///
/// The bridge owns its transport exclusively and only calls it from the
/// per-tick entry point, so implementations need no locking.
pub trait SerialTransport {
    /// Reconfigure the line rate in place; framing is unchanged.
    fn set_baud_rate(&mut self, baud: u32) -> BridgeResult<()>;

    /// Write the whole buffer to the device.
    fn write_bytes(&mut self, data: &[u8]) -> BridgeResult<()>;

    /// Read one byte, waiting at most `timeout`. `Ok(None)` means the
    /// timeout elapsed with no data, which is not a failure.
    fn read_byte(&mut self, timeout: Duration) -> BridgeResult<Option<u8>>;

    /// Number of bytes the device driver has already buffered.
    fn bytes_available(&mut self) -> BridgeResult<usize>;
}

pub use bridge::{BridgeState, UpdiPhyBridge};
pub use config::{BridgeConfig, EchoPolicy};
pub use signals::UpdiSignals;
pub use transport::{LineSettings, SystemSerial};

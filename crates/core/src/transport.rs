// UpdiLink - UPDI Physical-Layer Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::{BridgeError, BridgeResult, SerialTransport};

/// Line configuration for the physical UPDI link.
///
/// Framing is fixed by the protocol (even parity, two stop bits, eight
/// data bits); only the two rates vary. The break rate is slow enough
/// that one zero character holds the line low for the required twelve
/// bit times at the operating rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LineSettings {
    pub operating_baud: u32,
    pub break_baud: u32,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            operating_baud: 57_600,
            break_baud: 300,
        }
    }
}

impl From<serialport::Error> for BridgeError {
    fn from(err: serialport::Error) -> Self {
        BridgeError::Transport(err.to_string())
    }
}

/// Production transport over a named OS serial device.
pub struct SystemSerial {
    port: Box<dyn SerialPort>,
}

impl SystemSerial {
    /// Open `path` with UPDI framing at the operating baud rate.
    pub fn open(path: &str, settings: &LineSettings) -> BridgeResult<Self> {
        let port = serialport::new(path, settings.operating_baud)
            .parity(Parity::Even)
            .stop_bits(StopBits::Two)
            .data_bits(DataBits::Eight)
            .timeout(Duration::from_millis(100))
            .open()?;
        tracing::info!("Opened {} at {} baud", path, settings.operating_baud);
        Ok(Self { port })
    }
}

impl SerialTransport for SystemSerial {
    fn set_baud_rate(&mut self, baud: u32) -> BridgeResult<()> {
        self.port.set_baud_rate(baud)?;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> BridgeResult<()> {
        self.port
            .write_all(data)
            .and_then(|_| self.port.flush())
            .map_err(|e| BridgeError::Transport(e.to_string()))
    }

    fn read_byte(&mut self, timeout: Duration) -> BridgeResult<Option<u8>> {
        self.port.set_timeout(timeout)?;
        let mut buf = [0u8; 1];
        match self.port.read_exact(&mut buf) {
            Ok(()) => Ok(Some(buf[0])),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(BridgeError::Transport(e.to_string())),
        }
    }

    fn bytes_available(&mut self) -> BridgeResult<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }
}

// UpdiLink - UPDI Physical-Layer Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::collections::VecDeque;

use crate::{BridgeError, BridgeResult};

/// Depth of the simulated peripheral's hardware FIFOs.
pub const FIFO_DEPTH: usize = 16;

/// Byte FIFO with an advertised depth.
///
/// Discipline violations are loud: pushing past the depth or popping
/// while empty is a contract violation by the producer, never silently
/// tolerated.
#[derive(Debug, Default, serde::Serialize)]
pub struct ByteFifo {
    bytes: VecDeque<u8>,
    depth: Option<usize>,
}

impl ByteFifo {
    pub fn bounded(depth: usize) -> Self {
        Self {
            bytes: VecDeque::with_capacity(depth),
            depth: Some(depth),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            bytes: VecDeque::new(),
            depth: None,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Full against the advertised depth, not the backing allocation.
    pub fn is_full(&self) -> bool {
        match self.depth {
            Some(depth) => self.bytes.len() >= depth,
            None => false,
        }
    }

    pub fn push(&mut self, byte: u8) -> BridgeResult<()> {
        if self.is_full() {
            return Err(BridgeError::TransmitOverflow);
        }
        self.bytes.push_back(byte);
        Ok(())
    }

    pub fn pop(&mut self) -> BridgeResult<u8> {
        self.bytes.pop_front().ok_or(BridgeError::ReceiveUnderflow)
    }

    /// Take every queued byte in arrival order, leaving the FIFO empty.
    pub fn drain_all(&mut self) -> Vec<u8> {
        self.bytes.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_preserved() {
        let mut fifo = ByteFifo::bounded(FIFO_DEPTH);
        fifo.push(0x10).unwrap();
        fifo.push(0x20).unwrap();
        fifo.push(0x30).unwrap();
        assert_eq!(fifo.pop().unwrap(), 0x10);
        assert_eq!(fifo.pop().unwrap(), 0x20);
        assert_eq!(fifo.pop().unwrap(), 0x30);
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_full_at_advertised_depth() {
        let mut fifo = ByteFifo::bounded(FIFO_DEPTH);
        for i in 0..FIFO_DEPTH {
            assert!(!fifo.is_full(), "full before byte {}", i);
            fifo.push(i as u8).unwrap();
        }
        assert!(fifo.is_full());
        assert!(matches!(
            fifo.push(0xFF),
            Err(BridgeError::TransmitOverflow)
        ));
        assert_eq!(fifo.len(), FIFO_DEPTH);
    }

    #[test]
    fn test_pop_empty_is_underflow() {
        let mut fifo = ByteFifo::bounded(FIFO_DEPTH);
        assert!(matches!(fifo.pop(), Err(BridgeError::ReceiveUnderflow)));
    }

    #[test]
    fn test_unbounded_never_full() {
        let mut fifo = ByteFifo::unbounded();
        for i in 0..256 {
            fifo.push(i as u8).unwrap();
        }
        assert!(!fifo.is_full());
        assert_eq!(fifo.len(), 256);
    }

    #[test]
    fn test_drain_all_empties_in_order() {
        let mut fifo = ByteFifo::bounded(FIFO_DEPTH);
        fifo.push(0xAA).unwrap();
        fifo.push(0xBB).unwrap();
        assert_eq!(fifo.drain_all(), vec![0xAA, 0xBB]);
        assert!(fifo.is_empty());
        assert_eq!(fifo.drain_all(), Vec::<u8>::new());
    }
}

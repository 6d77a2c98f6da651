//! Weight FIFO: tiles staged from the host bus, consumed by the matrix unit

use std::collections::VecDeque;

/// Unbounded zero-latency queue of weight tiles. The FIFO never back-pressures
/// the controller; it is the one component without a request port.
#[derive(Debug, Clone, Default)]
pub struct WeightFifo {
    tiles: VecDeque<Vec<u8>>,
}

impl WeightFifo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, tile: Vec<u8>) {
        log::trace!("Weight FIFO load: {} bytes, depth now {}", tile.len(), self.tiles.len() + 1);
        self.tiles.push_back(tile);
    }

    /// Pops the oldest tile. An empty FIFO yields an empty tile, which the
    /// matrix unit treats as a degenerate operand.
    pub fn read(&mut self) -> Vec<u8> {
        self.tiles.pop_front().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

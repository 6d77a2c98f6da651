//! Unified Buffer: on-chip activation scratchpad with a single request port

use crate::port::LatencyPort;
use crate::sparse::SparseMemory;

// Advisory only; writes past this log a warning but still land
pub const NOMINAL_CAPACITY_BYTES: u32 = 256 * 1024;

const READ_LATENCY: u32 = 20;
const WRITE_LATENCY: u32 = 20;

#[derive(Debug, Clone)]
enum PendingOp {
    Read { addr: u32, length: u32 },
    Write { addr: u32, data: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct UnifiedBuffer {
    memory: SparseMemory,
    port: LatencyPort,
    pending: Option<PendingOp>,
    read_result: Vec<u8>,
}

impl UnifiedBuffer {
    pub fn new() -> Self {
        Self {
            memory: SparseMemory::new(),
            port: LatencyPort::new(),
            pending: None,
            read_result: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.port.is_idle()
    }

    /// Starts a read of `length` bytes; the bytes are collected from memory
    /// when the port timer expires, not at issue time.
    pub fn read_request(&mut self, addr: u32, length: u32) -> bool {
        if !self.port.try_begin(READ_LATENCY) {
            return false;
        }

        self.pending = Some(PendingOp::Read { addr, length });
        true
    }

    /// Stages `data` to be committed to memory when the port timer expires.
    pub fn write_request(&mut self, addr: u32, data: &[u8]) -> bool {
        if !self.port.try_begin(WRITE_LATENCY) {
            return false;
        }

        if u64::from(addr) + data.len() as u64 > u64::from(NOMINAL_CAPACITY_BYTES) {
            log::warn!(
                "UB write at {addr:08X} ({} bytes) runs past the nominal {NOMINAL_CAPACITY_BYTES} byte capacity",
                data.len()
            );
        }

        self.pending = Some(PendingOp::Write { addr, data: data.to_vec() });
        true
    }

    pub fn tick(&mut self) {
        if !self.port.tick() {
            return;
        }

        match self.pending.take() {
            Some(PendingOp::Read { addr, length }) => {
                self.read_result = self.memory.read(addr, length);
            }
            Some(PendingOp::Write { addr, data }) => {
                self.memory.write(addr, &data);
            }
            None => {}
        }
    }

    /// Result of the most recently completed read.
    pub fn read_result(&self) -> &[u8] {
        &self.read_result
    }

    /// Immediate read bypassing the port; unmapped bytes read as zero.
    pub fn read(&self, addr: u32, length: u32) -> Vec<u8> {
        self.memory.read(addr, length)
    }

    /// Immediate write bypassing the port.
    pub fn write(&mut self, addr: u32, data: &[u8]) {
        self.memory.write(addr, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick_n(ub: &mut UnifiedBuffer, cycles: u32) {
        for _ in 0..cycles {
            ub.tick();
        }
    }

    #[test]
    fn write_commits_at_timer_expiry() {
        let mut ub = UnifiedBuffer::new();

        assert!(ub.write_request(64, &[1, 2, 3, 4]));
        assert!(!ub.is_idle());

        // Not yet visible through the direct accessor
        tick_n(&mut ub, WRITE_LATENCY - 1);
        assert_eq!(ub.read(64, 4), vec![0, 0, 0, 0]);

        ub.tick();
        assert!(ub.is_idle());
        assert_eq!(ub.read(64, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn read_collects_at_timer_expiry() {
        let mut ub = UnifiedBuffer::new();
        ub.write(32, &[5, 6, 7]);

        assert!(ub.read_request(30, 6));

        // The read samples memory at expiry, so a write landing mid-flight
        // (via the debug accessor) is observed
        ub.write(35, &[9]);

        tick_n(&mut ub, READ_LATENCY);
        assert!(ub.is_idle());
        assert_eq!(ub.read_result(), &[0, 0, 5, 6, 7, 9]);
    }

    #[test]
    fn single_port_rejects_overlapping_ops() {
        let mut ub = UnifiedBuffer::new();

        assert!(ub.read_request(0, 16));
        assert!(!ub.write_request(0, &[1]));
        assert!(!ub.read_request(0, 16));

        tick_n(&mut ub, READ_LATENCY);
        assert!(ub.write_request(0, &[1]));
    }
}

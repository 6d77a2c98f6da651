//! Accumulator: int32 scratchpad fed by the matrix unit, with in-place ReLU

use crate::port::LatencyPort;
use crate::sparse::SparseMemory;

// Advisory only; each entry is one i32
pub const NOMINAL_CAPACITY_ENTRIES: u32 = 4096;

const READ_LATENCY: u32 = 5;
const WRITE_LATENCY: u32 = 5;
const ACTIVATE_LATENCY: u32 = 16;

#[derive(Debug, Clone)]
enum PendingOp {
    Read { addr: u32, length: u32 },
    Write { addr: u32, data: Vec<u8> },
    Activate { addr: u32, num_elements: u32 },
}

#[derive(Debug, Clone)]
pub struct Accumulator {
    memory: SparseMemory,
    port: LatencyPort,
    pending: Option<PendingOp>,
    read_result: Vec<u8>,
}

impl Accumulator {
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

    pub fn read_request(&mut self, addr: u32, length: u32) -> bool {
        if !self.port.try_begin(READ_LATENCY) {
            return false;
        }

        self.pending = Some(PendingOp::Read { addr, length });
        true
    }

    pub fn write_request(&mut self, addr: u32, data: &[u8]) -> bool {
        if !self.port.try_begin(WRITE_LATENCY) {
            return false;
        }

        if u64::from(addr) + data.len() as u64 > u64::from(4 * NOMINAL_CAPACITY_ENTRIES) {
            log::warn!(
                "ACC write at {addr:08X} ({} bytes) runs past the nominal {NOMINAL_CAPACITY_ENTRIES} entry capacity",
                data.len()
            );
        }

        self.pending = Some(PendingOp::Write { addr, data: data.to_vec() });
        true
    }

    /// Starts an in-place ReLU pass over `num_elements` i32 values at `addr`.
    pub fn activate_request(&mut self, addr: u32, num_elements: u32) -> bool {
        if !self.port.try_begin(ACTIVATE_LATENCY) {
            return false;
        }

        self.pending = Some(PendingOp::Activate { addr, num_elements });
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
            Some(PendingOp::Activate { addr, num_elements }) => {
                self.activate(addr, num_elements);
            }
            None => {}
        }
    }

    /// Result of the most recently completed read.
    pub fn read_result(&self) -> &[u8] {
        &self.read_result
    }

    fn activate(&mut self, addr: u32, num_elements: u32) {
        for i in 0..num_elements {
            let element_addr = addr.wrapping_add(i.wrapping_mul(4));
            let bytes = self.memory.read(element_addr, 4);
            let value = i32::from_le_bytes(bytes.try_into().unwrap());
            self.memory.write(element_addr, &value.max(0).to_le_bytes());
        }
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

//! Host memory and the single shared bus port
//!
//! The bus models transport delay only: a read captures its bytes into the
//! staging buffer at request time and a write commits at request time, with
//! the port then held busy for the transport latency. This ordering is what
//! lets the weight-load path push the staged bytes into the FIFO on the same
//! cycle the read is issued.

use crate::api::{TpuError, TpuResult};
use crate::port::LatencyPort;

pub const DEFAULT_HOST_MEMORY_LEN: usize = 4 * 1024 * 1024;

const READ_LATENCY: u32 = 100;
const WRITE_LATENCY: u32 = 100;

#[derive(Debug, Clone)]
pub struct HostMemory {
    bytes: Box<[u8]>,
    port: LatencyPort,
    staging: Vec<u8>,
}

impl HostMemory {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len].into_boxed_slice(),
            port: LatencyPort::new(),
            staging: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.port.is_idle()
    }

    /// Captures `length` bytes into the staging buffer and holds the port
    /// busy for the read transport latency. Reads past the end yield zero.
    pub fn read_request(&mut self, addr: u32, length: u32) -> bool {
        if !self.port.try_begin(READ_LATENCY) {
            return false;
        }

        self.staging.clear();
        for i in 0..length {
            let byte = self.read_byte(addr.wrapping_add(i));
            self.staging.push(byte);
        }
        true
    }

    /// Commits `data` to memory and holds the port busy for the write
    /// transport latency. Writes past the end are dropped.
    pub fn write_request(&mut self, addr: u32, data: &[u8]) -> bool {
        if !self.port.try_begin(WRITE_LATENCY) {
            return false;
        }

        for (i, &byte) in data.iter().enumerate() {
            self.write_byte(addr.wrapping_add(i as u32), byte);
        }
        true
    }

    pub fn tick(&mut self) {
        self.port.tick();
    }

    /// Bytes captured by the most recent read request.
    pub fn staged(&self) -> &[u8] {
        &self.staging
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Loads a memory image starting at offset 0, before the first tick.
    pub fn load_image(&mut self, image: &[u8]) -> TpuResult<()> {
        if image.len() > self.bytes.len() {
            return Err(TpuError::MemoryImageTooLarge {
                image_len: image.len(),
                capacity: self.bytes.len(),
            });
        }

        self.bytes[..image.len()].copy_from_slice(image);
        Ok(())
    }

    fn read_byte(&self, addr: u32) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        if let Some(byte) = self.bytes.get_mut(addr as usize) {
            *byte = value;
        }
    }
}

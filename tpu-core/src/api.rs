//! Public interface and the per-cycle simulation loop

use crate::acc::Accumulator;
use crate::controller::Controller;
use crate::datapath::DataPath;
use crate::fifo::WeightFifo;
use crate::host::{HostMemory, DEFAULT_HOST_MEMORY_LEN};
use crate::isa;
use crate::mxu::SystolicArray;
use crate::stats::PerformanceStats;
use crate::ub::UnifiedBuffer;
use thiserror::Error;


/// Default safety cap for the tick loop.
pub const SIMULATION_CYCLE_CAP: u64 = 5_000_000;

#[derive(Debug, Error)]
pub enum TpuError {
    #[error(
        "Program image size {image_len} is not a multiple of the {record_len}-byte instruction record",
        record_len = isa::INSTRUCTION_LEN
    )]
    ProgramSizeInvalid { image_len: usize },
    #[error("Host memory image is {image_len} bytes but host memory holds only {capacity}")]
    MemoryImageTooLarge { image_len: usize, capacity: usize },
    #[error("Simulation exceeded the {max_cycles} cycle limit")]
    Timeout { max_cycles: u64 },
}

pub type TpuResult<T> = Result<T, TpuError>;

#[derive(Debug)]
pub struct Tpu {
    host: HostMemory,
    ub: UnifiedBuffer,
    fifo: WeightFifo,
    mxu: SystolicArray,
    acc: Accumulator,
    controller: Controller,
    stats: PerformanceStats,
}

#[derive(Debug)]
pub struct TpuBuilder {
    host_memory_len: usize,
}

impl TpuBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { host_memory_len: DEFAULT_HOST_MEMORY_LEN }
    }

    #[must_use]
    pub fn host_memory_len(mut self, len: usize) -> Self {
        self.host_memory_len = len;
        self
    }

    #[must_use]
    pub fn build(self) -> Tpu {
        Tpu {
            host: HostMemory::new(self.host_memory_len),
            ub: UnifiedBuffer::new(),
            fifo: WeightFifo::new(),
            mxu: SystolicArray::new(),
            acc: Accumulator::new(),
            controller: Controller::new(),
            stats: PerformanceStats::new(),
        }
    }
}

impl Default for TpuBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Tpu {
    #[must_use]
    pub fn builder() -> TpuBuilder {
        TpuBuilder::new()
    }

    #[must_use]
    pub fn new() -> Self {
        TpuBuilder::new().build()
    }

    /// Loads a compiled program image.
    ///
    /// # Errors
    ///
    /// Will return an error if the image is not a whole number of records.
    pub fn load_program(&mut self, image: &[u8]) -> TpuResult<()> {
        let program = isa::parse_program(image)?;
        log::info!("Loaded program: {} instructions", program.len());
        self.controller.set_program(program);
        Ok(())
    }

    /// Loads a host memory image starting at offset 0.
    ///
    /// # Errors
    ///
    /// Will return an error if the image is larger than host memory.
    pub fn load_host_memory(&mut self, image: &[u8]) -> TpuResult<()> {
        self.host.load_image(image)?;
        log::info!("Loaded host memory image: {} bytes", image.len());
        Ok(())
    }

    /// Advances the machine one cycle: sample utilization, tick every
    /// component, then step the controller.
    pub fn tick(&mut self) {
        self.stats.total_cycles += 1;

        // Utilization sampling observes the state from the previous cycle
        if !self.host.is_idle() {
            self.stats.host_busy_cycles += 1;
        }
        if !self.ub.is_idle() {
            self.stats.ub_busy_cycles += 1;
        }
        if !self.acc.is_idle() {
            self.stats.acc_busy_cycles += 1;
        }
        if !self.mxu.is_idle() {
            self.stats.mxu_busy_cycles += 1;
        }

        self.host.tick();
        self.ub.tick();
        self.mxu.tick();
        self.acc.tick();

        // The controller sees post-tick component state, so a port that went
        // idle this cycle accepts a new request this cycle
        self.controller.step(
            &mut DataPath {
                host: &mut self.host,
                ub: &mut self.ub,
                fifo: &mut self.fifo,
                mxu: &mut self.mxu,
                acc: &mut self.acc,
            },
            &mut self.stats,
        );
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.controller.is_halted()
    }

    /// Ticks until the controller halts.
    ///
    /// # Errors
    ///
    /// Will return an error if the machine is still running after
    /// `max_cycles` cycles; the controller is left in its current state.
    pub fn run_until_halt(&mut self, max_cycles: u64) -> TpuResult<()> {
        while !self.is_halted() {
            self.tick();

            if self.stats.total_cycles > max_cycles {
                return Err(TpuError::Timeout { max_cycles });
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> &PerformanceStats {
        &self.stats
    }

    #[must_use]
    pub fn host_memory(&self) -> &[u8] {
        self.host.bytes()
    }
}

impl Default for Tpu {
    fn default() -> Self {
        Self::new()
    }
}

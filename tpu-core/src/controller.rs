//! Instruction fetch/decode/execute state machine
//!
//! The controller holds exactly one instruction in flight and advances one
//! state per cycle. Each execute state names the component it needs; if that
//! component's port is busy the controller stays put and the cycle is
//! counted as a stall.

use crate::datapath::DataPath;
use crate::isa::{Instruction, OpCode};
use crate::stats::PerformanceStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Fetch,
    Decode,
    RhmReadHost,
    RhmWriteUb,
    RwReadHost,
    MmcReadUb,
    MmcReadFifo,
    MmcExecute,
    MmcWriteAcc,
    ActRun,
    WhmReadAcc,
    WhmWriteHost,
    Halted,
}

#[derive(Debug, Clone)]
pub struct Controller {
    state: ControllerState,
    instruction_pointer: usize,
    current: Instruction,
    program: Vec<Instruction>,
    input_tile: Vec<u8>,
    weight_tile: Vec<u8>,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Fetch,
            instruction_pointer: 0,
            current: Instruction::default(),
            program: Vec::new(),
            input_tile: Vec::new(),
            weight_tile: Vec::new(),
        }
    }

    pub fn set_program(&mut self, program: Vec<Instruction>) {
        self.program = program;
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == ControllerState::Halted
    }

    /// Advances the controller one state against post-tick component state.
    pub fn step(&mut self, dp: &mut DataPath<'_>, stats: &mut PerformanceStats) {
        match self.state {
            ControllerState::Fetch => self.fetch(stats),
            ControllerState::Decode => self.decode(stats),
            ControllerState::RhmReadHost => {
                if dp.host.is_idle() {
                    dp.host.read_request(self.current.host_addr, self.current.length);
                    self.state = ControllerState::RhmWriteUb;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::RhmWriteUb => {
                // Wait out the bus transport before handing the staged bytes on
                if dp.host.is_idle() && dp.ub.is_idle() {
                    dp.ub.write_request(self.current.data_addr, dp.host.staged());
                    self.state = ControllerState::Fetch;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::RwReadHost => {
                if dp.host.is_idle() {
                    dp.host.read_request(self.current.host_addr, self.current.length);
                    // The read stages its bytes synchronously, so the tile can
                    // enter the FIFO on the issue cycle
                    dp.fifo.load(dp.host.staged().to_vec());
                    self.state = ControllerState::Fetch;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::MmcReadUb => {
                if dp.ub.is_idle() {
                    dp.ub.read_request(self.current.data_addr, self.current.length);
                    self.state = ControllerState::MmcReadFifo;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::MmcReadFifo => {
                if dp.ub.is_idle() {
                    self.input_tile = dp.ub.read_result().to_vec();
                    self.weight_tile = dp.fifo.read();
                    self.state = ControllerState::MmcExecute;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::MmcExecute => {
                if dp.mxu.is_idle() {
                    dp.mxu.execute_request(&self.input_tile, &self.weight_tile);
                    self.state = ControllerState::MmcWriteAcc;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::MmcWriteAcc => {
                if dp.mxu.is_idle() && dp.acc.is_idle() {
                    dp.acc.write_request(self.current.host_addr, dp.mxu.result());
                    self.state = ControllerState::Fetch;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::ActRun => {
                if dp.acc.is_idle() {
                    dp.acc.activate_request(self.current.data_addr, self.current.length);
                    self.state = ControllerState::Fetch;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::WhmReadAcc => {
                if dp.acc.is_idle() {
                    dp.acc.read_request(self.current.data_addr, self.current.length);
                    self.state = ControllerState::WhmWriteHost;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::WhmWriteHost => {
                if dp.acc.is_idle() && dp.host.is_idle() {
                    let data = dp.acc.read_result().to_vec();
                    dp.host.write_request(self.current.host_addr, &data);

                    if data.len() >= 4 {
                        let first = i32::from_le_bytes(data[..4].try_into().unwrap());
                        println!(
                            "CYCLE {}: WHM Issued. First 32-bit result: {first}",
                            stats.total_cycles
                        );
                    }

                    self.state = ControllerState::Fetch;
                } else {
                    stats.stall_cycles += 1;
                }
            }
            ControllerState::Halted => {}
        }
    }

    fn fetch(&mut self, stats: &mut PerformanceStats) {
        if self.instruction_pointer >= self.program.len() {
            self.state = ControllerState::Halted;
            return;
        }

        self.current = self.program[self.instruction_pointer];
        self.instruction_pointer += 1;
        stats.instruction_count += 1;
        self.state = ControllerState::Decode;
    }

    fn decode(&mut self, stats: &mut PerformanceStats) {
        match OpCode::from_byte(self.current.opcode) {
            Some(OpCode::Rhm) => self.state = ControllerState::RhmReadHost,
            Some(OpCode::Whm) => self.state = ControllerState::WhmReadAcc,
            Some(OpCode::Rw) => self.state = ControllerState::RwReadHost,
            Some(OpCode::Mmc) => {
                stats.mmc_count += 1;
                self.state = ControllerState::MmcReadUb;
            }
            Some(OpCode::Act) => self.state = ControllerState::ActRun,
            Some(OpCode::Hlt) => {
                println!("CYCLE {}: DECODE -> HLT", stats.total_cycles);
                self.state = ControllerState::Halted;
            }
            None => {
                println!(
                    "CYCLE {}: ERROR: Unknown opcode {:02X}",
                    stats.total_cycles, self.current.opcode
                );
                self.state = ControllerState::Halted;
            }
        }
    }
}

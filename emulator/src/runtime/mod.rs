//! The processor
//!
//! The machine fetches one instruction ahead: each [`Computer::tick`] executes
//! the instruction fetched by the previous tick, then fetches the next one.
//! After a reset the pipeline is empty, so the first tick fetches the
//! instruction at address 0 before executing it.

use parse_display::Display;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::constants as C;

mod config;
mod exception;
mod instructions;
mod memory;
mod ports;
mod registers;

pub use self::config::{BitWidth, ConfigError, MachineConfig};
pub use self::exception::Fault;
pub use self::instructions::{has_operand, Instruction, Mnemonic, OperandKind};
pub use self::memory::{Memory, MemoryError};
pub use self::ports::Ports;
pub use self::registers::{Flags, Reg, Registers};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("machine faulted: {0}")]
    Fault(#[from] Fault),

    #[error("machine did not halt within {0} ticks")]
    TickLimit(u64),
}

/// Execution state of a machine
///
/// `Faulted` machines are halted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum State {
    Running,
    Halted,
    Faulted,
}

/// An opcode and its operand as read from memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fetched {
    address: C::Address,
    opcode: C::Byte,
    operand: C::Byte,
}

impl Fetched {
    fn decode(self) -> Option<Instruction> {
        Instruction::decode(self.opcode, self.operand)
    }
}

pub struct Computer {
    pub registers: Registers,
    pub memory: Memory,
    ports: Ports,
    width: BitWidth,
    flags: Flags,
    fault: Option<Fault>,
    fetched: Option<Fetched>,
    ticks: u64,
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ registers: {:?}, flags: {:?}, width: {}, memory: [...] }}",
            self.registers, self.flags, self.width
        )
    }
}

/// The line shown before every tick in debug mode
impl std::fmt::Display for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let next = self.fetched.unwrap_or_else(|| self.peek());
        write!(f, "A: {} B: {} I: ", self.registers.a, self.registers.b)?;
        match Mnemonic::from_opcode(next.opcode) {
            Some(mnemonic) => write!(f, "{mnemonic}")?,
            None => write!(f, "??")?,
        }
        write!(f, ",{} PC: {}", next.operand, self.registers.pc)
    }
}

impl Default for Computer {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl Computer {
    #[must_use]
    pub fn new(config: MachineConfig) -> Self {
        Self {
            registers: Registers::default(),
            memory: Memory::new(config.memory_size()),
            ports: Ports::default(),
            width: config.width(),
            flags: Flags::default(),
            fault: None,
            fetched: None,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// Copy a program (or any data) into memory
    ///
    /// Registers, flags and the program counter are left untouched.
    ///
    /// # Errors
    ///
    /// Fails if the bytes do not fit in memory at `offset`, in which case the
    /// memory is not modified.
    pub fn load(&mut self, bytes: &[C::Byte], offset: C::Address) -> Result<(), MemoryError> {
        debug!(offset, length = bytes.len(), "Loading bytes in memory");
        self.memory.load(bytes, offset)
    }

    /// Clear registers, flags, ports and the fetch pipeline
    ///
    /// Memory content and the machine shape are kept.
    pub fn reset(&mut self) {
        debug!("Resetting computer");
        self.registers = Registers::default();
        self.flags = Flags::default();
        self.fault = None;
        self.fetched = None;
        self.ports.clear();
        self.ticks = 0;
    }

    /// Execute one instruction and fetch the next one
    ///
    /// This does nothing once the machine is halted.
    pub fn tick(&mut self) -> State {
        if self.is_halted() {
            return self.state();
        }

        self.flags.remove(Flags::OUTPUT_WRITTEN);

        let current = match self.fetched.take() {
            Some(fetched) => fetched,
            None => self.fetch(),
        };

        if let Some(instruction) = current.decode() {
            trace!(pc = self.registers.pc, %instruction, "Executing instruction");
            if let Err(fault) = instruction.execute(self) {
                self.raise(fault);
            }
        } else {
            trace!(opcode = current.opcode, "Skipping unknown opcode");
        }

        self.fetched = Some(self.fetch());
        self.ticks += 1;
        self.state()
    }

    /// Tick until the machine halts, returning the number of ticks it took
    ///
    /// # Errors
    ///
    /// Returns the fault if the machine stopped because of one.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<u64, ProcessorError> {
        let start = self.ticks;
        while !self.is_halted() {
            self.tick();
        }
        self.outcome(start)
    }

    /// Same as [`Computer::run`], giving up after `max_ticks` ticks
    ///
    /// # Errors
    ///
    /// Returns the fault if the machine stopped because of one, or
    /// [`ProcessorError::TickLimit`] if it was still running.
    #[tracing::instrument(skip(self))]
    pub fn run_for(&mut self, max_ticks: u64) -> Result<u64, ProcessorError> {
        let start = self.ticks;
        while !self.is_halted() {
            if self.ticks - start >= max_ticks {
                return Err(ProcessorError::TickLimit(max_ticks));
            }
            self.tick();
        }
        self.outcome(start)
    }

    fn outcome(&self, start: u64) -> Result<u64, ProcessorError> {
        match self.fault {
            Some(fault) => Err(fault.into()),
            None => Ok(self.ticks - start),
        }
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.flags.contains(Flags::HALTED)
    }

    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.flags.contains(Flags::FAULTED)
    }

    #[must_use]
    pub fn state(&self) -> State {
        if self.is_faulted() {
            State::Faulted
        } else if self.is_halted() {
            State::Halted
        } else {
            State::Running
        }
    }

    /// Why the machine faulted, if it did
    #[must_use]
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    #[must_use]
    pub fn overflow(&self) -> bool {
        self.flags.contains(Flags::OVERFLOW)
    }

    /// Whether the last tick wrote to the output port
    #[must_use]
    pub fn output_written(&self) -> bool {
        self.flags.contains(Flags::OUTPUT_WRITTEN)
    }

    /// Number of ticks since the last reset
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The instruction the next tick will execute, if it was already fetched
    #[must_use]
    pub fn current_instruction(&self) -> Option<Instruction> {
        self.fetched.and_then(Fetched::decode)
    }

    /// Address of the instruction the next tick will execute
    #[must_use]
    pub fn next_address(&self) -> C::Address {
        self.fetched.map_or(self.registers.pc, |fetched| fetched.address)
    }

    #[must_use]
    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    pub fn push_input(&mut self, value: i128) {
        self.ports.push_input(value);
    }

    pub fn extend_input<I: IntoIterator<Item = i128>>(&mut self, values: I) {
        self.ports.extend_input(values);
    }

    pub fn pop_output(&mut self) -> Option<C::Word> {
        self.ports.pop_output()
    }

    pub fn drain_output(&mut self) -> impl Iterator<Item = C::Word> + '_ {
        self.ports.drain_output()
    }

    fn read_pc_byte(&mut self) -> C::Byte {
        let byte = self.memory.get(self.registers.pc).unwrap_or_default();
        self.registers.pc = (self.registers.pc + 1) % self.memory.len();
        byte
    }

    fn fetch(&mut self) -> Fetched {
        let address = self.registers.pc;
        let opcode = self.read_pc_byte();
        let operand = if has_operand(opcode) {
            self.read_pc_byte()
        } else {
            0
        };
        Fetched {
            address,
            opcode,
            operand,
        }
    }

    /// Like [`Computer::fetch`], without moving the program counter
    fn peek(&self) -> Fetched {
        let address = self.registers.pc;
        let opcode = self.memory.get(address).unwrap_or_default();
        let operand = if has_operand(opcode) {
            self.memory
                .get((address + 1) % self.memory.len())
                .unwrap_or_default()
        } else {
            0
        };
        Fetched {
            address,
            opcode,
            operand,
        }
    }

    fn raise(&mut self, fault: Fault) {
        warn!(%fault, "Computer faulted");
        self.fault = Some(fault);
        self.flags.insert(Flags::FAULTED | Flags::HALTED);
    }

    pub(crate) fn halt(&mut self) {
        info!(ticks = self.ticks + 1, "Computer halted");
        self.flags.insert(Flags::HALTED);
    }

    pub(crate) fn set_overflow(&mut self, overflow: bool) {
        self.flags.set(Flags::OVERFLOW, overflow);
    }

    pub(crate) fn write_output(&mut self, value: C::Word) {
        trace!(value, "Writing to output port");
        self.ports.write(value);
        self.flags.insert(Flags::OUTPUT_WRITTEN);
    }

    pub(crate) fn jump(&mut self, address: C::Byte) -> Result<(), Fault> {
        let target = C::Address::from(address);
        if target >= self.memory.len() {
            return Err(Fault::InvalidJump {
                address: address.into(),
            });
        }

        debug!("Jumping to address {}", target);
        self.registers.pc = target;
        Ok(())
    }

    /// Address held by register B, checked against the memory size
    pub(crate) fn indexed_address(&self, instruction: Mnemonic) -> Result<C::Address, Fault> {
        let b = self.registers.b;
        C::Address::try_from(b)
            .ok()
            .filter(|&address| address < self.memory.len())
            .ok_or(Fault::InvalidIndexedAccess {
                instruction,
                address: b,
            })
    }

    pub(crate) fn read_memory(
        &self,
        instruction: Mnemonic,
        address: C::Address,
    ) -> Result<C::Byte, Fault> {
        self.memory
            .get(address)
            .map_err(|_| Fault::InvalidAddress {
                instruction,
                address: address as C::Word,
            })
    }

    pub(crate) fn write_memory(
        &mut self,
        instruction: Mnemonic,
        address: C::Address,
        value: C::Byte,
    ) -> Result<(), Fault> {
        let cell = self
            .memory
            .get_mut(address)
            .map_err(|_| Fault::InvalidAddress {
                instruction,
                address: address as C::Word,
            })?;
        *cell = value;
        Ok(())
    }
}

// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD
#![warn(missing_docs)]

//! Library providing an Intcode virtual machine
//!
//! The machine is fully functional, with all of the [Opcodes] and [Parameter Modes] defined in the
//! completed Intcode computer for [Day 9]. Each opcode is handled by its own
//! [Operation](ops::Operation), looked up in an [InstructionSet](ops::InstructionSet), so the set
//! can be restricted or extended.
//!
//! # Example
//!
//! ```rust
//! use intcode::prelude::*;
//! let mut machine = Machine::new([3, 0, 4, 0, 99], [7]);
//!
//! assert_eq!(machine.run_to_completion().unwrap(), &[7]);
//! assert!(!machine.is_running());
//! ```
//!
//! Machines can be stepped one output at a time, and have input added between runs:
//!
//! ```rust
//! use intcode::prelude::*;
//! // add 1 to each input, forever
//! let mut machine = Machine::new([3, 11, 1001, 11, 1, 11, 4, 11, 1105, 1, 0], [10]);
//!
//! assert_eq!(machine.run_to_next_output().unwrap(), Some(11));
//! machine.add_input(41);
//! assert_eq!(machine.run_to_next_output().unwrap(), Some(42));
//! assert_eq!(machine.run_to_next_output(), Err(MachineError::InputUnderflow));
//! ```
//!
//! See the [blocking] module for machines that pull their own input, and the [pipeline] module
//! for chaining machines together.
//!
//! [Opcodes]: https://esolangs.org/wiki/Intcode#Opcodes
//! [Parameter Modes]: https://esolangs.org/wiki/Intcode#Parameter_Modes
//! [Day 9]: https://adventofcode.com/2019/day/9

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::ops::{Index, IndexMut};

pub mod blocking;
mod internals;
mod logger;
pub mod memory;
pub mod opcode;
pub mod ops;
pub mod pipeline;
#[cfg(feature = "text")]
pub mod text;
pub mod trace;

pub use logger::{SharedSink, Verbosity};

use logger::Logger;
use memory::Memory;
use ops::InstructionSet;
use trace::Trace;

/// A small module that re-exports items needed when working with the Intcode machine
pub mod prelude {
    pub use crate::blocking::{BlockingMachine, InputSource};
    pub use crate::trace::Trace;
    pub use crate::{Machine, MachineError, State, StepOutcome, Verbosity};
}

/// The state of an Intcode machine
///
/// Once a machine is [Halted](State::Halted), it will never execute another instruction.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum State {
    /// More instructions can be executed
    #[default]
    Running,
    /// A `HALT` instruction has been executed
    Halted,
}

/// The result of executing a single instruction
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StepOutcome {
    /// An instruction ran without producing output
    Running,
    /// An instruction produced the contained output
    Output(i64),
    /// The machine is halted
    Halted,
}

#[derive(Debug)]
#[non_exhaustive]
/// An error that occured when executing an Intcode instruction
pub enum MachineError {
    /// An opcode with no operation bound to it was encountered. Contains the whole instruction
    /// word.
    UnrecognizedOpcode(i64),
    /// An unknown parameter mode digit was encountered
    UnknownMode(i64),
    /// An instruction tried to access memory at the contained negative address
    NegativeAddress(i64),
    /// An instruction tried to write to an immediate destination
    WriteToImmediate(i64),
    /// An instruction tried to jump to the contained negative address
    JumpToNegative(i64),
    /// Adding or multiplying the two contained operands overflowed an `i64`. This covers
    /// arithmetic instructions, relative base adjustment, and relative address resolution.
    Overflow {
        /// The left operand
        lhs: i64,
        /// The right operand
        rhs: i64,
    },
    /// An instruction needed input, but the input queue was empty. The machine is left as it was
    /// before the instruction, so it can be resumed once input is added.
    InputUnderflow,
    /// The machine previously failed with an unrecoverable error
    Poisoned,
    /// The log sink returned an error
    LoggerFailed(io::Error),
}

impl MachineError {
    /// Whether the error leaves the machine unable to continue
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InputUnderflow | Self::LoggerFailed(_) | Self::Poisoned
        )
    }
}

// io::Error isn't PartialEq
impl PartialEq for MachineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::UnrecognizedOpcode(lhs), Self::UnrecognizedOpcode(rhs)) => lhs == rhs,
            (Self::UnknownMode(lhs), Self::UnknownMode(rhs)) => lhs == rhs,
            (Self::NegativeAddress(lhs), Self::NegativeAddress(rhs)) => lhs == rhs,
            (Self::WriteToImmediate(lhs), Self::WriteToImmediate(rhs)) => lhs == rhs,
            (Self::JumpToNegative(lhs), Self::JumpToNegative(rhs)) => lhs == rhs,
            (Self::Overflow { lhs: a, rhs: b }, Self::Overflow { lhs: c, rhs: d }) => {
                a == c && b == d
            }
            (Self::InputUnderflow, Self::InputUnderflow) => true,
            (Self::Poisoned, Self::Poisoned) => true,
            (Self::LoggerFailed(lhs), Self::LoggerFailed(rhs)) => lhs.kind() == rhs.kind(),
            _ => false,
        }
    }
}

impl Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedOpcode(n) => write!(f, "encountered unrecognized opcode in {n}"),
            Self::UnknownMode(mode) => write!(f, "encountered unknown parameter mode {mode}"),
            Self::NegativeAddress(addr) => write!(f, "tried to access negative address {addr}"),
            Self::WriteToImmediate(i) => write!(f, "tried to write to immediate {i}"),
            Self::JumpToNegative(addr) => write!(f, "tried to jump to negative address {addr}"),
            Self::Overflow { lhs, rhs } => write!(f, "arithmetic on {lhs} and {rhs} overflowed"),
            Self::InputUnderflow => write!(f, "input needed, but none is queued"),
            Self::Poisoned => write!(f, "machine previously failed and can't continue"),
            Self::LoggerFailed(e) => write!(f, "logger encountered an error: {e}"),
        }
    }
}

impl Error for MachineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LoggerFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MachineError {
    fn from(err: io::Error) -> Self {
        Self::LoggerFailed(err)
    }
}

/// An Intcode virtual machine
///
/// A machine owns its memory, its registers, and its input and output queues. Nothing is shared
/// between machines, so chaining them is a matter of moving outputs of one into the inputs of
/// another (see [pipeline]).
#[derive(Clone)]
pub struct Machine {
    ip: u64,
    rel_base: i64,
    mem: Memory,
    inputs: VecDeque<i64>,
    outputs: Vec<i64>,
    state: State,
    poisoned: bool,
    ops: InstructionSet,
    logger: Option<Logger>,
    trace: Option<Trace>,
}

// ignore the logger, trace, and instruction set
impl PartialEq for Machine {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip
            && self.rel_base == other.rel_base
            && self.state == other.state
            && self.poisoned == other.poisoned
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.mem == other.mem
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("ip", &self.ip)
            .field("rel_base", &self.rel_base)
            .field("state", &self.state)
            .field("poisoned", &self.poisoned)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("ops", &self.ops)
            .field("logging", &self.logger.is_some())
            .field("tracing", &self.trace.is_some())
            .field("mem", &self.mem)
            .finish()
    }
}

impl Index<u64> for Machine {
    type Output = i64;

    fn index(&self, i: u64) -> &Self::Output {
        self.mem.index(i)
    }
}

impl IndexMut<u64> for Machine {
    fn index_mut(&mut self, i: u64) -> &mut Self::Output {
        self.mem.index_mut(i)
    }
}

impl Machine {
    /// Create a new machine with the [full](InstructionSet::full) instruction set.
    ///
    /// `program` is collected into the starting memory, and `inputs` into the input queue, which
    /// is consumed in order.
    pub fn new(
        program: impl IntoIterator<Item = i64>,
        inputs: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self::with_instruction_set(program, inputs, InstructionSet::full())
    }

    /// Create a new machine that dispatches opcodes through `ops`
    pub fn with_instruction_set(
        program: impl IntoIterator<Item = i64>,
        inputs: impl IntoIterator<Item = i64>,
        ops: InstructionSet,
    ) -> Self {
        Self {
            ip: 0,
            rel_base: 0,
            mem: program.into_iter().collect(),
            inputs: inputs.into_iter().collect(),
            outputs: Vec::new(),
            state: State::Running,
            poisoned: false,
            ops,
            logger: None,
            trace: None,
        }
    }

    /// Queue `value` behind any inputs that are already queued
    pub fn add_input(&mut self, value: i64) {
        self.inputs.push_back(value);
    }

    /// The number of queued inputs
    pub fn pending_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Execute a single instruction.
    ///
    /// On a halted machine, this does nothing and returns [`StepOutcome::Halted`].
    ///
    /// If the error is [fatal](MachineError::is_fatal), every later step fails with
    /// [`MachineError::Poisoned`].
    pub fn step(&mut self) -> Result<StepOutcome, MachineError> {
        if self.state == State::Halted {
            return Ok(StepOutcome::Halted);
        }
        if self.poisoned {
            return Err(MachineError::Poisoned);
        }
        let result = self.exec_instruction();
        if let Err(ref err) = result
            && err.is_fatal()
        {
            tracing::debug!(ip = self.ip, %err, "machine poisoned");
            self.poisoned = true;
        }
        result
    }

    /// Run until an instruction produces output or the machine halts.
    ///
    /// Returns the output, or [`None`] if the machine halted first. On a halted machine, this
    /// does nothing and returns [`None`].
    pub fn run_to_next_output(&mut self) -> Result<Option<i64>, MachineError> {
        loop {
            match self.step()? {
                StepOutcome::Running => (),
                StepOutcome::Output(val) => break Ok(Some(val)),
                StepOutcome::Halted => break Ok(None),
            }
        }
    }

    /// Run until the machine halts, returning every output it has produced over its lifetime
    pub fn run_to_completion(&mut self) -> Result<&[i64], MachineError> {
        while self.step()? != StepOutcome::Halted {}
        Ok(&self.outputs)
    }

    /// Whether the machine can still execute instructions
    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// The current [State]
    pub fn state(&self) -> State {
        self.state
    }

    /// Every output the machine has produced
    pub fn outputs(&self) -> &[i64] {
        &self.outputs
    }

    /// The most recent output, if there has been one
    pub fn last_output(&self) -> Option<i64> {
        self.outputs.last().copied()
    }

    /// Get the memory at `address`
    #[doc(alias = "peek")]
    pub fn mem_get(&self, address: u64) -> i64 {
        self.mem[address]
    }

    /// Manually set a memory location
    #[doc(alias("poke", "write"))]
    pub fn mem_override(&mut self, address: u64, value: i64) {
        self.mem[address] = value;
    }

    /// Read `len` consecutive memory cells starting at `start`
    pub fn read_range(&self, start: u64, len: u64) -> Vec<i64> {
        self.mem.read_range(start, len).into_owned()
    }

    /// A view of the machine's memory
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// The address of the next instruction
    pub fn instruction_pointer(&self) -> u64 {
        self.ip
    }

    /// The current relative base
    pub fn relative_base(&self) -> i64 {
        self.rel_base
    }

    /// The instruction set the machine dispatches through
    pub fn instruction_set(&self) -> &InstructionSet {
        &self.ops
    }

    /// Whether the next instruction needs input that isn't queued
    ///
    /// Returns `false` if the next instruction can't be decoded, leaving the error to surface on
    /// the next [step](Machine::step).
    pub fn awaiting_input(&self) -> bool {
        self.is_running()
            && !self.poisoned
            && self.inputs.is_empty()
            && opcode::Instruction::decode(self.mem[self.ip])
                .ok()
                .and_then(|instr| self.ops.get(instr.opcode()))
                .is_some_and(|op| op.consumes_input())
    }
}

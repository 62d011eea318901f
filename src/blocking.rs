// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Machines that pull input on demand
//!
//! A plain [Machine] fails with [`MachineError::InputUnderflow`] when it needs input that isn't
//! queued. A [BlockingMachine] instead asks its [InputSource] for a value, once per input
//! instruction that would otherwise underflow, and carries on. A source that has nothing left to
//! give returns [None], and the machine underflows as if it had no source.
//!
//! ```
//! use intcode::prelude::*;
//!
//! // output double each input, forever
//! let program = [3, 11, 1002, 11, 2, 11, 4, 11, 1105, 1, 0, 0];
//! let mut counter = 0;
//! let mut machine = BlockingMachine::new(Machine::new(program, []), move || {
//!     counter += 1;
//!     counter
//! });
//!
//! assert_eq!(machine.run_to_next_output(), Ok(Some(2)));
//! assert_eq!(machine.run_to_next_output(), Ok(Some(4)));
//! ```

use crate::{Machine, MachineError, StepOutcome};

/// Something that can supply a [BlockingMachine] with input
///
/// Any `FnMut() -> i64` closure is an infinite source.
pub trait InputSource {
    /// Produce the next input value, or [None] if the source is exhausted or failed
    fn next_input(&mut self) -> Option<i64>;
}

impl<F: FnMut() -> i64> InputSource for F {
    fn next_input(&mut self) -> Option<i64> {
        Some(self())
    }
}

/// A [Machine] paired with an optional [InputSource]
///
/// Queued inputs are always used before the source is consulted. Without a source, a
/// `BlockingMachine` behaves exactly like the machine it wraps.
#[derive(Debug)]
pub struct BlockingMachine<S> {
    machine: Machine,
    source: Option<S>,
}

impl<S: InputSource> BlockingMachine<S> {
    /// Wrap `machine`, pulling input from `source` when its queue runs dry
    pub fn new(machine: Machine, source: S) -> Self {
        Self {
            machine,
            source: Some(source),
        }
    }

    /// Wrap `machine` with no input source attached
    pub fn without_source(machine: Machine) -> Self {
        Self {
            machine,
            source: None,
        }
    }

    /// Attach `source`, returning the previously attached source, if any
    pub fn attach(&mut self, source: S) -> Option<S> {
        self.source.replace(source)
    }

    /// Detach the current source, if any
    pub fn detach(&mut self) -> Option<S> {
        self.source.take()
    }

    /// The attached source, if any
    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// The attached source, mutably
    pub fn source_mut(&mut self) -> Option<&mut S> {
        self.source.as_mut()
    }

    /// The wrapped machine
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// The wrapped machine, mutably
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Unwrap into the machine and its source
    pub fn into_inner(self) -> (Machine, Option<S>) {
        (self.machine, self.source)
    }

    /// Queue `value` on the wrapped machine
    pub fn add_input(&mut self, value: i64) {
        self.machine.add_input(value);
    }

    /// Execute a single instruction, first pulling a value from the source if the instruction
    /// would need one
    ///
    /// If the source returns [None], this fails with [`MachineError::InputUnderflow`] and the
    /// machine is left resumable.
    pub fn step(&mut self) -> Result<StepOutcome, MachineError> {
        if self.machine.awaiting_input()
            && let Some(source) = self.source.as_mut()
        {
            let ip = self.machine.instruction_pointer();
            match source.next_input() {
                Some(value) => {
                    tracing::trace!(ip, value, "pulled input from source");
                    self.machine.add_input(value);
                }
                None => tracing::debug!(ip, "input source is exhausted"),
            }
        }
        self.machine.step()
    }

    /// Run until an instruction produces output or the machine halts, as with
    /// [Machine::run_to_next_output]
    pub fn run_to_next_output(&mut self) -> Result<Option<i64>, MachineError> {
        loop {
            match self.step()? {
                StepOutcome::Running => (),
                StepOutcome::Output(val) => break Ok(Some(val)),
                StepOutcome::Halted => break Ok(None),
            }
        }
    }

    /// Run until the machine halts, as with [Machine::run_to_completion]
    pub fn run_to_completion(&mut self) -> Result<&[i64], MachineError> {
        while self.step()? != StepOutcome::Halted {}
        Ok(self.machine.outputs())
    }

    /// Whether the wrapped machine can still execute instructions
    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }
}

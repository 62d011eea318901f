// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Structured traces of executed instructions
//!
//! ```
//! use intcode::prelude::*;
//!
//! let mut machine = Machine::new([1101, 90, 9, 5, 99, 0], []);
//! machine.start_trace();
//! machine.run_to_completion().unwrap();
//! let Trace(trace) = machine.end_trace().unwrap();
//!
//! assert_eq!(trace.len(), 2);
//! assert_eq!(trace[0].stored_val(), Some(99));
//! assert_eq!(trace[0].to_string(), "01101 [add #90, #9, 5 (stored 99)]");
//! assert_eq!(trace[1].to_string(), "00099 [halt]");
//! ```

use std::fmt::{self, Display};

use crate::Machine;
use crate::opcode::{HALT, MAX_PARAMS, ParamMode};
use crate::ops::StepRecord;

/// A parameter as an operation resolved it
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Resolved {
    /// Read as a value
    Value {
        /// The parameter word
        raw: i64,
        /// What it resolved to
        value: i64,
    },
    /// Used as the destination of a store
    Dest {
        /// The parameter word
        raw: i64,
        /// The address it resolved to
        address: u64,
    },
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Information about an executed instruction, which can be queried with its various methods, or
/// converted into a [String] using its [Display] impl.
pub struct TracedInstr {
    op_int: i64,
    opcode: i64,
    instr_ptr: u64,
    rel_base: i64,
    mnemonic: &'static str,
    modes: [ParamMode; MAX_PARAMS],
    record: StepRecord,
}

impl TracedInstr {
    pub(crate) fn build(
        op_int: i64,
        opcode: i64,
        instr_ptr: u64,
        rel_base: i64,
        mnemonic: &'static str,
        modes: [ParamMode; MAX_PARAMS],
        record: StepRecord,
    ) -> Self {
        Self {
            op_int,
            opcode,
            instr_ptr,
            rel_base,
            mnemonic,
            modes,
            record,
        }
    }

    pub(crate) fn halt(op_int: i64, instr_ptr: u64, rel_base: i64) -> Self {
        Self::build(
            op_int,
            HALT,
            instr_ptr,
            rel_base,
            "halt",
            [ParamMode::Positional; MAX_PARAMS],
            StepRecord::default(),
        )
    }

    /// The relative base at the time the instruction was executed
    pub fn rel_base(&self) -> i64 {
        self.rel_base
    }

    /// The instruction pointer's position when the instruction was executed
    pub fn instr_ptr(&self) -> u64 {
        self.instr_ptr
    }

    /// The instruction word itself
    pub fn op_int(&self) -> i64 {
        self.op_int
    }

    /// The opcode of the instruction
    pub fn opcode(&self) -> i64 {
        self.opcode
    }

    /// The mnemonic of the operation that ran
    pub fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }

    /// The parameter modes of the instruction
    pub fn param_modes(&self) -> [ParamMode; MAX_PARAMS] {
        self.modes
    }

    /// The parameters the operation resolved, in order
    pub fn params(&self) -> impl Iterator<Item = Resolved> + '_ {
        self.record.params.iter().flatten().copied()
    }

    /// If the instruction stored a value, return that value
    pub fn stored_val(&self) -> Option<i64> {
        self.record.stored.map(|(_, val)| val)
    }

    /// If the instruction stored a value, return the address it was stored at
    pub fn stored_at(&self) -> Option<u64> {
        self.record.stored.map(|(address, _)| address)
    }

    /// The input the instruction consumed, if any
    pub fn input(&self) -> Option<i64> {
        self.record.input
    }

    /// The value the instruction output, if any
    pub fn output(&self) -> Option<i64> {
        self.record.output
    }
}

impl Display for TracedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05} [{}", self.op_int, self.mnemonic)?;
        for (i, (param, mode)) in self.record.params.iter().zip(self.modes).enumerate() {
            let Some(param) = param else { continue };
            f.write_str(if i == 0 { " " } else { ", " })?;
            match (*param, mode) {
                (Resolved::Value { raw, .. }, ParamMode::Immediate) => write!(f, "{mode}{raw}")?,
                (Resolved::Value { raw, value }, _) => {
                    write!(f, "{mode}{raw} (resolves to {value})")?
                }
                (Resolved::Dest { raw, .. }, _) if self.record.stored.is_some() => {
                    write!(f, "{mode}{raw} (stored {})", self.stored_val().unwrap_or_default())?
                }
                (Resolved::Dest { raw, address }, _) => write!(f, "{mode}{raw} (-> {address})")?,
            }
        }
        f.write_str("]")
    }
}

impl Machine {
    /// Begin a [Trace] of executed instructions. If a trace is already running, this replaces that
    /// trace and returns it in a [`Some`], otherwise, it returns [`None`].
    pub fn start_trace(&mut self) -> Option<Trace> {
        self.trace.replace(Trace::default())
    }

    /// Stop tracing executed instructions. If no trace was active, returns [`None`]
    ///
    /// see [Machine::start_trace]
    pub fn end_trace(&mut self) -> Option<Trace> {
        self.trace.take()
    }

    /// Get a view of the current trace
    pub fn show_trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
/// A log of instructions that a [Machine] has executed since a call to [Machine::start_trace]
pub struct Trace(pub Vec<TracedInstr>);

impl Trace {
    pub(crate) fn push(&mut self, instr: TracedInstr) {
        self.0.push(instr);
    }

    /// The number of traced instructions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no instructions were traced
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let mut machine = Machine::new([3, 0, 109, 4, 204, -4, 1005, 0, 10, 0, 99], [7]);
        machine.start_trace();
        machine.run_to_completion().unwrap();
        let lines: Vec<String> = machine
            .show_trace()
            .unwrap()
            .0
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            [
                "00003 [in 0 (stored 7)]",
                "00109 [rbo #4]",
                "00204 [out @-4 (resolves to 7)]",
                "01005 [jnz 0 (resolves to 7), #10]",
                "00099 [halt]",
            ]
        );
    }

    #[test]
    fn accessors() {
        let mut machine = Machine::new([21101, 3, 4, -1, 109, 10, 21101, 3, 4, -1, 99], []);
        machine.start_trace();
        machine.run_to_completion().unwrap_err();
        let trace = machine.end_trace().unwrap();
        // the first store failed, so nothing was traced
        assert!(trace.is_empty());

        let mut machine = Machine::new([109, 10, 21101, 3, 4, -1, 99], []);
        machine.start_trace();
        machine.run_to_completion().unwrap();
        let Trace(trace) = machine.end_trace().unwrap();
        assert_eq!(trace.len(), 3);
        let add = trace[1];
        assert_eq!(add.instr_ptr(), 2);
        assert_eq!(add.rel_base(), 10);
        assert_eq!(add.opcode(), 1);
        assert_eq!(add.mnemonic(), "add");
        assert_eq!(
            add.param_modes(),
            [ParamMode::Immediate, ParamMode::Immediate, ParamMode::Relative]
        );
        assert_eq!(
            add.params().collect::<Vec<_>>(),
            [
                Resolved::Value { raw: 3, value: 3 },
                Resolved::Value { raw: 4, value: 4 },
                Resolved::Dest { raw: -1, address: 9 },
            ]
        );
        assert_eq!(add.stored_at(), Some(9));
        assert_eq!(add.stored_val(), Some(7));
        assert_eq!(trace[2].opcode(), HALT);
        assert_eq!(machine.end_trace(), None);
    }

    #[test]
    fn opcode_comes_from_decoding() {
        use crate::ops::{ExecContext, InstructionSet, Operation};

        /// Does nothing, under a misleading name
        #[derive(Debug)]
        struct FakeHalt;

        impl Operation for FakeHalt {
            fn mnemonic(&self) -> &'static str {
                "halt"
            }
            fn arity(&self) -> usize {
                0
            }
            fn apply(&self, ctx: &mut ExecContext<'_>) -> Result<(), crate::MachineError> {
                ctx.advance();
                Ok(())
            }
        }

        let mut ops = InstructionSet::full();
        ops.register(42, FakeHalt);
        let mut machine = Machine::with_instruction_set([42, 99], [], ops);
        machine.start_trace();
        machine.run_to_completion().unwrap();
        let Trace(trace) = machine.end_trace().unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].mnemonic(), "halt");
        assert_eq!(trace[0].opcode(), 42);
        assert_eq!(trace[0].instr_ptr(), 0);
        assert_eq!(trace[1].opcode(), HALT);
        assert_eq!(trace[1].instr_ptr(), 1);
    }

    #[test]
    fn restarting_returns_old_trace() {
        let mut machine = Machine::new([104, 1, 104, 2, 99], []);
        assert!(machine.start_trace().is_none());
        machine.step().unwrap();
        let old = machine.start_trace().unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(old.0[0].output(), Some(1));
        machine.step().unwrap();
        assert_eq!(machine.show_trace().map(Trace::len), Some(1));
    }
}

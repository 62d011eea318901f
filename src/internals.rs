// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use super::*;
use crate::opcode::{Instruction, MAX_PARAMS};
use crate::ops::ExecContext;
use crate::trace::TracedInstr;

impl Machine {
    /// Execute the instruction at the instruction pointer.
    ///
    /// Logging and tracing only happen once the operation has succeeded.
    pub(crate) fn exec_instruction(&mut self) -> Result<StepOutcome, MachineError> {
        let (ip, rel_base) = (self.ip, self.rel_base);
        let word = self.mem[ip];
        let (opcode, modes) = match Instruction::decode(word)? {
            Instruction::Halt => return self.halt(word),
            Instruction::Op { opcode, modes } => (opcode, modes),
        };
        let op = self
            .ops
            .get(opcode)
            .ok_or(MachineError::UnrecognizedOpcode(word))?;
        let (mnemonic, arity) = (op.mnemonic(), op.arity());

        let mut args = [0; MAX_PARAMS];
        for (offset, arg) in (1..).zip(args.iter_mut().take(arity)) {
            *arg = self.mem[ip + offset];
        }

        let mut ctx = ExecContext::new(
            &mut self.mem,
            &mut self.ip,
            &mut self.rel_base,
            &mut self.inputs,
            &mut self.outputs,
            &args[..arity],
            modes,
        );
        if let Err(err) = op.apply(&mut ctx) {
            if err == MachineError::InputUnderflow {
                tracing::debug!(ip, "suspended waiting for input");
            }
            return Err(err);
        }
        let record = ctx.into_record();
        tracing::trace!(ip, rel_base, mnemonic, "executed instruction");

        let instr = TracedInstr::build(word, opcode, ip, rel_base, mnemonic, modes, record);
        if let Some(trace) = self.trace.as_mut() {
            trace.push(instr);
        }
        self.log(Verbosity::Instructions, ip, rel_base, format_args!("{instr}"))?;
        if let Some(input) = record.input {
            self.log(Verbosity::Io, ip, rel_base, format_args!("input {input}"))?;
        }
        if let Some(output) = record.output {
            self.log(Verbosity::Io, ip, rel_base, format_args!("output {output}"))?;
        }
        if let Some((address, value)) = record.stored {
            self.log(
                Verbosity::Memory,
                ip,
                rel_base,
                format_args!("store {value} -> [{address}]"),
            )?;
        }

        Ok(record.output.map_or(StepOutcome::Running, StepOutcome::Output))
    }

    fn halt(&mut self, word: i64) -> Result<StepOutcome, MachineError> {
        let (ip, rel_base) = (self.ip, self.rel_base);
        self.state = State::Halted;
        tracing::debug!(ip, outputs = self.outputs.len(), "machine halted");

        let instr = TracedInstr::halt(word, ip, rel_base);
        if let Some(trace) = self.trace.as_mut() {
            trace.push(instr);
        }
        self.log(Verbosity::Io, ip, rel_base, format_args!("{instr}"))?;
        Ok(StepOutcome::Halted)
    }
}

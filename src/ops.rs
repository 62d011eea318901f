// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Operations, and the [InstructionSet] that maps opcodes to them
//!
//! Each opcode is handled by its own [Operation], which declares how many parameters it takes and
//! applies itself to an [ExecContext]. The machine's execution loop knows nothing about what any
//! particular operation does, so new ones can be registered without touching it.
//!
//! # Example
//!
//! A custom operation that outputs the square of its parameter:
//!
//! ```
//! use intcode::prelude::*;
//! use intcode::ops::{ExecContext, InstructionSet, Operation};
//!
//! #[derive(Debug)]
//! struct Square;
//!
//! impl Operation for Square {
//!     fn mnemonic(&self) -> &'static str {
//!         "sqr"
//!     }
//!     fn arity(&self) -> usize {
//!         1
//!     }
//!     fn apply(&self, ctx: &mut ExecContext<'_>) -> Result<(), MachineError> {
//!         let n = ctx.val(0)?;
//!         ctx.push_output(n * n);
//!         ctx.advance();
//!         Ok(())
//!     }
//! }
//!
//! let mut ops = InstructionSet::full();
//! ops.register(42, Square);
//! let mut machine = Machine::with_instruction_set([142, 12, 99], [], ops);
//! assert_eq!(machine.run_to_completion().unwrap(), &[144]);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::MachineError;
use crate::memory::Memory;
use crate::opcode::{HALT, MAX_PARAMS, ParamMode};
use crate::trace::Resolved;

/// A handler for a single opcode
pub trait Operation: fmt::Debug + Send + Sync {
    /// Short name used when logging and tracing
    fn mnemonic(&self) -> &'static str;

    /// The number of parameter words following the instruction word. At most [MAX_PARAMS].
    fn arity(&self) -> usize;

    /// Perform the operation.
    ///
    /// Implementations must move the instruction pointer, either with [ExecContext::advance] or
    /// [ExecContext::jump]. An operation that returns an error should leave the context untouched
    /// if it wants the machine to be resumable.
    fn apply(&self, ctx: &mut ExecContext<'_>) -> Result<(), MachineError>;

    /// Whether this operation reads from the input queue.
    ///
    /// Used to decide when to pull from a [blocking input source](crate::blocking).
    fn consumes_input(&self) -> bool {
        false
    }
}

/// What happened during a single operation, beyond the change in memory and registers
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct StepRecord {
    pub(crate) params: [Option<Resolved>; MAX_PARAMS],
    /// address and value of a store
    pub(crate) stored: Option<(u64, i64)>,
    pub(crate) input: Option<i64>,
    pub(crate) output: Option<i64>,
}

/// Mutable view of a machine's state, handed to an [Operation]
///
/// Parameters are numbered from `0`. Accessing a parameter at or beyond the operation's
/// [arity](Operation::arity) panics.
pub struct ExecContext<'m> {
    mem: &'m mut Memory,
    ip: &'m mut u64,
    rel_base: &'m mut i64,
    inputs: &'m mut VecDeque<i64>,
    outputs: &'m mut Vec<i64>,
    args: &'m [i64],
    modes: [ParamMode; MAX_PARAMS],
    record: StepRecord,
}

impl<'m> ExecContext<'m> {
    #[allow(clippy::too_many_arguments, reason = "one per register")]
    pub(crate) fn new(
        mem: &'m mut Memory,
        ip: &'m mut u64,
        rel_base: &'m mut i64,
        inputs: &'m mut VecDeque<i64>,
        outputs: &'m mut Vec<i64>,
        args: &'m [i64],
        modes: [ParamMode; MAX_PARAMS],
    ) -> Self {
        Self {
            mem,
            ip,
            rel_base,
            inputs,
            outputs,
            args,
            modes,
            record: StepRecord::default(),
        }
    }

    pub(crate) fn into_record(self) -> StepRecord {
        self.record
    }

    /// The raw word of the `n`th parameter
    pub fn arg(&self, n: usize) -> i64 {
        self.args[n]
    }

    /// The mode of the `n`th parameter
    pub fn mode(&self, n: usize) -> ParamMode {
        self.modes[n]
    }

    fn address(&self, raw: i64, base: i64) -> Result<u64, MachineError> {
        let address = raw
            .checked_add(base)
            .ok_or(MachineError::Overflow { lhs: raw, rhs: base })?;
        u64::try_from(address).map_err(|_| MachineError::NegativeAddress(address))
    }

    /// Resolve the `n`th parameter into a value according to its mode
    pub fn val(&mut self, n: usize) -> Result<i64, MachineError> {
        let raw = self.args[n];
        let val = match self.modes[n] {
            ParamMode::Immediate => raw,
            ParamMode::Positional => self.mem[self.address(raw, 0)?],
            ParamMode::Relative => self.mem[self.address(raw, *self.rel_base)?],
        };
        self.record.params[n] = Some(Resolved::Value { raw, value: val });
        Ok(val)
    }

    /// Resolve the `n`th parameter into a destination address according to its mode
    pub fn dest(&mut self, n: usize) -> Result<u64, MachineError> {
        let raw = self.args[n];
        let address = match self.modes[n] {
            ParamMode::Immediate => return Err(MachineError::WriteToImmediate(raw)),
            ParamMode::Positional => self.address(raw, 0)?,
            ParamMode::Relative => self.address(raw, *self.rel_base)?,
        };
        self.record.params[n] = Some(Resolved::Dest { raw, address });
        Ok(address)
    }

    /// Read memory directly
    pub fn read(&self, address: u64) -> i64 {
        self.mem[address]
    }

    /// Write `value` to `address`
    pub fn store(&mut self, address: u64, value: i64) {
        self.mem[address] = value;
        self.record.stored = Some((address, value));
    }

    /// Take the oldest queued input
    pub fn next_input(&mut self) -> Result<i64, MachineError> {
        let input = self.inputs.pop_front().ok_or(MachineError::InputUnderflow)?;
        self.record.input = Some(input);
        Ok(input)
    }

    /// Append `value` to the output sequence
    pub fn push_output(&mut self, value: i64) {
        self.outputs.push(value);
        self.record.output = Some(value);
    }

    /// The current relative base
    pub fn relative_base(&self) -> i64 {
        *self.rel_base
    }

    /// Add `delta` to the relative base
    pub fn adjust_relative_base(&mut self, delta: i64) -> Result<(), MachineError> {
        *self.rel_base = self
            .rel_base
            .checked_add(delta)
            .ok_or(MachineError::Overflow {
                lhs: *self.rel_base,
                rhs: delta,
            })?;
        Ok(())
    }

    /// Move the instruction pointer past this instruction and its parameters
    pub fn advance(&mut self) {
        *self.ip += 1 + self.args.len() as u64;
    }

    /// Move the instruction pointer to `target`
    pub fn jump(&mut self, target: i64) -> Result<(), MachineError> {
        *self.ip = u64::try_from(target).map_err(|_| MachineError::JumpToNegative(target))?;
        Ok(())
    }
}

/// common logic of all 4 instructions that take 2 operands and store a result. `f` returns
/// [`None`] on overflow.
fn op3(
    ctx: &mut ExecContext<'_>,
    f: impl Fn(i64, i64) -> Option<i64>,
) -> Result<(), MachineError> {
    let a = ctx.val(0)?;
    let b = ctx.val(1)?;
    let dest = ctx.dest(2)?;
    let result = f(a, b).ok_or(MachineError::Overflow { lhs: a, rhs: b })?;
    ctx.store(dest, result);
    ctx.advance();
    Ok(())
}

fn jump(ctx: &mut ExecContext<'_>, cond: impl Fn(i64) -> bool) -> Result<(), MachineError> {
    let test = ctx.val(0)?;
    let target = ctx.val(1)?;
    if cond(test) {
        ctx.jump(target)
    } else {
        ctx.advance();
        Ok(())
    }
}

macro_rules! operation {
    ($(#[$attr: meta])* $name: ident, $mnemonic: literal, $arity: literal, |$ctx: ident| $body: expr) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Operation for $name {
            fn mnemonic(&self) -> &'static str {
                $mnemonic
            }
            fn arity(&self) -> usize {
                $arity
            }
            fn apply(&self, $ctx: &mut ExecContext<'_>) -> Result<(), MachineError> {
                $body
            }
        }
    };
}

operation!(
    /// Opcode 1: store the sum of the first two parameters in the third
    Add, "add", 3, |ctx| op3(ctx, i64::checked_add)
);
operation!(
    /// Opcode 2: store the product of the first two parameters in the third
    Mul, "mul", 3, |ctx| op3(ctx, i64::checked_mul)
);
operation!(
    /// Opcode 5: jump to the second parameter if the first is non-zero
    Jnz, "jnz", 2, |ctx| jump(ctx, |n| n != 0)
);
operation!(
    /// Opcode 6: jump to the second parameter if the first is zero
    Jz, "jz", 2, |ctx| jump(ctx, |n| n == 0)
);
operation!(
    /// Opcode 7: store `1` in the third parameter if the first is less than the second, else `0`
    Lt, "lt", 3, |ctx| op3(ctx, |a, b| Some(i64::from(a < b)))
);
operation!(
    /// Opcode 8: store `1` in the third parameter if the first two are equal, else `0`
    Eq, "eq", 3, |ctx| op3(ctx, |a, b| Some(i64::from(a == b)))
);
operation!(
    /// Opcode 4: append the parameter to the output sequence
    Out, "out", 1, |ctx| {
        let val = ctx.val(0)?;
        ctx.push_output(val);
        ctx.advance();
        Ok(())
    }
);
operation!(
    /// Opcode 9: adjust the relative base by the parameter
    Rbo, "rbo", 1, |ctx| {
        let delta = ctx.val(0)?;
        ctx.adjust_relative_base(delta)?;
        ctx.advance();
        Ok(())
    }
);

/// Opcode 3: store the oldest queued input in the parameter
#[derive(Debug, Clone, Copy, Default)]
pub struct In;

impl Operation for In {
    fn mnemonic(&self) -> &'static str {
        "in"
    }
    fn arity(&self) -> usize {
        1
    }
    fn apply(&self, ctx: &mut ExecContext<'_>) -> Result<(), MachineError> {
        // resolve the destination first so that a failed read leaves nothing half-done
        let dest = ctx.dest(0)?;
        let input = ctx.next_input()?;
        ctx.store(dest, input);
        ctx.advance();
        Ok(())
    }
    fn consumes_input(&self) -> bool {
        true
    }
}

/// Mapping from opcodes to the [Operation]s that handle them
///
/// Opcode `99` always halts, and is never looked up here.
#[derive(Clone)]
pub struct InstructionSet {
    ops: BTreeMap<i64, Arc<dyn Operation>>,
}

impl InstructionSet {
    /// An instruction set with no operations, which can only halt
    pub fn empty() -> Self {
        Self {
            ops: BTreeMap::new(),
        }
    }

    /// Opcodes `1` through `8`: arithmetic, I/O, jumps and comparisons, without relative base
    /// adjustment
    pub fn basic() -> Self {
        let mut set = Self::empty();
        set.register(1, Add);
        set.register(2, Mul);
        set.register(3, In);
        set.register(4, Out);
        set.register(5, Jnz);
        set.register(6, Jz);
        set.register(7, Lt);
        set.register(8, Eq);
        set
    }

    /// The complete instruction set: [basic](InstructionSet::basic) plus opcode `9`, relative base
    /// adjustment
    pub fn full() -> Self {
        let mut set = Self::basic();
        set.register(9, Rbo);
        set
    }

    /// Bind `op` to `opcode`, returning the operation previously bound to it, if any.
    ///
    /// # Panics
    ///
    /// Panics if `opcode` is not in `0..=98`, or if `op` takes more than [MAX_PARAMS] parameters
    pub fn register(
        &mut self,
        opcode: i64,
        op: impl Operation + 'static,
    ) -> Option<Arc<dyn Operation>> {
        assert!(
            (0..HALT).contains(&opcode),
            "opcode {opcode} can't be bound to an operation"
        );
        assert!(
            op.arity() <= MAX_PARAMS,
            "{} takes {} parameters, but at most {MAX_PARAMS} are supported",
            op.mnemonic(),
            op.arity()
        );
        self.ops.insert(opcode, Arc::new(op))
    }

    /// Unbind `opcode`, returning the operation that was bound to it
    pub fn remove(&mut self, opcode: i64) -> Option<Arc<dyn Operation>> {
        self.ops.remove(&opcode)
    }

    /// Look up the operation bound to `opcode`
    pub fn get(&self, opcode: i64) -> Option<&dyn Operation> {
        self.ops.get(&opcode).map(|op| &**op)
    }

    /// Iterate over bound opcodes and their operations, in opcode order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &dyn Operation)> {
        self.ops.iter().map(|(&opcode, op)| (opcode, &**op))
    }
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::full()
    }
}

impl fmt::Debug for InstructionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(opcode, op)| (opcode, op.mnemonic())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        mem: Memory,
        ip: u64,
        rel_base: i64,
        inputs: VecDeque<i64>,
        outputs: Vec<i64>,
    }

    impl Harness {
        fn new(mem: impl IntoIterator<Item = i64>) -> Self {
            Self {
                mem: mem.into_iter().collect(),
                ip: 0,
                rel_base: 0,
                inputs: VecDeque::new(),
                outputs: Vec::new(),
            }
        }

        fn apply(
            &mut self,
            op: &dyn Operation,
            args: &[i64],
            modes: [ParamMode; MAX_PARAMS],
        ) -> Result<StepRecord, MachineError> {
            let mut ctx = ExecContext::new(
                &mut self.mem,
                &mut self.ip,
                &mut self.rel_base,
                &mut self.inputs,
                &mut self.outputs,
                args,
                modes,
            );
            op.apply(&mut ctx)?;
            Ok(ctx.into_record())
        }
    }

    use ParamMode::*;

    #[test]
    fn add_resolves_each_mode() {
        let mut h = Harness::new([0, 0, 0, 0, 0, 7, 11]);
        h.rel_base = 1;
        let record = h.apply(&Add, &[5, 5, 2], [Positional, Relative, Relative]).unwrap();
        assert_eq!(h.mem[3], 18);
        assert_eq!(h.ip, 4);
        assert_eq!(
            record.params,
            [
                Some(Resolved::Value { raw: 5, value: 7 }),
                Some(Resolved::Value { raw: 5, value: 11 }),
                Some(Resolved::Dest { raw: 2, address: 3 }),
            ]
        );
        assert_eq!(record.stored, Some((3, 18)));
    }

    #[test]
    fn comparisons_store_flags() {
        let mut h = Harness::new([]);
        h.apply(&Lt, &[3, 4, 10], [Immediate, Immediate, Positional]).unwrap();
        h.apply(&Lt, &[4, 4, 11], [Immediate, Immediate, Positional]).unwrap();
        h.apply(&Eq, &[4, 4, 12], [Immediate, Immediate, Positional]).unwrap();
        h.apply(&Eq, &[4, 5, 13], [Immediate, Immediate, Positional]).unwrap();
        assert_eq!(&h.mem.read_range(10, 4)[..], &[1, 0, 1, 0]);
        assert_eq!(h.ip, 16);
    }

    #[test]
    fn jumps() {
        let mut h = Harness::new([]);
        h.apply(&Jnz, &[0, 50], [Immediate, Immediate, Positional]).unwrap();
        assert_eq!(h.ip, 3);
        h.apply(&Jnz, &[-1, 50], [Immediate, Immediate, Positional]).unwrap();
        assert_eq!(h.ip, 50);
        h.apply(&Jz, &[1, 7], [Immediate, Immediate, Positional]).unwrap();
        assert_eq!(h.ip, 53);
        h.apply(&Jz, &[0, 7], [Immediate, Immediate, Positional]).unwrap();
        assert_eq!(h.ip, 7);
        assert_eq!(
            h.apply(&Jz, &[0, -7], [Immediate, Immediate, Positional])
                .unwrap_err(),
            MachineError::JumpToNegative(-7)
        );
    }

    #[test]
    fn input_underflow_leaves_state() {
        let mut h = Harness::new([]);
        assert_eq!(
            h.apply(&In, &[0], [Positional; 3]).unwrap_err(),
            MachineError::InputUnderflow
        );
        assert_eq!(h.ip, 0);
        assert!(h.mem.is_empty());

        h.inputs.extend([5, 6]);
        let record = h.apply(&In, &[0], [Positional; 3]).unwrap();
        assert_eq!(record.input, Some(5));
        assert_eq!(h.mem[0], 5);
        assert_eq!(h.inputs, [6]);
    }

    #[test]
    fn write_targets() {
        let mut h = Harness::new([]);
        assert_eq!(
            h.apply(&Add, &[1, 1, 4], [Immediate; 3]).unwrap_err(),
            MachineError::WriteToImmediate(4)
        );
        assert_eq!(
            h.apply(&Add, &[1, 1, -4], [Immediate, Immediate, Positional])
                .unwrap_err(),
            MachineError::NegativeAddress(-4)
        );
        h.rel_base = 10;
        h.apply(&Add, &[1, 1, -4], [Immediate, Immediate, Relative]).unwrap();
        assert_eq!(h.mem[6], 2);
    }

    #[test]
    fn relative_base_and_output() {
        let mut h = Harness::new([]);
        h.apply(&Rbo, &[-3], [Immediate; 3]).unwrap();
        assert_eq!(h.rel_base, -3);
        let record = h.apply(&Out, &[13], [Relative; 3]).unwrap();
        assert_eq!(record.output, Some(0));
        assert_eq!(h.outputs, [0]);
        assert_eq!(h.ip, 4);
    }

    #[test]
    fn arithmetic_overflow() {
        let mut h = Harness::new([]);
        assert_eq!(
            h.apply(&Add, &[i64::MAX, 1, 5], [Immediate, Immediate, Positional])
                .unwrap_err(),
            MachineError::Overflow {
                lhs: i64::MAX,
                rhs: 1
            }
        );
        assert_eq!(
            h.apply(&Mul, &[i64::MIN, -1, 5], [Immediate, Immediate, Positional])
                .unwrap_err(),
            MachineError::Overflow {
                lhs: i64::MIN,
                rhs: -1
            }
        );
        // nothing was stored, and the instruction pointer didn't move
        assert!(h.mem.is_empty());
        assert_eq!(h.ip, 0);
        h.apply(&Add, &[i64::MAX, i64::MIN, 5], [Immediate, Immediate, Positional])
            .unwrap();
        assert_eq!(h.mem[5], -1);
    }

    #[test]
    fn relative_base_overflow() {
        let mut h = Harness::new([]);
        h.apply(&Rbo, &[i64::MAX], [Immediate; 3]).unwrap();
        assert_eq!(
            h.apply(&Rbo, &[1], [Immediate; 3]).unwrap_err(),
            MachineError::Overflow {
                lhs: i64::MAX,
                rhs: 1
            }
        );
        assert_eq!(h.rel_base, i64::MAX);
        // resolving a relative parameter overflows too
        assert_eq!(
            h.apply(&Out, &[1], [Relative; 3]).unwrap_err(),
            MachineError::Overflow {
                lhs: 1,
                rhs: i64::MAX
            }
        );
        assert_eq!(h.apply(&Out, &[-1], [Relative; 3]).map(|r| r.output), Ok(Some(0)));
        assert_eq!(h.outputs, [0]);
    }

    #[test]
    fn instruction_sets() {
        let basic = InstructionSet::basic();
        assert!(basic.get(9).is_none());
        assert!(basic.iter().map(|(opcode, _)| opcode).eq(1..=8));
        let full = InstructionSet::default();
        assert_eq!(full.get(9).map(|op| op.mnemonic()), Some("rbo"));
        assert!(full.get(3).is_some_and(|op| op.consumes_input()));
        assert!(!full.get(4).is_some_and(|op| op.consumes_input()));
    }

    #[test]
    #[should_panic(expected = "can't be bound")]
    fn halt_is_reserved() {
        InstructionSet::empty().register(HALT, Add);
    }
}

// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Instruction word decoding
//!
//! Given an instruction word with decimal digits `ABCDE`:
//!
//! * `DE` is the two-digit opcode
//! * `C` is the 1st parameter's mode
//! * `B` is the 2nd parameter's mode
//! * `A` is the 3rd parameter's mode
//!
//! So `1202` decodes to opcode `02` (multiply), with its 1st parameter in [relative] mode, its
//! 2nd in [immediate] mode, and its 3rd in [positional] mode, because missing digits are zeroes.
//!
//! [positional]: ParamMode::Positional
//! [immediate]: ParamMode::Immediate
//! [relative]: ParamMode::Relative

use std::fmt::{self, Display};

use crate::MachineError;

/// The most parameters any instruction can take
pub const MAX_PARAMS: usize = 3;

/// The opcode that halts a machine. It can't be bound to an [Operation](crate::ops::Operation).
pub const HALT: i64 = 99;

/// Parameter mode for an instruction parameter
///
/// When executing an instruction, its parameters are interpreted in accordance with their modes.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum ParamMode {
    /// The parameter is the address of the value.
    #[default]
    Positional = 0,
    /// The parameter is the value itself. Instructions which write to memory may not use
    /// immediate mode for their destinations.
    #[doc(alias = "#")]
    Immediate = 1,
    /// The parameter, added to the relative base, is the address of the value.
    #[doc(alias = "@")]
    Relative = 2,
}

impl Display for ParamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamMode::Positional => Ok(()),
            ParamMode::Immediate => write!(f, "#"),
            ParamMode::Relative => write!(f, "@"),
        }
    }
}

impl TryFrom<i64> for ParamMode {
    type Error = MachineError;
    fn try_from(digit: i64) -> Result<Self, Self::Error> {
        match digit {
            0 => Ok(ParamMode::Positional),
            1 => Ok(ParamMode::Immediate),
            2 => Ok(ParamMode::Relative),
            _ => Err(MachineError::UnknownMode(digit)),
        }
    }
}

/// A decoded instruction word
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    /// Opcode 99. Carries no parameter modes, and any leading digits are ignored.
    Halt,
    /// Any other opcode, which may or may not be bound to an operation
    Op {
        /// The last two decimal digits of the word
        opcode: i64,
        /// The parameter modes, in parameter order. Unspecified modes are positional.
        modes: [ParamMode; MAX_PARAMS],
    },
}

impl Instruction {
    /// Decode an instruction word
    ///
    /// Every leading digit must be a valid mode, even ones beyond the 3rd parameter, which are
    /// otherwise ignored.
    ///
    /// ```
    /// use intcode::opcode::{Instruction, ParamMode};
    /// assert_eq!(
    ///     Instruction::decode(1002),
    ///     Ok(Instruction::Op {
    ///         opcode: 2,
    ///         modes: [ParamMode::Positional, ParamMode::Immediate, ParamMode::Positional],
    ///     })
    /// );
    /// assert_eq!(Instruction::decode(21299), Ok(Instruction::Halt));
    /// ```
    pub fn decode(word: i64) -> Result<Self, MachineError> {
        if word < 0 {
            return Err(MachineError::UnrecognizedOpcode(word));
        }
        let opcode = word % 100;
        if opcode == HALT {
            return Ok(Instruction::Halt);
        }

        let mut modes = [ParamMode::Positional; MAX_PARAMS];
        let mut digits = word / 100;
        let mut i = 0;
        while digits != 0 {
            let mode = ParamMode::try_from(digits % 10)?;
            if let Some(slot) = modes.get_mut(i) {
                *slot = mode;
            }
            digits /= 10;
            i += 1;
        }
        Ok(Instruction::Op { opcode, modes })
    }

    /// The opcode of the instruction
    pub fn opcode(self) -> i64 {
        match self {
            Instruction::Halt => HALT,
            Instruction::Op { opcode, .. } => opcode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ParamMode::*;

    #[test]
    fn trailing_modes_default_positional() {
        assert_eq!(
            Instruction::decode(1002),
            Ok(Instruction::Op {
                opcode: 2,
                modes: [Positional, Immediate, Positional]
            })
        );
        assert_eq!(
            Instruction::decode(3),
            Ok(Instruction::Op {
                opcode: 3,
                modes: [Positional; 3]
            })
        );
    }

    #[test]
    fn all_modes() {
        assert_eq!(
            Instruction::decode(21201),
            Ok(Instruction::Op {
                opcode: 1,
                modes: [Relative, Immediate, Relative]
            })
        );
        assert_eq!(
            Instruction::decode(204),
            Ok(Instruction::Op {
                opcode: 4,
                modes: [Relative, Positional, Positional]
            })
        );
    }

    #[test]
    fn bad_mode_digit() {
        assert_eq!(Instruction::decode(301), Err(MachineError::UnknownMode(3)));
        assert_eq!(Instruction::decode(90_001), Err(MachineError::UnknownMode(9)));
        // past the 3rd parameter, but still checked
        assert_eq!(Instruction::decode(500_001), Err(MachineError::UnknownMode(5)));
        assert!(Instruction::decode(100_001).is_ok());
    }

    #[test]
    fn halt_ignores_modes() {
        assert_eq!(Instruction::decode(99), Ok(Instruction::Halt));
        assert_eq!(Instruction::decode(99_999), Ok(Instruction::Halt));
        assert_eq!(Instruction::Halt.opcode(), HALT);
    }

    #[test]
    fn negative_word() {
        assert_eq!(
            Instruction::decode(-1),
            Err(MachineError::UnrecognizedOpcode(-1))
        );
    }

    #[test]
    fn unbound_opcodes_still_decode() {
        // whether an opcode means anything is up to the instruction set
        assert_eq!(Instruction::decode(1042).map(Instruction::opcode), Ok(42));
        assert_eq!(Instruction::decode(0).map(Instruction::opcode), Ok(0));
    }
}

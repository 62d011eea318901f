// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2019 Day 2 built using the `intcode` library.

use intcode::prelude::*;

fn run_with(base: &Machine, noun: i64, verb: i64) -> i64 {
    let mut machine = base.clone();
    machine.mem_override(1, noun);
    machine.mem_override(2, verb);
    let output = machine.run_to_completion().unwrap();
    assert!(output.is_empty(), "intcode had unexpected output");
    machine.mem_get(0)
}

fn part1(base: &Machine) -> i64 {
    run_with(base, 12, 2)
}

fn part2(base: &Machine) -> i64 {
    for noun in 0..=99 {
        for verb in 0..=99 {
            #[allow(clippy::unreadable_literal, reason = "from Advent of Code")]
            if run_with(base, noun, verb) == 19690720 {
                return 100 * noun + verb;
            }
        }
    }
    panic!("no answer found for part 2");
}

fn main() {
    use std::env::args_os;
    use std::fs::read_to_string;
    let input =
        read_to_string(args_os().nth(1).expect("missing file name")).expect("failed to read file");

    let code = intcode::text::parse_program(&input).expect("failed to parse intcode");
    let machine = Machine::with_instruction_set(code, [], intcode::ops::InstructionSet::basic());
    println!("part 1: {}", part1(&machine));
    println!("part 2: {}", part2(&machine));
}

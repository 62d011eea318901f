// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2019 Day 9 built using the `intcode` library.

use intcode::prelude::*;

fn run_with(base: &Machine, input: i64) -> i64 {
    let mut machine = base.clone();
    machine.add_input(input);
    let output = machine.run_to_completion().unwrap();
    // any output before the last is a malfunctioning opcode
    assert_eq!(output.len(), 1, "{output:?}");
    output[0]
}

fn main() {
    use std::env::args_os;
    use std::fs::read_to_string;
    let input =
        read_to_string(args_os().nth(1).expect("missing file name")).expect("failed to read file");

    let code = intcode::text::parse_program(&input).expect("failed to parse intcode");
    let machine = Machine::new(code, []);
    println!("part 1: {}", run_with(&machine, 1));
    println!("part 2: {}", run_with(&machine, 2));
}

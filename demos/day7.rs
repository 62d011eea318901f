// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2019 Day 7 built using the `intcode` library.

use intcode::pipeline::{Topology, max_signal};

fn main() {
    use std::env::args_os;
    use std::fs::read_to_string;
    let input =
        read_to_string(args_os().nth(1).expect("missing file name")).expect("failed to read file");

    let code = intcode::text::parse_program(&input).expect("failed to parse intcode");
    let (part1, phases) = max_signal(&code, &[0, 1, 2, 3, 4], Topology::Serial, 0).unwrap();
    println!("part 1: {part1} (phases {phases:?})");
    let (part2, phases) = max_signal(&code, &[5, 6, 7, 8, 9], Topology::Feedback, 0).unwrap();
    println!("part 2: {part2} (phases {phases:?})");
}

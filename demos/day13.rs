// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2019 Day 13 built using the `intcode` library.
//!
//! Part 2 drives the joystick from a blocking input source that tracks the ball with the paddle.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use intcode::prelude::*;

const BLOCK: i64 = 2;
const PADDLE: i64 = 3;
const BALL: i64 = 4;

fn part1(code: &[i64]) -> usize {
    let mut machine = Machine::new(code.iter().copied(), []);
    let output = machine.run_to_completion().unwrap();
    let (chunks, []) = output.as_chunks::<3>() else {
        panic!("output did not come in triples");
    };
    let screen: HashMap<(i64, i64), i64> = chunks.iter().map(|&[x, y, t]| ((x, y), t)).collect();
    screen.values().filter(|&&t| t == BLOCK).count()
}

fn part2(code: &[i64]) -> i64 {
    let ball_x = Rc::new(Cell::new(0_i64));
    let paddle_x = Rc::new(Cell::new(0_i64));
    let joystick = {
        let (ball_x, paddle_x) = (Rc::clone(&ball_x), Rc::clone(&paddle_x));
        move || (ball_x.get() - paddle_x.get()).signum()
    };

    let mut machine = Machine::new(code.iter().copied(), []);
    // insert quarters
    machine.mem_override(0, 2);
    let mut machine = BlockingMachine::new(machine, joystick);

    let mut score = 0;
    while let Some(x) = machine.run_to_next_output().unwrap() {
        let (Some(y), Some(tile)) = (
            machine.run_to_next_output().unwrap(),
            machine.run_to_next_output().unwrap(),
        ) else {
            panic!("halted partway through a triple");
        };
        match (x, y, tile) {
            (-1, 0, s) => score = s,
            (x, _, BALL) => ball_x.set(x),
            (x, _, PADDLE) => paddle_x.set(x),
            _ => (),
        }
    }
    score
}

fn main() {
    use std::env::args_os;
    use std::fs::read_to_string;
    let input =
        read_to_string(args_os().nth(1).expect("missing file name")).expect("failed to read file");

    let code = intcode::text::parse_program(&input).expect("failed to parse intcode");
    println!("part 1: {}", part1(&code));
    println!("part 2: {}", part2(&code));
}

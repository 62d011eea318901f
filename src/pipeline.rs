// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Chains of machines that pass signals along
//!
//! Machines never share memory. Each stage's output is copied into the next stage's input queue,
//! and stages are driven one at a time, so results are deterministic.
//!
//! ```
//! use intcode::pipeline::{self, Topology};
//!
//! // outputs its phase setting times 10, plus the incoming signal
//! let program = [3, 15, 3, 16, 1002, 15, 10, 15, 1, 16, 15, 15, 4, 15, 99, 0, 0];
//! assert_eq!(pipeline::run_serial(&program, &[1, 2, 3], 0), Ok(60));
//!
//! let (best, phases) = pipeline::max_signal(&program, &[1, 2, 3], Topology::Serial, 0).unwrap();
//! assert_eq!((best, phases), (60, vec![1, 2, 3]));
//! ```

use std::error::Error;
use std::fmt::{self, Display};

use itertools::Itertools;

use crate::{Machine, MachineError};

/// An error from running a pipeline
#[derive(Debug, PartialEq)]
pub enum PipelineError {
    /// A stage's machine failed
    Machine(MachineError),
    /// A stage in a serial chain halted without producing a signal
    NoOutput {
        /// The index of the stage
        stage: usize,
    },
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Machine(e) => write!(f, "machine failed: {e}"),
            Self::NoOutput { stage } => write!(f, "stage {stage} halted without output"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Machine(e) => Some(e),
            Self::NoOutput { .. } => None,
        }
    }
}

impl From<MachineError> for PipelineError {
    fn from(err: MachineError) -> Self {
        Self::Machine(err)
    }
}

/// Run `program` once per phase, in order. Each machine starts with its phase setting followed
/// by the previous stage's signal as input, and its first output is the next signal.
///
/// Returns the last stage's signal, or `signal` itself if `phases` is empty.
pub fn run_serial(program: &[i64], phases: &[i64], signal: i64) -> Result<i64, PipelineError> {
    phases
        .iter()
        .enumerate()
        .try_fold(signal, |signal, (stage, &phase)| {
            let mut machine = Machine::new(program.iter().copied(), [phase, signal]);
            let out = machine.run_to_next_output()?;
            tracing::trace!(stage, phase, signal, ?out, "serial stage finished");
            out.ok_or(PipelineError::NoOutput { stage })
        })
}

/// A ring of machines, each feeding its outputs to the next, with the last feeding the first
#[derive(Debug, Clone)]
pub struct FeedbackLoop {
    machines: Vec<Machine>,
}

impl FeedbackLoop {
    /// Create one machine running `program` per phase, with its phase setting queued as input
    pub fn new(program: &[i64], phases: &[i64]) -> Self {
        Self::from_machines(
            phases
                .iter()
                .map(|&phase| Machine::new(program.iter().copied(), [phase]))
                .collect(),
        )
    }

    /// Build a loop from already-configured machines
    pub fn from_machines(machines: Vec<Machine>) -> Self {
        Self { machines }
    }

    /// The machines in the loop, in order
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Feed `seed` to the first machine, then round-robin until every machine has halted.
    ///
    /// Each running machine in turn gets the current signal queued, and is run to its next output,
    /// which becomes the new signal. A machine that halts instead leaves the signal unchanged.
    /// Returns the final signal.
    pub fn run(&mut self, seed: i64) -> Result<i64, PipelineError> {
        let mut signal = seed;
        while self.machines.iter().any(Machine::is_running) {
            for (stage, machine) in self.machines.iter_mut().enumerate() {
                if !machine.is_running() {
                    continue;
                }
                machine.add_input(signal);
                if let Some(out) = machine.run_to_next_output()? {
                    tracing::trace!(stage, signal = out, "forwarding signal");
                    signal = out;
                }
            }
        }
        Ok(signal)
    }
}

/// How the stages of a pipeline are connected
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Topology {
    /// A single pass, as with [run_serial]
    Serial,
    /// A loop run until every stage halts, as with [FeedbackLoop]
    Feedback,
}

/// Try every ordering of `phases`, returning the highest final signal along with the ordering
/// that produced it. Ties go to the ordering tried first.
pub fn max_signal(
    program: &[i64],
    phases: &[i64],
    topology: Topology,
    seed: i64,
) -> Result<(i64, Vec<i64>), PipelineError> {
    let mut best: Option<(i64, Vec<i64>)> = None;
    for ordering in phases.iter().copied().permutations(phases.len()) {
        let signal = match topology {
            Topology::Serial => run_serial(program, &ordering, seed)?,
            Topology::Feedback => FeedbackLoop::new(program, &ordering).run(seed)?,
        };
        if best.as_ref().is_none_or(|(max, _)| signal > *max) {
            best = Some((signal, ordering));
        }
    }
    Ok(best.unwrap_or_else(|| (seed, Vec::new())))
}

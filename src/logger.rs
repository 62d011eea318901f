// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Optional per-machine logging of executed instructions
//!
//! A [Machine] logs nothing unless given a sink with [Machine::log_with].
//!
//! ```
//! use intcode::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
//! let mut machine = Machine::new([104, 1024, 99], []);
//! machine.log_with(sink.clone(), Verbosity::Io);
//! machine.run_to_completion().unwrap();
//!
//! let log = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
//! assert_eq!(log.lines().count(), 2);
//! assert!(log.lines().next().unwrap().ends_with("output 1024"));
//! ```

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use crate::Machine;

/// A log sink that can be shared between machines, or kept by the caller to inspect later
pub type SharedSink = Arc<Mutex<dyn io::Write + Send>>;

/// How much a [Machine] logs. Each level includes everything logged by the levels below it.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub enum Verbosity {
    /// Inputs consumed, outputs produced, and halting
    #[default]
    Io,
    /// Every executed instruction, with its parameters
    Instructions,
    /// Every store to memory
    Memory,
}

#[derive(Clone)]
pub(crate) struct Logger {
    sink: SharedSink,
    verbosity: Verbosity,
}

impl Logger {
    pub(crate) fn enabled(&self, level: Verbosity) -> bool {
        level <= self.verbosity
    }

    pub(crate) fn log(
        &self,
        level: Verbosity,
        ip: u64,
        rel_base: i64,
        msg: fmt::Arguments<'_>,
    ) -> io::Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        // a panic mid-write leaves the sink usable
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(sink, "ip: {ip:>8} | rb: {rel_base:>5} | {msg}")
    }
}

impl Machine {
    /// Log to `sink` at the given [Verbosity], replacing any previous sink.
    ///
    /// Clones of the machine share the sink.
    pub fn log_with(&mut self, sink: SharedSink, verbosity: Verbosity) {
        self.logger = Some(Logger { sink, verbosity });
    }

    /// Stop logging
    pub fn stop_logging(&mut self) {
        self.logger = None;
    }

    pub(crate) fn log(
        &self,
        level: Verbosity,
        ip: u64,
        rel_base: i64,
        msg: fmt::Arguments<'_>,
    ) -> io::Result<()> {
        match self.logger {
            Some(ref logger) => logger.log(level, ip, rel_base, msg),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use std::sync::{Arc, Mutex};

    fn run_logged(program: &[i64], inputs: &[i64], verbosity: Verbosity) -> Vec<String> {
        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut machine = Machine::new(program.iter().copied(), inputs.iter().copied());
        machine.log_with(sink.clone(), verbosity);
        machine.run_to_completion().unwrap();
        let bytes = sink.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    const ECHO: [i64; 5] = [3, 0, 4, 0, 99];

    #[test]
    fn io_level() {
        let lines = run_logged(&ECHO, &[7], Verbosity::Io);
        assert_eq!(
            lines,
            [
                "ip:        0 | rb:     0 | input 7",
                "ip:        2 | rb:     0 | output 7",
                "ip:        4 | rb:     0 | 00099 [halt]",
            ]
        );
    }

    #[test]
    fn instruction_level() {
        let lines = run_logged(&ECHO, &[7], Verbosity::Instructions);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("00003 [in 0 (stored 7)]"), "{lines:?}");
        assert!(lines[1].ends_with("input 7"));
        assert!(lines[2].ends_with("00004 [out 0 (resolves to 7)]"), "{lines:?}");
    }

    #[test]
    fn memory_level() {
        let lines = run_logged(&[1101, 2, 3, 5, 99, 0], &[], Verbosity::Memory);
        assert!(lines.iter().any(|l| l.ends_with("store 5 -> [5]")), "{lines:?}");
    }

    #[test]
    fn silent_without_sink() {
        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut machine = Machine::new(ECHO, [1]);
        machine.log_with(sink.clone(), Verbosity::Memory);
        machine.stop_logging();
        machine.run_to_completion().unwrap();
        assert!(machine.logger.is_none());
        assert!(sink.lock().unwrap().is_empty());
    }
}

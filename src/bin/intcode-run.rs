// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Run an Intcode program, printing its outputs

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display};
use std::fs::{self, File, read_to_string};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use chumsky::error::{Rich, RichPattern};
use clap::{ArgAction, Parser, ValueEnum};
use intcode::prelude::*;
use intcode::text::parse_program;
use itertools::Itertools;

#[derive(PartialEq, Clone, Copy, ValueEnum)]
enum CodeFormat {
    /// comma-separated ASCII-encoded decimal numbers
    #[value(alias("text"))]
    #[value(alias("aoc"))]
    Ascii,
    /// little-endian 64-bit integers
    #[cfg_attr(target_endian = "little", value(alias("binary-native")))]
    #[value(name("binary-little-endian"), alias("binle"))]
    LittleEndian,
    #[cfg_attr(target_endian = "big", value(alias("binary-native")))]
    #[value(name("binary-big-endian"), alias("binbe"))]
    /// big-endian 64-bit integers
    BigEndian,
}

#[derive(PartialEq, Clone, Copy, ValueEnum)]
enum LogLevel {
    /// inputs, outputs, and halting
    Io,
    /// every executed instruction
    #[value(alias("instrs"))]
    Instructions,
    /// every executed instruction and store to memory
    #[value(alias("mem"))]
    Memory,
}

impl From<LogLevel> for Verbosity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Io => Verbosity::Io,
            LogLevel::Instructions => Verbosity::Instructions,
            LogLevel::Memory => Verbosity::Memory,
        }
    }
}

const VERSION: &str = concat!(env!("CARGO_CRATE_NAME"), '-', env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = VERSION)]
#[command(about = "Intcode runner", long_about = None)]
struct Args {
    #[arg(help = "The intcode to run")]
    source: PathBuf,
    #[arg(help = "Input format for the intcode")]
    #[arg(short, long)]
    #[arg(default_value = "ascii")]
    format: CodeFormat,
    #[arg(help = "Comma-separated inputs to queue before running")]
    #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
    input: Vec<i64>,
    #[arg(help = "Set memory before running, as ADDRESS=VALUE")]
    #[arg(short, long, value_parser = parse_patch)]
    patch: Vec<(u64, i64)>,
    #[arg(help = "Read further input from stdin as needed")]
    #[arg(long)]
    interactive: bool,
    #[arg(help = "Treat input and output as ASCII text")]
    #[arg(long)]
    ascii: bool,
    #[arg(help = "Log execution to a file")]
    #[arg(long)]
    trace_file: Option<PathBuf>,
    #[arg(help = "What to log to the trace file")]
    #[arg(long, default_value = "io")]
    log_level: LogLevel,
    #[arg(help = "Report machine lifecycle events on stderr (repeat for more detail)")]
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_patch(s: &str) -> Result<(u64, i64), String> {
    let (addr, val) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDRESS=VALUE, got {s:?}"))?;
    let addr = addr
        .trim()
        .parse()
        .map_err(|e| format!("invalid address {addr:?}: {e}"))?;
    let val = val
        .trim()
        .parse()
        .map_err(|e| format!("invalid value {val:?}: {e}"))?;
    Ok((addr, val))
}

macro_rules! to_ascii_char {
    ($e: expr) => {{
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "in macro to make it explicit"
        )]
        {
            $e as u8 as char
        }
    }};
}

/// Writes outputs as they are produced
struct Printer {
    ascii: bool,
    streaming: bool,
    pending: Vec<i64>,
}

impl Printer {
    fn emit(&mut self, out: i64) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        match (self.ascii, out) {
            (true, c @ 0..128) => write!(stdout, "{}", to_ascii_char!(c))?,
            (true, n) => writeln!(stdout, "{n}")?,
            (false, n) if self.streaming => writeln!(stdout, "{n}")?,
            (false, n) => self.pending.push(n),
        }
        stdout.flush()
    }

    fn finish(self) -> io::Result<()> {
        if !self.pending.is_empty() {
            println!("{}", self.pending.iter().format(","));
        }
        Ok(())
    }
}

/// Supplies input from lines of a reader, normally stdin
///
/// Once reading fails, the source stays exhausted and keeps the error for the caller.
struct LineSource<R> {
    reader: R,
    ascii: bool,
    queued: VecDeque<i64>,
    failure: Option<RunError>,
}

impl<R: BufRead> LineSource<R> {
    fn new(reader: R, ascii: bool) -> Self {
        Self {
            reader,
            ascii,
            queued: VecDeque::new(),
            failure: None,
        }
    }

    fn read_line(&mut self) -> Result<(), RunError> {
        loop {
            let mut buf = String::new();
            if self.reader.read_line(&mut buf)? == 0 {
                return Err(RunError::InputClosed);
            }
            if self.ascii {
                if let Some(bad_char) = buf.chars().find(|c| !c.is_ascii()) {
                    eprintln!("{bad_char:?} is not a valid ASCII character, try again");
                    continue;
                }
                self.queued.extend(buf.bytes().map(i64::from));
                return Ok(());
            }
            match buf
                .split([',', ' ', '\t'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<i64>)
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(vals) if !vals.is_empty() => {
                    self.queued.extend(vals);
                    return Ok(());
                }
                Ok(_) => (),
                Err(e) => eprintln!("{e}, try again"),
            }
        }
    }
}

impl<R: BufRead> InputSource for LineSource<R> {
    fn next_input(&mut self) -> Option<i64> {
        if self.queued.is_empty()
            && self.failure.is_none()
            && let Err(e) = self.read_line()
        {
            self.failure = Some(e);
        }
        self.queued.pop_front()
    }
}

#[derive(Debug)]
enum RunError {
    Io(io::Error),
    Machine(MachineError),
    IncompleteI64(Box<[u8]>),
    InputClosed,
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Io(e) => write!(f, "an I/O error occured: {e}"),
            RunError::Machine(e) => write!(f, "machine error: {e}"),
            RunError::IncompleteI64(bytes) => {
                write!(f, "expected 8 bytes, got {}: {:02x?}", bytes.len(), bytes)
            }
            RunError::InputClosed => write!(f, "stdin closed while input was needed"),
        }
    }
}

impl Error for RunError {}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<MachineError> for RunError {
    fn from(e: MachineError) -> Self {
        Self::Machine(e)
    }
}

fn read_bin_file<F: Fn([u8; 8]) -> i64>(file: &Path, func: F) -> Result<Vec<i64>, RunError> {
    let input = fs::read(file)?;
    let (chunks, remainder) = input.as_chunks::<8>();
    if !remainder.is_empty() {
        return Err(RunError::IncompleteI64(Box::from(remainder)));
    }
    Ok(chunks.iter().map(|c| func(*c)).collect())
}

fn report_parse_err(err: &Rich<'_, char>, file: &str, source: &str) {
    use std::fmt::Write;

    let mut builder = Report::build(ReportKind::Error, (file, err.span().into_range()))
        .with_message(format!("Failed to parse {}", file.fg(Color::Red)));

    if let Some(found) = err.found() {
        builder = builder.with_label(
            Label::new((file, err.span().into_range()))
                .with_message(format!(
                    "Found token \'{}\'",
                    found.escape_default().fg(Color::Cyan)
                ))
                .with_color(Color::Yellow),
        );
    } else {
        builder = builder.with_label(
            Label::new((file, err.span().into_range()))
                .with_message(err.to_string())
                .with_color(Color::Yellow),
        );
    }

    let mut expected: Vec<_> = err.expected().collect();
    expected.retain(|pat| !matches!(pat, RichPattern::Label(s) if *s == "whitespace"));
    expected.sort_unstable();

    match &expected[..] {
        &[] => (),
        &[pat] => {
            builder = builder.with_note(format!("Expected \"{}\"", pat.fg(Color::Blue)));
        }
        pats => {
            let mut note = String::from("Expected one of the following:\n");
            for pat in pats {
                writeln!(&mut note, "- {}", pat.fg(Color::Blue))
                    .expect("can write to &mut String");
            }
            builder = builder.with_note(note);
        }
    }

    if let Err(e) = builder.finish().eprint((file, Source::from(source))) {
        eprintln!("failed to report parse error: {e}");
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => return,
        1 => "intcode=debug",
        _ => "intcode=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args, program: Vec<i64>) -> Result<(), RunError> {
    let mut machine = Machine::new(program, args.input.iter().copied());
    for &(addr, val) in &args.patch {
        machine.mem_override(addr, val);
    }

    let trace_sink = match args.trace_file.as_deref() {
        Some(path) => {
            let sink = Arc::new(Mutex::new(BufWriter::new(File::create(path)?)));
            machine.log_with(sink.clone(), args.log_level.into());
            Some(sink)
        }
        None => None,
    };

    let mut printer = Printer {
        ascii: args.ascii,
        streaming: args.interactive,
        pending: Vec::new(),
    };
    let mut machine = if args.interactive {
        BlockingMachine::new(machine, LineSource::new(io::stdin().lock(), args.ascii))
    } else {
        BlockingMachine::without_source(machine)
    };

    let result = loop {
        match machine.run_to_next_output() {
            Ok(Some(out)) => {
                if let Err(e) = printer.emit(out) {
                    break Err(RunError::from(e));
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(RunError::from(e)),
        }
    };
    // outputs and the trace are flushed however the run ended
    let finished = printer.finish();
    if let Some(sink) = trace_sink {
        sink.lock()
            .map_err(|_| io::Error::other("trace file lock poisoned"))?
            .flush()?;
    }
    if let Err(e) = result {
        eprintln!(
            "stopped at instruction pointer {} (relative base {})",
            machine.machine().instruction_pointer(),
            machine.machine().relative_base()
        );
        // an underflow caused by the reader failing is reported as that failure
        let failure = machine.source_mut().and_then(|s| s.failure.take());
        return Err(match (e, failure) {
            (RunError::Machine(MachineError::InputUnderflow), Some(failure)) => failure,
            (e, _) => e,
        });
    }
    finished.map_err(RunError::from)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let program = match args.format {
        CodeFormat::Ascii => {
            let file = args.source.to_string_lossy();
            let source = match read_to_string(&args.source) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Failed to read source from {file}: {e}");
                    return ExitCode::FAILURE;
                }
            };
            match parse_program(&source) {
                Ok(program) => program,
                Err(errs) => {
                    for err in &errs {
                        report_parse_err(err, &file, &source);
                    }
                    return ExitCode::FAILURE;
                }
            }
        }
        CodeFormat::LittleEndian => match read_bin_file(&args.source, i64::from_le_bytes) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("Failed to read {}: {e}", args.source.display());
                return ExitCode::FAILURE;
            }
        },
        CodeFormat::BigEndian => match read_bin_file(&args.source, i64::from_be_bytes) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("Failed to read {}: {e}", args.source.display());
                return ExitCode::FAILURE;
            }
        },
    };

    match run(&args, program) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patches() {
        assert_eq!(parse_patch("1=12"), Ok((1, 12)));
        assert_eq!(parse_patch(" 2 = -3 "), Ok((2, -3)));
        assert!(parse_patch("12").is_err());
        assert!(parse_patch("-1=0").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "intcode-run",
            "prog.txt",
            "-i",
            "1,-2,3",
            "-p",
            "1=12",
            "-p",
            "2=2",
            "--format",
            "binle",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.input, [1, -2, 3]);
        assert_eq!(args.patch, [(1, 12), (2, 2)]);
        assert!(args.format == CodeFormat::LittleEndian);
        assert_eq!(args.verbose, 2);
        assert!(!args.interactive);
    }

    #[test]
    fn reports_parse_errors() {
        let source = "1,,2\n";
        let errs = parse_program(source).unwrap_err();
        assert!(!errs.is_empty());
        // rendering goes to stderr, and must not panic
        for err in &errs {
            report_parse_err(err, "bad.txt", source);
        }
    }

    #[test]
    fn line_source_reads_until_closed() {
        let mut source = LineSource::new(&b"1, -2\n\nx\n3\n"[..], false);
        assert_eq!(source.next_input(), Some(1));
        assert_eq!(source.next_input(), Some(-2));
        // blank and malformed lines are skipped
        assert_eq!(source.next_input(), Some(3));
        assert_eq!(source.next_input(), None);
        assert!(matches!(source.failure, Some(RunError::InputClosed)));
        // the reader isn't touched again once it has failed
        assert_eq!(source.next_input(), None);

        let mut ascii = LineSource::new(&b"hi\n"[..], true);
        assert_eq!(ascii.next_input(), Some(i64::from(b'h')));
        assert_eq!(ascii.next_input(), Some(i64::from(b'i')));
        assert_eq!(ascii.next_input(), Some(10));
        assert_eq!(ascii.next_input(), None);
    }

    #[test]
    fn closed_input_stops_machine() {
        // read two numbers and output their sum
        let program = [3, 11, 3, 12, 1, 11, 12, 13, 4, 13, 99];
        let source = LineSource::new(&b"40\n"[..], false);
        let mut machine = BlockingMachine::new(Machine::new(program, []), source);
        assert_eq!(
            machine.run_to_next_output(),
            Err(MachineError::InputUnderflow)
        );
        assert_eq!(machine.machine().instruction_pointer(), 2);
        assert!(
            machine
                .source()
                .is_some_and(|s| matches!(s.failure, Some(RunError::InputClosed)))
        );
        // the machine can still be resumed by hand
        machine.add_input(2);
        assert_eq!(machine.run_to_next_output(), Ok(Some(42)));
    }
}

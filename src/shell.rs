//! Colored status/warning/error output, adapted from rAdvisor's own
//! `Shell` — the same `termcolor` + `atty` + `textwrap` combination, pared
//! down to the handful of message kinds the collector needs (parser
//! failures are logged and swallowed per spec; client/name-resolution
//! failures are logged before being returned to the caller).

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

const JUSTIFY_STATUS_LEN: usize = 12;

/// Output verbosity, controlled by the CLI `--quiet`/`--verbose` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

/// Thread-safe handle to formatted stdout/stderr output.
pub struct Shell {
    pub verbosity: Verbosity,
    out: Mutex<StandardStream>,
    err: Mutex<StandardStream>,
}

impl Shell {
    #[must_use]
    pub fn new(verbosity: Verbosity) -> Self {
        let color_choice = if atty::is(atty::Stream::Stdout) {
            termcolor::ColorChoice::Auto
        } else {
            termcolor::ColorChoice::Never
        };
        Self {
            verbosity,
            out: Mutex::new(StandardStream::stdout(color_choice)),
            err: Mutex::new(StandardStream::stderr(color_choice)),
        }
    }

    pub fn status<T: fmt::Display, U: fmt::Display>(&self, status: T, message: U) {
        if self.verbosity != Verbosity::Quiet {
            let mut out = self.out.lock().expect("shell stdout lock poisoned");
            let _ = print_line(&mut *out, &status, Some(&message), Color::Green);
        }
    }

    pub fn warn<T: fmt::Display>(&self, message: T) {
        if self.verbosity != Verbosity::Quiet {
            let mut err = self.err.lock().expect("shell stderr lock poisoned");
            let _ = print_line(&mut *err, &"warning", Some(&message), Color::Yellow);
        }
    }

    pub fn error<T: fmt::Display>(&self, message: T) {
        let mut err = self.err.lock().expect("shell stderr lock poisoned");
        let _ = print_line(&mut *err, &"error", Some(&message), Color::Red);
    }

    pub fn info<T: fmt::Display>(&self, message: T) {
        if self.verbosity == Verbosity::Verbose {
            let mut out = self.out.lock().expect("shell stdout lock poisoned");
            let _ = print_line(&mut *out, &"info", Some(&message), Color::Cyan);
        }
    }
}

fn print_line(
    stream: &mut StandardStream,
    status: &dyn fmt::Display,
    message: Option<&dyn fmt::Display>,
    color: Color,
) -> io::Result<()> {
    stream.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
    write!(stream, "{:>width$}", status, width = JUSTIFY_STATUS_LEN)?;
    stream.reset()?;
    match message {
        Some(message) => {
            let formatted = format!("{}", message);
            let wrapped = textwrap::fill(&formatted, 100);
            writeln!(stream, " {}", wrapped)?;
        },
        None => writeln!(stream)?,
    }
    Ok(())
}

//! Interactive confirmation as an injected capability.
//!
//! Destructive operations ask their questions through a [`Confirmer`] so
//! the lifecycle manager stays deterministic under test: substitute a
//! scripted implementation and no real terminal input is needed.

use std::io::{self, BufRead, Write};

/// An operator's reply to a yes/no prompt.
///
/// Anything that is neither an accept nor a decline token parses as
/// [`Reply::Unrecognized`]; callers must treat that as "no effect", never
/// as consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Yes,
    No,
    Unrecognized(String),
}

impl Reply {
    /// Parse an input line. Accepts `y`/`yes`, declines on `n`/`no`, in any
    /// letter case.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Self::Yes,
            "n" | "no" => Self::No,
            _ => Self::Unrecognized(input.trim().to_string()),
        }
    }
}

/// Source of operator answers for confirmation-gated operations.
pub trait Confirmer {
    /// Put a yes/no question to the operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&mut self, prompt: &str) -> io::Result<Reply>;

    /// Ask the operator for a free-form line (e.g. an explicit version).
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be read.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
}

/// Confirmer backed by the controlling terminal.
#[derive(Debug, Default)]
pub struct ConsoleConfirmer;

impl ConsoleConfirmer {
    fn read_line(prompt: &str) -> io::Result<String> {
        print!("{prompt} ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Confirmer for ConsoleConfirmer {
    fn confirm(&mut self, prompt: &str) -> io::Result<Reply> {
        Ok(Reply::parse(&Self::read_line(prompt)?))
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        Self::read_line(prompt)
    }
}

use crate::error::{PackageError, Result};
use std::iter::{Enumerate, Peekable};
use std::str::Lines;

/// Line cursor over a text index table that reports errors by line number
pub(crate) struct IndexLines<'a> {
    entry: &'static str,
    lines: Peekable<Enumerate<Lines<'a>>>,
    line: usize,
}

impl<'a> IndexLines<'a> {
    pub fn new(entry: &'static str, text: &'a str) -> Self {
        Self {
            entry,
            lines: text.lines().enumerate().peekable(),
            line: 0,
        }
    }

    /// Take the first line of the next block, or `None` at end of input
    ///
    /// Blank lines are only meaningful inside the table; a run of blank
    /// lines that reaches end of input ends the table.
    pub fn next_block(&mut self) -> Option<&'a str> {
        let (_, next) = self.lines.peek()?;
        if next.is_empty() && self.lines.clone().all(|(_, line)| line.trim().is_empty()) {
            return None;
        }
        self.take()
    }

    /// Take the next line, failing at end of input
    pub fn expect_line(&mut self, what: &str) -> Result<&'a str> {
        match self.take() {
            Some(line) => Ok(line),
            None => Err(self.error(format!("unexpected end of input, expected {}", what))),
        }
    }

    /// Take the next line as an identifier value
    pub fn expect_int(&mut self, what: &str) -> Result<i32> {
        let line = self.expect_line(what)?;
        line.trim()
            .parse::<i32>()
            .map_err(|_| self.error(format!("{:?} is not an integer ({})", line, what)))
    }

    /// Take the next line as a non-negative element count
    pub fn expect_count(&mut self) -> Result<usize> {
        let line = self.expect_line("a count")?;
        line.trim()
            .parse::<usize>()
            .map_err(|_| self.error(format!("{:?} is not a valid count", line)))
    }

    /// Build a parse error at the current line
    pub fn error(&self, message: impl Into<String>) -> PackageError {
        PackageError::parse(self.entry, self.line, message)
    }

    fn take(&mut self) -> Option<&'a str> {
        let (index, line) = self.lines.next()?;
        self.line = index + 1;
        Some(line)
    }
}

// Tue Jan 13 2026 - Alex

use crate::host::{ConfirmationProvider, Decision};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Asks a y/N question on a line-based reader, stdin by default. An empty
/// answer means "no"; end of input or a non-interactive stdin cancels.
pub struct TerminalConfirm<R = io::StdinLock<'static>, W = io::Stdout> {
    reader: R,
    writer: W,
    require_tty: bool,
}

impl TerminalConfirm {
    pub fn new() -> Self {
        Self {
            reader: io::stdin().lock(),
            writer: io::stdout(),
            require_tty: true,
        }
    }
}

impl Default for TerminalConfirm {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead, W: Write> TerminalConfirm<R, W> {
    /// Reads answers from `reader` and writes prompts to `writer`, with no
    /// terminal check.
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            require_tty: false,
        }
    }

    fn ask(&mut self, prompt: &str) -> io::Result<Decision> {
        let mut line = String::new();
        loop {
            write!(self.writer, "{} [y/N] ", prompt)?;
            self.writer.flush()?;

            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(Decision::Cancel);
            }

            match parse_yes_no(&line) {
                Some(true) => return Ok(Decision::Yes),
                Some(false) => return Ok(Decision::No),
                None if line.trim().is_empty() => return Ok(Decision::No),
                None => writeln!(self.writer, "Please answer 'y' or 'n'.")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> ConfirmationProvider for TerminalConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> Decision {
        if self.require_tty && !atty::is(atty::Stream::Stdin) {
            log::warn!("stdin is not a terminal, cancelling: {}", prompt);
            return Decision::Cancel;
        }

        self.ask(prompt).unwrap_or_else(|e| {
            log::error!("Failed to read answer: {}", e);
            Decision::Cancel
        })
    }
}

fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Always gives the same answer, for `--yes` / `--no` style automation.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub Decision);

impl ConfirmationProvider for FixedAnswer {
    fn confirm(&mut self, prompt: &str) -> Decision {
        log::info!("{} -> {}", prompt, self.0);
        self.0
    }
}

/// Replays queued answers and keeps every prompt it was shown. Runs dry as
/// `Cancel`.
#[derive(Debug, Default)]
pub struct ScriptedAnswers {
    answers: VecDeque<Decision>,
    prompts: Vec<String>,
}

impl ScriptedAnswers {
    pub fn new(answers: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            prompts: Vec::new(),
        }
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl ConfirmationProvider for ScriptedAnswers {
    fn confirm(&mut self, prompt: &str) -> Decision {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().unwrap_or(Decision::Cancel)
    }
}

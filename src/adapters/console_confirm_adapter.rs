//! Terminal confirmation adapter.

use crate::ports::confirm_port::ConfirmPort;
use std::io::{self, BufRead, Write};

pub struct ConsoleConfirmAdapter {
    assume_yes: bool,
}

impl ConsoleConfirmAdapter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

/// `y`/`yes` in any case accepts; anything else declines.
pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

impl ConfirmPort for ConsoleConfirmAdapter {
    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            eprintln!("{question} [y/N] y (--yes)");
            return true;
        }
        eprint!("{question} [y/N] ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => parse_answer(&line),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_yes_variants() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer(" YES "));
        assert!(!parse_answer(""));
        assert!(!parse_answer("no"));
        assert!(!parse_answer("yep"));
    }

    #[test]
    fn assume_yes_never_reads_stdin() {
        assert!(ConsoleConfirmAdapter::new(true).confirm("Discard?"));
    }
}

//! Terminal implementation of the interaction port
//!
//! Options are printed as a numbered list on stderr and the answer is read
//! from stdin. An empty answer takes the suggested default.

use std::io::{self, BufRead, Write};

use crate::app::InteractionPort;
use crate::errors::{InteractionError, InteractionResult};

/// Prompts on the controlling terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalInteraction;

impl TerminalInteraction {
    /// Whether stdin is attached to a terminal
    pub fn is_available() -> bool {
        atty::is(atty::Stream::Stdin)
    }

    fn read_answer(question: &str) -> InteractionResult<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{}", question)?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(InteractionError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for an answer",
            )));
        }
        Ok(line)
    }
}

impl InteractionPort for TerminalInteraction {
    fn select_one(
        &self,
        prompt: &str,
        options: &[String],
        default: usize,
    ) -> InteractionResult<usize> {
        if options.is_empty() {
            return Err(InteractionError::NoOptions {
                prompt: prompt.to_string(),
            });
        }
        if !Self::is_available() {
            return Err(InteractionError::NonInteractive {
                prompt: prompt.to_string(),
            });
        }

        let default = default.min(options.len() - 1);
        eprintln!("{}", prompt);
        for (i, option) in options.iter().enumerate() {
            let marker = if i == default { '>' } else { ' ' };
            eprintln!("{} {:>2}) {}", marker, i + 1, option);
        }

        loop {
            let answer = Self::read_answer(&format!("Choice [{}]: ", default + 1))?;
            match parse_selection(&answer, options.len(), default) {
                Ok(index) => return Ok(index),
                Err(e) => eprintln!("{}", e),
            }
        }
    }

    fn confirm(&self, message: &str) -> InteractionResult<bool> {
        if !Self::is_available() {
            return Err(InteractionError::NonInteractive {
                prompt: message.to_string(),
            });
        }

        let answer = Self::read_answer(&format!("{} [y/N]: ", message))?;
        Ok(parse_confirmation(&answer))
    }
}

/// Parse a 1-based choice; empty input takes `default`
pub fn parse_selection(input: &str, len: usize, default: usize) -> InteractionResult<usize> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }

    match trimmed.parse::<usize>() {
        Ok(choice) if (1..=len).contains(&choice) => Ok(choice - 1),
        Ok(choice) => Err(InteractionError::InvalidChoice { index: choice, len }),
        Err(_) => Err(InteractionError::InvalidChoice { index: 0, len }),
    }
}

/// Only an explicit yes confirms
pub fn parse_confirmation(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("2\n", 3, 0).unwrap(), 1);
        assert_eq!(parse_selection("\n", 3, 2).unwrap(), 2);
        assert_eq!(parse_selection("  ", 3, 1).unwrap(), 1);
    }

    #[test]
    fn test_parse_selection_rejects_out_of_range() {
        assert!(matches!(
            parse_selection("4", 3, 0),
            Err(InteractionError::InvalidChoice { index: 4, len: 3 })
        ));
        assert!(parse_selection("0", 3, 0).is_err());
        assert!(parse_selection("two", 3, 0).is_err());
    }

    #[test]
    fn test_confirmation_defaults_to_no() {
        assert!(parse_confirmation("y\n"));
        assert!(parse_confirmation("YES"));
        assert!(!parse_confirmation("\n"));
        assert!(!parse_confirmation("n"));
        assert!(!parse_confirmation("sure"));
    }

    #[test]
    fn test_empty_options_fail_before_touching_terminal() {
        let result = TerminalInteraction.select_one("Pick", &[], 0);
        assert!(matches!(result, Err(InteractionError::NoOptions { .. })));
    }
}

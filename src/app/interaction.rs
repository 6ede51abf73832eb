//! Human interaction port
//!
//! The orchestrator never touches the terminal directly. It asks an
//! [`InteractionPort`] to pick one option or confirm a question; calls block
//! the current thread until answered. The terminal implementation lives in
//! the CLI layer.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::{InteractionError, InteractionResult};

/// Synchronous selection and confirmation prompts
pub trait InteractionPort: Send + Sync {
    /// Choose one of `options`, returning its index
    ///
    /// `default` is the index to suggest first.
    fn select_one(&self, prompt: &str, options: &[String], default: usize)
        -> InteractionResult<usize>;

    /// Ask a yes/no question
    fn confirm(&self, message: &str) -> InteractionResult<bool>;
}

/// Port that refuses every prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl InteractionPort for NonInteractive {
    fn select_one(
        &self,
        prompt: &str,
        _options: &[String],
        _default: usize,
    ) -> InteractionResult<usize> {
        Err(InteractionError::NonInteractive {
            prompt: prompt.to_string(),
        })
    }

    fn confirm(&self, message: &str) -> InteractionResult<bool> {
        Err(InteractionError::NonInteractive {
            prompt: message.to_string(),
        })
    }
}

/// Canned answer for [`ScriptedInteraction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAnswer {
    Select(usize),
    /// Take whatever default the prompt offers
    SelectDefault,
    Confirm(bool),
}

/// Port answering from a fixed script, recording every prompt it saw
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInteraction {
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_answer(&self, prompt: &str) -> InteractionResult<ScriptedAnswer> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .ok_or_else(|| InteractionError::Exhausted {
                prompt: prompt.to_string(),
            })
    }
}

impl InteractionPort for ScriptedInteraction {
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

        let index = match self.next_answer(prompt)? {
            ScriptedAnswer::Select(index) => index,
            ScriptedAnswer::SelectDefault => default,
            ScriptedAnswer::Confirm(_) => {
                return Err(InteractionError::Exhausted {
                    prompt: prompt.to_string(),
                })
            }
        };

        if index >= options.len() {
            return Err(InteractionError::InvalidChoice {
                index: index + 1,
                len: options.len(),
            });
        }
        Ok(index)
    }

    fn confirm(&self, message: &str) -> InteractionResult<bool> {
        match self.next_answer(message)? {
            ScriptedAnswer::Confirm(answer) => Ok(answer),
            _ => Err(InteractionError::Exhausted {
                prompt: message.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_non_interactive_refuses() {
        let port = NonInteractive;
        assert!(matches!(
            port.select_one("pick", &options(), 0),
            Err(InteractionError::NonInteractive { .. })
        ));
        assert!(matches!(
            port.confirm("sure?"),
            Err(InteractionError::NonInteractive { .. })
        ));
    }

    #[test]
    fn test_scripted_answers_in_order() {
        let port = ScriptedInteraction::new([
            ScriptedAnswer::Select(2),
            ScriptedAnswer::SelectDefault,
            ScriptedAnswer::Confirm(true),
        ]);

        assert_eq!(port.select_one("first", &options(), 0).unwrap(), 2);
        assert_eq!(port.select_one("second", &options(), 1).unwrap(), 1);
        assert!(port.confirm("third").unwrap());
        assert!(matches!(
            port.confirm("fourth"),
            Err(InteractionError::Exhausted { .. })
        ));
        assert_eq!(port.prompts(), vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn test_scripted_out_of_range() {
        let port = ScriptedInteraction::new([ScriptedAnswer::Select(5)]);
        assert!(matches!(
            port.select_one("pick", &options(), 0),
            Err(InteractionError::InvalidChoice { index: 6, len: 3 })
        ));
    }
}

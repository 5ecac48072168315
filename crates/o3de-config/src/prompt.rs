//! Interactive password entry.

use std::collections::VecDeque;

use crate::error::ConfigError;

/// Source of password input.
pub trait PasswordPrompt {
    /// Read one password without echo.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be read.
    fn read_password(&mut self, prompt: &str) -> Result<String, ConfigError>;
}

/// Terminal prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn read_password(&mut self, prompt: &str) -> Result<String, ConfigError> {
        dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| ConfigError::Prompt {
                message: e.to_string(),
            })
    }
}

/// Replays a fixed list of answers.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }
}

impl PasswordPrompt for ScriptedPrompt {
    fn read_password(&mut self, _prompt: &str) -> Result<String, ConfigError> {
        self.answers.pop_front().ok_or_else(|| ConfigError::Prompt {
            message: "no more scripted input".to_owned(),
        })
    }
}

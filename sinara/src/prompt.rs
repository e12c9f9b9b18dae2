//! Interactive prompting, behind a trait so request resolution stays
//! testable.

use dialoguer::{theme::ColorfulTheme, Input, Select};

use sinara_core::error::{Result, SinaraError};
use sinara_provider::server::ServerType;

pub trait Prompt {
    /// Free-form non-empty answer to `message`.
    fn input_path(&mut self, message: &str) -> Result<String>;

    fn select_server_type(&mut self) -> Result<ServerType>;
}

/// Terminal prompting via dialoguer.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn input_path(&mut self, message: &str) -> Result<String> {
        let answer: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .interact_text()
            .map_err(|e| SinaraError::Config(format!("Prompt failed: {e}")))?;
        Ok(answer.trim().to_string())
    }

    fn select_server_type(&mut self) -> Result<ServerType> {
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Please, choose a SinaraML Server type")
            .items(&["ML", "CV"])
            .default(0)
            .interact()
            .map_err(|e| SinaraError::Config(format!("Prompt failed: {e}")))?;
        Ok(match selection {
            0 => ServerType::Ml,
            _ => ServerType::Cv,
        })
    }
}

/// Pre-scripted answers, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: std::collections::VecDeque<String>,
    server_type: Option<ServerType>,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn with_answers(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
            server_type: None,
        }
    }

    pub fn with_server_type(mut self, server_type: ServerType) -> Self {
        self.server_type = Some(server_type);
        self
    }
}

#[cfg(test)]
impl Prompt for ScriptedPrompt {
    fn input_path(&mut self, message: &str) -> Result<String> {
        self.answers
            .pop_front()
            .ok_or_else(|| SinaraError::Internal(format!("no scripted answer for '{message}'")))
    }

    fn select_server_type(&mut self) -> Result<ServerType> {
        self.server_type
            .ok_or_else(|| SinaraError::Internal("no scripted server type".to_string()))
    }
}

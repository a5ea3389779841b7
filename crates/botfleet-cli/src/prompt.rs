//! Interactive prompts
//!
//! Every prompt has a non-interactive answer (its default) so commands
//! can run from scripts with `--yes` or without a terminal.

use crate::error::{CliError, CliResult};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy)]
pub struct Prompter {
    interactive: bool,
}

impl Prompter {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    /// Interactive when stdin is a terminal
    pub fn detect() -> Self {
        Self::new(std::io::stdin().is_terminal())
    }

    /// Non-interactive copy when `assume_yes` is set
    pub fn unless(self, assume_yes: bool) -> Self {
        Self::new(self.interactive && !assume_yes)
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn confirm(&self, prompt: &str, default: bool) -> CliResult<bool> {
        if !self.interactive {
            return Ok(default);
        }
        Ok(Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    /// Free-text input; returns `default` when not interactive.
    pub fn input(&self, prompt: &str, default: &str) -> CliResult<String> {
        if !self.interactive {
            return Ok(default.to_string());
        }
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?.trim().to_string())
    }

    /// Hidden input; `None` when empty or not interactive.
    pub fn secret(&self, prompt: &str) -> CliResult<Option<String>> {
        if !self.interactive {
            return Ok(None);
        }
        let value = Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        let value = value.trim().to_string();
        Ok((!value.is_empty()).then_some(value))
    }

    pub fn select(&self, prompt: &str, items: &[&str], default: usize) -> CliResult<usize> {
        if !self.interactive {
            return Ok(default);
        }
        Ok(Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?)
    }

    /// Error for a value that could not be prompted for
    pub fn required(&self, what: &str) -> CliError {
        if self.interactive {
            CliError::InvalidInput(format!("{} is required", what))
        } else {
            CliError::InvalidInput(format!(
                "{} is required when not running interactively",
                what
            ))
        }
    }
}

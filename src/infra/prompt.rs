use crate::domain::Confirmer;
use crate::error::{EnvError, Result};
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;

/// Asks on the controlling terminal.
#[derive(Debug, Default)]
pub struct DialoguerConfirmer;

impl DialoguerConfirmer {
    pub fn new() -> Self {
        Self
    }
}

impl Confirmer for DialoguerConfirmer {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(default)
            .interact_opt()?;

        answer.ok_or(EnvError::PromptCancelled)
    }
}

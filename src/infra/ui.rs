use crate::error::EnvError;
use chrono::{Datelike, Local, Timelike};
use dialoguer::console::style;

const GREETINGS: &[[&str; 3]] = &[
    ["Good morning", "Good day", "Good evening"],
    ["Guten Morgen", "Guten Tag", "Guten Abend"],
    ["Buenos días", "Buenos días", "Buenas noches"],
    ["Bonjour", "Bonne journée", "Bonsoir"],
    ["Buongiorno", "Buona giornata", "Buonasera"],
    ["Bom dia", "Boa tarde", "Boa noite"],
    ["Goedemorgen", "Goedendag", "Goedenavond"],
    ["God morgon", "God dag", "God kväll"],
];

pub fn error_header() -> &'static str {
    r"
     _            _
  __| | ___   ___| | _____ _ ____   __    ___  _ __  ___
 / _` |/ _ \ / __| |/ / _ \ '_ \ \ / /   / _ \| '_ \/ __|
| (_| | (_) | (__|   <  __/ | | \ V /   | (_) | |_) \__ \
 \__,_|\___/ \___|_|\_\___|_| |_|\_/     \___/| .__/|___/
                                              |_|
"
}

/// Greeting picked by time of day, rotating languages by day of year.
pub fn intro_text(name: &str, version: &str) -> String {
    let now = Local::now();
    let slot = match now.hour() {
        h if h < 12 => 0,
        h if h < 18 => 1,
        _ => 2,
    };
    let language = now.ordinal0() as usize % GREETINGS.len();

    format!(
        "{}, you are using {name} v{version}",
        GREETINGS[language][slot]
    )
}

pub fn show_intro(quiet: bool) {
    if quiet {
        return;
    }

    eprintln!(
        "{}",
        intro_text(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    );
}

/// Prints a failure with its whole cause chain, unless the user simply
/// closed a prompt.
pub fn show_error(error: &anyhow::Error) {
    if is_silent(error) {
        return;
    }

    eprintln!("{}", style(error_header()).red());
    eprintln!("{error:?}");
}

fn is_silent(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<EnvError>())
        .any(EnvError::is_silent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_intro_mentions_name_and_version() {
        let text = intro_text("dockenv", "1.2.3");
        assert!(text.ends_with(", you are using dockenv v1.2.3"));
    }

    #[test]
    fn test_prompt_cancellation_is_silent_even_when_wrapped() {
        let error = Err::<(), _>(EnvError::PromptCancelled)
            .context("cleaning the project")
            .unwrap_err();

        assert!(is_silent(&error));
    }

    #[test]
    fn test_other_errors_are_rendered() {
        let error = anyhow::Error::new(EnvError::ShellNotFound {
            container: "abc".to_string(),
        });

        assert!(!is_silent(&error));
    }
}

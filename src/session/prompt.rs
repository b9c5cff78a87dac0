//! User-facing prompts raised by the pipeline

/// Dialogs the pipeline needs from the host application
pub trait UserPrompt {
    /// Show a blocking error message
    fn show_error(&self, title: &str, message: &str);

    /// Ask a yes/no question. Hosts that cannot ask should answer `false`.
    fn ask_yes_no(&self, title: &str, message: &str) -> bool;
}

/// Prompt for hosts without a UI: logs errors and declines every question
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPrompt;

impl UserPrompt for HeadlessPrompt {
    fn show_error(&self, title: &str, message: &str) {
        log::error!("{}: {}", title, message);
    }

    fn ask_yes_no(&self, title: &str, _message: &str) -> bool {
        log::info!("{}: no interactive prompt available, declining", title);
        false
    }
}

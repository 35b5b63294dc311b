//! Terminal status output. Everything here writes to stderr so that stdout
//! stays machine-readable (plans, check findings, trees).

use std::io::Write;
use std::time::Duration;

use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};

/// Width the status label is right-aligned to.
const LABEL_WIDTH: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Action,
    Info,
    Warning,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Self::Action => Style::new().green().bold(),
            Self::Info => Style::new().cyan().bold(),
            Self::Warning => Style::new().yellow().bold(),
        }
    }
}

fn format_line(tone: Tone, label: &str, message: &str) -> String {
    let label = format!("{label:>LABEL_WIDTH$}");
    format!("{} {message}", tone.style().apply_to(label))
}

fn emit(tone: Tone, label: &str, message: &str) {
    let _ = writeln!(std::io::stderr(), "{}", format_line(tone, label, message));
}

/// Report a step that happened: `      Resolved 4 package(s)`.
pub fn status(label: &str, message: &str) {
    emit(Tone::Action, label, message);
}

/// Report something informational, such as where a report was written.
pub fn status_info(label: &str, message: &str) {
    emit(Tone::Info, label, message);
}

/// Report a problem that does not stop the command.
pub fn status_warn(label: &str, message: &str) {
    emit(Tone::Warning, label, message);
}

/// A spinner for work of unknown length, like resolving. It draws nothing
/// when stderr is not a terminal. Finish it with
/// [`ProgressBar::finish_and_clear`].
pub fn spinner(message: &str) -> ProgressBar {
    if !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_right_aligned() {
        console::set_colors_enabled(false);
        let line = format_line(Tone::Action, "Resolved", "3 package(s)");
        assert_eq!(line, "      Resolved 3 package(s)");
    }

    #[test]
    fn long_labels_are_not_cut() {
        console::set_colors_enabled(false);
        let line = format_line(Tone::Warning, "Would install now", "x");
        assert_eq!(line, "Would install now x");
    }
}

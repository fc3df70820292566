//! Terminal output for CLI handlers.
//!
//! Three modes, picked from the global flags: colored text (default),
//! one tagged JSON object per line (`--json`), or text restricted to
//! warnings and errors (`--quiet`).

use std::fmt::Display;
use std::sync::OnceLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use parking_lot::RwLock;
use serde_json::{json, Value};

/// Output flags shared by every handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    /// `-v` count.
    pub verbose: u8,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
        }
    }
}

fn cell() -> &'static RwLock<OutputConfig> {
    static MODE: OnceLock<RwLock<OutputConfig>> = OnceLock::new();
    MODE.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn mode() -> OutputConfig {
    *cell().read()
}

/// Whether a message is printed at all and in which form.
enum Route {
    Json,
    Text,
    Silent,
}

fn route(essential: bool) -> Route {
    let mode = mode();
    if mode.json {
        Route::Json
    } else if mode.quiet && !essential {
        Route::Silent
    } else {
        Route::Text
    }
}

/// Print a message either as a tagged JSON line or through `text`.
fn emit(kind: &str, essential: bool, payload: impl FnOnce() -> Value, text: impl FnOnce()) {
    match route(essential) {
        Route::Json => println!("{}", json!({ "type": kind, "payload": payload() })),
        Route::Text => text(),
        Route::Silent => {}
    }
}

pub fn configure(config: OutputConfig) {
    *cell().write() = config;
}

#[must_use]
pub fn is_json() -> bool {
    mode().json
}

#[must_use]
pub fn verbosity() -> u8 {
    mode().verbose
}

pub fn header(version: &str) {
    emit(
        "header",
        false,
        || json!({ "app": "oddsline", "version": version }),
        || println!("{} {}", "oddsline".bold(), version.dimmed()),
    );
}

pub fn section(title: &str) {
    emit(
        "section",
        false,
        || json!({ "title": title }),
        || println!("\n{}", title.bold()),
    );
}

/// Labeled value, aligned in a column.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        false,
        || json!({ "label": label, "value": &value }),
        || println!("  {:<14} {value}", label.dimmed()),
    );
}

pub fn success(message: &str) {
    emit(
        "success",
        false,
        || json!({ "message": message }),
        || println!("  {} {message}", "✓".green()),
    );
}

pub fn warning(message: &str) {
    emit(
        "warning",
        true,
        || json!({ "message": message }),
        || println!("  {} {message}", "⚠".yellow()),
    );
}

pub fn hint(message: &str) {
    emit(
        "hint",
        false,
        || json!({ "message": message }),
        || println!("  {} {}", "hint:".cyan(), message.dimmed()),
    );
}

/// Indented block, e.g. a rendered table.
pub fn lines(content: &str) {
    emit(
        "lines",
        false,
        || json!({ "content": content }),
        || content.lines().for_each(|line| println!("  {line}")),
    );
}

/// Errors always go to stderr.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
    } else {
        eprintln!("  {} {message}", "×".red());
    }
}

/// A command's structured result, printed as is.
pub fn json_output(value: Value) {
    println!("{value}");
}

/// Green when non-negative, red otherwise. Plain in JSON mode.
pub fn signed<T: Display + PartialOrd + Default>(value: T) -> String {
    let negative = value < T::default();
    let text = value.to_string();
    match (is_json(), negative) {
        (true, _) => text,
        (false, false) => text.green().to_string(),
        (false, true) => text.red().to_string(),
    }
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner for long-running work; hidden in JSON and quiet modes.
pub fn spinner(message: &str) -> ProgressBar {
    let mode = mode();
    let pb = if mode.json || mode.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_strings(TICKS)
            .template("  {spinner:.cyan} {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    };
    pb.set_message(message.to_string());
    pb
}

pub fn spinner_success(pb: &ProgressBar, message: &str) {
    finish(pb, format!("{} {message}", "✓".green()));
}

pub fn spinner_fail(pb: &ProgressBar, message: &str) {
    finish(pb, format!("{} {message}", "×".red()));
}

fn finish(pb: &ProgressBar, message: String) {
    if pb.is_hidden() {
        pb.finish_and_clear();
    } else {
        pb.finish_with_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_is_plain_in_json_mode() {
        configure(OutputConfig::new(true, false, 0));
        assert_eq!(signed(-3), "-3");
        assert!(is_json());
        configure(OutputConfig::default());
    }
}

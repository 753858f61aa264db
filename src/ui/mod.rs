//! Colored step output for the command-line digest run.

use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::scoring::{GroupedPapers, RelevanceThresholds, RelevanceTier};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different outcomes.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a one-line status message.
pub fn print_status(status: Status, message: &str) {
    let icon = status_icon(status);
    if !is_terminal() {
        println!("{} {}", icon, message);
        return;
    }
    match status {
        Status::Success => println!("{} {}", icon.green(), message),
        Status::Error => eprintln!("{} {}", icon.red(), message.red()),
        Status::Warning => println!("{} {}", icon.yellow(), message.yellow()),
        Status::Info => println!("{} {}", icon.blue(), message),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    if is_terminal() {
        println!("{}", format!("[{}]", title).bold().cyan());
    } else {
        println!("[{}]", title);
    }
}

/// Print a horizontal rule.
pub fn print_rule() {
    let rule = "=".repeat(80);
    if is_terminal() {
        println!("{}", rule.dimmed());
    } else {
        println!("{}", rule);
    }
}

/// Print a `label: value` line of the run header.
pub fn print_setting(label: &str, value: impl std::fmt::Display) {
    if is_terminal() {
        println!("{} {}", format!("{}:", label).bold(), value);
    } else {
        println!("{}: {}", label, value);
    }
}

/// Print tier counts with the score range each tier covers.
pub fn print_tiers(groups: &GroupedPapers<'_>, thresholds: RelevanceThresholds) {
    for tier in RelevanceTier::ALL {
        let range = match tier {
            RelevanceTier::High => format!("≥{}", thresholds.high),
            RelevanceTier::Medium => format!("{}-{}", thresholds.medium, thresholds.high.saturating_sub(1)),
            RelevanceTier::Low => format!("<{}", thresholds.medium),
        };
        print_status(
            Status::Success,
            &format!(
                "{} relevance ({}): {} papers",
                tier.label(),
                range,
                groups.tier(tier).len()
            ),
        );
    }
}

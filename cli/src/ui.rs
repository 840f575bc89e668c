//! Terminal output for the launcher
//!
//! The delegate writes to the same terminal, so errors and warnings carry a
//! `deckhand:` tag and go to stderr.

use colored::Colorize;

const TAG: &str = "deckhand";

/// Title line and an underline rule of the same width
pub fn header_lines(title: &str) -> (String, String) {
    let title = format!("{} {}", TAG, title);
    let rule = "─".repeat(title.chars().count());
    (title, rule)
}

fn tagged(level: &str, message: &str) -> String {
    format!("{}: {}: {}", TAG, level, message)
}

/// One row of a status listing
pub fn status_line(ok: bool, subject: &str, detail: &str) -> String {
    let mark = if ok { "✓".green() } else { "✗".yellow() };
    format!("  {} {}  {}", mark, subject.bold(), detail.dimmed())
}

pub fn print_header(title: &str) {
    let (title, rule) = header_lines(title);
    println!("{}", title.bold());
    println!("{}", rule.dimmed());
}

pub fn print_success(message: &str) {
    println!("{}", message.green());
}

pub fn print_info(message: &str) {
    println!("{}", message.cyan());
}

pub fn print_warning(message: &str) {
    eprintln!("{}", tagged("warning", message).yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{}", tagged("error", message).red().bold());
}

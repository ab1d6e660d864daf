//! Status messages on stderr.

use owo_colors::{OwoColorize, Stream};

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!(
        "{} {}",
        "✓".if_supports_color(Stream::Stderr, |s| s.green()),
        message
    );
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!(
        "{} {}",
        "ℹ".if_supports_color(Stream::Stderr, |s| s.blue()),
        message
    );
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        "⚠".if_supports_color(Stream::Stderr, |s| s.yellow()),
        message.if_supports_color(Stream::Stderr, |s| s.yellow())
    );
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        "✗".if_supports_color(Stream::Stderr, |s| s.red()),
        message.if_supports_color(Stream::Stderr, |s| s.red())
    );
}

//! Terminal output helpers.
//!
//! Status lines go to stderr so stdout stays clean for the resolved JSON.

mod messages;

pub use messages::{error, info, success, warning};

/// Check if color output should be enabled on stderr.
///
/// Shared by status messages and log output. Respects `NO_COLOR` and
/// `FORCE_COLOR`, then asks the terminal.
pub fn should_use_color() -> bool {
    color_choice(
        std::env::var_os("NO_COLOR").is_some(),
        std::env::var_os("FORCE_COLOR").is_some(),
        || console::Term::stderr().features().colors_supported(),
    )
}

fn color_choice(no_color: bool, force_color: bool, terminal: impl FnOnce() -> bool) -> bool {
    if no_color {
        return false;
    }
    if force_color {
        return true;
    }
    terminal()
}

/// Decide once whether status messages are colored.
pub fn init_colors(no_color: bool) {
    if no_color || !should_use_color() {
        owo_colors::set_override(false);
    }
}

/// `1 plugin`, `2 plugins`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_counts() {
        assert_eq!(plural(0, "plugin"), "0 plugins");
        assert_eq!(plural(1, "plugin"), "1 plugin");
        assert_eq!(plural(3, "external import"), "3 external imports");
    }

    #[test]
    fn no_color_beats_force_color() {
        assert!(!color_choice(true, true, || true));
        assert!(color_choice(false, true, || false));
        assert!(color_choice(false, false, || true));
        assert!(!color_choice(false, false, || false));
    }
}

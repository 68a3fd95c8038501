//! CLI theme and styling.

use colored::Colorize;
use sentinel_permissions::GrantSource;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("  {:<9} {}", key.bold(), value)
    }

    /// Format a verdict.
    pub(crate) fn verdict(allowed: bool) -> String {
        if allowed {
            "ALLOW".green().bold().to_string()
        } else {
            "DENY".red().bold().to_string()
        }
    }

    /// Format a node: negations red, grants green.
    pub(crate) fn node(node: &str) -> String {
        if node.starts_with('-') {
            node.red().to_string()
        } else {
            node.green().to_string()
        }
    }

    /// Format where an effective entry came from.
    pub(crate) fn source(source: &GrantSource) -> String {
        match source {
            GrantSource::Profile => "profile".cyan().to_string(),
            GrantSource::Group { id, depth } => {
                format!("{} {}", id.as_str().magenta(), format!("(depth {depth})").dimmed())
            },
        }
    }
}

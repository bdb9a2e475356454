//! Shared styling utilities for CLI output.

use console::Style;

/// Success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Header-styled string (bold).
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Dim-styled string.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Reconciliation status label, colored by state.
pub fn reconcile_status(label: &str) -> String {
    match label {
        "materialized" => Style::new().green().apply_to(label).to_string(),
        "cached-only" => Style::new().blue().apply_to(label).to_string(),
        "modified" => Style::new().yellow().apply_to(label).to_string(),
        "missing" => Style::new().red().apply_to(label).to_string(),
        other => other.to_string(),
    }
}

//! Centralized UI formatting and color utilities
//!
//! Status colours, relative dates and the padded columns used by list output.

use colored::{ColoredString, Colorize};

/// Check if quiet mode is enabled via environment variable or --quiet flag
pub fn is_quiet() -> bool {
    std::env::var("CLICKUP_QUIET")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Print a progress line to stderr unless quiet mode is on.
pub fn progress(message: &str) {
    if !is_quiet() {
        eprintln!("{}", message);
    }
}

/// Colour a status name by what it usually means on a ClickUp board.
pub fn status_colored(status: &str) -> ColoredString {
    let lower = status.to_lowercase();
    if ["done", "complete", "closed", "resolved", "shipped"]
        .iter()
        .any(|s| lower.contains(s))
    {
        status.green()
    } else if ["progress", "review", "doing", "active", "testing"]
        .iter()
        .any(|s| lower.contains(s))
    {
        status.yellow()
    } else if ["block", "stuck", "cancel"].iter().any(|s| lower.contains(s)) {
        status.red()
    } else if ["open", "to do", "todo", "backlog", "new"]
        .iter()
        .any(|s| lower.contains(s))
    {
        status.white()
    } else {
        status.cyan()
    }
}

/// Color scheme for status-related text output
pub mod colors {
    use colored::{ColoredString, Colorize};

    /// Green for success/completion
    pub fn success(text: &str) -> ColoredString {
        text.green()
    }

    pub fn warning(text: &str) -> ColoredString {
        text.yellow()
    }

    pub fn error(text: &str) -> ColoredString {
        text.red()
    }

    /// Cyan for identifiers (task IDs, branches)
    pub fn identifier(text: &str) -> ColoredString {
        text.cyan()
    }

    /// Dimmed for secondary text
    pub fn secondary(text: &str) -> ColoredString {
        text.dimmed()
    }

    pub fn heading(text: &str) -> ColoredString {
        text.bold()
    }
}

/// Common text formatting patterns
pub mod format {
    use chrono::{DateTime, TimeZone, Utc};

    /// Truncate to at most `max_len` characters, marking the cut with "...".
    pub fn truncate_title(title: &str, max_len: usize) -> String {
        if title.chars().count() <= max_len {
            title.to_string()
        } else {
            let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }

    /// Format elapsed time in minutes to human-readable string
    pub fn elapsed_minutes(minutes: i64) -> String {
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    /// Relative description of an epoch-milliseconds timestamp.
    pub fn relative_time(timestamp_ms: i64, now: DateTime<Utc>) -> String {
        match Utc.timestamp_millis_opt(timestamp_ms).single() {
            Some(then) => elapsed_minutes((now - then).num_minutes()),
            None => "unknown".to_string(),
        }
    }

    /// Left-aligned columns separated by two spaces, sized to the widest cell.
    pub fn columns(rows: &[Vec<String>]) -> Vec<String> {
        let width_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; width_count];
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        rows.iter()
            .map(|row| {
                let mut line = String::new();
                for (i, cell) in row.iter().enumerate() {
                    if i + 1 == row.len() {
                        line.push_str(cell);
                    } else {
                        let pad = widths[i] - cell.chars().count();
                        line.push_str(cell);
                        line.push_str(&" ".repeat(pad + 2));
                    }
                }
                line
            })
            .collect()
    }

    /// Format a separator line for sections
    pub fn separator(width: usize) -> String {
        "─".repeat(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_status_colored_keeps_text() {
        for status in ["done", "in progress", "blocked", "to do", "qa"] {
            assert!(status_colored(status).to_string().contains(status));
        }
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(format::truncate_title("short", 10), "short");
        assert_eq!(format::truncate_title("exactly ten", 11), "exactly ten");
        assert_eq!(
            format::truncate_title("this is a very long title", 10),
            "this is..."
        );
        assert_eq!(format::truncate_title("ünïcödé wörds", 6), "ünï...");
    }

    #[test]
    fn test_elapsed_minutes() {
        assert_eq!(format::elapsed_minutes(0), "just now");
        assert_eq!(format::elapsed_minutes(30), "30m ago");
        assert_eq!(format::elapsed_minutes(90), "1h ago");
        assert_eq!(format::elapsed_minutes(2880), "2d ago");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let two_hours_ago = now.timestamp_millis() - 2 * 3_600_000;
        assert_eq!(format::relative_time(two_hours_ago, now), "2h ago");
        assert_eq!(format::relative_time(i64::MAX, now), "unknown");
    }

    #[test]
    fn test_columns() {
        let rows = vec![
            vec!["ID".to_string(), "NAME".to_string()],
            vec!["abc123".to_string(), "Login".to_string()],
        ];
        assert_eq!(format::columns(&rows), vec!["ID      NAME", "abc123  Login"]);
    }

    #[test]
    fn test_separator() {
        assert_eq!(format::separator(5), "─────");
    }
}

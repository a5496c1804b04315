//! Console text helpers shared by the commands.

/// The first `max_chars` characters of `text`, with `...` appended when
/// `ellipsis` is set and something was cut.
pub fn preview(text: &str, max_chars: usize, ellipsis: bool) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if ellipsis && text.chars().nth(max_chars).is_some() {
        out.push_str("...");
    }
    out
}

/// Fit `text` into a table cell of `width` characters, ending in `...` when cut.
pub fn fit_cell(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", preview(text, width.saturating_sub(3), false))
    } else {
        text.to_string()
    }
}

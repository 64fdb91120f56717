use std::borrow::Cow;

/// Truncation marker appended when text is cut.
const ELLIPSIS: &str = "...";

/// Truncates `s` to at most `max_chars` characters, appending `"..."` when cut.
///
/// Counts Unicode scalar values, never bytes, so multi-byte text is never
/// split mid-character. The marker is not counted against the budget: a cut
/// result has `max_chars + 3` characters.
///
/// Returns `Cow::Borrowed` when no truncation is needed.
///
/// # Examples
///
/// ```
/// use readmaster::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello, world", 5), "Hello...");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&s[..cut]);
            out.push_str(ELLIPSIS);
            Cow::Owned(out)
        }
    }
}

/// Removes control characters except newline and tab.
///
/// Feed text is untrusted; this keeps escape sequences out of terminal output.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.chars()
            .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
            .collect(),
    )
}

//! Render-time sanitizing of untrusted message text.
//!
//! Message bodies and author names are stored exactly as received. They are only
//! made safe when they are turned into output: [`escape_html`] for the HTML export,
//! [`strip_control`] for the terminal, where the equivalent of markup injection is
//! smuggling escape sequences into the user's TTY.

use std::borrow::Cow;

/// Escape `&`, `<` and `>` so the text can be embedded in HTML element content.
///
/// Already-safe text is returned borrowed and unchanged.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

/// Remove control characters (ANSI escapes, carriage returns, bells, ...) from text
/// destined for a terminal. Tabs survive as a single space.
pub fn strip_control(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .filter_map(|c| match c {
                '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect(),
    )
}

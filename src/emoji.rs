//! Emoji palette, `:shortcode:` expansion and the message draft.

/// Longest message the input accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 130;

/// Picker palette: `(shortcode, emoji)`.
pub const EMOJI_EXPRESSIONS: &[(&str, &str)] = &[
    (":smile:", "😄"),
    (":joy:", "😂"),
    (":wink:", "😉"),
    (":heart_eyes:", "😍"),
    (":thinking:", "🤔"),
    (":cry:", "😢"),
    (":angry:", "😠"),
    (":cool:", "😎"),
    (":fire:", "🔥"),
    (":clap:", "👏"),
    (":thumbsup:", "👍"),
    (":thumbsdown:", "👎"),
    (":wave:", "👋"),
    (":pray:", "🙏"),
    (":100:", "💯"),
    (":eyes:", "👀"),
    (":rocket:", "🚀"),
    (":party:", "🎉"),
    (":heart:", "❤️"),
    (":skull:", "💀"),
];

/// Emoji at picker position `index`.
pub fn emoji_at(index: usize) -> Option<&'static str> {
    EMOJI_EXPRESSIONS.get(index).map(|(_, e)| *e)
}

/// Replace every known `:shortcode:` in `text` with its emoji. Unknown codes stay.
pub fn expand_shortcodes(text: &str) -> String {
    if !text.contains(':') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(':') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match EMOJI_EXPRESSIONS
            .iter()
            .find(|(code, _)| tail.starts_with(code))
        {
            Some((code, emoji)) => {
                out.push_str(emoji);
                rest = &tail[code.len()..];
            }
            None => {
                out.push(':');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// The message being composed. Never longer than [`MAX_MESSAGE_CHARS`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Draft {
    text: String,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Append `s`, dropping whatever does not fit.
    pub fn push_str(&mut self, s: &str) {
        let room = MAX_MESSAGE_CHARS.saturating_sub(self.text.chars().count());
        self.text.extend(s.chars().take(room));
    }

    /// Append the picker emoji at `index`. Returns `false` for an unknown index.
    pub fn push_emoji(&mut self, index: usize) -> bool {
        match emoji_at(index) {
            Some(emoji) => {
                self.push_str(emoji);
                true
            }
            None => false,
        }
    }

    /// Take the draft, leaving it empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

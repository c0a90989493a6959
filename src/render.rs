//! Rendering of the feed and panels.
//!
//! Two targets: colored terminal lines and an HTML fragment (for `/export`).
//! Message text is untrusted and is sanitized here, at render time, never when
//! it is stored.

use colored::*;

use crate::emoji::EMOJI_EXPRESSIONS;
use crate::feed::Message;
use crate::identity::color_for;
use crate::sanitize::{escape_html, strip_control};

/// Shown in place of an empty feed.
pub const EMPTY_FEED: &str = "No messages yet, be the first to post a message !";

fn admin_marker(is_admin: bool) -> &'static str {
    if is_admin {
        "**"
    } else {
        ""
    }
}

/// One message as a terminal line: `name : body`, the name in its palette color.
pub fn message_line(msg: &Message) -> String {
    let author = strip_control(&msg.author);
    let (r, g, b) = color_for(&msg.author).rgb;
    let name = format!("{}{} :", admin_marker(msg.is_admin), author)
        .truecolor(r, g, b)
        .bold();
    format!("{} {}", name, strip_control(&msg.body))
}

/// Terminal rendering of `messages`, one per line, or the empty-feed notice.
pub fn feed_lines(messages: &[Message]) -> String {
    if messages.is_empty() {
        return EMPTY_FEED.dimmed().to_string();
    }
    messages
        .iter()
        .map(message_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One message as an HTML element.
pub fn message_html(msg: &Message) -> String {
    let color = color_for(&msg.author);
    let title = if msg.is_admin { "admin" } else { "user" };
    format!(
        r#"<div class="tsc-msg"><a class="tsc-usrname" style="color: {}" title="{}">{}{} :</a>&nbsp; {}</div>"#,
        color.name,
        title,
        admin_marker(msg.is_admin),
        escape_html(&msg.author),
        escape_html(&msg.body),
    )
}

/// The message list as an HTML fragment.
pub fn feed_html(messages: &[Message]) -> String {
    let mut out = String::from("<div id=\"tsc-messages\">\n");
    if messages.is_empty() {
        out.push_str(&format!("<div class=\"tsc-no-msg\">{}</div>\n", EMPTY_FEED));
    }
    for msg in messages {
        out.push_str(&message_html(msg));
        out.push('\n');
    }
    out.push_str("</div>\n");
    out
}

/// The settings panel: current `<room id>|<username>` and the available commands.
pub fn settings_panel(summary: &str, username_locked: bool) -> String {
    let mut lines = vec![
        "tidi-settings".bold().to_string(),
        "-".repeat(24),
        strip_control(summary).to_string(),
        "-".repeat(24),
        "  /room <key>     set the room key (plain text or space link)".to_string(),
    ];
    if !username_locked {
        lines.push("  /name <user>    set your username".to_string());
    }
    lines.push("  /connect        connect to the room".to_string());
    lines.join("\n")
}

/// The emoji picker: index, emoji and shortcode per entry.
pub fn emoji_palette() -> String {
    EMOJI_EXPRESSIONS
        .iter()
        .enumerate()
        .map(|(i, (code, emoji))| format!("{i:>2} {emoji} {code}"))
        .collect::<Vec<_>>()
        .join("\n")
}

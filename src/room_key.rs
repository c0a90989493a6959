//! Room key resolution: user-facing room keys → numeric wire topics.
//!
//! A room key is whatever the user typed: a plain string, or a link to a Twitter
//! space. Links are reduced to the space identifier so that everybody pasting the
//! same space (with whatever tracking query string) lands in the same room. The
//! canonical key is then hashed with the classic 31-multiplier string hash into a
//! signed 32-bit [`RoomId`], which is what the relay sees as the topic.

use serde::{Deserialize, Serialize};
use url::Url;

/// Numeric room identifier used as the pub/sub topic.
///
/// Not collision-free: two different keys may share a `RoomId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoomId(pub i32);

impl RoomId {
    /// Decimal form used in the `topic` field of outbound frames.
    pub fn topic(&self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve a raw room key into its [`RoomId`].
///
/// `None` resolves to `RoomId(0)`. Never fails: anything that is not a recognised
/// social-media link is hashed verbatim, without case or whitespace folding.
pub fn resolve(raw: Option<&str>) -> RoomId {
    match raw {
        None => RoomId(0),
        Some(raw) => RoomId(hash_code(canonical_key(raw))),
    }
}

/// The string that actually gets hashed for `raw`.
pub fn canonical_key(raw: &str) -> &str {
    match twitter_space_key(raw) {
        Some(key) => key,
        None => raw,
    }
}

/// Extract the space identifier from a Twitter space link.
///
/// Returns `None` unless `raw` is an absolute `http`/`https` URL whose host and path
/// mention both `twitter.com` and `space`, or when the last path segment is empty.
pub fn twitter_space_key(raw: &str) -> Option<&str> {
    let url = parse_http_url(raw)?;
    let host = url.host_str().unwrap_or_default();
    let location = format!("{}{}", host, url.path());
    if !location.contains("twitter.com") || !location.contains("space") {
        return None;
    }

    // Work on the raw text rather than the parsed path so the key is exactly what
    // the user pasted (no percent-encoding).
    let without_query = raw.split(['?', '#']).next().unwrap_or(raw);
    let last = without_query.rsplit('/').next().unwrap_or_default();
    if last.is_empty() {
        None
    } else {
        Some(last)
    }
}

/// Whether `raw` is a well-formed absolute URL with an `http` or `https` scheme.
pub fn is_http_url(raw: &str) -> bool {
    parse_http_url(raw).is_some()
}

fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// `hash = (hash << 5) - hash + unit` over UTF-16 code units, wrapping at 32 bits.
pub fn hash_code(s: &str) -> i32 {
    s.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

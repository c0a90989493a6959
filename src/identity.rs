//! Identity and deterministic username colors.

use serde::{Deserialize, Serialize};

use crate::room_key::hash_code;

/// The local user as shown next to their messages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    /// Never set by the client itself; kept so renderers can honor it.
    #[serde(default)]
    pub is_admin: bool,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_admin: false,
        }
    }
}

/// A named display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub name: &'static str,
    pub rgb: (u8, u8, u8),
}

const fn c(name: &'static str, r: u8, g: u8, b: u8) -> PaletteColor {
    PaletteColor { name, rgb: (r, g, b) }
}

/// CSS named colors that stay readable on both dark and light terminals.
pub const PALETTE: &[PaletteColor] = &[
    c("Aqua", 0, 255, 255),
    c("BlueViolet", 138, 43, 226),
    c("Brown", 165, 42, 42),
    c("BurlyWood", 222, 184, 135),
    c("CadetBlue", 95, 158, 160),
    c("Chartreuse", 127, 255, 0),
    c("Chocolate", 210, 105, 30),
    c("Coral", 255, 127, 80),
    c("CornflowerBlue", 100, 149, 237),
    c("Crimson", 220, 20, 60),
    c("DarkCyan", 0, 139, 139),
    c("DarkGoldenRod", 184, 134, 11),
    c("DarkKhaki", 189, 183, 107),
    c("DarkMagenta", 139, 0, 139),
    c("DarkOliveGreen", 85, 107, 47),
    c("DarkOrange", 255, 140, 0),
    c("DarkOrchid", 153, 50, 204),
    c("DarkSalmon", 233, 150, 122),
    c("DarkSeaGreen", 143, 188, 143),
    c("DarkTurquoise", 0, 206, 209),
    c("DeepPink", 255, 20, 147),
    c("DeepSkyBlue", 0, 191, 255),
    c("DodgerBlue", 30, 144, 255),
    c("FireBrick", 178, 34, 34),
    c("ForestGreen", 34, 139, 34),
    c("Fuchsia", 255, 0, 255),
    c("Gold", 255, 215, 0),
    c("GoldenRod", 218, 165, 32),
    c("HotPink", 255, 105, 180),
    c("IndianRed", 205, 92, 92),
    c("LightCoral", 240, 128, 128),
    c("LightSeaGreen", 32, 178, 170),
    c("LimeGreen", 50, 205, 50),
    c("MediumOrchid", 186, 85, 211),
    c("MediumPurple", 147, 112, 219),
    c("MediumSeaGreen", 60, 179, 113),
    c("MediumSlateBlue", 123, 104, 238),
    c("MediumVioletRed", 199, 21, 133),
    c("Orange", 255, 165, 0),
    c("OrangeRed", 255, 69, 0),
    c("Orchid", 218, 112, 214),
    c("PaleVioletRed", 219, 112, 147),
    c("Peru", 205, 133, 63),
    c("RoyalBlue", 65, 105, 225),
    c("Salmon", 250, 128, 114),
    c("SeaGreen", 46, 139, 87),
    c("Sienna", 160, 82, 45),
    c("SlateBlue", 106, 90, 205),
    c("SpringGreen", 0, 255, 127),
    c("SteelBlue", 70, 130, 180),
    c("Teal", 0, 128, 128),
    c("Tomato", 255, 99, 71),
    c("Turquoise", 64, 224, 208),
    c("Violet", 238, 130, 238),
    c("YellowGreen", 154, 205, 50),
];

/// Letter score of the first four UTF-16 code units: `-3 + Σ (letter - 64)` over
/// ASCII letters, case-insensitive. Other units contribute nothing, and a character
/// outside the BMP uses up two of the four.
pub fn letter_score(username: &str) -> i32 {
    username
        .encode_utf16()
        .take(4)
        .filter_map(|unit| u8::try_from(unit).ok())
        .filter(u8::is_ascii_alphabetic)
        .map(|b| i32::from(b.to_ascii_uppercase()) - 64)
        .fold(-3, |sum, v| sum + v)
}

/// Palette index for `username`.
///
/// A positive letter score is reduced modulo `palette_size`. Names that score zero
/// or less (digits, punctuation, very short names) fall back to the string hash of
/// the whole name, so every name maps to the same color on every render.
pub fn color_index(username: &str, palette_size: usize) -> usize {
    if palette_size == 0 {
        return 0;
    }
    let score = letter_score(username);
    if score > 0 {
        score as usize % palette_size
    } else {
        hash_code(username).unsigned_abs() as usize % palette_size
    }
}

/// The palette entry for `username`.
pub fn color_for(username: &str) -> PaletteColor {
    PALETTE[color_index(username, PALETTE.len())]
}

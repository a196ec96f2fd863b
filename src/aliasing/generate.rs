//! Default alias text and badge colors for auto-aliased entities

use once_cell::sync::Lazy;
use regex::Regex;

/// No channel of a generated color goes below this, so white badge text stays legible
pub const MIN_CHANNEL: u8 = 80;

static TOKEN_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-_]+").expect("valid separator regex"));

/// Uppercase initials of up to three tokens, e.g. `my-cool_app` -> `MCA`.
///
/// Names without a space, hyphen or underscore yield their first letter.
pub fn generate_acronym(name: &str) -> String {
    let cleaned = name.trim();
    if !cleaned.contains([' ', '-', '_']) {
        return initial(cleaned);
    }
    TOKEN_SEPARATOR
        .split(cleaned)
        .filter(|part| !part.is_empty())
        .map(initial)
        .collect::<String>()
        .chars()
        .take(3)
        .collect()
}

fn initial(part: &str) -> String {
    part.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

/// ECMAScript ToInt32
fn to_int32(value: f64) -> i32 {
    value.trunc() as i64 as i32
}

/// Badge color derived from a 32-bit string hash over UTF-16 code units.
///
/// Produces the same `#rrggbb` as the browser extension for every input,
/// including the float drift of `hash = c + ((hash << 5) - hash)`.
pub fn generate_deterministic_color(input: &str) -> String {
    let mut hash = 0f64;
    for unit in input.encode_utf16() {
        let shifted = to_int32(hash).wrapping_shl(5) as f64;
        hash = f64::from(unit) + (shifted - hash);
    }
    let bits = to_int32(hash.abs());

    let channel = |shift: i32| ((bits >> shift) & 0xFF) as u8;
    let (r, g, b) = (channel(16), channel(8), channel(0));
    format!(
        "#{:02x}{:02x}{:02x}",
        r.max(MIN_CHANNEL),
        g.max(MIN_CHANNEL),
        b.max(MIN_CHANNEL)
    )
}

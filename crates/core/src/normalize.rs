//! Text normalization for option-value comparison.
//!
//! Produces a canonical comparison key so that cosmetic label differences
//! ("Obsidian-Black", "obsidian  black", "OBSIDIAN BLACK") compare equal and so
//! that containment tests ("black" within "obsidian black") work on word
//! boundaries rather than punctuation.

use std::cmp::Ordering;

/// Unicode format characters (general category `Cf`), inclusive ranges.
/// Invisible in labels, so they are removed before any other processing.
const FORMAT_CHARS: &[(char, char)] = &[
    ('\u{00AD}', '\u{00AD}'),
    ('\u{0600}', '\u{0605}'),
    ('\u{061C}', '\u{061C}'),
    ('\u{06DD}', '\u{06DD}'),
    ('\u{070F}', '\u{070F}'),
    ('\u{0890}', '\u{0891}'),
    ('\u{08E2}', '\u{08E2}'),
    ('\u{180E}', '\u{180E}'),
    ('\u{200B}', '\u{200F}'),
    ('\u{202A}', '\u{202E}'),
    ('\u{2060}', '\u{2064}'),
    ('\u{2066}', '\u{206F}'),
    ('\u{FEFF}', '\u{FEFF}'),
    ('\u{FFF9}', '\u{FFFB}'),
    ('\u{110BD}', '\u{110BD}'),
    ('\u{110CD}', '\u{110CD}'),
    ('\u{13430}', '\u{1343F}'),
    ('\u{1BCA0}', '\u{1BCA3}'),
    ('\u{1D173}', '\u{1D17A}'),
    ('\u{E0001}', '\u{E0001}'),
    ('\u{E0020}', '\u{E007F}'),
];

fn is_format_char(c: char) -> bool {
    FORMAT_CHARS
        .binary_search_by(|&(lo, hi)| {
            if hi < c {
                Ordering::Less
            } else if lo > c {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
        .is_ok()
}

/// Normalize a raw label into its comparison key.
///
/// - format characters such as zero-width spaces and soft hyphens are removed;
///   they never split words
/// - letters are lowercased
/// - every run of non-alphanumeric characters becomes a single space
/// - leading/trailing separators are dropped
///
/// Total and pure: any input yields a (possibly empty) key.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    // Lowercase first: some mappings expand into combining marks, which must be
    // classified like any other non-alphanumeric character.
    let lowered = raw
        .chars()
        .filter(|&c| !is_format_char(c))
        .flat_map(char::to_lowercase);

    for c in lowered {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Normalize several values and join them into one space-separated key.
pub fn normalize_joined<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for key in values.into_iter().map(normalize).filter(|k| !k.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&key);
    }
    out
}

//! Title validation.
//!
//! Rejects titles that are empty, too short, carry no letters, or show the
//! `ÐÑ…` runs left behind when UTF-8 Cyrillic is decoded as Latin-1.

/// Minimum title length, in characters.
const MIN_TITLE_CHARS: usize = 5;

/// Consecutive mojibake characters that mark a title as corrupted.
const MOJIBAKE_RUN: usize = 3;

/// Whether `text` looks like a usable event or page title.
#[must_use]
pub fn is_valid_title(text: &str) -> bool {
    if text.chars().count() < MIN_TITLE_CHARS {
        return false;
    }

    let has_letters = text.chars().any(|c| is_cyrillic(c) || c.is_ascii_alphabetic());
    has_letters && !has_mojibake(text)
}

const fn is_cyrillic(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Lead bytes of two-byte Cyrillic sequences seen through Latin-1.
const fn is_mojibake_char(c: char) -> bool {
    matches!(c, 'Ð' | 'Ñ')
}

fn has_mojibake(text: &str) -> bool {
    let mut run = 0;
    for c in text.chars() {
        if is_mojibake_char(c) {
            run += 1;
            if run >= MOJIBAKE_RUN {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

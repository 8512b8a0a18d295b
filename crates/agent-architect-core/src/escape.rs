//! JSON string escape decoding.
//!
//! The single-character escapes are resolved by [`simple_escape`]. The
//! `\uXXXX` form needs up to four more characters (and, for characters
//! outside the Basic Multilingual Plane, a second `\uXXXX` for the low
//! surrogate), so it is decoded incrementally by [`UnicodeEscape`] and
//! [`SurrogatePair`]. Both are plain values that can be carried across
//! fragment boundaries by the extractor.

/// Resolve the character that follows a backslash.
///
/// Returns `None` for `u` (which starts a multi-character escape) and for
/// characters that are not JSON escape codes. Callers pass unknown codes
/// through unchanged.
pub fn simple_escape(code: char) -> Option<char> {
    match code {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '"' => Some('"'),
        '\\' => Some('\\'),
        '/' => Some('/'),
        'b' => Some('\u{0008}'),
        'f' => Some('\u{000C}'),
        _ => None,
    }
}

/// Hex digits collected after `\u`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnicodeEscape {
    digits: String,
}

/// Result of pushing one character into a [`UnicodeEscape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnicodeStep {
    /// Still waiting for more hex digits.
    Pending,
    /// Four digits read; the UTF-16 code unit they encode.
    Complete(u16),
    /// The character was not a hex digit. Carries the raw text consumed so
    /// far (`u` plus any digits) so it can be passed through literally.
    Invalid(String),
}

impl UnicodeEscape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: char) -> UnicodeStep {
        if !c.is_ascii_hexdigit() {
            let mut raw = String::with_capacity(1 + self.digits.len());
            raw.push('u');
            raw.push_str(&self.digits);
            return UnicodeStep::Invalid(raw);
        }
        self.digits.push(c);
        if self.digits.len() < 4 {
            return UnicodeStep::Pending;
        }
        match u16::from_str_radix(&self.digits, 16) {
            Ok(unit) => UnicodeStep::Complete(unit),
            Err(_) => UnicodeStep::Invalid(format!("u{}", self.digits)),
        }
    }
}

/// Combines UTF-16 code units from consecutive `\uXXXX` escapes.
///
/// A high surrogate is held until the next code unit arrives. Anything
/// that is not a matching low surrogate turns the held unit into
/// U+FFFD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurrogatePair {
    high: Option<u16>,
}

impl SurrogatePair {
    /// Feed one decoded code unit, writing any completed characters to `out`.
    pub fn push_unit(&mut self, unit: u16, out: &mut impl FnMut(char)) {
        match unit {
            0xD800..=0xDBFF => {
                if self.high.replace(unit).is_some() {
                    out(char::REPLACEMENT_CHARACTER);
                }
            }
            0xDC00..=0xDFFF => match self.high.take() {
                Some(high) => {
                    let scalar =
                        0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(unit) - 0xDC00);
                    out(char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                None => out(char::REPLACEMENT_CHARACTER),
            },
            _ => {
                self.flush(out);
                out(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
    }

    /// Emit U+FFFD for a high surrogate that will never be completed.
    pub fn flush(&mut self, out: &mut impl FnMut(char)) {
        if self.high.take().is_some() {
            out(char::REPLACEMENT_CHARACTER);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.high.is_some()
    }
}

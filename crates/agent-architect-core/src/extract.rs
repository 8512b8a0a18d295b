//! Incremental extraction of string fields from a streamed JSON object.
//!
//! Tool-call arguments arrive from the model as `partial_json` fragments
//! that can be cut at any character: inside a key, inside an escape
//! sequence, between a key and its colon. [`FieldExtractor`] keeps just
//! enough state to follow a flat `{"key": "value", ...}` object across
//! those cuts and reports, per [`feed`](FieldExtractor::feed) call, the
//! newly decoded text of each field it was told to watch.
//!
//! # State machine
//!
//! ```text
//!             "              "               :               "
//! ExpectKey ────▶ InKey ────────▶ ExpectColon ───▶ ExpectValue ───▶ InValue
//!     ▲                                                               │
//!     │ ,                                                           " │
//!     └──────────────────────── ExpectCommaOrEnd ◀────────────────────┘
//! ```
//!
//! Characters that do not drive a transition are ignored outside strings.
//! A backslash inside a key or value escapes the next character; `\uXXXX`
//! is decoded to the character it names unless the extractor was built
//! with [`with_unicode_escapes(false)`](FieldExtractor::with_unicode_escapes).
//!
//! The extractor never fails. It is not a validator: structural anomalies
//! fall through to the ignore transitions.
//!
//! # Example
//!
//! ```rust
//! use agent_architect_core::extract::{DeltaEvent, FieldExtractor};
//!
//! let mut extractor = FieldExtractor::new(["requirements", "design"]);
//! assert_eq!(
//!     extractor.feed(r#"{"requirements":"Build "#),
//!     vec![DeltaEvent::new("requirements", "Build ")]
//! );
//! assert_eq!(
//!     extractor.feed(r#"a bot.","design":"Use"#),
//!     vec![
//!         DeltaEvent::new("requirements", "a bot."),
//!         DeltaEvent::new("design", "Use"),
//!     ]
//! );
//! ```

use std::sync::Arc;

use crate::escape::{simple_escape, SurrogatePair, UnicodeEscape, UnicodeStep};

/// Newly available, already unescaped text for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaEvent {
    pub field: Arc<str>,
    pub text: String,
}

impl DeltaEvent {
    pub fn new(field: impl Into<Arc<str>>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
        }
    }
}

/// The kind of token currently being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    ExpectKey,
    InKey,
    ExpectColon,
    ExpectValue,
    InValue,
    ExpectCommaOrEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Escape {
    Idle,
    /// A backslash was read; the next character is the escape code.
    Pending,
    Unicode(UnicodeEscape),
}

/// Streaming extractor for the string fields of a flat JSON object.
///
/// One instance follows one document. Feed it fragments in arrival order;
/// state survives between calls. Call [`reset`](Self::reset) before reusing
/// it for another document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExtractor {
    fields: Vec<Arc<str>>,
    state: State,
    key: String,
    current: Option<usize>,
    escape: Escape,
    surrogate: SurrogatePair,
    decode_unicode: bool,
}

impl FieldExtractor {
    /// Create an extractor that reports the given fields.
    ///
    /// Duplicate names are collapsed. All other keys are scanned and
    /// discarded.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let mut known: Vec<Arc<str>> = Vec::new();
        for field in fields {
            let field = field.into();
            if !known.contains(&field) {
                known.push(field);
            }
        }
        Self {
            fields: known,
            state: State::ExpectKey,
            key: String::new(),
            current: None,
            escape: Escape::Idle,
            surrogate: SurrogatePair::default(),
            decode_unicode: true,
        }
    }

    /// Enable or disable `\uXXXX` decoding.
    ///
    /// When disabled, `\u` yields a literal `u` and the hex digits are kept
    /// as ordinary characters.
    pub fn with_unicode_escapes(mut self, enabled: bool) -> Self {
        self.decode_unicode = enabled;
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| &**f)
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The known field whose value is being scanned, if any.
    pub fn current_field(&self) -> Option<&str> {
        self.current.map(|i| &*self.fields[i])
    }

    /// Return to the initial state, keeping the field set and options.
    pub fn reset(&mut self) {
        self.state = State::ExpectKey;
        self.key.clear();
        self.current = None;
        self.escape = Escape::Idle;
        self.surrogate = SurrogatePair::default();
    }

    /// Consume one fragment and return the deltas it completes, in order.
    ///
    /// Text for a field is coalesced into a single event per call, split
    /// only where the value's closing quote ends it.
    pub fn feed(&mut self, fragment: &str) -> Vec<DeltaEvent> {
        let mut events = Vec::new();
        let mut delta = String::new();
        for c in fragment.chars() {
            self.step(c, &mut delta, &mut events);
        }
        self.flush_delta(&mut delta, &mut events);
        events
    }

    fn step(&mut self, c: char, delta: &mut String, events: &mut Vec<DeltaEvent>) {
        match std::mem::replace(&mut self.escape, Escape::Idle) {
            Escape::Idle => {}
            Escape::Pending => {
                if c == 'u' && self.decode_unicode {
                    self.escape = Escape::Unicode(UnicodeEscape::new());
                } else {
                    self.push_char(simple_escape(c).unwrap_or(c), delta);
                }
                return;
            }
            Escape::Unicode(mut esc) => match esc.push(c) {
                UnicodeStep::Pending => {
                    self.escape = Escape::Unicode(esc);
                    return;
                }
                UnicodeStep::Complete(unit) => {
                    self.push_unit(unit, delta);
                    return;
                }
                // Not an escape after all: keep the raw text and let `c`
                // take its normal transition.
                UnicodeStep::Invalid(raw) => {
                    for r in raw.chars() {
                        self.push_char(r, delta);
                    }
                }
            },
        }

        match (self.state, c) {
            (State::ExpectKey, '"') => {
                self.key.clear();
                self.state = State::InKey;
            }
            (State::ExpectKey, _) => {}

            (State::InKey | State::InValue, '\\') => self.escape = Escape::Pending,

            (State::InKey, '"') => {
                self.flush_surrogate(delta);
                self.current = self
                    .fields
                    .iter()
                    .position(|f| &**f == self.key.as_str());
                self.state = State::ExpectColon;
            }
            (State::InKey, _) => self.push_char(c, delta),

            (State::ExpectColon, ':') => self.state = State::ExpectValue,
            (State::ExpectColon, _) => {}

            (State::ExpectValue, '"') => self.state = State::InValue,
            (State::ExpectValue, _) => {}

            (State::InValue, '"') => {
                self.flush_surrogate(delta);
                self.flush_delta(delta, events);
                self.current = None;
                self.state = State::ExpectCommaOrEnd;
            }
            (State::InValue, _) => self.push_char(c, delta),

            (State::ExpectCommaOrEnd, ',') => self.state = State::ExpectKey,
            (State::ExpectCommaOrEnd, _) => {}
        }
    }

    fn push_char(&mut self, c: char, delta: &mut String) {
        let (state, current) = (self.state, self.current);
        let key = &mut self.key;
        let mut sink = |ch| route(state, current, key, delta, ch);
        self.surrogate.flush(&mut sink);
        sink(c);
    }

    fn push_unit(&mut self, unit: u16, delta: &mut String) {
        let (state, current) = (self.state, self.current);
        let key = &mut self.key;
        let mut sink = |ch| route(state, current, key, delta, ch);
        self.surrogate.push_unit(unit, &mut sink);
    }

    fn flush_surrogate(&mut self, delta: &mut String) {
        let (state, current) = (self.state, self.current);
        let key = &mut self.key;
        let mut sink = |ch| route(state, current, key, delta, ch);
        self.surrogate.flush(&mut sink);
    }

    fn flush_delta(&self, delta: &mut String, events: &mut Vec<DeltaEvent>) {
        if delta.is_empty() {
            return;
        }
        match self.current {
            Some(i) => events.push(DeltaEvent {
                field: self.fields[i].clone(),
                text: std::mem::take(delta),
            }),
            None => delta.clear(),
        }
    }
}

/// Send a decoded character to the key accumulator or, for a known field's
/// value, to the per-call delta buffer.
fn route(state: State, current: Option<usize>, key: &mut String, delta: &mut String, c: char) {
    match state {
        State::InKey => key.push(c),
        State::InValue if current.is_some() => delta.push(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const FIELDS: [&str; 3] = ["requirements", "design", "tasks"];

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(FIELDS)
    }

    fn assemble(events: &[DeltaEvent]) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for e in events {
            out.entry(e.field.to_string())
                .or_insert_with(String::new)
                .push_str(&e.text);
        }
        out
    }

    fn feed_all(ex: &mut FieldExtractor, fragments: &[&str]) -> Vec<DeltaEvent> {
        fragments.iter().flat_map(|f| ex.feed(f)).collect()
    }

    fn expected(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Split `s` at the given char offsets.
    fn split_at_chars<'a>(s: &'a str, cuts: &[usize]) -> Vec<&'a str> {
        let offsets: Vec<usize> = s
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(s.len()))
            .collect();
        let mut pieces = Vec::new();
        let mut start = 0;
        for &cut in cuts {
            let end = offsets[cut];
            pieces.push(&s[start..end]);
            start = end;
        }
        pieces.push(&s[start..]);
        pieces
    }

    #[test]
    fn test_three_fragment_scenario() {
        let mut ex = extractor();
        let events = feed_all(
            &mut ex,
            &[
                r#"{"requirements":"Build "#,
                r#"a bot.","design":"Use "#,
                r#"queues.","tasks":"Step 1"}"#,
            ],
        );
        assert_eq!(
            events,
            vec![
                DeltaEvent::new("requirements", "Build "),
                DeltaEvent::new("requirements", "a bot."),
                DeltaEvent::new("design", "Use "),
                DeltaEvent::new("design", "queues."),
                DeltaEvent::new("tasks", "Step 1"),
            ]
        );
    }

    #[test]
    fn test_whole_document_one_event_per_field() {
        let mut ex = extractor();
        let events = ex.feed(r#"{"requirements": "R", "design": "D", "tasks": "T"}"#);
        assert_eq!(
            events,
            vec![
                DeltaEvent::new("requirements", "R"),
                DeltaEvent::new("design", "D"),
                DeltaEvent::new("tasks", "T"),
            ]
        );
    }

    #[test]
    fn test_reassembly_for_every_two_way_split() {
        let doc = r#"{"requirements":"line1\nline2 \"q\"","notes":"x\\y","design":"a\/b\tc","tasks":"caf\u00e9"}"#;
        let want = expected(&[
            ("requirements", "line1\nline2 \"q\""),
            ("design", "a/b\tc"),
            ("tasks", "café"),
        ]);
        let n = doc.chars().count();
        for cut in 0..=n {
            let mut ex = extractor();
            let events = feed_all(&mut ex, &split_at_chars(doc, &[cut]));
            assert_eq!(assemble(&events), want, "split at {}", cut);
        }
    }

    #[test]
    fn test_reassembly_for_every_three_way_split() {
        let doc = r#"{"design":"q\"\\u","x":"\u0041","tasks":"\ud83d\ude00!"}"#;
        let want = expected(&[("design", "q\"\\u"), ("tasks", "😀!")]);
        let n = doc.chars().count();
        for a in 0..=n {
            for b in a..=n {
                let mut ex = extractor();
                let events = feed_all(&mut ex, &split_at_chars(doc, &[a, b]));
                assert_eq!(assemble(&events), want, "splits at {} and {}", a, b);
            }
        }
    }

    #[test]
    fn test_single_character_fragments() {
        let doc = r#"{ "requirements" : "Hello, \"world\"" , "tasks" : "1\n2" }"#;
        let mut ex = extractor();
        let mut events = Vec::new();
        let mut buf = [0u8; 4];
        for c in doc.chars() {
            events.extend(ex.feed(c.encode_utf8(&mut buf)));
        }
        assert_eq!(
            assemble(&events),
            expected(&[("requirements", "Hello, \"world\""), ("tasks", "1\n2")])
        );
        // one event per non-empty value character, never an empty one
        assert!(events.iter().all(|e| !e.text.is_empty()));
    }

    #[test]
    fn test_order_across_fields() {
        let doc = r#"{"tasks":"t1","requirements":"r1","design":"d1"}"#;
        let mut ex = extractor();
        let events = feed_all(&mut ex, &split_at_chars(doc, &[5, 13, 27, 40]));
        let order: Vec<&str> = events.iter().map(|e| &*e.field).collect();
        let mut deduped = order.clone();
        deduped.dedup();
        assert_eq!(deduped, vec!["tasks", "requirements", "design"]);
    }

    #[test]
    fn test_unknown_key_is_transparent() {
        let plain = r#"{"requirements":"R","design":"D"}"#;
        let noisy = r#"{"requirements":"R","extra":"ignored \"design\":\"X\"","design":"D"}"#;
        let mut a = extractor();
        let mut b = extractor();
        let ea = a.feed(plain);
        let eb = b.feed(noisy);
        assert_eq!(ea, eb);
        assert!(eb.iter().all(|e| &*e.field != "extra"));
    }

    #[test]
    fn test_escape_split_across_calls() {
        let mut ex = extractor();
        assert_eq!(ex.feed(r#"{"design":"a\"#), vec![DeltaEvent::new("design", "a")]);
        assert_eq!(ex.feed(r#"nb\"#), vec![DeltaEvent::new("design", "\nb")]);
        assert_eq!(ex.feed(r#"\\"#), vec![DeltaEvent::new("design", "\\")]);
        assert_eq!(ex.feed(r#"t""#), vec![DeltaEvent::new("design", "\t")]);
        assert_eq!(ex.state(), State::ExpectCommaOrEnd);
    }

    #[test]
    fn test_escaped_quote_does_not_close_value() {
        let mut ex = extractor();
        let events = ex.feed(r#"{"tasks":"say \"hi\"""#);
        assert_eq!(events, vec![DeltaEvent::new("tasks", "say \"hi\"")]);
        assert_eq!(ex.state(), State::ExpectCommaOrEnd);
    }

    #[test]
    fn test_unknown_escape_passes_through() {
        let mut ex = extractor();
        assert_eq!(
            ex.feed(r#"{"tasks":"\q\b\f"}"#),
            vec![DeltaEvent::new("tasks", "q\u{0008}\u{000C}")]
        );
    }

    #[test]
    fn test_escaped_key_resolves_to_known_field() {
        let mut ex = extractor();
        let events = ex.feed(r#"{"ta\sks":"x","des\u0069gn":"y"}"#);
        assert_eq!(
            events,
            vec![DeltaEvent::new("tasks", "x"), DeltaEvent::new("design", "y")]
        );
    }

    #[test]
    fn test_empty_fragment_changes_nothing() {
        let mut ex = extractor();
        ex.feed(r#"{"design":"abc\"#);
        let before = ex.clone();
        assert!(ex.feed("").is_empty());
        assert_eq!(ex, before);
    }

    #[test]
    fn test_partial_value_not_duplicated() {
        let mut ex = extractor();
        assert_eq!(ex.feed(r#"{"design":"abc"#), vec![DeltaEvent::new("design", "abc")]);
        assert_eq!(ex.current_field(), Some("design"));
        assert_eq!(ex.feed("def"), vec![DeltaEvent::new("design", "def")]);
        assert_eq!(ex.feed("\"}"), Vec::new());
        assert_eq!(ex.current_field(), None);
    }

    #[test]
    fn test_fragment_without_field_text_returns_nothing() {
        let mut ex = extractor();
        assert!(ex.feed("{").is_empty());
        assert!(ex.feed(r#""design""#).is_empty());
        assert!(ex.feed(": ").is_empty());
        assert!(ex.feed("\"").is_empty());
        assert_eq!(ex.state(), State::InValue);
    }

    #[test]
    fn test_unicode_escape_split_everywhere() {
        let doc = r#"{"tasks":"\u00e9\u4e2d"}"#;
        let n = doc.chars().count();
        for cut in 0..=n {
            let mut ex = extractor();
            let events = feed_all(&mut ex, &split_at_chars(doc, &[cut]));
            assert_eq!(assemble(&events), expected(&[("tasks", "é中")]), "split at {}", cut);
        }
    }

    #[test]
    fn test_invalid_unicode_escape_is_literal() {
        let mut ex = extractor();
        let events = ex.feed(r#"{"tasks":"\u12x","design":"ok"}"#);
        assert_eq!(
            events,
            vec![DeltaEvent::new("tasks", "u12x"), DeltaEvent::new("design", "ok")]
        );
    }

    #[test]
    fn test_truncated_unicode_escape_before_quote_closes_value() {
        let mut ex = extractor();
        let events = ex.feed(r#"{"tasks":"a\u00","design":"b"}"#);
        assert_eq!(
            events,
            vec![DeltaEvent::new("tasks", "au00"), DeltaEvent::new("design", "b")]
        );
    }

    #[test]
    fn test_lone_high_surrogate_replaced_at_close() {
        let mut ex = extractor();
        let events = ex.feed(r#"{"tasks":"\ud83d"}"#);
        assert_eq!(events, vec![DeltaEvent::new("tasks", "\u{FFFD}")]);
    }

    #[test]
    fn test_legacy_unicode_mode_keeps_digits() {
        let mut ex = extractor().with_unicode_escapes(false);
        let events = ex.feed(r#"{"tasks":"\u00e9"}"#);
        assert_eq!(events, vec![DeltaEvent::new("tasks", "u00e9")]);
    }

    #[test]
    fn test_duplicate_known_key_accumulates() {
        let mut ex = extractor();
        let events = ex.feed(r#"{"tasks":"one","tasks":"two"}"#);
        assert_eq!(
            events,
            vec![DeltaEvent::new("tasks", "one"), DeltaEvent::new("tasks", "two")]
        );
        assert_eq!(assemble(&events), expected(&[("tasks", "onetwo")]));
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let mut ex = extractor();
        ex.feed(r#"{"design":"half\u00"#);
        ex.reset();
        assert_eq!(ex, extractor());
        assert_eq!(
            ex.feed(r#"{"tasks":"fresh"}"#),
            vec![DeltaEvent::new("tasks", "fresh")]
        );
    }

    #[test]
    fn test_duplicate_field_names_collapsed() {
        let ex = FieldExtractor::new(["a", "b", "a"]);
        assert_eq!(ex.fields().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_multibyte_text_preserved() {
        let mut ex = extractor();
        let events = feed_all(&mut ex, &[r#"{"design":"┌─"#, r#"─┐ ✓"}"#]);
        assert_eq!(assemble(&events), expected(&[("design", "┌──┐ ✓")]));
    }
}

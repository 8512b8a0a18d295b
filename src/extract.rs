//! `architect extract`: run the field extractor over stdin.
//!
//! Reads a complete JSON object from stdin, feeds it to a
//! [`FieldExtractor`] in fragments of `--chunk-size` characters (as if it
//! were arriving from a model stream), and prints what the extractor emits:
//!
//! ```bash
//! $ echo '{"design": "Use a \"router\"."}' | architect extract --chunk-size 4
//! {"field":"design","text":"Use "}
//! {"field":"design","text":"a \""}
//! {"field":"design","text":"rout"}
//! {"field":"design","text":"er\""}
//! {"field":"design","text":"."}
//! ```
//!
//! With `--assemble`, the deltas are concatenated per field and printed as
//! one JSON object instead. No config file is needed.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Write};

use agent_architect_core::spec::SpecField;
use agent_architect_core::{DeltaEvent, FieldExtractor};

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Fragment size in characters; 0 feeds the whole input at once.
    pub chunk_size: usize,
    /// Field names to extract; empty means the three spec fields.
    pub fields: Vec<String>,
    pub assemble: bool,
    /// Pass `\uXXXX` escapes through undecoded.
    pub legacy_unicode: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            fields: Vec::new(),
            assemble: false,
            legacy_unicode: false,
        }
    }
}

#[derive(Serialize)]
struct DeltaLine<'a> {
    field: &'a str,
    text: &'a str,
}

/// Split `input` into fragments of at most `chunk_size` characters.
pub fn fragments(input: &str, chunk_size: usize) -> Vec<&str> {
    if chunk_size == 0 || input.is_empty() {
        return vec![input];
    }
    let mut out = Vec::new();
    let mut start = 0;
    for (count, (idx, _)) in input.char_indices().enumerate() {
        if count > 0 && count % chunk_size == 0 {
            out.push(&input[start..idx]);
            start = idx;
        }
    }
    out.push(&input[start..]);
    out
}

/// Feed `input` through a fresh extractor, fragment by fragment.
pub fn extract_deltas(input: &str, options: &ExtractOptions) -> Vec<DeltaEvent> {
    let mut extractor = if options.fields.is_empty() {
        FieldExtractor::new(SpecField::ALL.map(SpecField::as_str))
    } else {
        FieldExtractor::new(options.fields.iter().map(String::as_str))
    }
    .with_unicode_escapes(!options.legacy_unicode);

    fragments(input, options.chunk_size)
        .into_iter()
        .flat_map(|fragment| extractor.feed(fragment))
        .collect()
}

/// Concatenate deltas per field.
pub fn assemble(deltas: &[DeltaEvent]) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for delta in deltas {
        fields
            .entry(delta.field.to_string())
            .or_default()
            .push_str(&delta.text);
    }
    fields
}

pub fn run_extract(options: &ExtractOptions) -> Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    if input.trim().is_empty() {
        bail!("No input on stdin. Pipe a JSON object, e.g. a generate_spec tool input.");
    }

    let deltas = extract_deltas(&input, options);
    tracing::debug!(deltas = deltas.len(), "extracted");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if options.assemble {
        writeln!(out, "{}", serde_json::to_string(&assemble(&deltas))?)?;
    } else {
        for delta in &deltas {
            let line = DeltaLine {
                field: &delta.field,
                text: &delta.text,
            };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_by_chars() {
        assert_eq!(fragments("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(fragments("héllo", 2), vec!["hé", "ll", "o"]);
        assert_eq!(fragments("abc", 0), vec!["abc"]);
        assert_eq!(fragments("ab", 5), vec!["ab"]);
    }

    #[test]
    fn test_assembled_output_independent_of_chunk_size() {
        let input = r#"{"requirements": "R\n\"1\"", "design": "D é", "tasks": "T"}"#;
        let expected = assemble(&extract_deltas(
            input,
            &ExtractOptions {
                chunk_size: 0,
                ..ExtractOptions::default()
            },
        ));
        assert_eq!(expected["requirements"], "R\n\"1\"");
        assert_eq!(expected["design"], "D é");
        for size in 1..input.len() {
            let options = ExtractOptions {
                chunk_size: size,
                ..ExtractOptions::default()
            };
            assert_eq!(assemble(&extract_deltas(input, &options)), expected, "chunk size {}", size);
        }
    }

    #[test]
    fn test_custom_fields_and_legacy_unicode() {
        let input = r#"{"summary": "a\u0041", "design": "x"}"#;
        let options = ExtractOptions {
            chunk_size: 3,
            fields: vec!["summary".to_string()],
            assemble: true,
            legacy_unicode: true,
        };
        let fields = assemble(&extract_deltas(input, &options));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["summary"], "au0041");
    }
}

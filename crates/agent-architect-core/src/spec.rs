//! The three spec files produced for an agent idea.
//!
//! [`SpecField`] names the `generate_spec` tool's string fields.
//! [`SpecDocument`] is the accumulating sink for [`DeltaEvent`]s: apply
//! every delta in order and it holds the decoded text of each file.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::extract::{DeltaEvent, FieldExtractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecField {
    Requirements,
    Design,
    Tasks,
}

impl SpecField {
    pub const ALL: [SpecField; 3] = [SpecField::Requirements, SpecField::Design, SpecField::Tasks];

    pub fn as_str(self) -> &'static str {
        match self {
            SpecField::Requirements => "requirements",
            SpecField::Design => "design",
            SpecField::Tasks => "tasks",
        }
    }

    /// File name the field is written to (`requirements.md`, ...).
    pub fn file_name(self) -> &'static str {
        match self {
            SpecField::Requirements => "requirements.md",
            SpecField::Design => "design.md",
            SpecField::Tasks => "tasks.md",
        }
    }
}

impl fmt::Display for SpecField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requirements" => Ok(SpecField::Requirements),
            "design" => Ok(SpecField::Design),
            "tasks" => Ok(SpecField::Tasks),
            other => anyhow::bail!("unknown spec field: {}", other),
        }
    }
}

impl Serialize for SpecField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A [`FieldExtractor`] watching the three spec fields.
pub fn spec_extractor() -> FieldExtractor {
    FieldExtractor::new(SpecField::ALL.map(SpecField::as_str))
}

/// Accumulated spec files, keyed by field.
///
/// A field is present once any text for it has been seen. Serializes as a
/// flat `{"requirements": "...", ...}` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SpecDocument {
    fields: BTreeMap<SpecField, String>,
}

impl SpecDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta to its field. Events for other field names are ignored.
    pub fn apply(&mut self, event: &DeltaEvent) {
        if let Ok(field) = event.field.parse::<SpecField>() {
            self.push(field, &event.text);
        }
    }

    pub fn push(&mut self, field: SpecField, text: &str) {
        self.fields.entry(field).or_default().push_str(text);
    }

    pub fn get(&self, field: SpecField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: SpecField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpecField, &str)> {
        self.fields.iter().map(|(f, s)| (*f, s.as_str()))
    }

    /// Build a document from a complete `generate_spec` tool input.
    ///
    /// Non-string and unknown members are skipped.
    pub fn from_tool_input(input: &serde_json::Value) -> Self {
        let mut doc = Self::new();
        for field in SpecField::ALL {
            if let Some(text) = input.get(field.as_str()).and_then(|v| v.as_str()) {
                doc.fields.insert(field, text.to_string());
            }
        }
        doc
    }
}

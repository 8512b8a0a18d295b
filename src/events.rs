//! Events sent to clients of `POST /generate-stream` and `architect generate`.
//!
//! Serialized one per SSE `data:` line, tagged by `type`:
//!
//! ```json
//! {"type": "progress", "step": "retrieving"}
//! {"type": "thinking", "content": "The user wants..."}
//! {"type": "delta", "field": "design", "content": "## Architecture\n"}
//! {"type": "done"}
//! {"type": "error", "message": "Query is too short. ..."}
//! ```

use serde::Serialize;

use agent_architect_core::DeltaEvent;

/// Pipeline stage announced before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Retrieving,
    Validating,
    Generating,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Retrieving => "retrieving",
            Step::Validating => "validating",
            Step::Generating => "generating",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    Progress { step: Step },
    Thinking { content: String },
    Delta { field: String, content: String },
    Done,
    Error { message: String },
}

impl GenerationEvent {
    pub fn error(message: impl Into<String>) -> Self {
        GenerationEvent::Error {
            message: message.into(),
        }
    }

    /// True for `done` and `error`, after which nothing else is sent.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationEvent::Done | GenerationEvent::Error { .. })
    }
}

impl From<DeltaEvent> for GenerationEvent {
    fn from(event: DeltaEvent) -> Self {
        GenerationEvent::Delta {
            field: event.field.to_string(),
            content: event.text,
        }
    }
}

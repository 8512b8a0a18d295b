//! # Agent Architect Core
//!
//! I/O-free logic for Agent Architect: the streaming field extractor that
//! turns `partial_json` tool-call fragments into per-field text deltas,
//! the spec document model, guardrails, knowledge chunking, the embedding
//! trait, the in-memory knowledge store, retrieval, and the prompt and
//! tool definitions.
//!
//! This crate contains no tokio, HTTP, or filesystem dependencies.

pub mod chunk;
pub mod embedding;
pub mod escape;
pub mod extract;
pub mod guardrails;
pub mod index;
pub mod models;
pub mod prompt;
pub mod search;
pub mod spec;
pub mod store;
pub mod tools;

pub use extract::{DeltaEvent, FieldExtractor};
pub use spec::{SpecDocument, SpecField};

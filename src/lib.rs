//! # Agent Architect
//!
//! Turns a one-paragraph agent idea into three spec files
//! (`requirements.md`, `design.md`, `tasks.md`), grounded in a local
//! knowledge base of agent architecture notes, and streams them to the
//! caller as they are written.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Knowledge  │──▶│ Chunk+Embed │──▶│ InMemoryStore│
//! │ (markdown) │   │             │   │ (+ snapshot) │
//! └────────────┘   └─────────────┘   └──────┬───────┘
//!                                           │ retrieve
//!                                           ▼
//! ┌────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Messages  │──▶│  SSE decode │──▶│    Field     │──▶ delta events
//! │  API       │   │             │   │  extractor   │
//! └────────────┘   └─────────────┘   └──────────────┘
//! ```
//!
//! The I/O-free pieces (extractor, guardrails, chunking, store, prompt)
//! live in `agent-architect-core`; this crate adds configuration, HTTP
//! clients, the pipeline, the server, and the `architect` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! architect index                         # embed the knowledge base
//! architect search "supervisor pattern"   # inspect retrieval
//! architect generate "an agent that triages support tickets" --out ./spec
//! architect serve                         # POST /generate-stream on :8000
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`http`] | Retry and backoff for upstream calls |
//! | [`embedding`] | Voyage / OpenAI embedding providers |
//! | [`knowledge`] | Knowledge scanning, indexing, snapshots |
//! | [`retrieval`] | `architect search` |
//! | [`sse`] | Server-sent events decoder |
//! | [`anthropic`] | Messages API client and stream events |
//! | [`events`] | Events sent to streaming clients |
//! | [`generate`] | Generation pipeline |
//! | [`server`] | HTTP server |
//! | [`extract`] | `architect extract` |

pub mod anthropic;
pub mod config;
pub mod embedding;
pub mod events;
pub mod extract;
pub mod generate;
pub mod http;
pub mod knowledge;
pub mod logging;
pub mod retrieval;
pub mod server;
pub mod sse;

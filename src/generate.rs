//! Spec generation pipeline.
//!
//! ```text
//! query ─▶ input guardrail ─▶ retrieve knowledge ─▶ render system prompt
//!       ─▶ validate_agent_idea (forced tool) ─▶ generate_spec ─▶ output guardrail
//! ```
//!
//! [`Architect::generate`] runs the pipeline with blocking model calls.
//! [`Architect::generate_stream`] streams the `generate_spec` call and
//! forwards each spec file's text as it arrives: the tool's
//! `input_json_delta` fragments go through a [`FieldExtractor`], and every
//! decoded delta becomes a [`GenerationEvent::Delta`].

use anyhow::Result;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use agent_architect_core::embedding::Embedder;
use agent_architect_core::guardrails::{validate_input, validate_output, GuardrailError};
use agent_architect_core::models::ScoredChunk;
use agent_architect_core::prompt::render_system_prompt;
use agent_architect_core::search::retrieve;
use agent_architect_core::spec::spec_extractor;
use agent_architect_core::store::memory::InMemoryStore;
use agent_architect_core::store::KnowledgeStore;
use agent_architect_core::tools::{tool_definitions, IdeaValidation, GENERATE_SPEC, VALIDATE_AGENT_IDEA};
use agent_architect_core::{FieldExtractor, SpecDocument, SpecField};

use crate::anthropic::{BlockDelta, ContentBlock, MessagesClient, MessagesRequest, StreamEvent};
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::events::{GenerationEvent, Step};
use crate::knowledge::open_store;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Guardrail(#[from] GuardrailError),
    #[error("Idea not suitable for an agent: {0}")]
    Unsuitable(String),
    #[error("Unexpected response from model.")]
    UnexpectedResponse,
    #[error("Model stream failed: {0}")]
    Stream(String),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl GenerateError {
    /// True when the request itself was rejected, before any model call.
    pub fn is_input_error(&self) -> bool {
        matches!(self, GenerateError::Guardrail(e) if e.is_input_error())
    }
}

// ============ Stream handling ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    SpecTool,
    Thinking,
    Other,
}

/// Turns the streamed `generate_spec` response into generation events.
///
/// Content blocks are tracked by index so that only the `generate_spec`
/// tool block's JSON reaches the extractor; text blocks and other tool
/// calls are ignored, thinking blocks are forwarded as
/// [`GenerationEvent::Thinking`].
#[derive(Debug)]
pub struct SpecStream {
    extractor: FieldExtractor,
    document: SpecDocument,
    blocks: HashMap<usize, BlockKind>,
    saw_spec_tool: bool,
}

impl Default for SpecStream {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecStream {
    pub fn new() -> Self {
        Self {
            extractor: spec_extractor(),
            document: SpecDocument::new(),
            blocks: HashMap::new(),
            saw_spec_tool: false,
        }
    }

    /// Handle one stream event, returning the events to forward.
    pub fn handle(&mut self, event: StreamEvent) -> Result<Vec<GenerationEvent>, GenerateError> {
        match event {
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let kind = match content_block {
                    ContentBlock::ToolUse { name, .. } if name == GENERATE_SPEC => {
                        self.extractor.reset();
                        self.saw_spec_tool = true;
                        BlockKind::SpecTool
                    }
                    ContentBlock::Thinking { .. } => BlockKind::Thinking,
                    _ => BlockKind::Other,
                };
                self.blocks.insert(index, kind);
                Ok(Vec::new())
            }
            StreamEvent::ContentBlockDelta { index, delta } => {
                let kind = self.blocks.get(&index).copied().unwrap_or(BlockKind::Other);
                match (kind, delta) {
                    (BlockKind::SpecTool, BlockDelta::InputJsonDelta { partial_json }) => Ok(self
                        .extractor
                        .feed(&partial_json)
                        .into_iter()
                        .map(|event| {
                            self.document.apply(&event);
                            GenerationEvent::from(event)
                        })
                        .collect()),
                    (BlockKind::Thinking, BlockDelta::ThinkingDelta { thinking })
                        if !thinking.is_empty() =>
                    {
                        Ok(vec![GenerationEvent::Thinking { content: thinking }])
                    }
                    _ => Ok(Vec::new()),
                }
            }
            StreamEvent::Error { error } => Err(GenerateError::Stream(format!(
                "{}: {}",
                error.kind, error.message
            ))),
            _ => Ok(Vec::new()),
        }
    }

    /// The accumulated spec files.
    ///
    /// Fails if the model never called `generate_spec`.
    pub fn finish(self) -> Result<SpecDocument, GenerateError> {
        if !self.saw_spec_tool {
            return Err(GenerateError::UnexpectedResponse);
        }
        Ok(self.document)
    }
}

// ============ Pipeline ============

/// Why a streaming run stopped early.
enum StreamStop {
    /// The receiver was dropped.
    Closed,
    Failed(GenerateError),
}

impl From<GenerateError> for StreamStop {
    fn from(e: GenerateError) -> Self {
        StreamStop::Failed(e)
    }
}

impl From<GuardrailError> for StreamStop {
    fn from(e: GuardrailError) -> Self {
        StreamStop::Failed(e.into())
    }
}

async fn emit(tx: &mpsc::Sender<GenerationEvent>, event: GenerationEvent) -> Result<(), StreamStop> {
    tx.send(event).await.map_err(|_| StreamStop::Closed)
}

/// Owns everything a generation request needs.
pub struct Architect {
    config: Config,
    store: Arc<InMemoryStore>,
    embedder: Arc<dyn Embedder>,
    client: MessagesClient,
}

impl Architect {
    pub fn new(
        config: Config,
        store: Arc<InMemoryStore>,
        embedder: Arc<dyn Embedder>,
        client: MessagesClient,
    ) -> Self {
        Self {
            config,
            store,
            embedder,
            client,
        }
    }

    /// Create the embedder, open the knowledge store, and build the client.
    pub async fn from_config(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let store = open_store(&config, embedder.as_ref()).await?;
        let client = MessagesClient::from_config(&config.model)?;
        Ok(Self::new(config, store, embedder, client))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Retrieve the knowledge chunks most relevant to `query`.
    ///
    /// An empty store returns nothing without calling the embedder.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if self.store.is_empty().await? {
            return Ok(Vec::new());
        }
        retrieve(self.store.as_ref(), self.embedder.as_ref(), query, top_k).await
    }

    async fn system_prompt(&self, query: &str) -> Result<String, GenerateError> {
        let knowledge = self.search(query, self.config.retrieval.top_k).await?;
        tracing::debug!(chunks = knowledge.len(), "retrieved knowledge");
        Ok(render_system_prompt(&knowledge))
    }

    async fn validate_idea(&self, query: &str, system: &str) -> Result<(), GenerateError> {
        let model = &self.config.model;
        let request = MessagesRequest::new(&model.validate, model.max_tokens, system, query)
            .with_tools(tool_definitions())
            .force_tool(VALIDATE_AGENT_IDEA);
        let response = self.client.create(&request).await?;
        let input = response
            .tool_input(VALIDATE_AGENT_IDEA)
            .ok_or(GenerateError::UnexpectedResponse)?;
        let validation =
            IdeaValidation::from_tool_input(input).map_err(|_| GenerateError::UnexpectedResponse)?;
        tracing::info!(
            suitable = validation.is_suitable_for_agent,
            agent_type = ?validation.agent_type,
            "validated idea"
        );
        if !validation.is_suitable_for_agent {
            return Err(GenerateError::Unsuitable(validation.reasoning));
        }
        Ok(())
    }

    fn spec_request(&self, query: &str, system: &str) -> MessagesRequest {
        let model = &self.config.model;
        let request = MessagesRequest::new(&model.generate, model.max_tokens, system, query)
            .with_tools(tool_definitions())
            .force_tool(GENERATE_SPEC);
        match model.thinking_budget {
            Some(budget) => request.with_thinking(budget),
            None => request,
        }
    }

    /// Run the whole pipeline and return validated spec files.
    pub async fn generate(&self, query: &str) -> Result<SpecDocument, GenerateError> {
        let limits = self.config.guardrails.limits();
        validate_input(query, &limits)?;

        let system = self.system_prompt(query).await?;
        self.validate_idea(query, &system).await?;

        let response = self.client.create(&self.spec_request(query, &system)).await?;
        let input = response
            .tool_input(GENERATE_SPEC)
            .ok_or(GenerateError::UnexpectedResponse)?;
        let document = SpecDocument::from_tool_input(input);
        validate_output(&document, &limits)?;
        Ok(document)
    }

    /// Run the pipeline, sending progress, thinking, and spec deltas to `tx`.
    ///
    /// Always finishes with `done` or `error` unless the receiver is
    /// dropped, in which case the model stream is abandoned quietly.
    pub async fn generate_stream(&self, query: &str, tx: mpsc::Sender<GenerationEvent>) {
        match self.run_stream(query, &tx).await {
            Ok(()) => {
                let _ = tx.send(GenerationEvent::Done).await;
            }
            Err(StreamStop::Closed) => {
                tracing::debug!("client disconnected; stopping generation");
            }
            Err(StreamStop::Failed(e)) => {
                tracing::warn!(error = %e, "generation failed");
                let _ = tx.send(GenerationEvent::error(e.to_string())).await;
            }
        }
    }

    async fn run_stream(
        &self,
        query: &str,
        tx: &mpsc::Sender<GenerationEvent>,
    ) -> Result<(), StreamStop> {
        let limits = self.config.guardrails.limits();
        validate_input(query, &limits)?;

        emit(tx, GenerationEvent::Progress { step: Step::Retrieving }).await?;
        let system = self.system_prompt(query).await?;

        emit(tx, GenerationEvent::Progress { step: Step::Validating }).await?;
        self.validate_idea(query, &system).await?;

        emit(tx, GenerationEvent::Progress { step: Step::Generating }).await?;
        let mut stream = self
            .client
            .stream(&self.spec_request(query, &system))
            .await
            .map_err(GenerateError::from)?;

        let mut spec = SpecStream::new();
        while let Some(event) = stream.next().await.map_err(GenerateError::from)? {
            for out in spec.handle(event)? {
                emit(tx, out).await?;
            }
        }

        let document = spec.finish()?;
        validate_output(&document, &limits)?;
        Ok(())
    }
}

// ============ architect generate ============

/// Run `architect generate`.
///
/// Spec text streams to stdout under a header per file; progress and
/// thinking go to stderr. With `out`, the three files are written there
/// once generation succeeds.
pub async fn run_generate(config: Config, query: &str, out: Option<&Path>) -> Result<()> {
    let architect = Arc::new(Architect::from_config(config).await?);
    let (tx, mut rx) = mpsc::channel(64);

    let task = {
        let architect = architect.clone();
        let query = query.to_string();
        tokio::spawn(async move { architect.generate_stream(&query, tx).await })
    };

    let mut document = SpecDocument::new();
    let mut current: Option<String> = None;
    let mut stdout = std::io::stdout();
    let mut failure = None;

    while let Some(event) = rx.recv().await {
        match event {
            GenerationEvent::Progress { step } => {
                eprintln!("{}...", step.as_str());
            }
            GenerationEvent::Thinking { content } => {
                eprint!("{}", content);
            }
            GenerationEvent::Delta { field, content } => {
                if current.as_deref() != Some(field.as_str()) {
                    let name = field
                        .parse::<SpecField>()
                        .map(SpecField::file_name)
                        .unwrap_or(field.as_str());
                    writeln!(stdout, "\n=== {} ===", name)?;
                    current = Some(field.clone());
                }
                write!(stdout, "{}", content)?;
                stdout.flush()?;
                if let Ok(f) = field.parse::<SpecField>() {
                    document.push(f, &content);
                }
            }
            GenerationEvent::Done => {}
            GenerationEvent::Error { message } => failure = Some(message),
        }
    }
    writeln!(stdout)?;
    task.await?;

    if let Some(message) = failure {
        anyhow::bail!(message);
    }

    if let Some(dir) = out {
        write_spec_files(dir, &document)?;
        println!("wrote {} spec files to {}", document.iter().count(), dir.display());
    }

    Ok(())
}

/// Write each present field to `<dir>/<field>.md`.
pub fn write_spec_files(dir: &Path, document: &SpecDocument) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (field, text) in document.iter() {
        std::fs::write(dir.join(field.file_name()), text)?;
    }
    Ok(())
}

//! Knowledge base loading and indexing.
//!
//! Knowledge is a directory of markdown files (`[knowledge].root`). Files
//! are discovered with include/exclude globs, split into heading sections
//! by [`chunk_markdown`], embedded, and kept in an [`InMemoryStore`].
//!
//! Embedding every section at startup costs one API round trip per batch,
//! so `architect index` can write the embedded index to
//! `[knowledge].index_path`; [`open_store`] loads that snapshot when it was
//! produced by the configured embedding model.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use agent_architect_core::chunk::chunk_markdown;
use agent_architect_core::embedding::Embedder;
use agent_architect_core::index::{index_chunks, IndexReport};
use agent_architect_core::models::KnowledgeChunk;
use agent_architect_core::store::memory::{IndexSnapshot, InMemoryStore};

use crate::config::{Config, KnowledgeConfig};
use crate::embedding::create_embedder;

/// A knowledge file read from disk.
#[derive(Debug, Clone)]
pub struct KnowledgeFile {
    /// Path relative to the knowledge root, with `/` separators.
    pub source: String,
    pub text: String,
}

/// Walk the knowledge root and read every matching file, sorted by path.
pub fn scan_knowledge(config: &KnowledgeConfig) -> Result<Vec<KnowledgeFile>> {
    let root = &config.root;
    if !root.exists() {
        bail!("Knowledge root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable knowledge file");
                continue;
            }
        };
        files.push(KnowledgeFile {
            source: rel_str,
            text,
        });
    }

    files.sort_by(|a, b| a.source.cmp(&b.source));

    Ok(files)
}

/// Chunk every file on the configured heading delimiter.
pub fn chunk_files(files: &[KnowledgeFile], delimiter: &str) -> Vec<KnowledgeChunk> {
    files
        .iter()
        .flat_map(|f| chunk_markdown(&f.source, &f.text, delimiter))
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

// ============ Store loading ============

/// Read an index snapshot written by `architect index`.
pub fn read_snapshot(path: &Path) -> Result<IndexSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse index file: {}", path.display()))
}

pub fn write_snapshot(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string(snapshot)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write index file: {}", path.display()))
}

/// Embed the knowledge base into a fresh store.
pub async fn build_store(
    config: &Config,
    embedder: &dyn Embedder,
) -> Result<(InMemoryStore, IndexReport)> {
    let files = scan_knowledge(&config.knowledge)?;
    let chunks = chunk_files(&files, &config.knowledge.heading_delimiter);
    let store = InMemoryStore::new();
    let report = index_chunks(&store, embedder, chunks, config.embedding.batch_size).await?;
    tracing::info!(
        files = files.len(),
        added = report.added,
        duplicates = report.duplicates,
        "indexed knowledge base"
    );
    Ok((store, report))
}

/// Open the knowledge store used for retrieval.
///
/// Loads `[knowledge].index_path` when it exists and matches the embedding
/// model, otherwise embeds the knowledge root. With embeddings disabled the
/// store is empty and retrieval contributes no context.
pub async fn open_store(config: &Config, embedder: &dyn Embedder) -> Result<Arc<InMemoryStore>> {
    if !config.embedding.is_enabled() {
        tracing::warn!("embeddings disabled; knowledge retrieval will return no context");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    if let Some(path) = &config.knowledge.index_path {
        if path.exists() {
            let snapshot = read_snapshot(path)?;
            if snapshot.model == embedder.model_name() {
                tracing::info!(
                    path = %path.display(),
                    entries = snapshot.entries.len(),
                    "loaded knowledge index"
                );
                return Ok(Arc::new(InMemoryStore::from_snapshot(snapshot)));
            }
            tracing::warn!(
                index_model = %snapshot.model,
                configured_model = embedder.model_name(),
                "knowledge index was built with a different model; re-embedding"
            );
        }
    }

    let (store, _) = build_store(config, embedder).await?;
    Ok(Arc::new(store))
}

// ============ architect index ============

/// Run `architect index`.
///
/// With `dry_run`, reports file and chunk counts without embedding.
/// Otherwise embeds the knowledge base and writes the snapshot to
/// `[knowledge].index_path` when configured.
pub async fn run_index(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        let files = scan_knowledge(&config.knowledge)?;
        let chunks = chunk_files(&files, &config.knowledge.heading_delimiter);
        println!("index (dry-run)");
        println!("  files found: {}", files.len());
        println!("  chunks: {}", chunks.len());
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Indexing requires embeddings. Set [embedding] provider in config.");
    }

    let embedder = create_embedder(&config.embedding)?;
    let (store, report) = build_store(config, embedder.as_ref()).await?;

    println!("index");
    println!("  embedded: {}", report.embedded);
    println!("  added: {}", report.added);
    println!("  duplicates skipped: {}", report.duplicates);

    if let Some(path) = &config.knowledge.index_path {
        let snapshot = store.snapshot(embedder.model_name())?;
        write_snapshot(path, &snapshot)?;
        println!("  written: {}", path.display());
    }
    println!("ok");

    Ok(())
}

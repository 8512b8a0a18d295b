use anyhow::{bail, Result};

use agent_architect_core::search::retrieve;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::knowledge::open_store;

/// Run `architect search`: print the knowledge sections closest to `query`.
pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Search requires embeddings. Set [embedding] provider in config.");
    }

    let embedder = create_embedder(&config.embedding)?;
    let store = open_store(config, embedder.as_ref()).await?;
    let top_k = limit.unwrap_or(config.retrieval.top_k);
    let results = retrieve(store.as_ref(), embedder.as_ref(), query, top_k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let title = result.chunk.text.lines().next().unwrap_or_default();
        println!("{}. [{:.2}] {}", i + 1, result.score, title);
        println!("    source: {}#{}", result.chunk.source, result.chunk.chunk_index);
        println!("    id: {}", result.chunk.id);
        println!();
    }

    Ok(())
}

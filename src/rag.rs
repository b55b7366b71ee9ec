//! Retrieval-augmented ingest and query pipeline.
//!
//! Ingest: chunk the document text, embed every chunk in passage mode, and
//! append the whole batch to the store in one call — a single failed
//! embedding aborts the document and nothing is persisted.
//!
//! Query: embed the question in query mode, pull the most similar chunks
//! from the store, and forward them plus the question to the generation
//! model. When retrieval comes back empty the canned
//! [`NOT_FOUND_ANSWER`] is returned without touching the generation
//! provider at all.
//!
//! The store lives behind an `RwLock` shared with the HTTP handlers;
//! the lock is held only around store calls, never across a provider
//! request.

use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embedding::{EmbeddingClient, InputType};
use crate::generation::GenerationClient;
use crate::models::{Answer, RecordMatch};
use crate::storage::UploadStore;
use crate::store::VectorStore;

/// The exact answer returned when no relevant context exists. Not an
/// error: callers receive it as a successful payload.
pub const NOT_FOUND_ANSWER: &str = "Not found in documents";

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Use the following context to \
answer the question. Answer strictly based on the provided context. If the answer is not in \
the context, say exactly 'Not found in documents'.";

/// Input validation failures surfaced before the pipeline does any work.
/// Typed so HTTP and CLI surfaces can classify them without inspecting
/// message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The question was empty or whitespace-only.
    EmptyQuestion,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::EmptyQuestion => write!(f, "question must not be empty"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Chunk, embed, and index `text` under `document_name`.
///
/// Returns the number of chunks indexed. Empty text and texts that
/// produce no chunks are successful no-ops.
pub async fn ingest_document(
    store: &RwLock<VectorStore>,
    embedder: &EmbeddingClient,
    config: &Config,
    text: &str,
    document_name: &str,
) -> Result<usize> {
    if text.is_empty() {
        println!("  {}: empty text, nothing to index", document_name);
        return Ok(0);
    }

    let chunks = chunk_text(
        text,
        document_name,
        config.chunking.chunk_size,
        config.chunking.overlap,
    );
    if chunks.is_empty() {
        println!("  {}: no indexable chunks", document_name);
        return Ok(0);
    }

    // All-or-nothing: collect every embedding before the store sees any
    // of them.
    let mut embeddings = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let embedding = embedder
            .embed(&chunk.text, InputType::Passage)
            .await
            .with_context(|| format!("failed to embed chunk {}", chunk.id))?;
        embeddings.push(embedding);
    }

    let count = chunks.len();
    let mut documents = Vec::with_capacity(count);
    let mut metadatas = Vec::with_capacity(count);
    let mut ids = Vec::with_capacity(count);
    for chunk in chunks {
        documents.push(chunk.text);
        metadatas.push(chunk.metadata);
        ids.push(chunk.id);
    }

    {
        let mut guard = store
            .write()
            .map_err(|_| anyhow!("vector store lock poisoned"))?;
        guard.add(documents, embeddings, metadatas, ids)?;
    }

    Ok(count)
}

/// Answer `question` from the indexed documents.
pub async fn query_documents(
    store: &RwLock<VectorStore>,
    embedder: &EmbeddingClient,
    generator: &GenerationClient,
    config: &Config,
    question: &str,
) -> Result<Answer> {
    if question.trim().is_empty() {
        return Err(PipelineError::EmptyQuestion.into());
    }

    let query_embedding = embedder
        .embed(question, InputType::Query)
        .await
        .context("failed to embed question")?;

    let matches = {
        let guard = store
            .read()
            .map_err(|_| anyhow!("vector store lock poisoned"))?;
        guard.query(&query_embedding, config.retrieval.top_k)
    };

    if let Some(answer) = no_match_answer(&matches) {
        return Ok(answer);
    }

    let user_message = build_user_message(&matches, question);
    let answer = generator
        .generate(SYSTEM_INSTRUCTION, &user_message)
        .await
        .context("generation request failed")?;

    Ok(Answer {
        answer,
        sources: dedup_sources(&matches),
    })
}

/// Clear the vector store and delete all uploaded originals.
///
/// A failure in either half names that half so the caller knows which
/// side was left partially cleared.
pub fn reset_knowledge_base(store: &RwLock<VectorStore>, uploads: &UploadStore) -> Result<()> {
    {
        let mut guard = store
            .write()
            .map_err(|_| anyhow!("vector store lock poisoned"))?;
        guard.clear().context("failed to clear vector store")?;
    }

    uploads
        .clear()
        .context("failed to delete uploaded files")?;

    Ok(())
}

/// The canned payload for empty retrieval, produced before any generation
/// call is made.
fn no_match_answer(matches: &[RecordMatch]) -> Option<Answer> {
    if matches.is_empty() {
        Some(Answer {
            answer: NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
        })
    } else {
        None
    }
}

/// Join the retrieved chunk texts (similarity-descending) with blank lines
/// and append the question.
fn build_user_message(matches: &[RecordMatch], question: &str) -> String {
    let context_block = matches
        .iter()
        .map(|m| m.document.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Context:\n{}\n\nQuestion: {}", context_block, question)
}

/// Deduplicate result sources, keeping first-seen order so the output is
/// deterministic.
fn dedup_sources(matches: &[RecordMatch]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for m in matches {
        if !sources.contains(&m.metadata.source) {
            sources.push(m.metadata.source.clone());
        }
    }
    sources
}

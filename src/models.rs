//! Core data types used throughout Doc QA.
//!
//! These types represent the chunks, stored records, and answers that flow
//! through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Metadata persisted alongside each chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Name of the document the chunk was cut from (the uploaded filename).
    pub source: String,
}

/// A contiguous window of a document's text, produced by the chunker.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Deterministic id: `{document_name}_{start}` where `start` is the
    /// character offset of the window in the source text.
    pub id: String,
    /// Window content. Never empty after trimming.
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// The persisted unit in the vector store: a chunk plus its embedding.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// A record returned from a similarity query, with its cosine score.
#[derive(Debug, Clone)]
pub struct RecordMatch {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Final answer payload for a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    /// Deduplicated document names the retrieved chunks came from.
    pub sources: Vec<String>,
}

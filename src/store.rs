//! Durable vector record store.
//!
//! Keeps every record (id, document text, metadata, embedding) in a single
//! ordered `Vec`, so the record list and the embedding matrix cannot drift
//! apart in memory. Mutation is append-only: records are added by
//! [`VectorStore::add`] and destroyed only en masse by
//! [`VectorStore::clear`].
//!
//! # On-disk layout
//!
//! The store directory holds two files written together on every mutation:
//!
//! - `records.json` — ordered list of `{id, document, metadata}` objects
//! - `vectors.bin` — `rows: u32 le`, `dims: u32 le`, then row-major
//!   little-endian `f32` values; row `i` is the embedding of record `i`
//!
//! Each file is written to a temp path and renamed into place. A crash
//! between the two renames leaves a row-count mismatch, which
//! [`VectorStore::open`] reports as [`StoreError::Corruption`] — the store
//! never repairs or silently resets damaged state.
//!
//! # Search
//!
//! [`VectorStore::query`] is a brute-force exact scan: cosine similarity
//! against every stored embedding, descending order, ties broken by
//! insertion order. Exactness is acceptable (and tested) at the target
//! scale of hundreds to low thousands of chunks.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{ChunkMetadata, RecordMatch, VectorRecord};

const RECORDS_FILE: &str = "records.json";
const VECTORS_FILE: &str = "vectors.bin";

/// Store failure modes.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Persisted state violates the structural invariant (row counts or
    /// matrix size disagree). Fatal for the store instance; no auto-repair.
    Corruption(String),
    /// Caller passed inconsistent input (length or dimensionality mismatch).
    Input(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store I/O error: {}", e),
            StoreError::Json(e) => write!(f, "store serialization error: {}", e),
            StoreError::Corruption(msg) => write!(f, "store corruption: {}", msg),
            StoreError::Input(msg) => write!(f, "invalid store input: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// Serialized form of a record in `records.json` (embedding lives in
/// `vectors.bin` at the same row index).
#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    id: String,
    document: String,
    metadata: ChunkMetadata,
}

/// Append-only vector record store backed by a directory on disk.
#[derive(Debug)]
pub struct VectorStore {
    dir: PathBuf,
    records: Vec<VectorRecord>,
    /// Fixed embedding dimensionality, set by the first stored record.
    dims: Option<usize>,
}

impl VectorStore {
    /// Open (or create) the store at `dir`, loading any persisted state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corruption`] when the persisted record list
    /// and embedding matrix disagree on row count or matrix size.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;

        let records_path = dir.join(RECORDS_FILE);
        let vectors_path = dir.join(VECTORS_FILE);

        if !records_path.exists() {
            return Ok(Self {
                dir: dir.to_path_buf(),
                records: Vec::new(),
                dims: None,
            });
        }

        let rows: Vec<RecordRow> = serde_json::from_slice(&fs::read(&records_path)?)?;

        let (matrix, dims) = if vectors_path.exists() {
            read_matrix(&fs::read(&vectors_path)?)?
        } else {
            (Vec::new(), 0)
        };

        if matrix.len() != rows.len() {
            return Err(StoreError::Corruption(format!(
                "{} holds {} records but {} holds {} embedding rows",
                RECORDS_FILE,
                rows.len(),
                VECTORS_FILE,
                matrix.len()
            )));
        }

        let records = rows
            .into_iter()
            .zip(matrix)
            .map(|(row, embedding)| VectorRecord {
                id: row.id,
                document: row.document,
                metadata: row.metadata,
                embedding,
            })
            .collect::<Vec<_>>();

        Ok(Self {
            dir: dir.to_path_buf(),
            dims: if records.is_empty() { None } else { Some(dims) },
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All stored records in insertion order.
    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    /// Append records and persist. All four argument lists must have equal
    /// length and every embedding must match the store's dimensionality.
    ///
    /// Duplicate ids are permitted; both entries remain retrievable.
    pub fn add(
        &mut self,
        documents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<ChunkMetadata>,
        ids: Vec<String>,
    ) -> Result<(), StoreError> {
        let n = documents.len();
        if embeddings.len() != n || metadatas.len() != n || ids.len() != n {
            return Err(StoreError::Input(format!(
                "add requires equal lengths, got {} documents, {} embeddings, {} metadatas, {} ids",
                n,
                embeddings.len(),
                metadatas.len(),
                ids.len()
            )));
        }
        if n == 0 {
            return Ok(());
        }

        let dims = self.dims.unwrap_or(embeddings[0].len());
        for (i, e) in embeddings.iter().enumerate() {
            if e.len() != dims {
                return Err(StoreError::Input(format!(
                    "embedding for id {} has {} dims, store expects {}",
                    ids[i],
                    e.len(),
                    dims
                )));
            }
        }
        if dims == 0 {
            return Err(StoreError::Input("embeddings must not be empty".to_string()));
        }

        for (((document, embedding), metadata), id) in documents
            .into_iter()
            .zip(embeddings)
            .zip(metadatas)
            .zip(ids)
        {
            self.records.push(VectorRecord {
                id,
                document,
                metadata,
                embedding,
            });
        }
        self.dims = Some(dims);

        self.persist()
    }

    /// Drop all records and persist the empty state. Idempotent.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        self.dims = None;
        self.persist()
    }

    /// Return the `k` records most similar to `query_embedding`, highest
    /// cosine similarity first. An empty store yields an empty vector.
    pub fn query(&self, query_embedding: &[f32], k: usize) -> Vec<RecordMatch> {
        self.query_batch(std::slice::from_ref(&query_embedding), k)
            .pop()
            .unwrap_or_default()
    }

    /// Batched similarity search: one result set per query embedding.
    pub fn query_batch(&self, query_embeddings: &[&[f32]], k: usize) -> Vec<Vec<RecordMatch>> {
        query_embeddings
            .iter()
            .map(|q| self.query_one(q, k))
            .collect()
    }

    fn query_one(&self, query_embedding: &[f32], k: usize) -> Vec<RecordMatch> {
        if self.records.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(&r.embedding, query_embedding)))
            .collect();

        // Stable sort keeps insertion order for equal scores, which makes
        // tie-breaking deterministic.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| {
                let r = &self.records[i];
                RecordMatch {
                    id: r.id.clone(),
                    document: r.document.clone(),
                    metadata: r.metadata.clone(),
                    score,
                }
            })
            .collect()
    }

    /// Write both files via temp + rename. The matrix goes first so a crash
    /// in between is caught by the row-count check at load time.
    fn persist(&self) -> Result<(), StoreError> {
        let dims = self.dims.unwrap_or(0);
        write_atomic(
            &self.dir.join(VECTORS_FILE),
            &encode_matrix(&self.records, dims),
        )?;

        let rows: Vec<RecordRow> = self
            .records
            .iter()
            .map(|r| RecordRow {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
            })
            .collect();
        write_atomic(&self.dir.join(RECORDS_FILE), &serde_json::to_vec(&rows)?)?;

        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Encode the embedding matrix: `rows`, `dims` header then row-major
/// little-endian `f32` values.
fn encode_matrix(records: &[VectorRecord], dims: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + records.len() * dims * 4);
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    out.extend_from_slice(&(dims as u32).to_le_bytes());
    for r in records {
        for &v in &r.embedding {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

/// Decode `vectors.bin` into per-row embeddings plus the dimensionality.
fn read_matrix(bytes: &[u8]) -> Result<(Vec<Vec<f32>>, usize), StoreError> {
    if bytes.len() < 8 {
        return Err(StoreError::Corruption(format!(
            "{} is truncated ({} bytes)",
            VECTORS_FILE,
            bytes.len()
        )));
    }

    let rows = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let dims = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;

    // Checked arithmetic: a malformed header can declare counts whose
    // byte size overflows usize.
    let expected = rows
        .checked_mul(dims)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(8))
        .ok_or_else(|| {
            StoreError::Corruption(format!(
                "{} declares an implausible {} rows x {} dims",
                VECTORS_FILE, rows, dims
            ))
        })?;
    if bytes.len() != expected {
        return Err(StoreError::Corruption(format!(
            "{} declares {} rows x {} dims ({} bytes) but holds {} bytes",
            VECTORS_FILE,
            rows,
            dims,
            expected,
            bytes.len()
        )));
    }

    let matrix = bytes[8..]
        .chunks_exact(dims.max(1) * 4)
        .map(|row| {
            row.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
        .take(rows)
        .collect();

    Ok((matrix, dims))
}

/// Cosine similarity between two vectors: the dot product of their
/// L2-normalized forms. Returns `0.0` for mismatched lengths or a zero
/// vector on either side.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    let denom = norm_a * norm_b;
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

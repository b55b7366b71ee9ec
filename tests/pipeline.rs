//! Integration tests for the ingest/query pipeline built on real on-disk
//! stores. Provider calls are never reached: every scenario here either
//! short-circuits before embedding or drives the store directly with
//! synthetic vectors.

use std::path::Path;
use std::sync::RwLock;

use tempfile::TempDir;

use doc_qa::chunk::chunk_text;
use doc_qa::config::{
    ChunkingConfig, Config, ProviderConfig, RetrievalConfig, ServerConfig, StoreConfig,
    UploadsConfig,
};
use doc_qa::embedding::EmbeddingClient;
use doc_qa::generation::GenerationClient;
use doc_qa::models::ChunkMetadata;
use doc_qa::rag;
use doc_qa::storage::UploadStore;
use doc_qa::store::VectorStore;

fn test_config(root: &Path) -> Config {
    Config {
        store: StoreConfig {
            path: root.join("vector_store"),
        },
        uploads: UploadsConfig {
            dir: root.join("docs"),
        },
        chunking: ChunkingConfig {
            chunk_size: 1000,
            overlap: 200,
        },
        retrieval: RetrievalConfig { top_k: 3 },
        provider: ProviderConfig::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            allowed_origins: vec!["*".to_string()],
        },
    }
}

#[tokio::test]
async fn ingest_empty_text_leaves_store_unchanged() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(tmp.path());
    let store = RwLock::new(VectorStore::open(&cfg.store.path).unwrap());
    let embedder = EmbeddingClient::new(&cfg.provider).unwrap();

    let count = rag::ingest_document(&store, &embedder, &cfg, "", "empty.txt")
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(store.read().unwrap().len(), 0);
}

#[tokio::test]
async fn ingest_whitespace_text_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(tmp.path());
    let store = RwLock::new(VectorStore::open(&cfg.store.path).unwrap());
    let embedder = EmbeddingClient::new(&cfg.provider).unwrap();

    // Every window trims to empty, so no chunk ever reaches the embedder.
    let count = rag::ingest_document(&store, &embedder, &cfg, "   \n\t  ", "blank.txt")
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(store.read().unwrap().len(), 0);
}

#[tokio::test]
async fn empty_question_fails_with_typed_error() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(tmp.path());
    let store = RwLock::new(VectorStore::open(&cfg.store.path).unwrap());
    let embedder = EmbeddingClient::new(&cfg.provider).unwrap();
    let generator = GenerationClient::new(&cfg.provider).unwrap();

    // Rejected before any embedding or generation request is attempted.
    let err = rag::query_documents(&store, &embedder, &generator, &cfg, "   \n")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<rag::PipelineError>(),
        Some(rag::PipelineError::EmptyQuestion)
    ));
    assert!(err.to_string().contains("must not be empty"));
}

#[test]
fn policy_document_scenario() {
    // 1500 chars of unique text at size 1000 / overlap 200 => two chunks
    // with ids policy.txt_0 and policy.txt_800.
    let text: String = (0..1500)
        .map(|i| {
            if i % 80 == 79 {
                ' '
            } else {
                ((i * 7 % 26) as u8 + b'a') as char
            }
        })
        .collect();

    let chunks = chunk_text(&text, "policy.txt", 1000, 200);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].id, "policy.txt_0");
    assert_eq!(chunks[1].id, "policy.txt_800");

    // Index both chunks with distinct synthetic embeddings, then query
    // with chunk 1's vector: chunk 1 must rank first and every match must
    // name policy.txt as its source.
    let tmp = TempDir::new().unwrap();
    let mut store = VectorStore::open(tmp.path()).unwrap();

    let embeddings = vec![vec![0.9, 0.1, 0.0], vec![0.1, 0.9, 0.3]];
    store
        .add(
            chunks.iter().map(|c| c.text.clone()).collect(),
            embeddings.clone(),
            chunks.iter().map(|c| c.metadata.clone()).collect(),
            chunks.iter().map(|c| c.id.clone()).collect(),
        )
        .unwrap();

    let results = store.query(&embeddings[0], 3);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "policy.txt_0");
    assert!((results[0].score - 1.0).abs() < 1e-5);
    for r in &results {
        assert_eq!(r.metadata.source, "policy.txt");
    }
}

#[test]
fn reset_clears_store_and_uploads() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(tmp.path());

    let mut store = VectorStore::open(&cfg.store.path).unwrap();
    store
        .add(
            vec!["chunk".to_string()],
            vec![vec![1.0, 0.0]],
            vec![ChunkMetadata {
                source: "a.txt".to_string(),
            }],
            vec!["a.txt_0".to_string()],
        )
        .unwrap();
    let store = RwLock::new(store);

    let uploads = UploadStore::open(&cfg.uploads.dir).unwrap();
    uploads.save("a.txt", b"original bytes").unwrap();

    rag::reset_knowledge_base(&store, &uploads).unwrap();

    assert!(store.read().unwrap().is_empty());
    assert!(uploads.list().unwrap().is_empty());

    // State survives reopen as empty.
    drop(store);
    let reopened = VectorStore::open(&cfg.store.path).unwrap();
    assert!(reopened.is_empty());
}

//! # Doc QA
//!
//! A minimal document question-answering service.
//!
//! Doc QA ingests plain-text, PDF, and DOCX documents, splits them into
//! overlapping chunks, embeds each chunk through an OpenAI-compatible
//! embedding endpoint, and stores the vectors in a small on-disk store.
//! Questions are answered by embedding the question, retrieving the most
//! similar chunks by cosine similarity, and forwarding them together with
//! the question to a chat-completion model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Extract  │──▶│   Pipeline   │──▶│ VectorStore │
//! │ txt/pdf/ │   │ Chunk+Embed  │   │ json + bin  │
//! │   docx   │   └──────────────┘   └──────┬──────┘
//! └──────────┘                             │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │  (dqa)   │       │  (axum)  │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dqa ingest ./policy.txt       # extract, chunk, embed, index
//! dqa ask "What is the policy?" # retrieve + generate an answer
//! dqa documents                 # list indexed documents
//! dqa serve                     # start the HTTP API
//! dqa reset                     # clear the knowledge base
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping fixed-window chunker |
//! | [`store`] | Durable vector record store |
//! | [`embedding`] | Embedding provider client |
//! | [`generation`] | Chat-completion client |
//! | [`extract`] | Text extraction from uploaded files |
//! | [`storage`] | Uploaded-file storage |
//! | [`rag`] | Ingest and query pipeline |
//! | [`server`] | HTTP API server |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod models;
pub mod rag;
pub mod server;
pub mod storage;
pub mod store;

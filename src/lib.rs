//! # PaperChat
//!
//! A retrieval-augmented chat service over uploaded PDF documents.
//!
//! PaperChat ingests PDFs into an embedding index (chunking each page into
//! overlapping windows and embedding them in batches), then answers
//! questions by retrieving the most similar chunks and prompting a hosted
//! chat model with them as context. Every answer carries the source file
//! and page of each supporting chunk, and is persisted to a local audit
//! store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐
//! │ PDF      │──▶│  Ingestion   │──▶│ Vector index │
//! │ uploads  │   │ chunk+embed  │   │ (Pinecone /  │
//! └──────────┘   └──────────────┘   │  in-memory)  │
//!                                   └──────┬──────┘
//!                                          │ top-k
//!                ┌──────────────┐   ┌──────▼──────┐   ┌─────────┐
//!                │  Chat model  │◀──│    Query     │──▶│ SQLite  │
//!                │ (Groq/OpenAI)│   │   service    │   │  audit  │
//!                └──────────────┘   └─────────────┘   └─────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Domain errors and sanitized user messages |
//! | [`pdf`] | PDF text and document-property extraction |
//! | [`chunk`] | Overlapping character-window chunking |
//! | [`embedding`] | Embedding provider adapters (OpenAI, Ollama) |
//! | [`index`] | Vector index adapters (Pinecone, in-memory) |
//! | [`completion`] | Chat-completion adapter (Groq, OpenAI) |
//! | [`ingest`] | Upload-folder ingestion pipeline |
//! | [`query`] | Retrieval-augmented query service |
//! | [`audit`] | Answer provenance store (SQLite) |
//! | [`uploads`] | Upload folder validation and management |
//! | [`server`] | HTTP API |

pub mod audit;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod models;
pub mod pdf;
pub mod query;
pub mod server;
pub mod uploads;

//! # Casebook
//!
//! A grounded question-answering service over a fixed corpus of
//! investigation manuals. Answers come exclusively from the indexed
//! documents; when the corpus cannot support a question, the assistant
//! refuses with a fixed sentence instead of guessing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │  Corpus  │──▶│   Ingestion   │──▶│  Vector   │
//! │ PDF/text │   │ chunk + embed │   │  index    │
//! └──────────┘   └──────────────┘   └────┬─────┘
//!                                        │
//!                   ┌────────────────────┤
//!                   ▼                    ▼
//!              ┌──────────┐        ┌──────────┐
//!              │   CLI    │        │   HTTP   │
//!              │  (cbk)   │        │  /ask    │
//!              └──────────┘        └──────────┘
//! ```
//!
//! Ingestion fully rebuilds the index from scratch on every run; serving
//! opens the index read-only. The two phases never run concurrently
//! against the same index.
//!
//! ## Quick start
//!
//! ```bash
//! cbk ingest                 # build the index from ./documents
//! cbk ask "How do I image a seized drive?"
//! cbk serve                  # POST /ask on the configured bind address
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration |
//! | [`models`] | Core data types |
//! | [`loader`] | Corpus directory loader (PDF/text, page-structured) |
//! | [`chunk`] | Recursive chunker with overlap |
//! | [`embedding`] | Embedding gateway (Ollama, OpenAI) |
//! | [`generation`] | Answer generator (Ollama, OpenAI) |
//! | [`index`] | Durable nearest-neighbor store |
//! | [`ingest`] | Offline ingestion pipeline |
//! | [`retrieve`] | Top-k retrieval |
//! | [`prompt`] | Grounding contract and prompt assembly |
//! | [`service`] | Retrieve → compose → generate pipeline |
//! | [`server`] | HTTP API |
//! | [`chat`] | Interactive loop |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod prompt;
pub mod retrieve;
pub mod server;
pub mod service;

pub use error::{CasebookError, Result};
pub use prompt::REFUSAL_SENTENCE;

//! # pgembed
//!
//! Embed text and PDF documents with the OpenAI embeddings API, store the
//! vectors in PostgreSQL with pgvector, and query for nearest neighbors by
//! cosine distance.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │   Input     │──▶│   Chunker   │──▶│  Embedding   │
//! │ text / PDF  │   │ para→sent→ch│   │  per chunk   │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            ▼
//!                                     ┌──────────────┐
//!                                     │  PostgreSQL  │
//!                                     │  + pgvector  │
//!                                     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pgembed init                                   # create extension + table
//! pgembed get-embeddings --text "Dog"
//! pgembed store-embeddings --text-file cat.txt --text-key "Feline"
//! pgembed query-similar --text "Puppy" --dump-query query.sql
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chunk`] | Budget-bounded text chunking |
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | Core data types |
//! | [`extract`] | Reading text, text files, and PDFs |
//! | [`embedding`] | Embedding provider trait and OpenAI client |
//! | [`store`] | Storage trait, pgvector and in-memory stores |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |
//! | [`embed_cmd`] | `get-embeddings` |
//! | [`store_cmd`] | `store-embeddings` |
//! | [`query_cmd`] | `query-similar` |
//! | [`dump`] | Vector and SQL dump files |

pub mod chunk;
pub mod config;
pub mod db;
pub mod display;
pub mod dump;
pub mod embed_cmd;
pub mod embedding;
pub mod extract;
pub mod migrate;
pub mod models;
pub mod query_cmd;
pub mod store;
pub mod store_cmd;

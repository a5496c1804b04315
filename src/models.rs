//! Core data models shared by the commands and the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// How the input text was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    Text,
    TextFile,
    PdfFile,
}

impl InputMethod {
    /// Label shown to the user and stored as `metadata.input_method`.
    pub fn label(&self) -> &'static str {
        match self {
            InputMethod::Text => "text",
            InputMethod::TextFile => "text-file",
            InputMethod::PdfFile => "pdf-file",
        }
    }

    /// Value stored as `metadata.type`.
    pub fn metadata_type(&self) -> &'static str {
        match self {
            InputMethod::Text => "text",
            InputMethod::TextFile => "text_file",
            InputMethod::PdfFile => "pdf_file",
        }
    }
}

impl std::fmt::Display for InputMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Text read from one of the input sources, plus its source identifier.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub text: String,
    pub method: InputMethod,
    /// `demo`, `file:<name>`, or `pdf:<name>`.
    pub source: String,
    pub path: Option<PathBuf>,
}

/// A row to insert into `text_embeddings`.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub text: String,
    pub source: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// A row as returned by an insert.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    pub text: String,
    pub source: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A nearest-neighbor result.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarRecord {
    pub id: i64,
    /// First 100 characters of the stored text.
    pub text_preview: String,
    pub source: String,
    pub metadata: serde_json::Value,
    /// `1 - distance`.
    pub similarity: f64,
    /// pgvector cosine distance (`<=>`).
    pub distance: f64,
    pub created_at: DateTime<Utc>,
}

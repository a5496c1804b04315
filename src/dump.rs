//! Debug dumps for `query-similar`: the query vector as JSON and the
//! similarity search as a runnable SQL file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::Path;

use crate::display::preview;
use crate::embedding::to_pgvector_literal;
use crate::models::InputMethod;
use crate::store::SIMILAR_QUERY;

#[derive(Debug, Serialize)]
pub struct VectorDump<'a> {
    pub model: &'a str,
    pub dimensions: usize,
    pub embedding: &'a [f32],
    pub input_text_length: usize,
    pub input_text_preview: String,
}

impl<'a> VectorDump<'a> {
    pub fn new(model: &'a str, embedding: &'a [f32], input_text: &str) -> Self {
        Self {
            model,
            dimensions: embedding.len(),
            embedding,
            input_text_length: input_text.chars().count(),
            input_text_preview: preview(input_text, 100, false),
        }
    }
}

/// Write the query vector as pretty JSON, overwriting `path`.
pub fn write_vector_dump(path: &Path, dump: &VectorDump<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(dump)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write vector dump: {}", path.display()))
}

fn rule() -> String {
    format!("-- {}\n", "=".repeat(60))
}

/// Render the similarity query as a SQL file.
///
/// Section 1 holds the parameterized template, section 2 the same query
/// with the vector literal and limit inlined so it runs as-is in `psql`.
pub fn render_sql_dump(
    method: InputMethod,
    embedding: &[f32],
    limit: i64,
    generated_at: DateTime<Local>,
) -> String {
    let vector = to_pgvector_literal(embedding);
    let first: Vec<f32> = embedding.iter().take(10).copied().collect();

    let mut out = String::new();
    out.push_str("-- Query-Similar SQL Dump\n");
    out.push_str(&format!(
        "-- Generated: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("-- Input method: {}\n", method));
    out.push_str(&format!("-- Vector dimensions: {}\n", embedding.len()));
    out.push_str(&format!("-- Result limit: {}\n\n", limit));

    out.push_str(&rule());
    out.push_str("-- SECTION 1: SQL Template (with parameter placeholders)\n");
    out.push_str(&rule());
    out.push('\n');
    out.push_str(SIMILAR_QUERY);
    out.push_str(";\n\n");
    out.push_str("-- Parameters:\n");
    out.push_str(&format!(
        "-- $1: Query embedding vector ({} dimensions)\n",
        embedding.len()
    ));
    out.push_str(&format!("-- First 10 dimensions: {:?} ...\n", first));
    out.push_str(&format!("-- $2: Result limit = {}\n\n", limit));

    out.push_str(&rule());
    out.push_str("-- SECTION 2: Executable SQL (ready to run in PostgreSQL)\n");
    out.push_str(&rule());
    out.push('\n');
    let executable = SIMILAR_QUERY
        .replace("$2", &limit.to_string())
        .replace("$1", &format!("'{}'", vector));
    out.push_str(&executable);
    out.push_str(";\n\n");
    out.push_str(&format!(
        "-- Note: Full vector embedded above ({} dimensions)\n",
        embedding.len()
    ));

    out
}

/// Write the SQL dump, overwriting `path`.
pub fn write_sql_dump(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write query dump: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_vector_dump_json_shape() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("vec.json");
        let embedding = vec![0.25f32, -0.5];
        let dump = VectorDump::new("text-embedding-3-small", &embedding, "Puppy");

        write_vector_dump(&path, &dump).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["model"], "text-embedding-3-small");
        assert_eq!(parsed["dimensions"], 2);
        assert_eq!(parsed["embedding"], serde_json::json!([0.25, -0.5]));
        assert_eq!(parsed["input_text_length"], 5);
        assert_eq!(parsed["input_text_preview"], "Puppy");
    }

    #[test]
    fn test_sql_dump_sections() {
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let sql = render_sql_dump(InputMethod::TextFile, &[1.0, 0.5], 5, at);

        assert!(sql.starts_with("-- Query-Similar SQL Dump\n"));
        assert!(sql.contains("-- Generated: 2025-01-02 03:04:05"));
        assert!(sql.contains("-- Input method: text-file"));
        assert!(sql.contains("-- Vector dimensions: 2"));
        assert!(sql.contains("SECTION 1"));
        assert!(sql.contains("ORDER BY embedding <=> $1::vector"));
        assert!(sql.contains("SECTION 2"));
        assert!(sql.contains("ORDER BY embedding <=> '[1,0.5]'::vector"));
        assert!(sql.contains("LIMIT 5;"));
    }

    #[test]
    fn test_executable_section_has_no_placeholders() {
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let sql = render_sql_dump(InputMethod::Text, &[1.0], 3, at);
        let executable = sql.split("SECTION 2").nth(1).unwrap();
        assert!(!executable.contains("$1"));
        assert!(!executable.contains("$2"));
    }
}

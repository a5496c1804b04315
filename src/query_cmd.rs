//! `pgembed query-similar`: nearest-neighbor search by cosine distance.

use anyhow::Result;
use std::path::Path;

use crate::chunk::{self, CHARS_PER_TOKEN};
use crate::config::{self, Config};
use crate::db;
use crate::display::{fit_cell, preview};
use crate::dump;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::extract::{self, InputArgs};
use crate::models::SimilarRecord;
use crate::store::{EmbeddingStore, PgStore};

/// Cut query text to the chunk budget. Queries are truncated, never chunked.
///
/// Returns the text to embed and whether anything was cut.
pub fn truncate_query(text: &str, budget_tokens: usize) -> (String, bool) {
    if chunk::estimate_tokens(text) <= budget_tokens {
        return (text.to_string(), false);
    }
    let max_chars = budget_tokens.saturating_mul(CHARS_PER_TOKEN);
    (text.chars().take(max_chars).collect(), true)
}

/// Render search results as a fixed-width table.
pub fn format_results(results: &[SimilarRecord]) -> String {
    let mut out = format!(
        "{:<5} {:<50} {:<20} {:<12} {:<12}\n",
        "ID", "Text Preview", "Source", "Similarity", "Distance"
    );
    out.push_str(&"-".repeat(110));
    out.push('\n');

    for r in results {
        // Table cells are single-line.
        let text = r.text_preview.replace(['\n', '\r'], " ");
        out.push_str(&format!(
            "{:<5} {:<50} {:<20} {:>11.4} {:>11.4}\n",
            r.id,
            fit_cell(&text, 50),
            fit_cell(&r.source, 20),
            r.similarity,
            r.distance
        ));
    }

    out
}

const SIMILARITY_LEGEND: &str = "Similarity score interpretation:
  1.0 = Identical
  0.9-0.99 = Very similar
  0.8-0.89 = Similar
  0.7-0.79 = Somewhat similar
  <0.7 = Less similar";

/// CLI entry point for `query-similar`.
pub async fn run_query(
    config: &Config,
    input: &InputArgs,
    dump_vector: Option<&Path>,
    dump_query: Option<&Path>,
) -> Result<()> {
    let api_key = config::api_key()?;
    let doc = extract::read_input(input)?;
    let budget = config.chunking.max_tokens;
    let limit = config.retrieval.result_limit;

    println!("=== Querying Similar Texts ===");
    println!();
    println!("Input method: {}", doc.method);
    println!("Query text length: {} characters", doc.text.chars().count());
    println!("Estimated tokens: {}", chunk::estimate_tokens(&doc.text));

    let (query_text, truncated) = truncate_query(&doc.text, budget);
    if truncated {
        println!();
        println!(
            "⚠️  Query text exceeds token limit ({} tokens > {})",
            chunk::estimate_tokens(&doc.text),
            budget
        );
        println!(
            "Truncated to the first {} characters",
            query_text.chars().count()
        );
    }

    println!("Result limit: Top {} most similar", limit);
    println!();
    println!("Query text preview:");
    println!("{}", preview(&query_text, 100, true));
    println!();

    let embedder = OpenAIEmbedder::new(&config.embedding, api_key)?;
    println!("Getting embedding from {}...", embedder.model_name());
    let query = embedder.embed(&query_text).await?;
    println!("✓ Query embedding received");
    println!();

    if let Some(path) = dump_vector {
        let vector_dump = dump::VectorDump::new(embedder.model_name(), &query.vector, &query_text);
        match dump::write_vector_dump(path, &vector_dump) {
            Ok(()) => println!("✓ Vector saved to {}", path.display()),
            Err(e) => println!("Warning: Could not save vector to file: {:#}", e),
        }
        println!();
    }

    if let Some(path) = dump_query {
        let sql = dump::render_sql_dump(doc.method, &query.vector, limit, chrono::Local::now());
        match dump::write_sql_dump(path, &sql) {
            Ok(()) => println!("✓ Query saved to {}", path.display()),
            Err(e) => println!("Warning: Could not save query to file: {:#}", e),
        }
        println!();
    }

    println!("Searching database for similar texts...");
    println!();
    let store = PgStore::new(db::connect(config).await?);
    let results = store.query_similar(&query.vector, limit).await;
    store.close().await;
    let results = results?;

    if results.is_empty() {
        println!("No results found in database.");
        println!("Add some embeddings first using: store-embeddings");
        return Ok(());
    }

    println!("=== Search Results (Top {}) ===", limit);
    println!();
    print!("{}", format_results(&results));
    println!();
    println!("{}", SIMILARITY_LEGEND);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(id: i64, text: &str, source: &str, similarity: f64) -> SimilarRecord {
        SimilarRecord {
            id,
            text_preview: text.to_string(),
            source: source.to_string(),
            metadata: serde_json::json!({}),
            similarity,
            distance: 1.0 - similarity,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_truncate_query_short_text_untouched() {
        let (text, truncated) = truncate_query("Puppy", 5000);
        assert_eq!(text, "Puppy");
        assert!(!truncated);
    }

    #[test]
    fn test_truncate_query_long_text() {
        let long = "q".repeat(25);
        let (text, truncated) = truncate_query(&long, 10);
        assert!(truncated);
        assert_eq!(text.len(), 20);
    }

    #[test]
    fn test_format_results_columns() {
        let rows = vec![
            result(1, "Dogs are loyal companions", "demo", 0.91234),
            result(
                12,
                &"long text ".repeat(10),
                "file:a_really_long_source_name.txt",
                0.5,
            ),
        ];
        let table = format_results(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("ID    Text Preview"));
        assert_eq!(lines[1], "-".repeat(110));
        assert!(lines[2].contains("Dogs are loyal companions"));
        assert!(lines[2].contains("0.9123"));
        assert!(lines[2].contains("0.0877"));
        assert!(lines[3].contains("file:a_really_lon..."));
        assert!(lines[3].contains("long text long text"));
        assert!(lines[3].contains("..."));
    }

    #[test]
    fn test_format_results_flattens_newlines() {
        let rows = vec![result(1, "line one\nline two", "demo", 1.0)];
        let table = format_results(&rows);
        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("line one line two"));
    }
}

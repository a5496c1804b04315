//! Storage abstraction for embedded text.
//!
//! The [`EmbeddingStore`] trait covers everything the commands need from
//! persistence: duplicate detection and deletion scoped by source,
//! inserting a record, and nearest-neighbor retrieval by cosine distance.
//!
//! | Implementation | Backend |
//! |----------------|---------|
//! | [`PgStore`] | PostgreSQL + pgvector (`<=>` operator) |
//! | [`MemoryStore`] | In-process brute-force cosine distance, for tests |

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};

use crate::display::preview;
use crate::embedding::{cosine_distance, to_pgvector_literal};
use crate::models::{NewRecord, SimilarRecord, StoredRecord};

/// Characters of stored text returned in [`SimilarRecord::text_preview`].
pub const TEXT_PREVIEW_CHARS: usize = 100;

/// Nearest-neighbor query. `$1` is the query vector, `$2` the row limit.
pub const SIMILAR_QUERY: &str = "SELECT
    id,
    LEFT(text, 100) AS text_preview,
    source,
    metadata,
    1 - (embedding <=> $1::vector) AS cosine_similarity,
    embedding <=> $1::vector AS cosine_distance,
    created_at
FROM text_embeddings
ORDER BY embedding <=> $1::vector
LIMIT $2";

#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Number of records stored under `source`.
    async fn count_by_source(&self, source: &str) -> Result<i64>;

    /// Delete every record stored under `source`, returning how many were removed.
    async fn delete_by_source(&self, source: &str) -> Result<u64>;

    /// Insert a record and return it as stored.
    async fn insert(&self, record: &NewRecord) -> Result<StoredRecord>;

    /// The `limit` records closest to `embedding`, nearest first.
    async fn query_similar(&self, embedding: &[f32], limit: i64) -> Result<Vec<SimilarRecord>>;
}

// ============ PostgreSQL ============

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl EmbeddingStore for PgStore {
    async fn count_by_source(&self, source: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM text_embeddings WHERE source = $1")
            .bind(source)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_by_source(&self, source: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM text_embeddings WHERE source = $1")
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert(&self, record: &NewRecord) -> Result<StoredRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO text_embeddings (text, source, embedding, metadata)
            VALUES ($1, $2, $3::vector, $4)
            RETURNING id, text, source, metadata, created_at
            "#,
        )
        .bind(&record.text)
        .bind(&record.source)
        .bind(to_pgvector_literal(&record.embedding))
        .bind(&record.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(StoredRecord {
            id: row.get("id"),
            text: row.get("text"),
            source: row.get("source"),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
        })
    }

    async fn query_similar(&self, embedding: &[f32], limit: i64) -> Result<Vec<SimilarRecord>> {
        let rows = sqlx::query(SIMILAR_QUERY)
            .bind(to_pgvector_literal(embedding))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| SimilarRecord {
                id: row.get("id"),
                text_preview: row.get("text_preview"),
                source: row.get("source"),
                metadata: row.get("metadata"),
                similarity: row.get("cosine_similarity"),
                distance: row.get("cosine_distance"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

// ============ In-memory ============

struct MemoryRow {
    record: StoredRecord,
    embedding: Vec<f32>,
}

/// In-memory store. Vector search is brute-force cosine distance over all rows.
pub struct MemoryStore {
    rows: RwLock<Vec<MemoryRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// All stored records in insertion order.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.read_rows().iter().map(|r| r.record.clone()).collect()
    }

    fn read_rows(&self) -> std::sync::RwLockReadGuard<'_, Vec<MemoryRow>> {
        self.rows.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_rows(&self) -> std::sync::RwLockWriteGuard<'_, Vec<MemoryRow>> {
        self.rows.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    async fn count_by_source(&self, source: &str) -> Result<i64> {
        Ok(self
            .read_rows()
            .iter()
            .filter(|r| r.record.source == source)
            .count() as i64)
    }

    async fn delete_by_source(&self, source: &str) -> Result<u64> {
        let mut rows = self.write_rows();
        let before = rows.len();
        rows.retain(|r| r.record.source != source);
        Ok((before - rows.len()) as u64)
    }

    async fn insert(&self, record: &NewRecord) -> Result<StoredRecord> {
        let mut rows = self.write_rows();
        let id = rows.iter().map(|r| r.record.id).max().unwrap_or(0) + 1;
        let stored = StoredRecord {
            id,
            text: record.text.clone(),
            source: record.source.clone(),
            metadata: record.metadata.clone(),
            created_at: Utc::now(),
        };
        rows.push(MemoryRow {
            record: stored.clone(),
            embedding: record.embedding.clone(),
        });
        Ok(stored)
    }

    async fn query_similar(&self, embedding: &[f32], limit: i64) -> Result<Vec<SimilarRecord>> {
        let rows = self.read_rows();
        let mut results: Vec<SimilarRecord> = rows
            .iter()
            .map(|r| {
                let distance = cosine_distance(&r.embedding, embedding) as f64;
                SimilarRecord {
                    id: r.record.id,
                    text_preview: preview(&r.record.text, TEXT_PREVIEW_CHARS, false),
                    source: r.record.source.clone(),
                    metadata: r.record.metadata.clone(),
                    similarity: 1.0 - distance,
                    distance,
                    created_at: r.record.created_at,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit.max(0) as usize);
        Ok(results)
    }
}

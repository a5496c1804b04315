use anyhow::Result;
use sqlx::PgPool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate(&pool, config.embedding.dims).await?;
    pool.close().await;
    Ok(())
}

/// Create the pgvector extension, the `text_embeddings` table, and its indexes.
///
/// Every statement is idempotent.
pub async fn migrate(pool: &PgPool, dims: usize) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(pool)
        .await?;

    // Column dimensionality is part of the type, so it cannot be a bind parameter.
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS text_embeddings (
            id BIGSERIAL PRIMARY KEY,
            text TEXT NOT NULL,
            source TEXT NOT NULL,
            embedding vector({}) NOT NULL,
            metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        dims
    ))
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_text_embeddings_source ON text_embeddings(source)")
        .execute(pool)
        .await?;

    // HNSW supports at most 2000 dimensions.
    if dims <= 2000 {
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_text_embeddings_embedding \
             ON text_embeddings USING hnsw (embedding vector_cosine_ops)",
        )
        .execute(pool)
        .await?;
    } else {
        tracing::warn!(dims, "skipping HNSW index: too many dimensions");
    }

    Ok(())
}

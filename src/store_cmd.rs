//! `pgembed store-embeddings`: chunk, embed, and persist a document.
//!
//! The workflow runs in three steps:
//!
//! 1. **Duplicate check**: existing records with the same source are
//!    skipped, replaced, or kept according to a [`DuplicatePolicy`].
//! 2. **Planning**: [`plan_store`] chunks the text and builds the base
//!    metadata. Nothing touches the network or the database here.
//! 3. **Storing**: [`store_chunks`] embeds each chunk and inserts it,
//!    one chunk at a time, in document order.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use crate::chunk::{self, Chunk};
use crate::config::{self, Config};
use crate::db;
use crate::display::preview;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::extract::{self, InputArgs};
use crate::models::{DocumentInput, InputMethod, NewRecord, StoredRecord};
use crate::store::{EmbeddingStore, PgStore};

/// What to do when records with the same source already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// `--skip-if-exists`
    Skip,
    /// `--replace-if-exists`
    Replace,
    /// `--force`
    Force,
    /// No flag: ask on a terminal, stop otherwise.
    Prompt,
}

impl DuplicatePolicy {
    pub fn from_flags(skip: bool, replace: bool, force: bool) -> Self {
        if skip {
            DuplicatePolicy::Skip
        } else if replace {
            DuplicatePolicy::Replace
        } else if force {
            DuplicatePolicy::Force
        } else {
            DuplicatePolicy::Prompt
        }
    }
}

/// The resolved decision for a source that already has records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateAction {
    /// Leave the existing records and store nothing.
    Skip,
    /// Delete the existing records, then store.
    Replace,
    /// Store alongside the existing records.
    Continue,
}

/// Map an interactive answer (`1`, `2`, or `3`) to an action.
pub fn parse_choice(answer: &str) -> Option<DuplicateAction> {
    match answer.trim() {
        "1" => Some(DuplicateAction::Skip),
        "2" => Some(DuplicateAction::Replace),
        "3" => Some(DuplicateAction::Continue),
        _ => None,
    }
}

/// Ask the user what to do with existing records.
///
/// End of input and unrecognized answers resolve to [`DuplicateAction::Skip`].
pub fn prompt_duplicate_action(reader: &mut impl BufRead, out: &mut impl Write) -> DuplicateAction {
    let _ = writeln!(out);
    let _ = writeln!(out, "Options:");
    let _ = writeln!(out, "  1. Skip - Don't store (keep existing)");
    let _ = writeln!(out, "  2. Replace - Delete existing and store new");
    let _ = writeln!(out, "  3. Continue - Store anyway (create duplicates)");
    let _ = writeln!(out);
    let _ = write!(out, "Enter your choice (1/2/3): ");
    let _ = out.flush();

    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) | Err(_) => {
            let _ = writeln!(out);
            let _ = writeln!(out, "No input provided. Exiting.");
            DuplicateAction::Skip
        }
        Ok(_) => match parse_choice(&line) {
            Some(action) => action,
            None => {
                let _ = writeln!(out, "Invalid choice. Exiting.");
                DuplicateAction::Skip
            }
        },
    }
}

/// Resolve a policy to an action without any I/O.
///
/// Returns `None` for [`DuplicatePolicy::Prompt`], which needs the user.
pub fn resolve_policy(policy: DuplicatePolicy) -> Option<DuplicateAction> {
    match policy {
        DuplicatePolicy::Skip => Some(DuplicateAction::Skip),
        DuplicatePolicy::Replace => Some(DuplicateAction::Replace),
        DuplicatePolicy::Force => Some(DuplicateAction::Continue),
        DuplicatePolicy::Prompt => None,
    }
}

/// Chunks, metadata, and labelling for one document, ready to embed.
#[derive(Debug, Clone)]
pub struct StorePlan {
    pub source: String,
    pub chunks: Vec<Chunk>,
    /// Metadata shared by every chunk of the document.
    pub base_metadata: Map<String, Value>,
    /// Custom text stored instead of the chunk content.
    pub text_key: Option<String>,
}

impl StorePlan {
    pub fn is_chunked(&self) -> bool {
        self.chunks.len() > 1
    }

    /// Metadata for one chunk: the base metadata plus position fields when chunked.
    pub fn metadata_for(&self, chunk: &Chunk) -> Value {
        let mut metadata = self.base_metadata.clone();
        if self.is_chunked() {
            metadata.insert("chunk_index".to_string(), json!(chunk.index));
            metadata.insert("total_chunks".to_string(), json!(chunk.total));
            metadata.insert("chunk_chars".to_string(), json!(chunk.chars));
        }
        Value::Object(metadata)
    }

    /// Text column value for one chunk.
    pub fn text_for(&self, chunk: &Chunk) -> String {
        match &self.text_key {
            Some(key) if self.is_chunked() => {
                format!("{} (chunk {}/{})", key, chunk.index, chunk.total)
            }
            Some(key) => key.clone(),
            None => chunk.text.clone(),
        }
    }
}

/// Chunk a document and build its base metadata.
///
/// `text_key` is ignored for direct `--text` input.
pub fn plan_store(
    input: &DocumentInput,
    text_key: Option<&str>,
    budget_tokens: usize,
) -> Result<StorePlan> {
    let text_key = match (text_key, input.method) {
        (Some(_), InputMethod::Text) => {
            tracing::warn!("--text-key is ignored when using --text");
            None
        }
        (key, _) => key.map(str::to_string),
    };

    let chunks = chunk::chunk_document(&input.text, budget_tokens)?;

    let mut base_metadata = Map::new();
    base_metadata.insert("type".to_string(), json!(input.method.metadata_type()));
    base_metadata.insert("input_method".to_string(), json!(input.method.label()));

    if let Some(path) = &input.path {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size_bytes = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();

        let name_key = match input.method {
            InputMethod::PdfFile => "pdf_filename",
            _ => "filename",
        };
        base_metadata.insert(name_key.to_string(), json!(name));
        base_metadata.insert("size_bytes".to_string(), json!(size_bytes));
    }

    Ok(StorePlan {
        source: input.source.clone(),
        chunks,
        base_metadata,
        text_key,
    })
}

/// Embed and insert every chunk of `plan`, sequentially and in order.
///
/// Stops at the first failure; chunks stored before it stay stored.
pub async fn store_chunks(
    embedder: &dyn Embedder,
    store: &dyn EmbeddingStore,
    plan: &StorePlan,
) -> Result<Vec<StoredRecord>> {
    let total = plan.chunks.len();
    let mut stored = Vec::with_capacity(total);

    for chunk in &plan.chunks {
        if plan.is_chunked() {
            println!(
                "Processing chunk {}/{} ({} chars, ~{} tokens)...",
                chunk.index,
                total,
                chunk.chars,
                chunk.estimated_tokens()
            );
        } else {
            println!("Getting embedding from {}...", embedder.model_name());
        }

        let embedding = embedder
            .embed(&chunk.text)
            .await
            .with_context(|| format!("Failed to embed chunk {}/{}", chunk.index, total))?;

        let record = NewRecord {
            text: plan.text_for(chunk),
            source: plan.source.clone(),
            embedding: embedding.vector,
            metadata: plan.metadata_for(chunk),
        };

        let inserted = store
            .insert(&record)
            .await
            .with_context(|| format!("Failed to store chunk {}/{}", chunk.index, total))?;

        tracing::debug!(id = inserted.id, chunk = chunk.index, hash = %chunk.hash, "stored chunk");

        if plan.is_chunked() {
            println!("  ✓ Chunk {} stored (ID: {})", chunk.index, inserted.id);
        }
        stored.push(inserted);
    }

    Ok(stored)
}

/// Apply the duplicate policy for `source`. Returns `false` when storing should stop.
pub async fn handle_duplicates(
    store: &dyn EmbeddingStore,
    source: &str,
    policy: DuplicatePolicy,
) -> Result<bool> {
    println!("Checking for existing embeddings...");
    let existing = store.count_by_source(source).await?;

    if existing == 0 {
        println!("✓ No existing records found for this source");
        println!();
        return Ok(true);
    }

    println!(
        "⚠️  Found {} existing record(s) with source: {}",
        existing, source
    );

    let action = match resolve_policy(policy) {
        Some(action) => {
            match action {
                DuplicateAction::Skip => println!("Skipping (--skip-if-exists)."),
                DuplicateAction::Replace => println!("Replacing (--replace-if-exists)."),
                DuplicateAction::Continue => {
                    println!("Continuing with duplicate storage (--force)...")
                }
            }
            action
        }
        None => {
            if !atty::is(atty::Stream::Stdin) {
                println!(
                    "Non-interactive mode detected. Use --skip-if-exists, --replace-if-exists, or --force"
                );
                return Ok(false);
            }
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            prompt_duplicate_action(&mut stdin.lock(), &mut stdout.lock())
        }
    };

    match action {
        DuplicateAction::Skip => {
            println!("No changes made.");
            Ok(false)
        }
        DuplicateAction::Replace => {
            println!("Deleting {} existing record(s)...", existing);
            let deleted = store.delete_by_source(source).await?;
            println!("✓ Deleted {} record(s)", deleted);
            println!();
            Ok(true)
        }
        DuplicateAction::Continue => {
            println!();
            Ok(true)
        }
    }
}

/// CLI entry point for `store-embeddings`.
pub async fn run_store(
    config: &Config,
    input: &InputArgs,
    text_key: Option<&str>,
    policy: DuplicatePolicy,
) -> Result<()> {
    let api_key = config::api_key()?;
    let doc = extract::read_input(input)?;
    let budget = config.chunking.max_tokens;

    println!("=== Storing Embedding in Database ===");
    println!();
    println!("Input method: {}", doc.method);
    println!("Source: {}", doc.source);
    println!("Text length: {} characters", doc.text.chars().count());
    println!("Estimated tokens: {}", chunk::estimate_tokens(&doc.text));
    if let Some(key) = text_key.filter(|_| doc.method != InputMethod::Text) {
        println!("Text key: {}", key);
    }
    println!();

    let store = PgStore::new(db::connect(config).await?);

    if !handle_duplicates(&store, &doc.source, policy).await? {
        store.close().await;
        return Ok(());
    }

    let plan = plan_store(&doc, text_key, budget)?;
    if plan.is_chunked() {
        println!(
            "⚠️  Text exceeds token limit ({} tokens > {})",
            chunk::estimate_tokens(&doc.text),
            budget
        );
        println!("Split into {} chunks", plan.chunks.len());
        println!();
    }

    let embedder = OpenAIEmbedder::new(&config.embedding, api_key)?;
    let result = store_chunks(&embedder, &store, &plan).await;
    store.close().await;
    let stored = result?;

    if plan.is_chunked() {
        println!();
        println!("✓ All {} chunks stored successfully!", stored.len());
        println!("Total text length: {} characters", doc.text.chars().count());
        println!("Source: {}", doc.source);
    } else if let Some(record) = stored.first() {
        println!("✓ Embedding stored successfully!");
        println!();
        println!("Inserted record:");
        println!("  ID: {}", record.id);
        println!("  Text: {}", preview(&record.text, 100, true));
        println!("  Source: {}", record.source);
        println!("  Metadata: {}", record.metadata);
        println!("  Created: {}", record.created_at);
    }

    Ok(())
}

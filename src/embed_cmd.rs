//! `pgembed get-embeddings`: embed a document and print the vector.

use anyhow::Result;

use crate::config::{self, Config};
use crate::display::preview;
use crate::embedding::{self, Embedder, OpenAIEmbedder};
use crate::extract::{self, InputArgs};

pub async fn run_get_embeddings(config: &Config, input: &InputArgs, full_array: bool) -> Result<()> {
    let api_key = config::api_key()?;
    let doc = extract::read_input(input)?;
    let embedder = OpenAIEmbedder::new(&config.embedding, api_key)?;

    println!("=== Getting Embedding ===");
    println!();
    println!("Input method: {}", doc.method);
    println!("Text length: {} characters", doc.text.chars().count());
    println!("Model: {}", embedder.model_name());
    println!();
    println!("Text preview:");
    println!("{}", preview(&doc.text, 100, true));
    println!();

    println!("Sending request to embedding API...");
    let result = embedder.embed(&doc.text).await?;

    println!("✓ Embedding received successfully!");
    println!();
    println!("Embedding dimensions: {}", result.vector.len());
    println!("Tokens used: {}", result.total_tokens);
    println!();
    println!("Embedding vector:");
    println!("{}", embedding::format_embedding(&result.vector, full_array));

    Ok(())
}

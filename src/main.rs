//! # pgembed CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pgembed init` | Create the pgvector extension, table, and indexes |
//! | `pgembed get-embeddings` | Embed input text and print the vector |
//! | `pgembed store-embeddings` | Chunk, embed, and store input text |
//! | `pgembed query-similar` | Find the stored texts closest to the input |
//!
//! ## Examples
//!
//! ```bash
//! pgembed get-embeddings --text "Dog"
//! pgembed get-embeddings --text-file samples/dog.txt --full-array
//! pgembed store-embeddings --text-file samples/cat.txt --text-key "Feline"
//! pgembed store-embeddings --pdf-file paper.pdf --replace-if-exists
//! pgembed query-similar --text "Puppy" --dump-vector vec.json --dump-query query.sql
//! ```

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pgembed::config::{self, DEFAULT_CONFIG_PATH};
use pgembed::extract::InputArgs;
use pgembed::store_cmd::DuplicatePolicy;
use pgembed::{embed_cmd, migrate, query_cmd, store_cmd};

/// Embed text and PDFs with OpenAI and search them with pgvector.
#[derive(Parser)]
#[command(
    name = "pgembed",
    about = "Embed text and PDFs with OpenAI and search them in PostgreSQL with pgvector",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pgembed.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the `vector` extension, the `text_embeddings` table, and its
    /// indexes. Safe to run repeatedly.
    Init,

    /// Get an embedding from the API and print it.
    GetEmbeddings {
        #[command(flatten)]
        input: InputArgs,

        /// Print every dimension instead of the first 10.
        #[arg(long)]
        full_array: bool,
    },

    /// Embed input text and store it in the database.
    ///
    /// Text over the chunk budget is split on paragraph and sentence
    /// boundaries and stored as one record per chunk.
    #[command(group(ArgGroup::new("duplicates").multiple(false)))]
    StoreEmbeddings {
        #[command(flatten)]
        input: InputArgs,

        /// Custom text value to store instead of the content (file and PDF input only).
        #[arg(long)]
        text_key: Option<String>,

        /// Skip if the source already exists (no prompt).
        #[arg(long, group = "duplicates")]
        skip_if_exists: bool,

        /// Delete existing records for the source and store again (no prompt).
        #[arg(long, group = "duplicates")]
        replace_if_exists: bool,

        /// Store anyway, allowing duplicates (no prompt).
        #[arg(long, group = "duplicates")]
        force: bool,
    },

    /// Query the database for the most similar stored texts.
    QuerySimilar {
        #[command(flatten)]
        input: InputArgs,

        /// Save the query embedding vector to a JSON file.
        #[arg(long, value_name = "FILE")]
        dump_vector: Option<PathBuf>,

        /// Save the similarity SQL query to a file.
        #[arg(long, value_name = "FILE")]
        dump_query: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = match &cli.config {
        Some(path) => config::load_config(path, true)?,
        None => config::load_config(&PathBuf::from(DEFAULT_CONFIG_PATH), false)?,
    };
    tracing::debug!(model = %cfg.embedding.model, max_tokens = cfg.chunking.max_tokens, "config loaded");

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::GetEmbeddings { input, full_array } => {
            embed_cmd::run_get_embeddings(&cfg, &input, full_array).await?;
        }
        Commands::StoreEmbeddings {
            input,
            text_key,
            skip_if_exists,
            replace_if_exists,
            force,
        } => {
            let policy = DuplicatePolicy::from_flags(skip_if_exists, replace_if_exists, force);
            store_cmd::run_store(&cfg, &input, text_key.as_deref(), policy).await?;
        }
        Commands::QuerySimilar {
            input,
            dump_vector,
            dump_query,
        } => {
            query_cmd::run_query(&cfg, &input, dump_vector.as_deref(), dump_query.as_deref())
                .await?;
        }
    }

    Ok(())
}

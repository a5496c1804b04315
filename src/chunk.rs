//! Paragraph → sentence → character text chunker.
//!
//! Splits document text into pieces that fit an embedding model's input
//! budget. Budgets are expressed in tokens and converted to characters with
//! the fixed [`CHARS_PER_TOKEN`] ratio; no real tokenizer is involved, and
//! chunk boundaries are defined relative to this approximation.
//!
//! Splitting prefers paragraph boundaries (`\n\n`), then sentence boundaries
//! (`". "`), and only falls back to fixed-size character windows for a
//! single unit that is still over budget. Lengths are counted in `char`s, so
//! a window never cuts through a UTF-8 sequence.
//!
//! Sentence splitting on a literal `". "` is a known approximation: it
//! mishandles abbreviations, decimals, and non-English punctuation.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Conservative chars-per-token ratio (math and special characters tokenize densely).
pub const CHARS_PER_TOKEN: usize = 2;

/// Default chunk budget in tokens, leaving headroom under the model's 8192 limit.
pub const DEFAULT_CHUNK_TOKENS: usize = 5000;

/// Separator placed between units accumulated into one chunk.
const PARAGRAPH_SEP: &str = "\n\n";
const SENTENCE_SEP: &str = ". ";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk budget must be greater than 0 tokens")]
    ZeroBudget,
    #[error("chunk budget of {0} tokens overflows the character limit")]
    BudgetOverflow(usize),
}

/// A chunk tagged with its 1-based position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub total: usize,
    pub text: String,
    /// Length of `text` in characters.
    pub chars: usize,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

impl Chunk {
    pub fn estimated_tokens(&self) -> usize {
        self.chars / CHARS_PER_TOKEN
    }
}

/// Estimate the token count of `text` as `chars / CHARS_PER_TOKEN`.
pub fn estimate_tokens(text: &str) -> usize {
    char_len(text) / CHARS_PER_TOKEN
}

/// Convert a token budget into the character limit every chunk must respect.
pub fn budget_chars(budget_tokens: usize) -> Result<usize, ChunkError> {
    if budget_tokens == 0 {
        return Err(ChunkError::ZeroBudget);
    }
    budget_tokens
        .checked_mul(CHARS_PER_TOKEN)
        .ok_or(ChunkError::BudgetOverflow(budget_tokens))
}

/// Split text into chunks of at most `budget_tokens * CHARS_PER_TOKEN` characters.
///
/// Text that already fits is returned unchanged as a single chunk. Otherwise
/// every chunk is trimmed at both ends and the original order is kept.
///
/// # Errors
///
/// Returns [`ChunkError`] for a zero budget, before any work is done.
pub fn chunk_text(text: &str, budget_tokens: usize) -> Result<Vec<String>, ChunkError> {
    let max_chars = budget_chars(budget_tokens)?;

    if char_len(text) <= max_chars {
        return Ok(vec![text.to_string()]);
    }

    let mut acc = Accumulator::new(max_chars);

    for para in text.split(PARAGRAPH_SEP) {
        if char_len(para) > max_chars {
            let mut sentences = para.split(SENTENCE_SEP).peekable();
            while let Some(sentence) = sentences.next() {
                // The separator swallowed this sentence's period.
                if sentences.peek().is_some() {
                    acc.absorb(&format!("{}.", sentence));
                } else {
                    acc.absorb(sentence);
                }
            }
        } else {
            acc.absorb(para);
        }
    }

    Ok(acc.finish())
}

/// Like [`chunk_text`], but tags each chunk with its position, size, and hash.
pub fn chunk_document(text: &str, budget_tokens: usize) -> Result<Vec<Chunk>, ChunkError> {
    let pieces = chunk_text(text, budget_tokens)?;
    let total = pieces.len();

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| make_chunk(i + 1, total, piece))
        .collect())
}

/// Accumulation state: completed chunks plus the chunk being built.
struct Accumulator {
    max_chars: usize,
    chunks: Vec<String>,
    current: String,
    current_chars: usize,
}

impl Accumulator {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            chunks: Vec::new(),
            current: String::new(),
            current_chars: 0,
        }
    }

    fn absorb(&mut self, unit: &str) {
        if unit.is_empty() {
            return;
        }

        let unit_chars = char_len(unit);

        if unit_chars > self.max_chars {
            self.flush();
            for window in char_windows(unit, self.max_chars) {
                self.emit(window);
            }
        } else if self.current_chars + unit_chars + PARAGRAPH_SEP.len() > self.max_chars {
            self.flush();
            self.current.push_str(unit);
            self.current_chars = unit_chars;
        } else {
            if !self.current.is_empty() {
                self.current.push_str(PARAGRAPH_SEP);
                self.current_chars += PARAGRAPH_SEP.len();
            }
            self.current.push_str(unit);
            self.current_chars += unit_chars;
        }
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let current = std::mem::take(&mut self.current);
        self.current_chars = 0;
        self.emit(&current);
    }

    fn emit(&mut self, piece: &str) {
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            self.chunks.push(trimmed.to_string());
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        // Whitespace-only input trims away entirely.
        if self.chunks.is_empty() {
            self.chunks.push(String::new());
        }
        self.chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Consecutive slices of `s` holding `size` characters each (the last may be shorter).
fn char_windows(s: &str, size: usize) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(size)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head)
    })
}

fn make_chunk(index: usize, total: usize, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        index,
        total,
        chars: char_len(&text),
        text,
        hash,
    }
}

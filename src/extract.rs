//! Input reading: direct text, UTF-8 text files, and PDF text extraction.
//!
//! Every command takes exactly one of `--text`, `--text-file`, or
//! `--pdf-file`. The chosen source also determines the source identifier
//! used for duplicate detection (`demo`, `file:<name>`, `pdf:<name>`).

use std::path::{Path, PathBuf};

use clap::Args;
use thiserror::Error;

use crate::models::{DocumentInput, InputMethod};

/// Source identifier for text passed directly on the command line.
pub const DIRECT_TEXT_SOURCE: &str = "demo";

/// Mutually exclusive input flags shared by all commands.
#[derive(Debug, Clone, Default, Args)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// Direct text input.
    #[arg(long)]
    pub text: Option<String>,

    /// Path to a UTF-8 text file.
    #[arg(long)]
    pub text_file: Option<PathBuf>,

    /// Path to a PDF file.
    #[arg(long)]
    pub pdf_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Must provide one of --text, --text-file, or --pdf-file")]
    NoInput,
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error reading PDF {}: {message}", .path.display())]
    Pdf { path: PathBuf, message: String },
    #[error("Could not extract text from PDF: {}", .0.display())]
    EmptyPdf(PathBuf),
}

/// Read the document text from whichever input flag was given.
pub fn read_input(args: &InputArgs) -> Result<DocumentInput, ExtractError> {
    if let Some(text) = &args.text {
        return Ok(DocumentInput {
            text: text.clone(),
            method: InputMethod::Text,
            source: DIRECT_TEXT_SOURCE.to_string(),
            path: None,
        });
    }

    if let Some(path) = &args.text_file {
        let text = read_text_file(path)?;
        return Ok(DocumentInput {
            text,
            method: InputMethod::TextFile,
            source: format!("file:{}", file_name(path)),
            path: Some(path.clone()),
        });
    }

    if let Some(path) = &args.pdf_file {
        let text = read_pdf_file(path)?;
        return Ok(DocumentInput {
            text,
            method: InputMethod::PdfFile,
            source: format!("pdf:{}", file_name(path)),
            path: Some(path.clone()),
        });
    }

    Err(ExtractError::NoInput)
}

fn read_text_file(path: &Path) -> Result<String, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_pdf_file(path: &Path) -> Result<String, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyPdf(path.to_path_buf()));
    }

    tracing::debug!(path = %path.display(), chars = text.chars().count(), "extracted PDF text");
    Ok(text)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_direct_text() {
        let args = InputArgs {
            text: Some("Dog".to_string()),
            ..Default::default()
        };
        let input = read_input(&args).unwrap();
        assert_eq!(input.text, "Dog");
        assert_eq!(input.method, InputMethod::Text);
        assert_eq!(input.source, "demo");
        assert!(input.path.is_none());
    }

    #[test]
    fn test_text_file_source_uses_file_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cat.txt");
        fs::write(&path, "Cats are small carnivorous mammals.").unwrap();

        let args = InputArgs {
            text_file: Some(path.clone()),
            ..Default::default()
        };
        let input = read_input(&args).unwrap();
        assert_eq!(input.text, "Cats are small carnivorous mammals.");
        assert_eq!(input.method, InputMethod::TextFile);
        assert_eq!(input.source, "file:cat.txt");
        assert_eq!(input.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_text_file() {
        let args = InputArgs {
            text_file: Some(PathBuf::from("/definitely/not/here.txt")),
            ..Default::default()
        };
        let err = read_input(&args).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
        assert!(err.to_string().contains("here.txt"));
    }

    #[test]
    fn test_missing_pdf_file() {
        let args = InputArgs {
            pdf_file: Some(PathBuf::from("/definitely/not/here.pdf")),
            ..Default::default()
        };
        assert!(matches!(
            read_input(&args).unwrap_err(),
            ExtractError::NotFound(_)
        ));
    }

    #[test]
    fn test_invalid_pdf() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        fs::write(&path, b"this is not a pdf").unwrap();

        let args = InputArgs {
            pdf_file: Some(path),
            ..Default::default()
        };
        assert!(read_input(&args).is_err());
    }

    #[test]
    fn test_no_input() {
        assert!(matches!(
            read_input(&InputArgs::default()).unwrap_err(),
            ExtractError::NoInput
        ));
    }
}

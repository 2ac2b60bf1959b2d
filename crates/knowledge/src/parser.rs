//! Source file decoding and text extraction.

use ledgerlens_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Text encodings tried when decoding a document, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    /// Decoding order used for financial documents.
    pub const FALLBACK_ORDER: [TextEncoding; 2] = [TextEncoding::Utf8, TextEncoding::Latin1];

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
        }
    }

    /// Decode `bytes`, or `None` if they are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            // Every byte maps to the code point of the same value
            Self::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Read a text document, trying each encoding in `encodings` until one decodes.
pub fn parse_file_with(
    path: &Path,
    encodings: &[TextEncoding],
) -> AppResult<(String, TextEncoding)> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if !is_likely_text(&bytes) {
        tracing::warn!("Skipping likely binary file: {:?}", path);
        return Err(AppError::Knowledge(format!(
            "Binary file not supported: {:?}",
            path
        )));
    }

    for encoding in encodings {
        if let Some(text) = encoding.decode(&bytes) {
            if *encoding != TextEncoding::Utf8 {
                tracing::debug!("Decoded {:?} as {}", path, encoding.as_str());
            }
            return Ok((normalize_line_endings(&text), *encoding));
        }
    }

    Err(AppError::Knowledge(format!(
        "Could not decode {:?} with any of: {}",
        path,
        encodings
            .iter()
            .map(TextEncoding::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Check if content is likely text (not binary).
fn is_likely_text(data: &[u8]) -> bool {
    // Simple heuristic: check for null bytes
    !data.contains(&0)
}

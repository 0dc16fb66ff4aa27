//! Document splitting strategies.
//!
//! Two interchangeable strategies, selected by [`SplitMethod`]:
//!
//! * [`SplitMethod::Recursive`]: character-bounded chunks with overlap,
//!   breaking at the highest-level boundary available (paragraph, line,
//!   sentence, word, character).
//! * [`SplitMethod::Paragraph`]: strictly on blank-line boundaries, no
//!   size bound, no overlap.
//!
//! Both preserve the source document's metadata on every produced chunk and
//! are deterministic for fixed input and parameters.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::document::Document;
use crate::types::RagError;

/// Separator ladder for the recursive strategy, highest level first. The
/// empty separator is the character-level hard cut.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Chunking strategy selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SplitMethod {
    /// Recursive character-bounded split with overlap.
    #[default]
    Recursive,
    /// One chunk per blank-line-delimited paragraph.
    Paragraph,
}

impl std::fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitMethod::Recursive => f.write_str("recursive"),
            SplitMethod::Paragraph => f.write_str("paragraph"),
        }
    }
}

/// Splits cleaned documents according to `method`.
///
/// A failure here is fatal to the whole ingestion run; there is no partial
/// chunking.
pub fn split_documents(
    documents: &[Document],
    method: SplitMethod,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Document>, RagError> {
    match method {
        SplitMethod::Recursive => {
            if chunk_size == 0 {
                return Err(RagError::Chunking("chunk size must be positive".into()));
            }
            if chunk_overlap >= chunk_size {
                return Err(RagError::Chunking(format!(
                    "chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})"
                )));
            }
            Ok(documents
                .iter()
                .flat_map(|doc| {
                    split_recursive(&doc.content, chunk_size, chunk_overlap)
                        .into_iter()
                        .map(|piece| doc.derive(piece))
                })
                .collect())
        }
        SplitMethod::Paragraph => Ok(documents
            .iter()
            .flat_map(|doc| {
                split_paragraphs(&doc.content)
                    .into_iter()
                    .map(|piece| doc.derive(piece))
            })
            .collect()),
    }
}

/// Splits on blank-line boundaries; each trimmed non-empty paragraph becomes
/// one chunk.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits `text` into chunks of at most `chunk_size` characters with
/// `chunk_overlap` characters shared between consecutive chunks, preferring
/// the highest-level separator present before falling back toward a hard
/// character cut.
pub fn split_recursive(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    split_with_separators(text, &SEPARATORS, chunk_size, chunk_overlap)
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn split_with_separators(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    // Pick the first separator that actually occurs; the final "" always does.
    let (index, separator) = separators
        .iter()
        .enumerate()
        .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
        .map(|(i, sep)| (i, *sep))
        .unwrap_or((separators.len() - 1, ""));
    let deeper = &separators[index + 1..];

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator).map(str::to_string).collect()
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<String> = Vec::new();
    for piece in pieces {
        if char_len(&piece) <= chunk_size {
            fitting.push(piece);
            continue;
        }
        // Oversized piece: flush what fits, then recurse with finer separators.
        if !fitting.is_empty() {
            chunks.extend(merge_pieces(&fitting, separator, chunk_size, chunk_overlap));
            fitting.clear();
        }
        if deeper.is_empty() {
            chunks.push(piece);
        } else {
            chunks.extend(split_with_separators(
                &piece,
                deeper,
                chunk_size,
                chunk_overlap,
            ));
        }
    }
    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, separator, chunk_size, chunk_overlap));
    }
    chunks
}

/// Greedily merges already-fitting pieces into chunks of at most
/// `chunk_size` characters, carrying up to `chunk_overlap` trailing
/// characters into the next chunk.
fn merge_pieces(
    pieces: &[String],
    separator: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: Vec<String> = Vec::new();
    let mut total = 0usize;

    for piece in pieces {
        let piece_len = char_len(piece);
        let extra = if window.is_empty() { 0 } else { sep_len };
        if total + piece_len + extra > chunk_size && !window.is_empty() {
            chunks.push(window.join(separator));
            // Shrink the window until it fits inside the overlap budget and
            // leaves room for the incoming piece.
            while total > chunk_overlap
                || (total + piece_len + if window.is_empty() { 0 } else { sep_len } > chunk_size
                    && total > 0)
            {
                let dropped = window.remove(0);
                total -= char_len(&dropped) + if window.is_empty() { 0 } else { sep_len };
            }
        }
        let extra = if window.is_empty() { 0 } else { sep_len };
        total += piece_len + extra;
        window.push(piece.clone());
    }
    if !window.is_empty() {
        chunks.push(window.join(separator));
    }
    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::document::DocMetadata;

    fn doc(content: &str) -> Document {
        Document::new(
            content,
            DocMetadata {
                source: Some("test.txt".into()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn paragraph_split_is_lossless_modulo_separators() {
        let content = "first paragraph here\n\nsecond paragraph here\n\nthird paragraph here";
        let chunks = split_paragraphs(content);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.join("\n\n"), content);
    }

    #[test]
    fn paragraph_split_drops_empty_paragraphs() {
        let chunks = split_paragraphs("alpha\n\n   \n\nbeta");
        assert_eq!(chunks, vec!["alpha", "beta"]);
    }

    #[test]
    fn recursive_respects_size_bound() {
        let text = "word ".repeat(200);
        for chunk in split_recursive(&text, 50, 10) {
            assert!(chunk.chars().count() <= 50, "oversized chunk: {chunk:?}");
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn recursive_prefers_paragraph_boundaries() {
        let text = "short first paragraph\n\nshort second paragraph";
        let chunks = split_recursive(text, 30, 0);
        assert_eq!(
            chunks,
            vec!["short first paragraph", "short second paragraph"]
        );
    }

    #[test]
    fn recursive_covers_start_and_end() {
        let text = "the quick brown fox jumps over the lazy dog and keeps on running";
        let chunks = split_recursive(text, 20, 5);
        assert!(text.starts_with(chunks.first().unwrap().split(' ').next().unwrap()));
        assert!(text.ends_with(chunks.last().unwrap().rsplit(' ').next().unwrap()));
    }

    #[test]
    fn recursive_overlaps_consecutive_chunks() {
        let text = "aa bb cc dd ee ff gg hh";
        let chunks = split_recursive(text, 8, 4);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].rsplit(' ').next().unwrap();
            assert!(
                pair[1].contains(last_word),
                "expected overlap carry-over between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn recursive_hard_cuts_unbreakable_runs() {
        let text = "a".repeat(25);
        let chunks = split_recursive(&text, 10, 0);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        let joined: String = chunks.concat();
        assert_eq!(joined, text);
    }

    #[test]
    fn recursive_is_deterministic() {
        let text = "alpha beta gamma\n\ndelta epsilon zeta\neta theta iota kappa";
        assert_eq!(
            split_recursive(text, 24, 6),
            split_recursive(text, 24, 6)
        );
    }

    #[test]
    fn split_documents_preserves_metadata() {
        let documents = vec![doc("one paragraph\n\nanother paragraph")];
        let chunks =
            split_documents(&documents, SplitMethod::Paragraph, 0, 0).unwrap();
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert_eq!(chunk.metadata.source.as_deref(), Some("test.txt"));
        }
    }

    #[test]
    fn split_documents_rejects_bad_overlap() {
        let documents = vec![doc("anything")];
        let err = split_documents(&documents, SplitMethod::Recursive, 10, 10).unwrap_err();
        assert!(matches!(err, RagError::Chunking(_)));
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(split_recursive("", 10, 0).is_empty());
        assert!(split_paragraphs("").is_empty());
    }
}

//! Text normalization for raw extracted content.
//!
//! Extracted text (especially from HTML or PDF-derived sources) arrives with
//! soft-wrapped lines, mixed line endings, and spurious spaces between CJK
//! characters. [`normalize`] folds all of that into continuous prose while
//! keeping blank-line paragraph boundaries intact, and rejects fragments too
//! short to be content.

use std::sync::LazyLock;

use regex::Regex;

use super::document::Document;

/// Minimum number of characters a document must retain after cleaning.
pub const MIN_CONTENT_CHARS: usize = 20;

/// Placeholder protecting paragraph breaks while single newlines are removed.
const PARAGRAPH_SENTINEL: &str = "<<PARAGRAPH_BREAK>>";

/// Hiragana, Katakana, Han, and common CJK punctuation/fullwidth forms.
const CJK_CLASS: &str = r"[\p{Hiragana}\p{Katakana}\p{Han}\u{3000}-\u{303F}\u{FF00}-\u{FFEF}]";

static RE_PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph-break regex"));
static RE_SOFT_WRAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s?").expect("valid soft-wrap regex"));
static RE_CJK_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("({CJK_CLASS}) ({CJK_CLASS})")).expect("valid CJK spacing regex")
});
static RE_HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid whitespace regex"));
static RE_PARAGRAPH_EDGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\n\n ?").expect("valid paragraph-edge regex"));

/// Cleans raw text, returning `None` when the result is too short to keep.
///
/// Steps, in order:
/// 1. blank-line paragraph breaks are replaced with a sentinel,
/// 2. line-ending variants fold to `\n`,
/// 3. remaining single newlines are removed (soft-wrapped lines are treated
///    as continuous prose, deliberately so for unspaced scripts),
/// 4. sentinels are restored as `\n\n`,
/// 5. single spaces between adjacent CJK characters are deleted,
/// 6. runs of horizontal whitespace collapse to one space and the whole
///    text is trimmed.
///
/// Rejection is a content-quality skip, not an error.
pub fn normalize(raw: &str) -> Option<String> {
    let text = RE_PARAGRAPH_BREAK.replace_all(raw, PARAGRAPH_SENTINEL);
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = RE_SOFT_WRAP.replace_all(&text, "");
    let text = text.replace(PARAGRAPH_SENTINEL, "\n\n");
    let text = collapse_cjk_spaces(&text);
    let text = RE_HORIZONTAL_WS.replace_all(&text, " ");
    let text = RE_PARAGRAPH_EDGES.replace_all(&text, "\n\n");
    let text = text.trim();

    if text.chars().count() < MIN_CONTENT_CHARS {
        None
    } else {
        Some(text.to_string())
    }
}

/// Applies [`normalize`] to a document, carrying its metadata over.
pub fn normalize_document(doc: &Document) -> Option<Document> {
    normalize(&doc.content).map(|cleaned| doc.derive(cleaned))
}

/// Deletes extraction-artifact spaces between adjacent CJK characters.
///
/// A single pass cannot fix runs like `日 本 語` because matches consume the
/// trailing character, so the substitution repeats until it reaches a fixed
/// point.
fn collapse_cjk_spaces(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = RE_CJK_SPACE.replace_all(&current, "${1}${2}");
        if next == current {
            return current;
        }
        current = next.into_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::document::DocMetadata;

    #[test]
    fn rejects_short_fragments() {
        assert_eq!(normalize("too short"), None);
        assert_eq!(normalize("   \n\n  "), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn keeps_exactly_minimum_length() {
        let text = "a".repeat(MIN_CONTENT_CHARS);
        assert_eq!(normalize(&text).as_deref(), Some(text.as_str()));
        let short = "a".repeat(MIN_CONTENT_CHARS - 1);
        assert_eq!(normalize(&short), None);
    }

    #[test]
    fn strips_soft_wrapped_newlines() {
        let raw = "the quick brown\nfox jumps over\nthe lazy dog";
        assert_eq!(
            normalize(raw).as_deref(),
            Some("the quick brownfox jumps overthe lazy dog")
        );
    }

    #[test]
    fn preserves_paragraph_breaks() {
        let raw = "first paragraph of text here\n\nsecond paragraph of text here";
        let cleaned = normalize(raw).unwrap();
        assert_eq!(
            cleaned,
            "first paragraph of text here\n\nsecond paragraph of text here"
        );
    }

    #[test]
    fn folds_crlf_and_blank_line_runs() {
        let raw = "first paragraph line one\r\nline two\r\n\r\n\r\nsecond paragraph here";
        let cleaned = normalize(raw).unwrap();
        assert_eq!(
            cleaned,
            "first paragraph line oneline two\n\nsecond paragraph here"
        );
    }

    #[test]
    fn removes_spaces_between_cjk_characters() {
        let raw = "アジャイル 開 発 の プラクティス について説明します";
        let cleaned = normalize(raw).unwrap();
        assert_eq!(cleaned, "アジャイル開発のプラクティスについて説明します");
    }

    #[test]
    fn keeps_spaces_between_latin_words() {
        let raw = "pair programming is a practice worth trying";
        assert_eq!(normalize(raw).as_deref(), Some(raw));
    }

    #[test]
    fn collapses_whitespace_runs() {
        let raw = "several   words\t\tseparated by   runs of whitespace";
        assert_eq!(
            normalize(raw).as_deref(),
            Some("several words separated by runs of whitespace")
        );
    }

    #[test]
    fn normalize_document_copies_metadata() {
        let doc = Document::new(
            "content long enough to survive the cleaning threshold",
            DocMetadata {
                source: Some("notes.txt".into()),
                ..Default::default()
            },
        );
        let cleaned = normalize_document(&doc).unwrap();
        assert_eq!(cleaned.metadata, doc.metadata);
    }
}

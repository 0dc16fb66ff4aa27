//! Document loaders: local text files and web pages.
//!
//! The filesystem loader walks a directory for `*.txt` files; the web loader
//! fetches a page, drops boilerplate structure (navigation, headers,
//! scripts, sidebars), and extracts body text plus title metadata. Both
//! produce [`Document`] values for the ingestion pipeline.

use std::path::Path;
use std::sync::LazyLock;

use reqwest::Client;
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tokio::fs;
use tracing::{debug, warn};
use url::Url;
use walkdir::WalkDir;

use super::document::{DocMetadata, Document};
use crate::types::RagError;

/// Structural elements removed before text extraction.
const BOILERPLATE_SELECTORS: [&str; 8] = [
    "header", "footer", "nav", "aside", "script", "style", ".sidebar", "#sidebar",
];

/// Elements whose end produces a paragraph break in the extracted text, so
/// downstream paragraph splitting still sees document structure.
const BLOCK_ELEMENTS: [&str; 15] = [
    "p", "div", "section", "article", "li", "ul", "ol", "table", "tr", "h1", "h2", "h3", "h4",
    "h5", "h6",
];

static BOILERPLATE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    BOILERPLATE_SELECTORS
        .iter()
        .map(|css| Selector::parse(css).expect("valid boilerplate selector"))
        .collect()
});
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Loads every `.txt` file under `dir` (recursively) as one document.
///
/// Files are read as UTF-8 with an optional byte-order mark stripped;
/// `source` is the file path and `practice_name` defaults to the file stem.
/// Unreadable files are skipped with a warning rather than failing the run.
pub async fn load_text_documents(dir: &Path) -> Result<Vec<Document>, RagError> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "text input directory does not exist, skipping");
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        let is_txt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if !entry.file_type().is_file() || !is_txt {
            continue;
        }
        match fs::read_to_string(path).await {
            Ok(raw) => {
                let content = raw.strip_prefix('\u{feff}').unwrap_or(&raw).to_string();
                let practice_name = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string);
                debug!(path = %path.display(), "loaded text file");
                documents.push(Document::new(
                    content,
                    DocMetadata {
                        source: Some(path.display().to_string()),
                        title: None,
                        practice_name,
                    },
                ));
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read text file, skipping");
            }
        }
    }
    Ok(documents)
}

/// Reads a URL list file: one URL per line, `#` comments and blank lines
/// ignored, unparsable URLs skipped with a warning.
pub async fn load_url_list(path: &Path) -> Result<Vec<Url>, RagError> {
    let raw = fs::read_to_string(path).await?;
    let mut urls = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Url::parse(line) {
            Ok(url) => urls.push(url),
            Err(err) => warn!(line, error = %err, "skipping invalid URL"),
        }
    }
    Ok(urls)
}

/// Fetches web pages and extracts their body text with boilerplate removed.
#[derive(Clone, Debug)]
pub struct WebPageLoader {
    client: Client,
}

impl WebPageLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a loader with the crate's default HTTP client.
    pub fn with_defaults() -> Result<Self, RagError> {
        let client = Client::builder()
            .user_agent(concat!("apm-rag-ingestor/", env!("CARGO_PKG_VERSION")))
            .use_rustls_tls()
            .build()?;
        Ok(Self::new(client))
    }

    /// Fetches one page and turns it into a document.
    ///
    /// `source` is the URL; `title` and `practice_name` come from the page
    /// title when present.
    pub async fn load(&self, url: &Url) -> Result<Document, RagError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let (content, title) = extract_page(&body);
        if content.trim().is_empty() {
            return Err(RagError::InvalidDocument(format!(
                "no extractable text at {url}"
            )));
        }
        Ok(Document::new(
            content,
            DocMetadata {
                source: Some(url.to_string()),
                title: title.clone(),
                practice_name: title,
            },
        ))
    }
}

/// Extracts `(body_text, title)` from an HTML page, skipping boilerplate
/// subtrees and inserting paragraph breaks after block-level elements.
pub fn extract_page(html: &str) -> (String, Option<String>) {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty());

    let mut text = String::new();
    match document.select(&BODY).next() {
        Some(body) => collect_text(*body, &mut text),
        None => collect_text(document.tree.root(), &mut text),
    }
    (text, title)
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(contents) => out.push_str(contents),
        Node::Element(element) => {
            if let Some(element_ref) = ElementRef::wrap(node) {
                if BOILERPLATE.iter().any(|sel| sel.matches(&element_ref)) {
                    return;
                }
            }
            if element.name() == "br" {
                out.push('\n');
            }
            for child in node.children() {
                collect_text(child, out);
            }
            if BLOCK_ELEMENTS.contains(&element.name()) {
                out.push_str("\n\n");
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn walks_txt_files_recursively_and_strips_bom() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("daily-scrum.txt"), "\u{feff}standup notes").unwrap();
        std::fs::write(nested.join("kanban.txt"), "board content").unwrap();
        std::fs::write(dir.path().join("ignored.md"), "not a text file").unwrap();

        let mut documents = load_text_documents(dir.path()).await.unwrap();
        documents.sort_by(|a, b| a.content.cmp(&b.content));

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].content, "board content");
        assert_eq!(documents[0].metadata.practice_name.as_deref(), Some("kanban"));
        assert_eq!(documents[1].content, "standup notes");
        assert!(
            documents[1]
                .metadata
                .source
                .as_deref()
                .unwrap()
                .ends_with("daily-scrum.txt")
        );
    }

    #[tokio::test]
    async fn missing_directory_yields_no_documents() {
        let dir = tempdir().unwrap();
        let absent = dir.path().join("does-not-exist");
        assert!(load_text_documents(&absent).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn url_list_skips_comments_blanks_and_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "# comment line\n\nhttps://example.com/one\nnot a url\nhttps://example.com/two\n",
        )
        .unwrap();

        let urls = load_url_list(&path).await.unwrap();
        assert_eq!(
            urls.iter().map(Url::as_str).collect::<Vec<_>>(),
            vec!["https://example.com/one", "https://example.com/two"]
        );
    }

    #[test]
    fn extract_page_strips_boilerplate_and_captures_title() {
        let html = r#"<html>
            <head><title>Planning Poker</title></head>
            <body>
                <nav>Home | About</nav>
                <header>Site banner</header>
                <div class="sidebar">Sidebar links</div>
                <p>Planning poker is an estimation practice.</p>
                <script>console.log("noise")</script>
                <footer>Copyright</footer>
            </body>
        </html>"#;

        let (text, title) = extract_page(html);
        assert_eq!(title.as_deref(), Some("Planning Poker"));
        assert!(text.contains("Planning poker is an estimation practice."));
        assert!(!text.contains("Home | About"));
        assert!(!text.contains("Sidebar links"));
        assert!(!text.contains("console.log"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn extract_page_breaks_paragraphs_at_block_elements() {
        let html = "<html><body><p>first block</p><p>second block</p></body></html>";
        let (text, _) = extract_page(html);
        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        assert_eq!(paragraphs, vec!["first block", "second block"]);
    }
}

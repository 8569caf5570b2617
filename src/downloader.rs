/// Page download and HTML→Markdown conversion.
///
/// One page at a time: GET the markup, optionally narrow it to a CSS
/// selector's subtree(s), convert to Markdown with `htmd`.
use std::path::Path;

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::fetch::{FetchError, PageFetcher};

/// Errors from downloading or saving a page.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("output file must have the .md extension, got {0:?}")]
    InvalidExtension(String),

    #[error("markdown conversion failed: {0}")]
    Conversion(String),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetch one page and return its content as Markdown.
///
/// With a `css_selector`, only the matching elements are converted, joined
/// in document order; if the selector matches nothing the whole page is
/// used and a warning logged. Non-2xx statuses and network errors surface
/// as `DownloadError::Fetch` for the caller to handle.
pub fn fetch_markdown(
    fetcher: &dyn PageFetcher,
    url: &Url,
    css_selector: Option<&str>,
) -> Result<String, DownloadError> {
    info!("Downloading page: {url}");
    let html = fetcher.get(url)?;

    let scoped = match css_selector {
        Some(selector_str) => select_fragment(&html, selector_str, url).unwrap_or(html),
        None => html,
    };

    htmd::convert(&scoped).map_err(|e| DownloadError::Conversion(e.to_string()))
}

/// Serialize the elements matching `selector_str`, joined in document
/// order, or `None` when the selector is invalid or matches nothing.
fn select_fragment(html: &str, selector_str: &str, url: &Url) -> Option<String> {
    let selector = match Selector::parse(selector_str) {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid CSS selector '{selector_str}': {e}; converting full page");
            return None;
        }
    };

    let document = Html::parse_document(html);
    let matched: Vec<String> = document.select(&selector).map(|el| el.html()).collect();
    if matched.is_empty() {
        warn!("Selector '{selector_str}' matched nothing on {url}; converting full page");
        return None;
    }

    Some(matched.join("\n"))
}

/// Save Markdown content to `output_path`, creating parent directories as
/// needed and overwriting any existing file.
///
/// Fails with `InvalidExtension` if the path does not end in `.md`.
pub fn save_as_markdown(content: &str, output_path: &Path) -> Result<(), DownloadError> {
    let extension = output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if extension != "md" {
        return Err(DownloadError::InvalidExtension(extension.to_string()));
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, content)?;
    info!("Page content saved as Markdown to {}", output_path.display());
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fake::FakeFetcher;
    use tempfile::tempdir;

    #[test]
    fn test_fetch_markdown_converts_headings_and_paragraphs() {
        let fetcher = FakeFetcher::new().with_page(
            "https://example.com/",
            "<html><body><h1>Hello</h1><p>This is a test.</p></body></html>",
        );
        let url = Url::parse("https://example.com/").unwrap();

        let markdown = fetch_markdown(&fetcher, &url, None).unwrap();
        assert!(markdown.contains("# Hello"));
        assert!(markdown.contains("This is a test."));
    }

    #[test]
    fn test_fetch_markdown_preserves_links_and_lists() {
        let fetcher = FakeFetcher::new().with_page(
            "https://example.com/",
            r#"<body><ul><li><a href="https://example.com/a">A</a></li><li>B</li></ul></body>"#,
        );
        let url = Url::parse("https://example.com/").unwrap();

        let markdown = fetch_markdown(&fetcher, &url, None).unwrap();
        assert!(markdown.contains("[A](https://example.com/a)"));
        // htmd renders list items as "*" plus alignment spaces
        let bullet = regex::Regex::new(r"\*\s+B").unwrap();
        assert!(bullet.is_match(&markdown), "no list item for B in: {markdown:?}");
    }

    #[test]
    fn test_fetch_markdown_with_selector() {
        let fetcher = FakeFetcher::new().with_page(
            "https://example.com/",
            "<body><nav><p>menu</p></nav><main><h2>Docs</h2></main></body>",
        );
        let url = Url::parse("https://example.com/").unwrap();

        let markdown = fetch_markdown(&fetcher, &url, Some("main")).unwrap();
        assert!(markdown.contains("## Docs"));
        assert!(!markdown.contains("menu"));
    }

    #[test]
    fn test_fetch_markdown_selector_fallback() {
        let fetcher = FakeFetcher::new().with_page(
            "https://example.com/",
            "<body><p>everything</p></body>",
        );
        let url = Url::parse("https://example.com/").unwrap();

        let markdown = fetch_markdown(&fetcher, &url, Some("article.missing")).unwrap();
        assert!(markdown.contains("everything"));
    }

    #[test]
    fn test_fetch_markdown_propagates_http_error() {
        let fetcher = FakeFetcher::new(); // every URL 404s
        let url = Url::parse("https://example.com/gone").unwrap();

        let result = fetch_markdown(&fetcher, &url, None);
        assert!(matches!(
            result,
            Err(DownloadError::Fetch(FetchError::Status(404)))
        ));
    }

    #[test]
    fn test_save_as_markdown_rejects_bad_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.txt");
        let result = save_as_markdown("# Hi", &path);
        assert!(matches!(result, Err(DownloadError::InvalidExtension(_))));
    }

    #[test]
    fn test_save_as_markdown_creates_parents_and_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch").join("page.md");

        save_as_markdown("first", &path).unwrap();
        save_as_markdown("second", &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}

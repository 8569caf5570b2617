/// Directory-backed document store.
///
/// Orchestrates the managed documents directory and the external index:
/// list/add/delete source files, crawl-and-download batches, and query
/// forwarding. User-visible failures are returned as plain status strings
/// rather than raised across the tool-call boundary.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};
use url::Url;

use crate::config::CrawlerConfig;
use crate::crawler::{CrawlConfig, WebsiteCrawler, url_to_filename};
use crate::downloader::{fetch_markdown, save_as_markdown};
use crate::fetch::PageFetcher;
use crate::index::{DocumentRecord, FILE_NAME_KEY, IndexError, QueryFilter, QueryResponse, RagIndex};

/// A crawl-and-download request.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Absolute start URL.
    pub url: String,
    /// Subfolder of the documents directory this batch is saved under;
    /// also tags each resulting record's metadata.
    pub folder: String,
    /// Traversal depth; the configured default when absent.
    pub max_depth: Option<usize>,
    /// Restrict link discovery and content extraction to this subtree.
    pub css_selector: Option<String>,
}

pub struct DocumentStore {
    documents_dir: PathBuf,
    index: Arc<TokioMutex<Box<dyn RagIndex>>>,
    fetcher: Arc<dyn PageFetcher>,
    crawler_config: CrawlerConfig,
}

impl DocumentStore {
    pub fn new(
        documents_dir: impl Into<PathBuf>,
        index: Arc<TokioMutex<Box<dyn RagIndex>>>,
        fetcher: Arc<dyn PageFetcher>,
        crawler_config: CrawlerConfig,
    ) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            index,
            fetcher,
            crawler_config,
        }
    }

    /// File names of all Markdown files at the top level of the documents
    /// directory, sorted.
    pub fn list_markdown_files(&self) -> Result<Vec<String>> {
        if !self.documents_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.documents_dir)
            .with_context(|| format!("failed to read {}", self.documents_dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Copy a Markdown file into the managed directory and index it.
    ///
    /// Duplicates (by name) are a no-op reported as status text. If
    /// indexing fails, the copied file is removed again.
    pub async fn add_file(&self, src: &Path) -> String {
        let Some(file_name) = src.file_name().and_then(|n| n.to_str()).map(ToString::to_string)
        else {
            return format!("Error: not a file path: {}", src.display());
        };
        if src.extension().and_then(|e| e.to_str()) != Some("md") {
            return format!("Error: '{file_name}' is not a Markdown file.");
        }

        let dest = self.documents_dir.join(&file_name);
        if dest.exists() {
            return format!("File '{file_name}' already exists in the document store.");
        }

        let content = match std::fs::read_to_string(src) {
            Ok(c) => c,
            Err(e) => return format!("Error: failed to read {}: {e}", src.display()),
        };

        if let Err(e) = std::fs::create_dir_all(&self.documents_dir) {
            return format!("Error: failed to create documents directory: {e}");
        }
        if let Err(e) = std::fs::copy(src, &dest) {
            return format!("Error: failed to copy {}: {e}", src.display());
        }

        let record = DocumentRecord::new(content, &file_name);
        let mut index = self.index.lock().await;
        if let Err(e) = index.insert(record).and_then(|()| index.persist()) {
            // Compensating cleanup: do not keep the file, and do not keep a
            // record that was inserted but never persisted
            if let Err(del) = index.delete_where(FILE_NAME_KEY, &file_name) {
                warn!("Failed to roll back index entries for {file_name}: {del}");
            }
            if let Err(rm) = std::fs::remove_file(&dest) {
                warn!("Failed to roll back copy of {file_name}: {rm}");
            }
            return format!("Error: indexing '{file_name}' failed: {e}");
        }

        info!("Added {file_name} to the document store");
        format!("File '{file_name}' added and indexed.")
    }

    /// Delete files by name from the index and the filesystem.
    ///
    /// Per-file failures are collected, never aborting the batch. A file
    /// missing from disk is a warning, not a failure.
    pub async fn delete_files(&self, file_names: &[String]) -> String {
        let mut deleted = 0usize;
        let mut failures: Vec<String> = Vec::new();

        for name in file_names {
            let index_result = {
                let mut index = self.index.lock().await;
                index.delete_where(FILE_NAME_KEY, name)
            };
            match index_result {
                Ok(removed) => {
                    if removed == 0 {
                        warn!("No index entries for {name}");
                    }
                }
                Err(e) => {
                    failures.push(format!("{name}: index removal failed: {e}"));
                    continue;
                }
            }

            let path = self.documents_dir.join(name);
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    failures.push(format!("{name}: file removal failed: {e}"));
                    continue;
                }
            } else {
                warn!("{name} not found on disk, index entries removed anyway");
            }
            deleted += 1;
        }

        if let Err(e) = self.index.lock().await.persist() {
            failures.push(format!("index persist failed: {e}"));
        }

        let mut summary = format!("Deleted {deleted} of {} file(s).", file_names.len());
        if !failures.is_empty() {
            summary.push_str(&format!(" Failures: {}", failures.join("; ")));
        }
        summary
    }

    /// Crawl from a start URL, download every discovered page as Markdown
    /// into `documents_dir/<folder>/`, and index each page.
    pub async fn crawl_and_download(&self, request: CrawlRequest) -> String {
        let base_url = match Url::parse(&request.url) {
            Ok(u) => u,
            Err(e) => return format!("Error: invalid start URL '{}': {e}", request.url),
        };
        if request.folder.is_empty() || request.folder.contains(['/', '\\']) {
            return format!("Error: invalid folder name '{}'.", request.folder);
        }

        let crawl_config = CrawlConfig {
            base_url,
            max_depth: request.max_depth.unwrap_or(self.crawler_config.max_depth),
            css_selector: request.css_selector.clone(),
            same_domain_only: true,
        };

        // Network work is synchronous by design; keep it off the runtime.
        let fetcher = Arc::clone(&self.fetcher);
        let css_selector = request.css_selector.clone();
        let crawl_result = tokio::task::spawn_blocking(move || {
            let crawler = WebsiteCrawler::new(crawl_config, fetcher.as_ref());
            let discovered = crawler.crawl();
            info!("Crawl discovered {} page(s)", discovered.len());

            let mut pages: Vec<(String, String)> = Vec::new();
            let mut failed = 0usize;
            for url_str in &discovered {
                let Ok(url) = Url::parse(url_str) else {
                    failed += 1;
                    continue;
                };
                match fetch_markdown(fetcher.as_ref(), &url, css_selector.as_deref()) {
                    Ok(markdown) => pages.push((url_str.clone(), markdown)),
                    Err(e) => {
                        warn!("Skipping {url_str}: {e}");
                        failed += 1;
                    }
                }
            }
            (pages, failed)
        })
        .await;

        let (pages, mut failed) = match crawl_result {
            Ok(r) => r,
            Err(e) => return format!("Error: crawl task failed: {e}"),
        };

        let mut saved = 0usize;
        for (url_str, markdown) in pages {
            let file_name = format!("{}.md", url_to_filename(&url_str));
            let relative = format!("{}/{}", request.folder, file_name);
            let path = self.documents_dir.join(&request.folder).join(&file_name);

            if let Err(e) = save_as_markdown(&markdown, &path) {
                warn!("Failed to save {relative}: {e}");
                failed += 1;
                continue;
            }

            let record = DocumentRecord::new(markdown, &relative).with_folder(&request.folder);
            let mut index = self.index.lock().await;
            // Re-crawling a page replaces its records, like the file on disk
            if let Err(e) = index.delete_where(FILE_NAME_KEY, &relative) {
                warn!("Failed to drop stale index entries for {relative}: {e}");
                failed += 1;
                continue;
            }
            if let Err(e) = index.insert(record) {
                warn!("Failed to index {relative}: {e}");
                failed += 1;
                continue;
            }
            saved += 1;
        }

        if let Err(e) = self.index.lock().await.persist() {
            return format!("Error: index persist failed after crawl: {e}");
        }

        format!(
            "Crawl of '{}' complete: {saved} page(s) saved under '{}', {failed} failure(s).",
            request.url, request.folder
        )
    }

    /// Forward a question to the index, optionally restricted to the given
    /// file names (OR-combined).
    pub async fn query(
        &self,
        question: &str,
        include_files: Option<Vec<String>>,
    ) -> Result<QueryResponse, IndexError> {
        let filter = include_files.map(|file_names| QueryFilter { file_names });
        let index = self.index.lock().await;
        index.query(question, filter.as_ref())
    }

    /// Sorted names of all files known to the index.
    pub async fn get_indexed_files(&self) -> Vec<String> {
        self.index.lock().await.indexed_files()
    }

    /// Index any on-disk Markdown files the index does not know yet.
    ///
    /// Walks the documents directory recursively so crawl-batch subfolders
    /// are picked up; returns the number of newly indexed files.
    pub async fn bootstrap(&self) -> Result<usize> {
        let files = walk_markdown_files(&self.documents_dir)?;

        let mut index = self.index.lock().await;
        let known = index.indexed_files();
        let mut added = 0usize;

        for path in files {
            let relative = path
                .strip_prefix(&self.documents_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            if known.contains(&relative) {
                continue;
            }
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Skipping unreadable {}: {e}", path.display());
                    continue;
                }
            };
            index.insert(DocumentRecord::new(content, &relative))?;
            added += 1;
        }

        if added > 0 {
            index.persist()?;
            info!("Bootstrapped {added} document(s) into the index");
        }
        Ok(added)
    }
}

/// Recursively collect `.md` files under `dir`.
fn walk_markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    if !dir.is_dir() {
        return Ok(result);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            result.extend(walk_markdown_files(&path)?);
        } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
            result.push(path);
        }
    }
    Ok(result)
}

// ── Tests ────────────────────────────────────────────────────────────

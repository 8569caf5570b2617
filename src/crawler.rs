/// Same-domain web crawler: bounded breadth-first link discovery.
///
/// The crawl is iterative (explicit work queue of `(url, depth)` pairs plus
/// a visited set) rather than recursive, so pathological link graphs cannot
/// exhaust the stack. Each `crawl()` call owns its own state; nothing is
/// shared across invocations.
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::fetch::PageFetcher;

// Characters that are illegal in filenames on common filesystems.
static ILLEGAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?"<>|]"#).expect("hardcoded regex is valid"));

// Runs of whitespace, slashes, or dots collapse into a single hyphen.
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s/.]+").expect("hardcoded regex is valid"));

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("hardcoded selector is valid"));

/// Convert a URL to a human-readable, filesystem-safe filename (no extension).
///
/// Pure and deterministic: network location plus percent-decoded path, query
/// string dropped, illegal characters replaced, separator runs collapsed to
/// hyphens. Unparseable input (including the empty string) yields `"index"`.
#[must_use]
pub fn url_to_filename(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "index".to_string();
    };

    let path = parsed.path();
    let decoded = urlencoding::decode(path).map_or_else(|_| path.to_string(), |c| c.into_owned());

    // Network location + path; query parameters are not taken into account.
    let raw = format!("{}{}", netloc(&parsed), decoded);

    let replaced = ILLEGAL_CHARS.replace_all(&raw, "_");
    let collapsed = SEPARATOR_RUNS.replace_all(&replaced, "-");
    let trimmed = collapsed.trim_matches(['-', '_']);

    if trimmed.is_empty() {
        "index".to_string()
    } else {
        trimmed.to_string()
    }
}

/// The scheme-relative network location (host plus explicit port) of a URL,
/// used for same-domain comparisons.
#[must_use]
pub fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Parameters for one crawl invocation.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Absolute URL the traversal starts from.
    pub base_url: Url,

    /// Maximum number of hops away from the start page (0 = only the start
    /// page is expanded; its links are still discovered).
    pub max_depth: usize,

    /// Restrict link extraction to the subtree(s) matching this CSS
    /// selector. No match falls back to the full page with a warning.
    pub css_selector: Option<String>,

    /// Keep only links whose network location equals the start page's.
    pub same_domain_only: bool,
}

impl CrawlConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            max_depth: 2,
            css_selector: None,
            same_domain_only: true,
        }
    }
}

/// Depth-bounded breadth-first crawler over a `PageFetcher`.
pub struct WebsiteCrawler<'a> {
    config: CrawlConfig,
    fetcher: &'a dyn PageFetcher,
}

impl<'a> WebsiteCrawler<'a> {
    pub fn new(config: CrawlConfig, fetcher: &'a dyn PageFetcher) -> Self {
        Self { config, fetcher }
    }

    /// Enumerate all unique links reachable from the start URL.
    ///
    /// Returns the discovered set, sorted. A fetch failure on any single
    /// page is logged and that page contributes no links; the traversal
    /// continues with whatever was already discovered.
    pub fn crawl(&self) -> BTreeSet<String> {
        let start_netloc = netloc(&self.config.base_url);

        let mut discovered: BTreeSet<String> = BTreeSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(Url, usize)> = VecDeque::new();

        queue.push_back((self.config.base_url.clone(), 0));

        while let Some((url, depth)) = queue.pop_front() {
            // A URL enters the visited set exactly once, immediately before
            // expansion. This is what breaks cycles (A→B→A).
            if !visited.insert(url.as_str().to_string()) {
                continue;
            }
            discovered.insert(url.as_str().to_string());

            let links = self.page_links(&url, &start_netloc);
            for link in links {
                discovered.insert(link.as_str().to_string());
                if depth < self.config.max_depth && !visited.contains(link.as_str()) {
                    queue.push_back((link, depth + 1));
                }
            }
        }

        discovered
    }

    /// Extract all same-scope links from one page.
    fn page_links(&self, url: &Url, start_netloc: &str) -> Vec<Url> {
        let body = match self.fetcher.get(url) {
            Ok(body) => body,
            Err(e) => {
                warn!("Error fetching {url}: {e}");
                return Vec::new();
            }
        };

        let document = Html::parse_document(&body);
        let scope_html = self.scoped_fragment(&document, url);

        // When a selector narrowed the scope, re-parse just that fragment.
        let fragment;
        let root = match &scope_html {
            Some(html) => {
                fragment = Html::parse_fragment(html);
                &fragment
            }
            None => &document,
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut links = Vec::new();

        for anchor in root.select(&ANCHOR_SELECTOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if href.is_empty() || href.starts_with('#') {
                continue;
            }

            // Resolve relative references against the current page.
            let Ok(mut link) = url.join(href) else {
                debug!("Skipping unresolvable href {href} on {url}");
                continue;
            };
            link.set_fragment(None);

            if self.config.same_domain_only && netloc(&link) != start_netloc {
                continue;
            }

            if seen.insert(link.as_str().to_string()) {
                links.push(link);
            }
        }

        links
    }

    /// Serialize the selector-matched subtree(s), or `None` for the whole
    /// page (no selector configured, selector invalid, or nothing matched).
    fn scoped_fragment(&self, document: &Html, url: &Url) -> Option<String> {
        let selector_str = self.config.css_selector.as_deref()?;

        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(e) => {
                warn!("Invalid CSS selector '{selector_str}': {e}; using full page");
                return None;
            }
        };

        let matched: Vec<String> = document.select(&selector).map(|el| el.html()).collect();
        if matched.is_empty() {
            warn!("Selector '{selector_str}' matched nothing on {url}; using full page");
            return None;
        }

        Some(matched.join("\n"))
    }
}

// ── Tests ────────────────────────────────────────────────────────────

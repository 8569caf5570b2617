/// Keyword-overlap index: an in-process stand-in for the external vector
/// index, implementing the full `RagIndex` capability set.
///
/// Scoring is term overlap at paragraph granularity, nothing more — real
/// embedding and answer synthesis stay an external concern. Persists as a
/// single JSON file under the persist directory.
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{
    DocumentRecord, IndexError, QueryFilter, QueryResponse, RagIndex, SourceNode,
};

const PERSIST_FILE: &str = "index.json";

pub struct KeywordIndex {
    records: Vec<DocumentRecord>,
    persist_dir: Option<PathBuf>,
    top_k: usize,
}

impl KeywordIndex {
    /// Load the persisted index from `persist_dir`, or start empty if no
    /// usable state exists there yet. `top_k` bounds the source nodes
    /// returned per query.
    pub fn load_or_create(persist_dir: &Path, top_k: usize) -> Result<Self, IndexError> {
        let file = persist_dir.join(PERSIST_FILE);
        let records = if file.exists() {
            let data = std::fs::read_to_string(&file)?;
            match serde_json::from_str::<Vec<DocumentRecord>>(&data) {
                Ok(records) => {
                    info!("Loaded {} records from {}", records.len(), file.display());
                    records
                }
                Err(e) => {
                    warn!("Could not load existing index ({e}). Starting fresh.");
                    Vec::new()
                }
            }
        } else {
            info!("No persisted index at {}, starting fresh", file.display());
            Vec::new()
        };

        Ok(Self {
            records,
            persist_dir: Some(persist_dir.to_path_buf()),
            top_k,
        })
    }

    /// An index that never touches the disk (useful for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            persist_dir: None,
            top_k: 3,
        }
    }

    /// Lowercased alphanumeric terms of at least two characters.
    fn terms(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= 2)
            .map(ToString::to_string)
            .collect()
    }

    /// Best-scoring paragraph of a record for the given query terms, as a
    /// fraction of query terms present.
    fn best_paragraph(record: &DocumentRecord, query_terms: &HashSet<String>) -> (String, f32) {
        let mut best = (String::new(), 0.0_f32);
        for paragraph in record.content.split("\n\n") {
            let trimmed = paragraph.trim();
            if trimmed.is_empty() {
                continue;
            }
            let para_terms = Self::terms(trimmed);
            let overlap = query_terms.intersection(&para_terms).count();
            let score = overlap as f32 / query_terms.len().max(1) as f32;
            if score > best.1 {
                best = (trimmed.to_string(), score);
            }
        }
        best
    }
}

impl RagIndex for KeywordIndex {
    fn query(&self, text: &str, filter: Option<&QueryFilter>) -> Result<QueryResponse, IndexError> {
        let query_terms = Self::terms(text);

        let mut scored: Vec<SourceNode> = self
            .records
            .iter()
            .filter(|r| filter.is_none_or(|f| f.matches(r)))
            .filter_map(|record| {
                let (content, score) = Self::best_paragraph(record, &query_terms);
                (score > 0.0).then(|| SourceNode {
                    content,
                    metadata: record.metadata.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.top_k);

        let answer = if scored.is_empty() {
            "No relevant information found in the indexed documents.".to_string()
        } else {
            let sources: Vec<&str> = scored
                .iter()
                .filter_map(|n| n.metadata.get(super::FILE_NAME_KEY).map(String::as_str))
                .collect();
            format!(
                "{}\n\n(sources: {})",
                scored[0].content,
                sources.join(", ")
            )
        };

        Ok(QueryResponse {
            answer,
            source_nodes: scored,
        })
    }

    fn insert(&mut self, record: DocumentRecord) -> Result<(), IndexError> {
        self.records.push(record);
        Ok(())
    }

    fn delete_where(&mut self, key: &str, value: &str) -> Result<usize, IndexError> {
        let before = self.records.len();
        self.records
            .retain(|r| r.metadata.get(key).map(String::as_str) != Some(value));
        Ok(before - self.records.len())
    }

    fn indexed_files(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .records
            .iter()
            .filter_map(|r| r.file_name().map(ToString::to_string))
            .collect();
        names.into_iter().collect()
    }

    fn persist(&self) -> Result<(), IndexError> {
        let Some(dir) = &self.persist_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let data = serde_json::to_string(&self.records)?;
        std::fs::write(dir.join(PERSIST_FILE), data)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(file: &str, content: &str) -> DocumentRecord {
        DocumentRecord::new(content.to_string(), file)
    }

    #[test]
    fn test_insert_and_query() {
        let mut index = KeywordIndex::in_memory();
        index
            .insert(record("rust.md", "Rust is a systems programming language."))
            .unwrap();
        index
            .insert(record("cooking.md", "Preheat the oven to 200 degrees."))
            .unwrap();

        let response = index.query("systems programming", None).unwrap();
        assert!(!response.source_nodes.is_empty());
        assert_eq!(
            response.source_nodes[0].metadata.get(crate::index::FILE_NAME_KEY),
            Some(&"rust.md".to_string())
        );
        assert!(response.answer.contains("rust.md"));
    }

    #[test]
    fn test_query_no_match() {
        let mut index = KeywordIndex::in_memory();
        index.insert(record("a.md", "alpha beta gamma")).unwrap();

        let response = index.query("zzzz qqqq", None).unwrap();
        assert!(response.source_nodes.is_empty());
        assert!(response.answer.contains("No relevant information"));
    }

    #[test]
    fn test_query_filter_restricts_by_file_name() {
        let mut index = KeywordIndex::in_memory();
        index.insert(record("a.md", "shared keyword here")).unwrap();
        index.insert(record("b.md", "shared keyword there")).unwrap();

        let filter = QueryFilter {
            file_names: vec!["b.md".to_string()],
        };
        let response = index.query("shared keyword", Some(&filter)).unwrap();
        assert_eq!(response.source_nodes.len(), 1);
        assert_eq!(
            response.source_nodes[0].metadata.get(crate::index::FILE_NAME_KEY),
            Some(&"b.md".to_string())
        );
    }

    #[test]
    fn test_delete_where_by_file_name() {
        let mut index = KeywordIndex::in_memory();
        index.insert(record("a.md", "content a")).unwrap();
        index.insert(record("b.md", "content b")).unwrap();

        let removed = index.delete_where(crate::index::FILE_NAME_KEY, "a.md").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(index.indexed_files(), vec!["b.md".to_string()]);
    }

    #[test]
    fn test_delete_where_no_match_removes_nothing() {
        let mut index = KeywordIndex::in_memory();
        index.insert(record("a.md", "content a")).unwrap();

        let removed = index.delete_where(crate::index::FILE_NAME_KEY, "gone.md").unwrap();
        assert_eq!(removed, 0);
        assert_eq!(index.indexed_files().len(), 1);
    }

    #[test]
    fn test_indexed_files_sorted_and_deduplicated() {
        let mut index = KeywordIndex::in_memory();
        index.insert(record("b.md", "one")).unwrap();
        index.insert(record("a.md", "two")).unwrap();
        index.insert(record("a.md", "three")).unwrap();

        assert_eq!(
            index.indexed_files(),
            vec!["a.md".to_string(), "b.md".to_string()]
        );
    }

    #[test]
    fn test_persist_roundtrip() {
        let dir = tempdir().unwrap();

        let mut index = KeywordIndex::load_or_create(dir.path(), 3).unwrap();
        index.insert(record("a.md", "persisted content")).unwrap();
        index.persist().unwrap();

        let reloaded = KeywordIndex::load_or_create(dir.path(), 3).unwrap();
        assert_eq!(reloaded.indexed_files(), vec!["a.md".to_string()]);
    }

    #[test]
    fn test_crawl_folder_tag() {
        let rec = record("docs/page.md", "hello").with_folder("docs");
        assert_eq!(rec.metadata.get(crate::index::FOLDER_KEY), Some(&"docs".to_string()));
    }
}

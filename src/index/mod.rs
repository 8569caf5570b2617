/// The external index collaborator, modeled as an injected trait.
///
/// Embedding, similarity search, and answer synthesis are not this crate's
/// contribution; they live behind `RagIndex` so the document store can be
/// wired to any backend and tested against an in-memory implementation.
pub mod keyword;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata key holding a record's originating file name.
pub const FILE_NAME_KEY: &str = "file_name";

/// Metadata key tagging records created by a crawl batch.
pub const FOLDER_KEY: &str = "folder";

/// Errors that can occur during index operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("persist failed: {0}")]
    Persist(String),
}

/// A (content, metadata) pair handed to the index. Owned by the index once
/// inserted; the document store never inspects its internals afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl DocumentRecord {
    /// Build a record for `file_name`, stamped with the insertion time.
    #[must_use]
    pub fn new(content: String, file_name: &str) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(FILE_NAME_KEY.to_string(), file_name.to_string());
        metadata.insert("indexed_at".to_string(), chrono::Utc::now().to_rfc3339());
        Self { content, metadata }
    }

    #[must_use]
    pub fn with_folder(mut self, folder: &str) -> Self {
        self.metadata
            .insert(FOLDER_KEY.to_string(), folder.to_string());
        self
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.metadata.get(FILE_NAME_KEY).map(String::as_str)
    }
}

/// A retrieved chunk with its relevance score and originating metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceNode {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub score: f32,
}

/// A generated answer together with the evidence it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub source_nodes: Vec<SourceNode>,
}

/// Inclusion filter for queries: file names, OR-combined. An empty filter
/// matches everything.
#[derive(Debug, Default, Clone)]
pub struct QueryFilter {
    pub file_names: Vec<String>,
}

impl QueryFilter {
    #[must_use]
    pub fn matches(&self, record: &DocumentRecord) -> bool {
        if self.file_names.is_empty() {
            return true;
        }
        record
            .file_name()
            .is_some_and(|name| self.file_names.iter().any(|f| f == name))
    }
}

/// Capability set consumed from the external index.
///
/// All implementations must be `Send + Sync` to allow use behind
/// `Arc<Mutex<..>>`.
pub trait RagIndex: Send + Sync {
    /// Answer a question, optionally restricted to the given files.
    fn query(&self, text: &str, filter: Option<&QueryFilter>) -> Result<QueryResponse, IndexError>;

    /// Hand a new record to the index.
    fn insert(&mut self, record: DocumentRecord) -> Result<(), IndexError>;

    /// Remove every record whose metadata `key` equals `value`; returns the
    /// number of records removed.
    fn delete_where(&mut self, key: &str, value: &str) -> Result<usize, IndexError>;

    /// Sorted, deduplicated file names of all indexed records.
    fn indexed_files(&self) -> Vec<String>;

    /// Flush the index to its persisted on-disk representation.
    fn persist(&self) -> Result<(), IndexError>;
}

/// MCP Tool handlers for mdrag.
///
/// Implements 6 tools over the document store:
/// 1. query              – RAG answer + source nodes
/// 2. list_files         – Markdown files in the documents directory
/// 3. add_file           – copy a file into the store and index it
/// 4. delete_files       – batch delete by file name
/// 5. crawl_and_download – crawl a site and save pages as Markdown
/// 6. get_indexed_files  – file names known to the index
use crate::mcp::server::McpContext;
use crate::store::CrawlRequest;
use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{ErrorData as McpError, handler::server::tool::ToolRouter, model::*, tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::Path;

// ── Parameter structs ────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct QueryParams {
    /// Question to ask about the Markdown documents (natural language)
    question: String,
    /// Restrict retrieval to these file names (OR-combined)
    include_files: Option<Vec<String>>,
}

#[derive(Deserialize, JsonSchema)]
struct AddFileParams {
    /// Path of the Markdown file to add to the document store
    filepath: String,
}

#[derive(Deserialize, JsonSchema)]
struct DeleteFilesParams {
    /// File names to delete from the store and the index
    file_names: Vec<String>,
}

#[derive(Deserialize, JsonSchema)]
struct CrawlParams {
    /// Absolute start URL (e.g. 'https://docs.example.com/')
    url: String,
    /// Subfolder of the documents directory to save the batch under
    folder: String,
    /// Max traversal depth (configured default if omitted)
    max_depth: Option<usize>,
    /// CSS selector restricting link discovery and content extraction
    css_selector: Option<String>,
}

// ── Response helpers ─────────────────────────────────────────────────

fn json_result(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_default(),
    )]))
}

fn error_result(msg: &str) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.to_string())]))
}

// ── Tool implementations ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppTools {
    pub ctx: McpContext,
    pub tool_router: ToolRouter<Self>,
}

impl ServerHandler for AppTools {}

#[tool_router]
impl AppTools {
    pub fn new(ctx: McpContext) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    // ── Tool 1: query ───────────────────────────────────────────────

    #[tool(
        description = "Answer a question with Retrieval-Augmented Generation over the local Markdown documents. Optionally restrict retrieval to specific files."
    )]
    async fn query(&self, params: Parameters<QueryParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        if p.question.is_empty() {
            return error_result("question is required");
        }

        let response = self
            .ctx
            .store
            .query(&p.question, p.include_files)
            .await
            .map_err(|e| McpError::internal_error(format!("query failed: {e}"), None))?;

        let nodes_json: Vec<serde_json::Value> = response
            .source_nodes
            .iter()
            .map(|n| {
                serde_json::json!({
                    "content": n.content,
                    "metadata": n.metadata,
                    "score": n.score,
                })
            })
            .collect();

        json_result(serde_json::json!({
            "answer": response.answer,
            "source_nodes": nodes_json,
        }))
    }

    // ── Tool 2: list_files ──────────────────────────────────────────

    #[tool(description = "List the Markdown files available in the document store")]
    async fn list_files(&self) -> Result<CallToolResult, McpError> {
        let files = self
            .ctx
            .store
            .list_markdown_files()
            .map_err(|e| McpError::internal_error(format!("list failed: {e}"), None))?;

        json_result(serde_json::json!({ "files": files }))
    }

    // ── Tool 3: add_file ────────────────────────────────────────────

    #[tool(description = "Copy a Markdown file into the document store and index it")]
    async fn add_file(
        &self,
        params: Parameters<AddFileParams>,
    ) -> Result<CallToolResult, McpError> {
        let filepath = &params.0.filepath;
        if filepath.is_empty() {
            return error_result("filepath is required");
        }

        let status = self.ctx.store.add_file(Path::new(filepath)).await;
        json_result(serde_json::json!({ "status": status }))
    }

    // ── Tool 4: delete_files ────────────────────────────────────────

    #[tool(
        description = "Delete files from the document store and the index by name. Per-file failures are reported in the summary without aborting the batch."
    )]
    async fn delete_files(
        &self,
        params: Parameters<DeleteFilesParams>,
    ) -> Result<CallToolResult, McpError> {
        let file_names = params.0.file_names;
        if file_names.is_empty() {
            return error_result("file_names is required");
        }

        let status = self.ctx.store.delete_files(&file_names).await;
        json_result(serde_json::json!({ "status": status }))
    }

    // ── Tool 5: crawl_and_download ──────────────────────────────────

    #[tool(
        description = "Crawl a website (same domain, depth-bounded), convert each discovered page to Markdown, save the batch under a named subfolder, and index everything."
    )]
    async fn crawl_and_download(
        &self,
        params: Parameters<CrawlParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        if p.url.is_empty() || p.folder.is_empty() {
            return error_result("url and folder are required");
        }

        let status = self
            .ctx
            .store
            .crawl_and_download(CrawlRequest {
                url: p.url,
                folder: p.folder,
                max_depth: p.max_depth,
                css_selector: p.css_selector,
            })
            .await;
        json_result(serde_json::json!({ "status": status }))
    }

    // ── Tool 6: get_indexed_files ───────────────────────────────────

    #[tool(description = "List the names of all files that have been indexed in the RAG knowledge base")]
    async fn get_indexed_files(&self) -> Result<CallToolResult, McpError> {
        let files = self.ctx.store.get_indexed_files().await;
        json_result(serde_json::json!({ "files": files }))
    }
}

//! # mdrag — Local Markdown RAG MCP Server
//!
//! Retrieval-Augmented Generation over a local folder of Markdown
//! documents, exposed as an MCP tool-calling server (stdio transport) and
//! a minimal chat web UI. Vector search, embeddings, and answer synthesis
//! are delegated to an external index collaborator behind the [`index`]
//! trait; this crate owns configuration, the same-domain crawler, the
//! HTML→Markdown downloader, and the document-store bookkeeping.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and defaults
//! - **[`fetch`]** — Injectable HTTP page fetcher (reqwest behind a trait)
//! - **[`crawler`]** — Depth-bounded same-domain link discovery + URL→filename
//! - **[`downloader`]** — Page download, CSS scoping, HTML→Markdown, save
//! - **[`index`]** — External index capability set (`query`/`insert`/`delete_where`/`persist`)
//! - **[`store`]** — Directory-backed document store orchestration
//! - **[`mcp`]** — MCP server with 6 tool handlers (stdio transport via rmcp)
//! - **[`web`]** — Chat UI: embedded page + JSON API (axum)

pub mod config;
pub mod crawler;
pub mod downloader;
pub mod fetch;
pub mod index;
pub mod mcp;
pub mod store;
pub mod web;

/// Chat web UI: a single embedded page plus a small JSON API over the
/// document store. The heavy lifting (retrieval, answer text) stays in the
/// index collaborator; this module is wiring only.
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::store::DocumentStore;

#[derive(Clone)]
struct WebState {
    store: Arc<DocumentStore>,
}

#[derive(Deserialize)]
struct QueryBody {
    question: String,
    include_files: Option<Vec<String>>,
}

/// Build the router: `GET /` (chat page), `GET /api/files`,
/// `POST /api/query`.
pub fn router(store: Arc<DocumentStore>) -> Router {
    Router::new()
        .route("/", get(chat_page))
        .route("/api/files", get(api_files))
        .route("/api/query", post(api_query))
        .with_state(WebState { store })
}

/// Serve the chat UI until the process is stopped.
pub async fn serve(store: Arc<DocumentStore>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("Chat UI listening on http://{bind}");
    axum::serve(listener, router(store))
        .await
        .context("web server error")?;
    Ok(())
}

async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn api_files(State(state): State<WebState>) -> Json<serde_json::Value> {
    match state.store.list_markdown_files() {
        Ok(files) => Json(serde_json::json!({ "files": files })),
        Err(e) => Json(serde_json::json!({ "files": [], "error": e.to_string() })),
    }
}

async fn api_query(
    State(state): State<WebState>,
    Json(body): Json<QueryBody>,
) -> Json<serde_json::Value> {
    if body.question.is_empty() {
        return Json(serde_json::json!({ "error": "question is required" }));
    }
    match state.store.query(&body.question, body.include_files).await {
        Ok(response) => Json(serde_json::json!({
            "answer": response.answer,
            "source_nodes": response.source_nodes,
        })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

const CHAT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>mdrag — RAG Pipeline Explorer</title>
<style>
  body { font-family: sans-serif; max-width: 800px; margin: 2rem auto; padding: 0 1rem; }
  #chat { border: 1px solid #ccc; border-radius: 6px; padding: 1rem; min-height: 240px; }
  .user { color: #234; font-weight: bold; margin-top: .8rem; }
  .bot { white-space: pre-wrap; margin-top: .3rem; }
  .nodes { font-size: .85em; color: #666; white-space: pre-wrap; margin-top: .3rem; }
  #question { width: 75%; padding: .4rem; }
  button { padding: .4rem 1rem; }
  #files { font-size: .9em; color: #444; }
</style>
</head>
<body>
<h1>RAG Pipeline Explorer</h1>
<p id="files">Loading available documents…</p>
<div id="chat"></div>
<p>
  <input id="question" placeholder="Ask a question about your documents">
  <button onclick="ask()">Send</button>
</p>
<script>
async function loadFiles() {
  const res = await fetch('/api/files');
  const data = await res.json();
  document.getElementById('files').textContent =
    'Documents: ' + (data.files.length ? data.files.join(', ') : '(none)');
}
async function ask() {
  const input = document.getElementById('question');
  const question = input.value.trim();
  if (!question) return;
  input.value = '';
  const chat = document.getElementById('chat');
  chat.insertAdjacentHTML('beforeend', '<div class="user"></div>');
  chat.lastChild.textContent = question;
  const res = await fetch('/api/query', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ question })
  });
  const data = await res.json();
  chat.insertAdjacentHTML('beforeend', '<div class="bot"></div>');
  chat.lastChild.textContent = data.answer || data.error;
  if (data.source_nodes && data.source_nodes.length) {
    const summary = data.source_nodes
      .map(n => `${n.metadata.file_name} (score ${n.score.toFixed(2)})`)
      .join('\n');
    chat.insertAdjacentHTML('beforeend', '<div class="nodes"></div>');
    chat.lastChild.textContent = 'Retrieved:\n' + summary;
  }
}
loadFiles();
</script>
</body>
</html>
"#;

// ── Tests ────────────────────────────────────────────────────────────

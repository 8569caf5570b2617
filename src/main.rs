use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex as TokioMutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mdrag::config::Config;
use mdrag::fetch::HttpFetcher;
use mdrag::index::RagIndex;
use mdrag::index::keyword::KeywordIndex;
use mdrag::mcp::server::{McpContext, McpServer};
use mdrag::store::DocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the stdio MCP transport; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting mdrag...");

    // 1. Load config
    let config = Arc::new(Config::load("")?);
    config.validate().context("invalid configuration")?;

    // 2. Load or create the index
    let index = KeywordIndex::load_or_create(Path::new(&config.persist_dir), config.top_k)
        .context("Failed to open index")?;
    let index: Arc<TokioMutex<Box<dyn RagIndex>>> = Arc::new(TokioMutex::new(Box::new(index)));

    // 3. Document store over the managed directory
    // (blocking reqwest client; keep construction off the async runtime)
    let crawler_config = config.crawler.clone();
    let fetcher = tokio::task::spawn_blocking(move || {
        HttpFetcher::new(crawler_config.timeout_secs, &crawler_config.user_agent)
    })
    .await??;
    let fetcher = Arc::new(fetcher);
    let store = Arc::new(DocumentStore::new(
        config.documents_dir.as_str(),
        index,
        fetcher,
        config.crawler.clone(),
    ));

    // 4. Pick up any documents added while the server was down
    let added = store.bootstrap().await?;
    if added > 0 {
        info!("Indexed {added} new document(s) at startup");
    }

    // 5. `mdrag web` serves the chat UI; default is the stdio MCP server
    if std::env::args().nth(1).as_deref() == Some("web") {
        mdrag::web::serve(store, &config.web_bind).await
    } else {
        let server = McpServer::new(McpContext {
            store,
            config: config.clone(),
        });
        server.start().await
    }
}

use anyhow::Result;
use tower_lsp::{LspService, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grammafixer::config::Config;
use grammafixer::server::{AppContext, GrammaFixerServer};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries LSP traffic, so logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting GrammaFixer Language Server...");

    let config = Config::load_from_default();
    let context = AppContext::from_config(config).await;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(move |client| GrammaFixerServer::new(client, context));
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

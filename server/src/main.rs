use std::sync::Arc;

use tokio::net::TcpListener;
use todo_core::{JsonFileStore, RecordStore, TodoService};
use todo_server::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = JsonFileStore::new(&config.data_file);
    store.initialize()?;
    let service = Arc::new(TodoService::new(store));

    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        data_file = %service.store().location().display(),
        "listening"
    );
    todo_server::run(listener, service).await?;
    Ok(())
}

mod config;
mod db;
mod frame;
mod game;
mod protocol;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use crate::config::GameConfig;
use crate::services::dictionaries::DictionaryLibrary;
use crate::services::persistence::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = GameConfig::from_env();

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool(url, &config).await.expect("database init failed");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, scores and match history are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    if let Err(e) = store.seed_defaults().await {
        tracing::warn!(error = %e, "default AI names not seeded");
    }

    let dictionaries = DictionaryLibrary::load(config.dictionary_dir.clone())
        .await
        .expect("dictionary library failed to load");

    let port = config.port;
    let state = state::AppState::new(config, store, Arc::new(dictionaries));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "wordgame listening");
    axum::serve(listener, app).await.expect("server failed");
}

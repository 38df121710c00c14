mod config;
mod db;
mod error;
mod models;
mod routes;
mod state;
mod utils {
    pub mod jwt;
    pub mod password;
    pub mod sweep;
}

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Extension};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};

use crate::config::Config;
use crate::error::AppErr;
use crate::state::{ChatRoomStore, PlaybackStore};
use crate::utils::sweep;

const BODY_LIMIT: usize = 2 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), AppErr> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    let cfg = Arc::new(Config::from_env());
    let pool = SqlitePool::connect(&cfg.database_url).await?;
    db::init(&pool, &cfg).await?;

    let chat = ChatRoomStore::default();
    let playback = PlaybackStore::default();
    if let Some(ttl) = cfg.room_ttl_secs {
        tokio::spawn(sweep::task(chat.clone(), playback.clone(), ttl));
    }

    let app = routes::router()
        .layer(Extension(pool))
        .layer(Extension(cfg.clone()))
        .layer(Extension(chat))
        .layer(Extension(playback))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

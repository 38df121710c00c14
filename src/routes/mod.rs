use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub mod auth;
pub mod episodes;
pub mod room;
pub mod series;
pub mod share;
pub mod vod;

pub fn router() -> Router {
    Router::new()
        .route("/", get(health))
        .merge(auth::router())
        .merge(series::router())
        .merge(episodes::router())
        .merge(share::router())
        .merge(room::router())
        .merge(vod::router())
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "message": "self-cinema api is running"}))
}

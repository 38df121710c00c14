use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::{AppErr, AppResult},
    models::{EpisodeIn, EpisodeOut, EpisodeRow},
    routes::series::fetch_series,
    utils::jwt,
};

pub fn router() -> Router {
    Router::new()
        .route("/series/:id/episodes", get(list_episodes))
        .route("/episodes", post(create_episode))
        .route(
            "/episodes/:id",
            get(get_episode).put(update_episode).delete(delete_episode),
        )
}

async fn list_episodes(
    Path(series_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
) -> AppResult<Json<Vec<EpisodeOut>>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    let rows: Vec<EpisodeRow> =
        sqlx::query_as("SELECT * FROM episodes WHERE series_id = ? ORDER BY episode")
            .bind(&series_id)
            .fetch_all(&pool)
            .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn get_episode(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
) -> AppResult<Json<EpisodeOut>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    let row = fetch_episode(&pool, &id).await?;
    Ok(Json(row.into()))
}

async fn create_episode(
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
    Json(p): Json<EpisodeIn>,
) -> AppResult<Json<EpisodeOut>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    fetch_series(&pool, &p.series_id).await?;

    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO episodes (id, series_id, episode, title, description, video_url, \
         duration, cover_image, is_vip, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&p.series_id)
    .bind(p.episode)
    .bind(&p.title)
    .bind(&p.description)
    .bind(&p.video_url)
    .bind(&p.duration)
    .bind(&p.cover_image)
    .bind(p.is_vip)
    .bind(Utc::now())
    .execute(&pool)
    .await?;

    let row = fetch_episode(&pool, &id).await?;
    Ok(Json(row.into()))
}

async fn update_episode(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
    Json(p): Json<EpisodeIn>,
) -> AppResult<Json<EpisodeOut>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    fetch_episode(&pool, &id).await?;
    sqlx::query(
        "UPDATE episodes SET series_id = ?, episode = ?, title = ?, description = ?, \
         video_url = ?, duration = ?, cover_image = ?, is_vip = ? WHERE id = ?",
    )
    .bind(&p.series_id)
    .bind(p.episode)
    .bind(&p.title)
    .bind(&p.description)
    .bind(&p.video_url)
    .bind(&p.duration)
    .bind(&p.cover_image)
    .bind(p.is_vip)
    .bind(&id)
    .execute(&pool)
    .await?;

    let row = fetch_episode(&pool, &id).await?;
    Ok(Json(row.into()))
}

async fn delete_episode(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
) -> AppResult<Json<Value>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    fetch_episode(&pool, &id).await?;
    sqlx::query("DELETE FROM episodes WHERE id = ?")
        .bind(&id)
        .execute(&pool)
        .await?;
    Ok(Json(json!({"message": "episode deleted"})))
}

async fn fetch_episode(pool: &SqlitePool, id: &str) -> AppResult<EpisodeRow> {
    sqlx::query_as("SELECT * FROM episodes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppErr::NotFound("episode not found".into()))
}

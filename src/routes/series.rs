use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::{AppErr, AppResult},
    models::{json_text, SeriesIn, SeriesOut, SeriesRow},
    utils::jwt,
};

pub fn router() -> Router {
    Router::new()
        .route("/series", get(list_series).post(create_series))
        .route(
            "/series/:id",
            get(get_series).put(update_series).delete(delete_series),
        )
}

async fn list_series(
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
) -> AppResult<Json<Vec<SeriesOut>>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    let rows: Vec<SeriesRow> = sqlx::query_as("SELECT * FROM series")
        .fetch_all(&pool)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn get_series(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
) -> AppResult<Json<SeriesOut>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    let row = fetch_series(&pool, &id).await?;
    Ok(Json(row.into()))
}

async fn create_series(
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
    Json(p): Json<SeriesIn>,
) -> AppResult<Json<SeriesOut>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO series (id, title, english_title, description, cover_image, \
         backdrop_image, total_episodes, release_year, genre, rating, views, status, \
         director, actors, region, language, update_time, tags, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&p.title)
    .bind(&p.english_title)
    .bind(&p.description)
    .bind(&p.cover_image)
    .bind(&p.backdrop_image)
    .bind(p.total_episodes)
    .bind(p.release_year)
    .bind(json_text(&p.genre))
    .bind((p.rating * 10.0) as i64)
    .bind(&p.views)
    .bind(&p.status)
    .bind(&p.director)
    .bind(json_text(&p.actors))
    .bind(&p.region)
    .bind(&p.language)
    .bind(&p.update_time)
    .bind(json_text(&p.tags))
    .bind(Utc::now())
    .execute(&pool)
    .await?;

    let row = fetch_series(&pool, &id).await?;
    Ok(Json(row.into()))
}

async fn update_series(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
    Json(p): Json<SeriesIn>,
) -> AppResult<Json<SeriesOut>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    fetch_series(&pool, &id).await?;
    sqlx::query(
        "UPDATE series SET title = ?, english_title = ?, description = ?, cover_image = ?, \
         backdrop_image = ?, total_episodes = ?, release_year = ?, genre = ?, rating = ?, \
         views = ?, status = ?, director = ?, actors = ?, region = ?, language = ?, \
         update_time = ?, tags = ? WHERE id = ?",
    )
    .bind(&p.title)
    .bind(&p.english_title)
    .bind(&p.description)
    .bind(&p.cover_image)
    .bind(&p.backdrop_image)
    .bind(p.total_episodes)
    .bind(p.release_year)
    .bind(json_text(&p.genre))
    .bind((p.rating * 10.0) as i64)
    .bind(&p.views)
    .bind(&p.status)
    .bind(&p.director)
    .bind(json_text(&p.actors))
    .bind(&p.region)
    .bind(&p.language)
    .bind(&p.update_time)
    .bind(json_text(&p.tags))
    .bind(&id)
    .execute(&pool)
    .await?;

    let row = fetch_series(&pool, &id).await?;
    Ok(Json(row.into()))
}

/// Deleting a series takes its episodes and share links with it.
async fn delete_series(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
) -> AppResult<Json<Value>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    fetch_series(&pool, &id).await?;
    sqlx::query("DELETE FROM episodes WHERE series_id = ?")
        .bind(&id)
        .execute(&pool)
        .await?;
    sqlx::query("DELETE FROM share_links WHERE series_id = ?")
        .bind(&id)
        .execute(&pool)
        .await?;
    sqlx::query("DELETE FROM series WHERE id = ?")
        .bind(&id)
        .execute(&pool)
        .await?;
    Ok(Json(json!({"message": "series deleted"})))
}

pub(crate) async fn fetch_series(pool: &SqlitePool, id: &str) -> AppResult<SeriesRow> {
    sqlx::query_as("SELECT * FROM series WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppErr::NotFound("series not found".into()))
}

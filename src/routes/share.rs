use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::{AppErr, AppResult},
    models::{EpisodeOut, EpisodeRow, SeriesOut},
    routes::series::fetch_series,
    utils::jwt,
};

#[derive(Serialize)]
struct ShareOut {
    #[serde(rename = "shareUrl")]
    share_url: String,
    hash: String,
    #[serde(rename = "expiresAt")]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct WatchOut {
    series: SeriesOut,
    episodes: Vec<EpisodeOut>,
}

pub fn router() -> Router {
    Router::new()
        .route("/series/:id/share", post(create_share))
        .route("/watch/:hash", get(watch_data))
}

async fn create_share(
    Path(series_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
) -> AppResult<Json<ShareOut>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    fetch_series(&pool, &series_id).await?;

    let hash = nanoid::nanoid!(16);
    sqlx::query("INSERT INTO share_links (hash, series_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&hash)
        .bind(&series_id)
        .bind(Option::<DateTime<Utc>>::None) // links never expire for now
        .bind(Utc::now())
        .execute(&pool)
        .await?;

    let base = base_url(&headers);
    Ok(Json(ShareOut {
        share_url: format!("{base}/watch/{hash}"),
        hash,
        expires_at: None,
    }))
}

/// Public entry point behind a share link: the series plus its episodes.
async fn watch_data(
    Path(hash): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> AppResult<Json<WatchOut>> {
    let link: Option<(String, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT series_id, expires_at FROM share_links WHERE hash = ?")
            .bind(&hash)
            .fetch_optional(&pool)
            .await?;
    let Some((series_id, expires_at)) = link else {
        return Err(AppErr::NotFound("share link not found".into()));
    };
    if let Some(t) = expires_at {
        if t < Utc::now() {
            return Err(AppErr::Gone("share link expired".into()));
        }
    }

    let series = fetch_series(&pool, &series_id).await?;
    let episodes: Vec<EpisodeRow> =
        sqlx::query_as("SELECT * FROM episodes WHERE series_id = ? ORDER BY episode")
            .bind(&series_id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(WatchOut {
        series: series.into(),
        episodes: episodes.into_iter().map(Into::into).collect(),
    }))
}

/// Share URLs point back at whatever front door the admin came through:
/// Referer first, then Origin, then Host + X-Forwarded-Proto.
fn base_url(headers: &HeaderMap) -> String {
    if let Some(origin) = header_str(headers, header::REFERER.as_str()).and_then(origin_of) {
        return origin;
    }
    if let Some(origin) = header_str(headers, header::ORIGIN.as_str()) {
        return origin.trim_end_matches('/').to_owned();
    }
    let host = header_str(headers, header::HOST.as_str()).unwrap_or("localhost:3000");
    let scheme = match header_str(headers, "x-forwarded-proto") {
        Some("https") => "https",
        _ => "http",
    };
    format!("{scheme}://{host}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn origin_of(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let authority = url[scheme_end + 3..].split('/').next()?;
    if authority.is_empty() {
        return None;
    }
    Some(format!("{}://{authority}", &url[..scheme_end]))
}

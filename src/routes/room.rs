//! Polling endpoints for a watch-together room (keyed by share hash):
//! chat relay on one side, the host's playback pointer on the other.

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    error::{bad, AppErr, AppResult},
    state::{ChatMessage, ChatRoomStore, PlaybackState, PlaybackStore},
};

pub fn router() -> Router {
    Router::new()
        .route("/watch/:hash/chat", get(poll_chat).post(post_chat))
        .route("/watch/:hash/sync", get(poll_sync).post(post_sync))
}

/* ------------ chat ------------ */

#[derive(Deserialize)]
struct ChatPost {
    id: Option<String>,
    user: Option<String>,
    content: String,
    timestamp: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct ChatQuery {
    since: Option<String>,
}

async fn post_chat(
    Path(hash): Path<String>,
    Extension(chat): Extension<ChatRoomStore>,
    Json(p): Json<ChatPost>,
) -> AppResult<Json<ChatMessage>> {
    if p.content.trim().is_empty() {
        return Err(bad("content must not be empty"));
    }
    let timestamp = match p.timestamp.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };
    let msg = ChatMessage {
        id: p.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        user: p.user.unwrap_or_else(|| "anonymous".into()),
        content: p.content,
        timestamp,
        kind: p.kind.unwrap_or_else(|| "chat".into()),
    };
    Ok(Json(chat.add_message(&hash, msg)))
}

async fn poll_chat(
    Path(hash): Path<String>,
    Query(q): Query<ChatQuery>,
    Extension(chat): Extension<ChatRoomStore>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let since = q.since.as_deref().map(parse_instant).transpose()?;
    Ok(Json(chat.get_messages(&hash, since)))
}

/* ------------ playback sync ------------ */

#[derive(Deserialize)]
struct SyncPost {
    url: String,
}

#[derive(Deserialize)]
struct SyncQuery {
    version: Option<String>,
    current_url: Option<String>,
}

#[derive(Serialize)]
struct SyncOut {
    url: String,
    #[serde(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
    version: u64,
    #[serde(rename = "isSameSource")]
    is_same_source: bool,
    #[serde(rename = "isSameEpisode")]
    is_same_episode: bool,
}

async fn post_sync(
    Path(hash): Path<String>,
    Extension(playback): Extension<PlaybackStore>,
    Json(p): Json<SyncPost>,
) -> AppResult<Json<PlaybackState>> {
    if p.url.trim().is_empty() {
        return Err(bad("url must not be empty"));
    }
    Ok(Json(playback.update(&hash, &p.url)))
}

/// Latest pointer is returned immediately; `version` is advisory and the
/// server never blocks on it. Clients diff the returned version themselves.
async fn poll_sync(
    Path(hash): Path<String>,
    Query(q): Query<SyncQuery>,
    Extension(playback): Extension<PlaybackStore>,
    Extension(pool): Extension<SqlitePool>,
) -> AppResult<Json<SyncOut>> {
    if let Some(raw) = q.version.as_deref() {
        parse_version(raw)?;
    }
    let Some(state) = playback.get(&hash) else {
        return Err(AppErr::NotFound("no playback state for this room".into()));
    };
    let (is_same_source, is_same_episode) =
        compare_with_catalog(&pool, &state.url, q.current_url.as_deref()).await?;
    Ok(Json(SyncOut {
        url: state.url,
        updated_at: state.updated_at,
        version: state.version,
        is_same_source,
        is_same_episode,
    }))
}

/// Reconcile the viewer's url against the host's. Identical urls (or no
/// viewer url at all) short-circuit without touching the catalog; otherwise
/// both urls must resolve to the same series and episode number to still
/// count as the same episode, e.g. mirrored links for one episode.
async fn compare_with_catalog(
    pool: &SqlitePool,
    host_url: &str,
    viewer_url: Option<&str>,
) -> AppResult<(bool, bool)> {
    match viewer_url {
        None => Ok((true, true)),
        Some(viewer) if viewer == host_url => Ok((true, true)),
        Some(viewer) => {
            let host_ep = find_episode(pool, host_url).await?;
            let viewer_ep = find_episode(pool, viewer).await?;
            Ok((false, same_episode(host_ep, viewer_ep)))
        }
    }
}

fn same_episode(a: Option<(String, i64)>, b: Option<(String, i64)>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

async fn find_episode(pool: &SqlitePool, url: &str) -> AppResult<Option<(String, i64)>> {
    Ok(
        sqlx::query_as("SELECT series_id, episode FROM episodes WHERE video_url = ?")
            .bind(url)
            .fetch_optional(pool)
            .await?,
    )
}

/* ------------ parsing ------------ */

fn parse_instant(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    // zone-less ISO timestamps are taken as UTC
    raw.parse::<chrono::NaiveDateTime>()
        .map(|t| t.and_utc())
        .map_err(|_| bad(format!("invalid timestamp: {raw}")))
}

fn parse_version(raw: &str) -> AppResult<u64> {
    raw.parse().map_err(|_| bad(format!("invalid version: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn catalog_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::create_tables(&pool).await.unwrap();
        pool
    }

    async fn add_episode(pool: &SqlitePool, series: &str, number: i64, url: &str) {
        sqlx::query(
            "INSERT INTO episodes (id, series_id, episode, title, video_url, is_vip, created_at) \
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(series)
        .bind(number)
        .bind(format!("EP{number}"))
        .bind(url)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn identical_urls_match_without_catalog() {
        let pool = catalog_pool().await; // deliberately empty
        let flags = compare_with_catalog(&pool, "http://x/1.mp4", Some("http://x/1.mp4"))
            .await
            .unwrap();
        assert_eq!(flags, (true, true));
    }

    #[tokio::test]
    async fn missing_viewer_url_assumes_no_discrepancy() {
        let pool = catalog_pool().await;
        let flags = compare_with_catalog(&pool, "http://x/1.mp4", None)
            .await
            .unwrap();
        assert_eq!(flags, (true, true));
    }

    #[tokio::test]
    async fn mirrored_links_count_as_same_episode() {
        let pool = catalog_pool().await;
        add_episode(&pool, "s1", 3, "http://cdn-a/3.mp4").await;
        add_episode(&pool, "s1", 3, "http://cdn-b/3.mp4").await;
        let flags = compare_with_catalog(&pool, "http://cdn-a/3.mp4", Some("http://cdn-b/3.mp4"))
            .await
            .unwrap();
        assert_eq!(flags, (false, true));
    }

    #[tokio::test]
    async fn different_episode_or_unresolved_is_a_mismatch() {
        let pool = catalog_pool().await;
        add_episode(&pool, "s1", 3, "http://cdn-a/3.mp4").await;
        add_episode(&pool, "s1", 4, "http://cdn-a/4.mp4").await;
        let flags = compare_with_catalog(&pool, "http://cdn-a/3.mp4", Some("http://cdn-a/4.mp4"))
            .await
            .unwrap();
        assert_eq!(flags, (false, false));

        let flags = compare_with_catalog(&pool, "http://cdn-a/3.mp4", Some("http://elsewhere/x"))
            .await
            .unwrap();
        assert_eq!(flags, (false, false));
    }

    #[tokio::test]
    async fn same_number_in_another_series_is_not_the_same_episode() {
        let pool = catalog_pool().await;
        add_episode(&pool, "s1", 3, "http://cdn-a/3.mp4").await;
        add_episode(&pool, "s2", 3, "http://cdn-c/3.mp4").await;
        let flags = compare_with_catalog(&pool, "http://cdn-a/3.mp4", Some("http://cdn-c/3.mp4"))
            .await
            .unwrap();
        assert_eq!(flags, (false, false));
    }

    #[test]
    fn instants_parse_rfc3339_and_naive() {
        assert!(parse_instant("2026-08-06T12:00:00Z").is_ok());
        assert!(parse_instant("2026-08-06T12:00:00.123+08:00").is_ok());
        assert!(parse_instant("2026-08-06T12:00:00.123").is_ok());
        assert!(parse_instant("yesterday").is_err());
        assert!(parse_instant("").is_err());
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let t = parse_instant("2026-08-06T12:00:00+08:00").unwrap();
        assert_eq!(t, parse_instant("2026-08-06T04:00:00Z").unwrap());
    }

    #[test]
    fn version_must_be_an_integer() {
        assert_eq!(parse_version("42").unwrap(), 42);
        assert!(parse_version("v2").is_err());
        assert!(parse_version("1.5").is_err());
        assert!(parse_version("-1").is_err());
    }
}

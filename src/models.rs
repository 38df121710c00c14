use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/* ------------ series ------------ */

/// Row shape of the `series` table. `genre`/`actors`/`tags` are JSON text
/// columns; `rating` is stored as an integer 0-100 and exposed as a float.
#[derive(FromRow)]
pub struct SeriesRow {
    pub id: String,
    pub title: String,
    pub english_title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub backdrop_image: Option<String>,
    pub total_episodes: i64,
    pub release_year: Option<i64>,
    pub genre: Option<String>,
    pub rating: i64,
    pub views: Option<String>,
    pub status: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub region: Option<String>,
    pub language: Option<String>,
    pub update_time: Option<String>,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SeriesOut {
    pub id: String,
    pub title: String,
    #[serde(rename = "englishTitle")]
    pub english_title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<String>,
    #[serde(rename = "backdropImage")]
    pub backdrop_image: Option<String>,
    #[serde(rename = "totalEpisodes")]
    pub total_episodes: i64,
    #[serde(rename = "releaseYear")]
    pub release_year: Option<i64>,
    pub genre: Vec<String>,
    pub rating: f64,
    pub views: String,
    pub status: String,
    pub director: Option<String>,
    pub actors: Vec<String>,
    pub region: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "updateTime")]
    pub update_time: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SeriesRow> for SeriesOut {
    fn from(row: SeriesRow) -> Self {
        Self {
            genre: json_list(row.genre.as_deref()),
            actors: json_list(row.actors.as_deref()),
            tags: json_list(row.tags.as_deref()),
            rating: row.rating as f64 / 10.0,
            views: row.views.unwrap_or_else(|| "0".into()),
            status: row.status.unwrap_or_else(|| "upcoming".into()),
            id: row.id,
            title: row.title,
            english_title: row.english_title,
            description: row.description,
            cover_image: row.cover_image,
            backdrop_image: row.backdrop_image,
            total_episodes: row.total_episodes,
            release_year: row.release_year,
            director: row.director,
            region: row.region,
            language: row.language,
            update_time: row.update_time,
            created_at: row.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct SeriesIn {
    pub title: String,
    #[serde(rename = "englishTitle")]
    pub english_title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<String>,
    #[serde(rename = "backdropImage")]
    pub backdrop_image: Option<String>,
    #[serde(rename = "totalEpisodes", default)]
    pub total_episodes: i64,
    #[serde(rename = "releaseYear")]
    pub release_year: Option<i64>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default = "default_views")]
    pub views: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub director: Option<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    pub region: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "updateTime")]
    pub update_time: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_views() -> String {
    "0".into()
}

fn default_status() -> String {
    "upcoming".into()
}

/* ------------ episodes ------------ */

#[derive(FromRow)]
pub struct EpisodeRow {
    pub id: String,
    pub series_id: String,
    pub episode: i64,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub duration: Option<String>,
    pub cover_image: Option<String>,
    pub is_vip: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct EpisodeOut {
    pub id: String,
    pub series_id: String,
    pub episode: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "videoUrl")]
    pub video_url: String,
    pub duration: Option<String>,
    pub cover_image: Option<String>,
    #[serde(rename = "isVip")]
    pub is_vip: bool,
    pub created_at: DateTime<Utc>,
}

impl From<EpisodeRow> for EpisodeOut {
    fn from(row: EpisodeRow) -> Self {
        Self {
            id: row.id,
            series_id: row.series_id,
            episode: row.episode,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            duration: row.duration,
            cover_image: row.cover_image,
            is_vip: row.is_vip,
            created_at: row.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct EpisodeIn {
    pub series_id: String,
    pub episode: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "videoUrl")]
    pub video_url: String,
    pub duration: Option<String>,
    pub cover_image: Option<String>,
    #[serde(rename = "isVip", default)]
    pub is_vip: bool,
}

/* ------------ helpers ------------ */

pub fn json_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

pub fn json_text(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".into())
}

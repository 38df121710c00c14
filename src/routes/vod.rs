//! Aggregated search across the configured third-party VOD resource APIs.
//! Providers speak the common collection-site JSON dialect; a provider that
//! errors out just contributes nothing to the merged result.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::{Config, VodSite},
    error::{bad, AppResult},
    utils::jwt,
};

#[derive(Deserialize)]
struct SearchQuery {
    keyword: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct VodItem {
    pub source: String,
    pub id: String,
    pub name: String,
    pub note: Option<String>,
    #[serde(rename = "playUrls")]
    pub play_urls: Vec<PlayUrl>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PlayUrl {
    pub name: String,
    pub url: String,
}

pub fn router() -> Router {
    Router::new().route("/vod/search", get(search))
}

async fn search(
    Query(q): Query<SearchQuery>,
    headers: HeaderMap,
    Extension(cfg): Extension<Arc<Config>>,
) -> AppResult<Json<Vec<VodItem>>> {
    jwt::require(&headers, &cfg.jwt_secret)?;
    let keyword = q.keyword.trim();
    if keyword.is_empty() {
        return Err(bad("keyword must not be empty"));
    }

    let client = Client::new();
    let fetches = cfg
        .vod_sites
        .iter()
        .map(|site| search_site(&client, site, keyword));
    let results = join_all(fetches).await;
    Ok(Json(results.into_iter().flatten().collect()))
}

async fn search_site(client: &Client, site: &VodSite, keyword: &str) -> Vec<VodItem> {
    match fetch_site(client, site, keyword).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("vod search on {} failed: {e}", site.name);
            Vec::new()
        }
    }
}

async fn fetch_site(
    client: &Client,
    site: &VodSite,
    keyword: &str,
) -> Result<Vec<VodItem>, reqwest::Error> {
    #[derive(Deserialize)]
    struct ApiResp {
        #[serde(default)]
        list: Vec<Value>,
    }

    let url = format!("{}/api.php/provide/vod/", site.api.trim_end_matches('/'));
    let resp = client
        .get(&url)
        .query(&[("ac", "videolist"), ("wd", keyword)])
        .send()
        .await?
        .error_for_status()?;
    let api: ApiResp = resp.json().await?;
    Ok(api
        .list
        .into_iter()
        .filter_map(|v| map_item(&site.name, &v))
        .collect())
}

fn map_item(source: &str, v: &Value) -> Option<VodItem> {
    let name = v.get("vod_name")?.as_str()?.to_owned();
    let id = match v.get("vod_id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return None,
    };
    let note = v
        .get("vod_remarks")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let play_urls = v
        .get("vod_play_url")
        .and_then(Value::as_str)
        .map(parse_play_urls)
        .unwrap_or_default();
    Some(VodItem {
        source: source.to_owned(),
        id,
        name,
        note,
        play_urls,
    })
}

/// `"EP1$http://a#EP2$http://b"`; an entry without `$` is a bare url.
fn parse_play_urls(raw: &str) -> Vec<PlayUrl> {
    raw.split('#')
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once('$') {
            Some((name, url)) => PlayUrl {
                name: name.to_owned(),
                url: url.to_owned(),
            },
            None => PlayUrl {
                name: entry.to_owned(),
                url: entry.to_owned(),
            },
        })
        .collect()
}

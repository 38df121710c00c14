use std::env;

/// Runtime configuration, read once at startup from the environment
/// (`.env` is loaded first in `main`). Every knob has a default so the
/// server comes up on a bare machine.
#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expire_minutes: i64,
    pub admin_username: String,
    pub admin_password: String,
    /// Idle room eviction; `None` keeps room state for the process lifetime.
    pub room_ttl_secs: Option<u64>,
    pub vod_sites: Vec<VodSite>,
}

#[derive(Clone)]
pub struct VodSite {
    pub name: String,
    pub api: String,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using development default");
            "change-me-in-production".into()
        });
        Self {
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:8000"),
            database_url: var_or("DATABASE_URL", "sqlite://cinema.db?mode=rwc"),
            jwt_secret,
            jwt_expire_minutes: parsed_var("JWT_EXPIRE_MINUTES", 30),
            admin_username: var_or("ADMIN_USERNAME", "admin"),
            admin_password: var_or("ADMIN_PASSWORD", "your_strong_password"),
            room_ttl_secs: env::var("ROOM_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok()),
            vod_sites: parse_vod_sites(&var_or("VOD_API_SITES", "")),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// `VOD_API_SITES="name=https://host,other=https://other-host"`
fn parse_vod_sites(raw: &str) -> Vec<VodSite> {
    raw.split(',')
        .filter_map(|entry| {
            let (name, api) = entry.split_once('=')?;
            let (name, api) = (name.trim(), api.trim());
            if name.is_empty() || api.is_empty() {
                return None;
            }
            Some(VodSite {
                name: name.to_owned(),
                api: api.to_owned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vod_sites_parse_and_skip_junk() {
        let sites = parse_vod_sites("a=https://x, b = https://y ,broken,=https://z");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].name, "a");
        assert_eq!(sites[0].api, "https://x");
        assert_eq!(sites[1].name, "b");
        assert_eq!(sites[1].api, "https://y");
    }

    #[test]
    fn empty_site_list() {
        assert!(parse_vod_sites("").is_empty());
    }
}

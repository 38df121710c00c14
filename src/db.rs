use chrono::Utc;
use sqlx::SqlitePool;

use crate::{config::Config, error::AppResult, utils::password};

/// Create the schema and make sure the admin account matches config.
pub async fn init(pool: &SqlitePool, cfg: &Config) -> AppResult<()> {
    create_tables(pool).await?;
    seed_admin(pool, cfg).await?;
    Ok(())
}

pub(crate) async fn create_tables(pool: &SqlitePool) -> AppResult<()> {
    let statements = [
        r#"CREATE TABLE IF NOT EXISTS admins (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at    TEXT NOT NULL
        )"#,
        r#"CREATE TABLE IF NOT EXISTS series (
            id             TEXT PRIMARY KEY,
            title          TEXT NOT NULL,
            english_title  TEXT,
            description    TEXT,
            cover_image    TEXT,
            backdrop_image TEXT,
            total_episodes INTEGER NOT NULL DEFAULT 0,
            release_year   INTEGER,
            genre          TEXT,
            rating         INTEGER NOT NULL DEFAULT 0,
            views          TEXT,
            status         TEXT,
            director       TEXT,
            actors         TEXT,
            region         TEXT,
            language       TEXT,
            update_time    TEXT,
            tags           TEXT,
            created_at     TEXT NOT NULL
        )"#,
        r#"CREATE TABLE IF NOT EXISTS episodes (
            id          TEXT PRIMARY KEY,
            series_id   TEXT NOT NULL,
            episode     INTEGER NOT NULL,
            title       TEXT NOT NULL,
            description TEXT,
            video_url   TEXT NOT NULL,
            duration    TEXT,
            cover_image TEXT,
            is_vip      INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        )"#,
        r#"CREATE INDEX IF NOT EXISTS idx_episodes_series ON episodes(series_id)"#,
        r#"CREATE INDEX IF NOT EXISTS idx_episodes_video_url ON episodes(video_url)"#,
        r#"CREATE TABLE IF NOT EXISTS share_links (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            hash       TEXT NOT NULL UNIQUE,
            series_id  TEXT NOT NULL,
            expires_at TEXT,
            created_at TEXT NOT NULL
        )"#,
        r#"CREATE INDEX IF NOT EXISTS idx_share_links_series ON share_links(series_id)"#,
    ];
    for stmt in statements {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

/// One admin account, driven by config. A stored account whose username or
/// password no longer matches is dropped and recreated.
async fn seed_admin(pool: &SqlitePool, cfg: &Config) -> AppResult<()> {
    let row: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, username, password_hash FROM admins LIMIT 1")
            .fetch_optional(pool)
            .await?;
    match row {
        Some((id, username, stored))
            if username != cfg.admin_username
                || !password::verify(&cfg.admin_password, &stored) =>
        {
            sqlx::query("DELETE FROM admins WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await?;
            insert_admin(pool, cfg).await?;
            tracing::info!(
                "replaced admin account {username} with {}",
                cfg.admin_username
            );
        }
        Some(_) => {}
        None => {
            insert_admin(pool, cfg).await?;
            tracing::info!("created initial admin account {}", cfg.admin_username);
        }
    }
    Ok(())
}

async fn insert_admin(pool: &SqlitePool, cfg: &Config) -> AppResult<()> {
    sqlx::query("INSERT INTO admins (username, password_hash, created_at) VALUES (?, ?, ?)")
        .bind(&cfg.admin_username)
        .bind(password::hash(&cfg.admin_password)?)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    fn test_cfg(username: &str, pw: &str) -> Config {
        Config {
            bind_addr: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            jwt_secret: "secret".into(),
            jwt_expire_minutes: 30,
            admin_username: username.into(),
            admin_password: pw.into(),
            room_ttl_secs: None,
            vod_sites: Vec::new(),
        }
    }

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn init_is_idempotent_and_seeds_admin() {
        let pool = memory_pool().await;
        let cfg = test_cfg("admin", "pw1");
        init(&pool, &cfg).await.unwrap();
        init(&pool, &cfg).await.unwrap();

        let (username, hash): (String, String) =
            sqlx::query_as("SELECT username, password_hash FROM admins")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(username, "admin");
        assert!(password::verify("pw1", &hash));
    }

    #[tokio::test]
    async fn changed_credentials_replace_the_admin() {
        let pool = memory_pool().await;
        init(&pool, &test_cfg("admin", "pw1")).await.unwrap();
        init(&pool, &test_cfg("root", "pw2")).await.unwrap();

        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT username, password_hash FROM admins")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "root");
        assert!(password::verify("pw2", &rows[0].1));
        assert!(!password::verify("pw1", &rows[0].1));
    }
}

//! routes/auth.rs
use std::sync::Arc;

use axum::{extract::Extension, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::{AppErr, AppResult},
    utils::{jwt, password},
};

#[derive(Deserialize)]
struct LoginInput {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenJson {
    access_token: String,
    token_type: String,
}

pub fn router() -> Router {
    Router::new().route("/auth/login", post(login))
}

async fn login(
    Extension(pool): Extension<SqlitePool>,
    Extension(cfg): Extension<Arc<Config>>,
    Json(p): Json<LoginInput>,
) -> AppResult<Json<TokenJson>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT username, password_hash FROM admins WHERE username = ?")
            .bind(&p.username)
            .fetch_optional(&pool)
            .await?;

    // same rejection whether the user or the password is wrong
    let Some((username, stored)) = row else {
        return Err(AppErr::Unauthorized("incorrect username or password".into()));
    };
    if !password::verify(&p.password, &stored) {
        return Err(AppErr::Unauthorized("incorrect username or password".into()));
    }

    let token = jwt::sign(&username, &cfg.jwt_secret, cfg.jwt_expire_minutes);
    Ok(Json(TokenJson {
        access_token: token,
        token_type: "Bearer".into(),
    }))
}

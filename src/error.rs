use axum::{http::StatusCode, response::IntoResponse};
use std::fmt::Display;

pub type AppResult<T> = Result<T, AppErr>;

#[derive(thiserror::Error, Debug)]
pub enum AppErr {
    #[error("Bad request: {0}")]
    Bad(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Crypto: {0}")]
    Crypto(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("DB: {0}")]
    Db(#[from] sqlx::Error),
}

impl IntoResponse for AppErr {
    fn into_response(self) -> axum::response::Response {
        let (code, body) = match self {
            AppErr::Bad(msg)          => (StatusCode::BAD_REQUEST, msg),
            AppErr::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppErr::NotFound(msg)     => (StatusCode::NOT_FOUND, msg),
            AppErr::Gone(msg)         => (StatusCode::GONE, msg),
            other                     => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (code, body).into_response()
    }
}

/* ── tiny helper: fold any error into Bad ── */
pub fn bad<E: Display>(e: E) -> AppErr {
    AppErr::Bad(e.to_string())
}

use axum::http::{header, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey,
                   Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppErr, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims { pub sub: String, pub exp: i64 }

pub fn sign(sub: &str, secret: &str, expire_minutes: i64) -> String {
    let c = Claims {
        sub: sub.into(),
        exp: Utc::now().timestamp() + expire_minutes * 60,
    };
    encode(&Header::default(), &c, &EncodingKey::from_secret(secret.as_bytes()))
        .unwrap()
}

pub fn verify(token: &str, secret: &str) -> Option<String> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()),
                     &Validation::new(Algorithm::HS256))
        .map(|d| d.claims.sub)
        .ok()
}

/// Admin gate for protected handlers: `Authorization: Bearer <token>`.
pub fn require(headers: &HeaderMap, secret: &str) -> AppResult<String> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppErr::Unauthorized("missing bearer token".into()))?;
    verify(token, secret)
        .ok_or_else(|| AppErr::Unauthorized("invalid or expired token".into()))
}

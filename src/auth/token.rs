//! Signed bearer tokens (HS256 JWT) carrying the caller's id, e-mail and role.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Role, UserRecord};

/// Ten years; longer lifetimes are clamped.
const MAX_TTL_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Identity of an authenticated request, taken from verified claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self { id: claims.sub, email: claims.email, role: claims.role }
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            ttl: Duration::hours(i64::try_from(ttl_hours.min(MAX_TTL_HOURS)).unwrap_or(24)),
        }
    }

    pub fn issue(&self, user: &UserRecord) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("token rejected: {}", e);
                AppError::unauthenticated("Invalid token")
            })
    }

    /// Resolves the caller from an `Authorization: Bearer <token>` header.
    /// A missing header and an unverifiable token are both `Unauthenticated`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Caller, AppError> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthenticated("No token provided"))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthenticated("No token provided"))?;
        self.verify(token).map(Caller::from)
    }
}

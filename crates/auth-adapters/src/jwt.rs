//! HS256 session tokens.
//!
//! `decode` is the exact inverse of `issue`: any token that was not produced
//! with the same secret, or whose `exp` has passed, fails with `Authentication`.

use chrono::{TimeDelta, Utc};
use domains::{AppError, Result, SessionClaims, TokenCodec};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    iat: i64,
    exp: i64,
}

pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl JwtCodec {
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: TimeDelta::minutes(ttl_minutes),
        }
    }
}

impl TokenCodec for JwtCodec {
    fn issue(&self, claims: &SessionClaims) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: claims.user_id.to_string(),
            username: claims.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        debug!(user = %claims.sub, exp = claims.exp, "issuing session token");
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Storage(format!("token signing failed: {e}")))
    }

    fn decode(&self, token: &str) -> Result<SessionClaims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| AppError::Authentication(format!("invalid or expired token: {e}")))?;
        let user_id = data
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::Authentication("invalid token subject".into()))?;
        Ok(SessionClaims {
            user_id,
            username: data.claims.username,
        })
    }
}

//! Request extractors: bearer identities and JSON/query/path inputs whose
//! rejections use the common error envelope.

use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use domains::{AppError, Identity};

use crate::error::ApiError;
use crate::state::AppState;

/// `Json<T>` with a `validation` error envelope on malformed bodies.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query<T>` with a `validation` error envelope on malformed query strings.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Path<T>`; an unparsable id segment is a `validation` error.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Token from `Authorization: Bearer <token>`.
///
/// `Ok(None)` when the header is absent; a present but malformed header is
/// an error so it never degrades into an anonymous request.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Authentication("authorization header is not valid text".into()))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AppError::Authentication(
            "expected 'Authorization: Bearer <token>'".into(),
        )),
    }
}

/// A caller that must be signed in.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Authentication("missing bearer token".into()))?;
        let identity = state.accounts.authenticate(token).await?;
        Ok(Self(identity))
    }
}

/// Public routes that behave differently for staff.
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub Option<Identity>);

impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(state.accounts.authenticate(token).await?))),
            None => Ok(Self(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&parts(Some("bearer abc"))).unwrap(), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Bearer  abc "))).unwrap(), Some("abc"));
    }

    #[test]
    fn absent_header_is_anonymous_but_malformed_is_rejected() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
        for bad in ["abc", "Basic abc", "Bearer ", "Bearer"] {
            let err = bearer_token(&parts(Some(bad))).unwrap_err();
            assert_eq!(err.kind(), "authentication");
        }
    }
}

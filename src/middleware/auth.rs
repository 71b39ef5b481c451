//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the token from the Authorization header
//! 2. Verify its signature and expiry
//! 3. Inject the token payload into the request
//! 4. Reject unauthorized requests with HTTP 401

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, token::TokenMaker};

/// Only bearer tokens are accepted; the scheme is matched case-insensitively.
const AUTHORIZATION_TYPE_BEARER: &str = "bearer";

/// Token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Verify `<token>` with the token maker
/// 3. If valid: inject `token::Payload` into request, call next handler
/// 4. Otherwise: return 401 Unauthorized error
///
/// Route handlers read the caller with `Extension<Payload>`.
pub async fn auth_middleware(
    State(token_maker): State<Arc<TokenMaker>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("authorization header is not provided".into()))?;

    let mut fields = auth_header.split_whitespace();
    let (Some(scheme), Some(token)) = (fields.next(), fields.next()) else {
        return Err(AppError::Unauthorized(
            "invalid authorization header format".into(),
        ));
    };

    if !scheme.eq_ignore_ascii_case(AUTHORIZATION_TYPE_BEARER) {
        return Err(AppError::Unauthorized(format!(
            "unsupported authorization type: {}",
            scheme.to_ascii_lowercase()
        )));
    }

    let payload = token_maker.verify_token(token)?;

    request.extensions_mut().insert(payload);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Duration;

    use crate::handlers::test_support::TestApp;

    async fn list_with_header(
        app: &TestApp,
        value: Option<String>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method("GET").uri("/accounts");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        app.send(builder.body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn accepts_bearer_in_any_case() {
        let app = TestApp::new();
        let user = app.create_user().await;
        let token = app.token(&user.username, Duration::minutes(1));

        for scheme in ["Bearer", "bearer", "BEARER"] {
            let (status, _) = list_with_header(&app, Some(format!("{scheme} {token}"))).await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn rejects_bad_headers() {
        let app = TestApp::new();
        let user = app.create_user().await;
        let token = app.token(&user.username, Duration::minutes(1));
        let expired = app.token(&user.username, -Duration::minutes(1));

        let cases = [
            (None, "authorization header is not provided"),
            (Some(token.clone()), "invalid authorization header format"),
            (Some(format!("Basic {token}")), "unsupported authorization type: basic"),
            (Some(format!("Bearer {expired}")), "token has expired"),
            (Some("Bearer garbage".to_string()), "token is invalid"),
        ];

        for (value, message) in cases {
            let (status, body) = list_with_header(&app, value).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"]["message"], message);
        }
    }
}

//! Bearer authentication middleware.
//! Turns the `Authorization` header into an `AuthorizationSubject` extension.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::subject::AuthorizationSubject;
use crate::auth::token::{bearer_token, TokenVerifier};
use crate::error::ServiceError;

pub async fn authenticate(
    State(verifier): State<TokenVerifier>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let claims = match bearer_token(header).and_then(|token| verifier.verify(token)) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "Rejected unauthenticated request");
            return ServiceError::Unauthenticated(e.to_string()).into_response();
        }
    };

    let subject = match AuthorizationSubject::from_claims(&claims) {
        Ok(subject) => subject,
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "Rejected token with invalid subject");
            return ServiceError::Unauthenticated(e.to_string()).into_response();
        }
    };

    req.extensions_mut().insert(subject);
    next.run(req).await
}

/// Only callers holding the global ADMIN role pass. Runs after [`authenticate`].
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<AuthorizationSubject>() {
        Some(subject) if subject.is_admin() => next.run(req).await,
        Some(subject) => {
            tracing::debug!(subject = %subject.id, path = %req.uri().path(), "Admin route denied");
            ServiceError::AuthorizationDenied.into_response()
        }
        None => ServiceError::Unauthenticated("missing Authorization header".into()).into_response(),
    }
}

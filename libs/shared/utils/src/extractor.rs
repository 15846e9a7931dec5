use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::debug;

use crate::session::Session;

/// Builds the per-request [`Session`] from the `Authorization` header.
///
/// Requests without a bearer token get an anonymous session; handlers that need
/// authentication turn that into a login redirect themselves.
pub async fn session_middleware(mut request: Request<Body>, next: Next) -> Response {
    let session = match bearer_token(request.headers()) {
        Some(token) => Session::with_token(token),
        None => {
            debug!("No bearer token on request, continuing anonymously");
            Session::anonymous()
        }
    };

    request.extensions_mut().insert(session);

    next.run(request).await
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let Authorization(bearer) = headers.typed_get::<Authorization<Bearer>>()?;
    let token = bearer.token().trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

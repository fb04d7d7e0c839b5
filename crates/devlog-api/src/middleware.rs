use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;
use crate::session;

/// Admin-only gate. Runs before the handler touches the request body, so a
/// rejected publish never reads or stores its upload.
pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match session::resolve(&jar, &state.session_secret) {
        Some(identity) if identity.is_admin() => {
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        other => {
            debug!(
                "Rejected {} for {}",
                req.uri().path(),
                other.map(|i| i.username).unwrap_or_else(|| "anonymous".into())
            );
            Err(ApiError::Forbidden)
        }
    }
}

/// Any logged-in user.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = session::resolve(&jar, &state.session_secret).ok_or(ApiError::Unauthorized)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

use crate::error::AppError;
use crate::state::AppState;

/// Middleware resolving the caller's bearer credential through the Identity
/// Resolver and stashing the participant in request extensions for the
/// guards to pick up.
pub async fn auth_middleware(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;

    let credential = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)?;

    let participant = state.directory.resolve(credential).await?;
    req.extensions_mut().insert(participant);

    Ok(next.run(req).await)
}

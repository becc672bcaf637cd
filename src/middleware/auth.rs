use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::error::AppError;
use crate::models::{Claims, CurrentUser};
use crate::AppState;

/// Authentication middleware
///
/// Validates the identity-provider bearer token and exposes the caller as
/// a `CurrentUser` request extension. Authorization beyond "authenticated"
/// (the organizational email-domain policy) is checked by the handlers
/// that need it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Get Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return Err(AppError::Unauthorized(
                "Missing or invalid Authorization header".to_string(),
            ));
        }
    };

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    let claims = data.claims;

    if claims.email.is_empty() {
        return Err(AppError::Unauthorized(
            "Token missing email claim".to_string(),
        ));
    }

    let current_user = CurrentUser {
        id: claims.sub,
        email: claims.email,
    };

    // Insert current user into request extensions
    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use docgen_types::api::Claims;
use docgen_types::models::User;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;

/// The authenticated account, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::InvalidToken)
}

/// Extract and validate the bearer JWT, then load the account it names.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or(ApiError::MissingToken)?;

    let claims = decode_token(&state.jwt_secret, &token)?;

    let user_id = claims.sub.to_string();
    let user = with_db(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or_else(|| {
            warn!("Token for deleted user {}", claims.sub);
            ApiError::UnknownUser
        })?;

    if !user.is_active {
        return Err(ApiError::AccountDisabled);
    }

    req.extensions_mut().insert(CurrentUser(user.to_api()));
    Ok(next.run(req).await)
}

/// Must run after [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(ApiError::MissingToken)?;

    if !user.0.is_admin() {
        warn!("Non-admin {} denied admin route {}", user.0.email, req.uri().path());
        return Err(ApiError::AdminRequired);
    }
    Ok(next.run(req).await)
}

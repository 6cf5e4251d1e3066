use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info, warn};
use uuid::Uuid;

use docgen_db::Database;
use docgen_types::api::{
    Claims, LoginRequest, LoginResponse, REGISTRATION_UNAVAILABLE, RegisterRequest,
};
use docgen_types::models::Role;
use docgen_types::schema::Catalog;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::mailer::Mailer;
use crate::templates::TemplateStore;

pub const MIN_PASSWORD_LEN: usize = 6;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub catalog: Catalog,
    pub templates: TemplateStore,
    pub mailer: Arc<dyn Mailer>,
}

/// Run a blocking DB call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::from)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_string();
    info!("Login attempt for {}", email);

    let user = with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| {
            warn!("Login failed: unknown email {}", req.email.trim());
            ApiError::InvalidCredentials
        })?;

    if !verify_password(&req.password, &user.password) {
        warn!("Login failed: bad password for {}", user.email);
        return Err(ApiError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(ApiError::AccountDisabled);
    }

    let mut profile = user.to_api();
    let token = create_token(&state.jwt_secret, profile.id, &profile.email, profile.role, state.token_ttl)?;

    let user_id = user.id.clone();
    with_db(&state, move |db| db.record_login(&user_id)).await?;
    profile.last_login = Some(chrono::Utc::now());

    info!("User {} logged in", profile.email);
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: profile,
    }))
}

/// POST /api/auth/register. Accounts are created by administrators only.
pub async fn register(ApiJson(req): ApiJson<RegisterRequest>) -> ApiError {
    info!("Rejected self-registration for {}", req.email);
    ApiError::NotImplemented(REGISTRATION_UNAVAILABLE)
}

/// Hash password with Argon2id.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Malformed stored hashes count as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Unreadable password hash: {}", e);
            false
        }
    }
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    role: Role,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

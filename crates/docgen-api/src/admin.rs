use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use tracing::{info, warn};
use uuid::Uuid;

use docgen_db::models::NewUser;
use docgen_types::api::{
    ActionResponse, CreateUserRequest, CreateUserResponse, DocumentsResponse, ToggleUserRequest,
    UsersResponse,
};
use docgen_types::models::{Stats, User};
use docgen_types::schema::is_email;

use crate::auth::{AppState, MIN_PASSWORD_LEN, hash_password, with_db};
use crate::documents::PageQuery;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CurrentUser;

/// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let rows = with_db(&state, |db| db.list_users()).await?;
    let users: Vec<User> = rows.iter().map(|r| r.to_api()).collect();
    Ok(Json(UsersResponse {
        count: users.len(),
        users,
    }))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    let email = req.email.trim().to_string();
    if !is_email(&email) {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    let password_hash = hash_password(&req.password)?;
    let id = Uuid::new_v4();
    let role = req.role;

    let created = with_db(&state, move |db| {
        if db.get_user_by_email(&email)?.is_some() {
            return Ok(None);
        }
        db.create_user(&NewUser {
            id,
            email: &email,
            username: Some(&username),
            password_hash: &password_hash,
            role,
        })?;
        db.get_user_by_id(&id.to_string())
    })
    .await?
    .ok_or_else(|| ApiError::Conflict("Email already registered".into()))?;

    let user = created.to_api();
    info!("{} created {} account {}", admin.email, user.role, user.email);
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            success: true,
            user,
        }),
    ))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ActionResponse>, ApiError> {
    if id == admin.id {
        warn!("{} tried to delete their own account", admin.email);
        return Err(ApiError::Forbidden("Cannot delete your own account"));
    }

    let target = id.to_string();
    let deleted = with_db(&state, move |db| db.delete_user(&target)).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".into()));
    }

    info!("{} deleted user {}", admin.email, id);
    Ok(Json(ActionResponse {
        success: true,
        message: "User deleted".into(),
    }))
}

/// PUT /api/admin/users/{id}/toggle
pub async fn toggle_user(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ToggleUserRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    if id == admin.id {
        warn!("{} tried to toggle their own account", admin.email);
        return Err(ApiError::Forbidden("Cannot deactivate your own account"));
    }

    let target = id.to_string();
    let active = req.is_active;
    let changed = with_db(&state, move |db| db.set_user_active(&target, active)).await?;
    if !changed {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let message = if active { "User activated" } else { "User deactivated" };
    info!("{}: {} by {}", message, id, admin.email);
    Ok(Json(ActionResponse {
        success: true,
        message: message.into(),
    }))
}

/// GET /api/admin/documents, newest first across all users.
pub async fn list_documents(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let (limit, skip) = (page.limit(), page.skip());
    let rows = with_db(&state, move |db| db.list_documents(None, limit, skip)).await?;
    let documents: Vec<_> = rows.iter().map(|r| r.to_api()).collect();
    Ok(Json(DocumentsResponse {
        count: documents.len(),
        documents,
    }))
}

/// GET /api/admin/stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    let stats = with_db(&state, |db| db.stats()).await?;
    Ok(Json(stats.to_api()))
}

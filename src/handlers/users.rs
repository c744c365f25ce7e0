use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::require_store;
use crate::{
    error::{AppError, ResultExt},
    middleware::{ApiJson, ApiPath, CurrentUser},
    models::{normalize_email, NewUser, Role, UserChanges, UserPayload, UserResponse},
    utils::{hash_password, non_empty},
    AppState,
};

fn parse_role(raw: &str) -> Result<Role, AppError> {
    raw.parse().map_err(|_| AppError::bad_request("Invalid user type"))
}

fn hash(state: &AppState, password: &str) -> Result<String, AppError> {
    hash_password(password, state.auth.bcrypt_cost).map_err(|err| {
        log::error!("Failed to hash password: {}", err);
        AppError::Internal("Failed to process password".to_string())
    })
}

pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    current_user.require_admin()?;

    let users = state
        .repo
        .list_users()
        .await
        .context("Failed to get users")?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(payload): ApiJson<UserPayload>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    current_user.require_admin()?;
    let context = "Failed to create user";

    let (Some(email), Some(password), Some(role), Some(store_id)) = (
        non_empty(payload.email),
        payload.pwd.filter(|p| !p.is_empty()),
        non_empty(payload.role),
        payload.store_id,
    ) else {
        return Err(AppError::bad_request(
            "Email, password, type and storeId are required",
        ));
    };

    let role = parse_role(&role)?;
    require_store(&state, store_id, context).await?;

    let email = normalize_email(&email);
    if state
        .repo
        .find_user_by_email(&email)
        .await
        .context(context)?
        .is_some()
    {
        return Err(AppError::bad_request("User already exists"));
    }

    let password_hash = hash(&state, &password)?;
    let user = state
        .repo
        .insert_user(NewUser {
            email,
            password_hash,
            role,
            store_id: Some(store_id),
        })
        .await
        .context(context)?;
    log::info!("Created {} user {} ({})", user.role, user.email, user.id);

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> Result<Json<UserResponse>, AppError> {
    current_user.require_admin()?;
    let context = "Failed to update user";

    let existing = state
        .repo
        .get_user(id)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    // Empty values keep what is stored
    let email = non_empty(payload.email)
        .map(|e| normalize_email(&e))
        .filter(|e| *e != existing.email);
    if let Some(email) = &email {
        if state
            .repo
            .find_user_by_email(email)
            .await
            .context(context)?
            .is_some()
        {
            return Err(AppError::bad_request("User already exists"));
        }
    }

    let role = non_empty(payload.role).map(|r| parse_role(&r)).transpose()?;

    if let Some(store_id) = payload.store_id {
        require_store(&state, store_id, context).await?;
    }

    let password_hash = match payload.pwd.filter(|p| !p.is_empty()) {
        Some(password) => Some(hash(&state, &password)?),
        None => None,
    };

    let changes = UserChanges {
        email,
        password_hash,
        role,
        store_id: payload.store_id,
    };
    let user = state
        .repo
        .update_user(id, changes)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    current_user.require_admin()?;

    let user = state
        .repo
        .delete_user(id)
        .await
        .context("Failed to delete user")?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    log::info!("Deleted user {} ({})", user.email, user.id);

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

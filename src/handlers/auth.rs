use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, ResultExt},
    middleware::{ApiJson, CurrentUser},
    models::{normalize_email, Role, User, UserResponse},
    utils::{create_token, non_empty, verify_password, Claims, BUILTIN_ADMIN_SUBJECT},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub pwd: Option<String>,
}

/// The caller as echoed back by `login` and, for the built-in admin, `me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MeResponse {
    BuiltinAdmin(SessionUser),
    User(UserResponse),
}

fn sign(state: &AppState, claims: &Claims) -> Result<String, AppError> {
    create_token(claims, &state.auth.jwt_secret).map_err(|err| {
        log::error!("Failed to sign token: {}", err);
        AppError::Internal("Login failed".to_string())
    })
}

async fn authenticate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let user = state
        .repo
        .find_user_by_email(&normalize_email(email))
        .await
        .context("Login failed")?;

    Ok(user.filter(|user| verify_password(password, &user.password_hash).unwrap_or(false)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = non_empty(request.email);
    let username = non_empty(request.username);
    let password = request.pwd.filter(|p| !p.is_empty());

    let Some(password) = password.filter(|_| email.is_some() || username.is_some()) else {
        return Err(AppError::bad_request(
            "Email/Username and password are required",
        ));
    };

    if let Some(username) = &username {
        if state.auth.is_builtin_admin(username, &password) {
            let claims = Claims::new(
                BUILTIN_ADMIN_SUBJECT.to_string(),
                username.clone(),
                Role::Admin,
                None,
                state.auth.token_ttl_hours,
            );
            let token = sign(&state, &claims)?;
            log::info!("Built-in administrator logged in");

            return Ok(Json(LoginResponse {
                token,
                user: SessionUser {
                    id: BUILTIN_ADMIN_SUBJECT.to_string(),
                    email: None,
                    username: Some(username.clone()),
                    role: Role::Admin,
                    store_id: None,
                },
            }));
        }
    }

    let user = match &email {
        Some(email) => authenticate_user(&state, email, &password).await?,
        None => None,
    }
    .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    let claims = Claims::new(
        user.id.to_string(),
        user.email.clone(),
        user.role,
        user.store_id,
        state.auth.token_ttl_hours,
    );
    let token = sign(&state, &claims)?;
    log::info!("User {} logged in", user.email);

    Ok(Json(LoginResponse {
        token,
        user: SessionUser {
            id: user.id.to_string(),
            email: Some(user.email),
            username: None,
            role: user.role,
            store_id: user.store_id,
        },
    }))
}

pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<MeResponse>, AppError> {
    let Some(user_id) = current_user.id else {
        return Ok(Json(MeResponse::BuiltinAdmin(SessionUser {
            id: BUILTIN_ADMIN_SUBJECT.to_string(),
            email: Some(current_user.email),
            username: None,
            role: Role::Admin,
            store_id: None,
        })));
    };

    let user = state
        .repo
        .get_user(user_id)
        .await
        .context("Failed to load user")?
        .ok_or_else(|| AppError::unauthorized("Invalid token"))?;

    Ok(Json(MeResponse::User(UserResponse::from(user))))
}

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{
    error::{AppError, ResultExt},
    models::{Role, Scope, User},
    utils::{verify_token, BUILTIN_ADMIN_SUBJECT},
    AppState,
};

/// The authenticated caller, resolved from the bearer token on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// `None` for the configured built-in administrator, which has no user row.
    pub id: Option<Uuid>,
    pub email: String,
    pub role: Role,
    pub store_id: Option<Uuid>,
}

impl CurrentUser {
    pub fn builtin_admin(username: &str) -> Self {
        Self {
            id: None,
            email: username.to_string(),
            role: Role::Admin,
            store_id: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Forbidden: Admins only"))
        }
    }

    pub fn scope(&self) -> Scope {
        match (self.role, self.store_id) {
            (Role::Admin, _) => Scope::All,
            (Role::User, Some(store_id)) => Scope::Store(store_id),
            (Role::User, None) => Scope::Nothing,
        }
    }

    pub fn can_access_store(&self, store_id: Uuid) -> bool {
        self.scope().allows(store_id)
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: Some(user.id),
            email: user.email,
            role: user.role,
            store_id: user.store_id,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized("No token provided"))?;

        let claims = verify_token(bearer.token(), &state.auth.jwt_secret).map_err(|err| {
            log::warn!("Token verification error: {}", err);
            AppError::unauthorized("Invalid token")
        })?;

        if claims.sub == BUILTIN_ADMIN_SUBJECT {
            // Tokens outlive a removed ADMIN_PASSWORD; honour them only while it is set
            if state.auth.admin_password.is_none() {
                return Err(AppError::unauthorized("Invalid token"));
            }
            return Ok(CurrentUser::builtin_admin(&state.auth.admin_username));
        }

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::unauthorized("Invalid token"))?;

        // Role and store come from the stored user so changes apply immediately
        let user = state
            .repo
            .get_user(user_id)
            .await
            .context("Failed to authenticate")?
            .ok_or_else(|| AppError::unauthorized("Invalid token"))?;

        Ok(CurrentUser::from(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_user(store_id: Option<Uuid>) -> CurrentUser {
        CurrentUser {
            id: Some(Uuid::new_v4()),
            email: "clerk@example.com".into(),
            role: Role::User,
            store_id,
        }
    }

    #[test]
    fn admin_sees_everything() {
        let admin = CurrentUser::builtin_admin("admin");
        assert!(admin.require_admin().is_ok());
        assert_eq!(admin.scope(), Scope::All);
        assert!(admin.can_access_store(Uuid::new_v4()));
    }

    #[test]
    fn store_user_is_confined_to_its_store() {
        let store_id = Uuid::new_v4();
        let user = store_user(Some(store_id));

        assert!(matches!(user.require_admin(), Err(AppError::Forbidden(_))));
        assert_eq!(user.scope(), Scope::Store(store_id));
        assert!(user.can_access_store(store_id));
        assert!(!user.can_access_store(Uuid::new_v4()));
    }

    #[test]
    fn unassigned_user_sees_nothing() {
        let user = store_user(None);
        assert_eq!(user.scope(), Scope::Nothing);
    }
}

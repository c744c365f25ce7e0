pub mod auth;
pub mod billings;
pub mod medicines;
pub mod stores;
pub mod users;

use uuid::Uuid;

use crate::{
    error::{AppError, ResultExt},
    utils::non_empty,
    AppState,
};

pub async fn root() -> &'static str {
    "Medical store API is running!"
}

/// For partial updates: an absent field stays absent, a present one must not be blank.
fn provided(value: Option<String>, message: &str) -> Result<Option<String>, AppError> {
    value
        .map(|v| non_empty(Some(v)).ok_or_else(|| AppError::bad_request(message)))
        .transpose()
}

async fn require_store(state: &AppState, store_id: Uuid, context: &str) -> Result<(), AppError> {
    state
        .repo
        .get_store(store_id)
        .await
        .context(context)?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Store not found"))
}

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, ResultExt},
    middleware::{ApiJson, ApiPath, CurrentUser},
    models::{MedicineDetail, MedicineFilter, Store, StorePayload},
    utils::non_empty,
    AppState,
};

pub async fn list_stores(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<Store>>, AppError> {
    let stores = state
        .repo
        .list_stores(current_user.scope())
        .await
        .context("Failed to fetch stores")?;

    Ok(Json(stores))
}

/// Loads a store the caller may see; stores outside the caller's scope are reported missing.
async fn visible_store(
    state: &AppState,
    current_user: &CurrentUser,
    id: Uuid,
    context: &str,
) -> Result<Store, AppError> {
    state
        .repo
        .get_store(id)
        .await
        .context(context)?
        .filter(|store| current_user.can_access_store(store.id))
        .ok_or_else(|| AppError::not_found("Store not found"))
}

pub async fn get_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Store>, AppError> {
    let store = visible_store(&state, &current_user, id, "Failed to fetch store").await?;
    Ok(Json(store))
}

pub async fn store_medicines(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<MedicineDetail>>, AppError> {
    let context = "Failed to fetch medicines for store";
    visible_store(&state, &current_user, id, context).await?;

    let filter = MedicineFilter {
        store_id: Some(id),
        ..MedicineFilter::scoped(current_user.scope())
    };
    let medicines = state.repo.list_medicines(&filter).await.context(context)?;

    Ok(Json(medicines))
}

pub async fn create_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(payload): ApiJson<StorePayload>,
) -> Result<(StatusCode, Json<Store>), AppError> {
    current_user.require_admin()?;
    let context = "Failed to create store";

    let name = non_empty(payload.name).ok_or_else(|| AppError::bad_request("Store name is required"))?;

    // Check if store name already exists
    if state
        .repo
        .find_store_by_name(&name, None)
        .await
        .context(context)?
        .is_some()
    {
        return Err(AppError::bad_request("Store name already exists"));
    }

    let store = state.repo.insert_store(&name).await.context(context)?;
    log::info!("Created store {} ({})", store.name, store.id);

    Ok((StatusCode::CREATED, Json(store)))
}

pub async fn update_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StorePayload>,
) -> Result<Json<Store>, AppError> {
    current_user.require_admin()?;
    let context = "Failed to update store";

    let name = non_empty(payload.name).ok_or_else(|| AppError::bad_request("Store name is required"))?;

    // Another store may not carry the same name
    if state
        .repo
        .find_store_by_name(&name, Some(id))
        .await
        .context(context)?
        .is_some()
    {
        return Err(AppError::bad_request("Store name already exists"));
    }

    let store = state
        .repo
        .update_store(id, &name)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Store not found"))?;

    Ok(Json(store))
}

pub async fn delete_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    current_user.require_admin()?;
    let context = "Failed to delete store";

    if state.repo.count_medicines_for_store(id).await.context(context)? > 0 {
        return Err(AppError::bad_request(
            "Cannot delete store with existing medicines. Please delete medicines first.",
        ));
    }

    if state.repo.count_billings_for_store(id).await.context(context)? > 0 {
        return Err(AppError::bad_request(
            "Cannot delete store with existing prescriptions. Please delete prescriptions first.",
        ));
    }

    let store = state
        .repo
        .delete_store(id)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Store not found"))?;
    log::info!("Deleted store {} ({})", store.name, store.id);

    Ok(Json(json!({
        "message": "Store deleted successfully",
        "store": store,
    })))
}

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{provided, require_store};
use crate::{
    error::{AppError, ResultExt},
    middleware::{ApiJson, ApiPath, CurrentUser},
    models::{
        parse_expiry_date, MedicineChanges, MedicineDetail, MedicineFilter, MedicinePayload,
        NewMedicine, StockPayload,
    },
    utils::non_empty,
    AppState,
};

fn checked_expiry(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let expiry =
        parse_expiry_date(raw).ok_or_else(|| AppError::bad_request("Invalid expiry date format"))?;

    if expiry < Utc::now() {
        return Err(AppError::bad_request("Expiry date cannot be in the past"));
    }

    Ok(expiry)
}

fn checked_stock(stock: i32) -> Result<i32, AppError> {
    if stock < 0 {
        return Err(AppError::bad_request("Stock must be a non-negative number"));
    }
    Ok(stock)
}

async fn medicine_detail(state: &AppState, id: Uuid, context: &str) -> Result<MedicineDetail, AppError> {
    state
        .repo
        .get_medicine_detail(id)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Medicine not found"))
}

pub async fn list_medicines(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<MedicineDetail>>, AppError> {
    let medicines = state
        .repo
        .list_medicines(&MedicineFilter::scoped(current_user.scope()))
        .await
        .context("Failed to fetch medicines")?;

    Ok(Json(medicines))
}

pub async fn medicines_by_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(store_id): ApiPath<Uuid>,
) -> Result<Json<Vec<MedicineDetail>>, AppError> {
    let context = "Failed to fetch medicines for store";

    if !current_user.can_access_store(store_id) {
        return Err(AppError::not_found("Store not found"));
    }
    require_store(&state, store_id, context).await?;

    let filter = MedicineFilter {
        store_id: Some(store_id),
        ..MedicineFilter::scoped(current_user.scope())
    };
    let medicines = state.repo.list_medicines(&filter).await.context(context)?;

    Ok(Json(medicines))
}

pub async fn get_medicine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MedicineDetail>, AppError> {
    let context = "Failed to fetch medicine";

    let medicine = state
        .repo
        .get_medicine(id)
        .await
        .context(context)?
        .filter(|m| current_user.can_access_store(m.store_id))
        .ok_or_else(|| AppError::not_found("Medicine not found"))?;

    Ok(Json(medicine_detail(&state, medicine.id, context).await?))
}

pub async fn create_medicine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(payload): ApiJson<MedicinePayload>,
) -> Result<(StatusCode, Json<MedicineDetail>), AppError> {
    current_user.require_admin()?;
    let context = "Failed to create medicine";

    let (Some(name), Some(store_id), Some(expiry_date), Some(stock), Some(batch_number)) = (
        non_empty(payload.name),
        payload.store_id,
        non_empty(payload.expiry_date),
        payload.stock,
        non_empty(payload.batch_number),
    ) else {
        return Err(AppError::bad_request(
            "All fields (name, storeId, expirydate, stock, batchNumber) are required",
        ));
    };

    let stock = checked_stock(stock)?;
    require_store(&state, store_id, context).await?;
    let expiry_date = checked_expiry(&expiry_date)?;

    let medicine = state
        .repo
        .insert_medicine(NewMedicine {
            name,
            store_id,
            expiry_date,
            stock,
            batch_number,
        })
        .await
        .context(context)?;
    log::info!("Created medicine {} ({}) in store {}", medicine.name, medicine.id, store_id);

    let detail = medicine_detail(&state, medicine.id, context).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_medicine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<MedicinePayload>,
) -> Result<Json<MedicineDetail>, AppError> {
    current_user.require_admin()?;
    let context = "Failed to update medicine";

    let stock = payload.stock.map(checked_stock).transpose()?;

    if let Some(store_id) = payload.store_id {
        require_store(&state, store_id, context).await?;
    }

    // A blank expiry date leaves the stored one in place
    let expiry_date = non_empty(payload.expiry_date)
        .as_deref()
        .map(checked_expiry)
        .transpose()?;

    let name = provided(payload.name, "Medicine name cannot be empty")?;
    let batch_number = provided(payload.batch_number, "Batch number cannot be empty")?;

    let existing = state
        .repo
        .get_medicine(id)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Medicine not found"))?;

    // Billings record the medicine's store; moving it would break that pairing
    if let Some(store_id) = payload.store_id {
        if store_id != existing.store_id
            && state.repo.count_billings_for_medicine(id).await.context(context)? > 0
        {
            return Err(AppError::bad_request(
                "Cannot move medicine with existing prescriptions to another store",
            ));
        }
    }

    let changes = MedicineChanges {
        name,
        store_id: payload.store_id,
        expiry_date,
        stock,
        batch_number,
    };
    state
        .repo
        .update_medicine(id, changes)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Medicine not found"))?;

    Ok(Json(medicine_detail(&state, id, context).await?))
}

pub async fn update_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StockPayload>,
) -> Result<Json<MedicineDetail>, AppError> {
    current_user.require_admin()?;
    let context = "Failed to update medicine stock";

    let stock = payload
        .stock
        .filter(|stock| *stock >= 0)
        .ok_or_else(|| AppError::bad_request("Valid stock number is required"))?;

    state
        .repo
        .set_medicine_stock(id, stock)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Medicine not found"))?;

    Ok(Json(medicine_detail(&state, id, context).await?))
}

pub async fn delete_medicine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    current_user.require_admin()?;
    let context = "Failed to delete medicine";

    if state.repo.count_billings_for_medicine(id).await.context(context)? > 0 {
        return Err(AppError::bad_request(
            "Cannot delete medicine with existing prescriptions. Please delete prescriptions first.",
        ));
    }

    let medicine = state
        .repo
        .delete_medicine(id)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Medicine not found"))?;
    log::info!("Deleted medicine {} ({})", medicine.name, medicine.id);

    Ok(Json(json!({
        "message": "Medicine deleted successfully",
        "medicine": medicine,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn past_expiry_is_rejected() {
        let yesterday = (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string();
        match checked_expiry(&yesterday) {
            Err(AppError::BadRequest(message)) => {
                assert_eq!(message, "Expiry date cannot be in the past")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_expiry_is_rejected() {
        match checked_expiry("31/12/2030") {
            Err(AppError::BadRequest(message)) => assert_eq!(message, "Invalid expiry date format"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn future_expiry_is_accepted() {
        assert!(checked_expiry("2099-01-01").is_ok());
    }

    #[test]
    fn negative_stock_is_rejected() {
        assert!(checked_stock(-1).is_err());
        assert_eq!(checked_stock(0).unwrap(), 0);
    }
}

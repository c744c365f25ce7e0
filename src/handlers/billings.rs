use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{provided, require_store};
use crate::{
    error::{AppError, ResultExt},
    middleware::{ApiJson, ApiPath, CurrentUser},
    models::{
        Billing, BillingChanges, BillingDetail, BillingFilter, BillingPayload, Frequency,
        Medicine, NewBilling,
    },
    utils::non_empty,
    AppState,
};

const FREQUENCY_ERROR: &str = r#"Frequency must be either "morning" or "evening""#;
const MISMATCH_ERROR: &str = "Medicine does not belong to the specified store";

fn parse_frequency(raw: &str) -> Result<Frequency, AppError> {
    raw.parse().map_err(|_| AppError::bad_request(FREQUENCY_ERROR))
}

/// Loads a medicine the caller may see; other stores' medicines are reported missing.
async fn visible_medicine(
    state: &AppState,
    current_user: &CurrentUser,
    id: Uuid,
    context: &str,
) -> Result<Medicine, AppError> {
    state
        .repo
        .get_medicine(id)
        .await
        .context(context)?
        .filter(|m| current_user.can_access_store(m.store_id))
        .ok_or_else(|| AppError::not_found("Medicine not found"))
}

/// Loads a billing the caller may see; other stores' billings are reported missing.
async fn visible_billing(
    state: &AppState,
    current_user: &CurrentUser,
    id: Uuid,
    context: &str,
) -> Result<Billing, AppError> {
    state
        .repo
        .get_billing(id)
        .await
        .context(context)?
        .filter(|b| current_user.can_access_store(b.store_id))
        .ok_or_else(|| AppError::not_found("Prescription not found"))
}

async fn billing_detail(state: &AppState, id: Uuid, context: &str) -> Result<BillingDetail, AppError> {
    state
        .repo
        .get_billing_detail(id)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Prescription not found"))
}

pub async fn list_billings(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<BillingDetail>>, AppError> {
    let billings = state
        .repo
        .list_billings(&BillingFilter::scoped(current_user.scope()))
        .await
        .context("Failed to fetch prescriptions")?;

    Ok(Json(billings))
}

pub async fn billings_by_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(store_id): ApiPath<Uuid>,
) -> Result<Json<Vec<BillingDetail>>, AppError> {
    let context = "Failed to fetch prescriptions for store";

    if !current_user.can_access_store(store_id) {
        return Err(AppError::not_found("Store not found"));
    }
    require_store(&state, store_id, context).await?;

    let filter = BillingFilter {
        store_id: Some(store_id),
        ..BillingFilter::scoped(current_user.scope())
    };
    let billings = state.repo.list_billings(&filter).await.context(context)?;

    Ok(Json(billings))
}

pub async fn billings_by_medicine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(medicine_id): ApiPath<Uuid>,
) -> Result<Json<Vec<BillingDetail>>, AppError> {
    let context = "Failed to fetch prescriptions for medicine";

    visible_medicine(&state, &current_user, medicine_id, context).await?;

    let filter = BillingFilter {
        medicine_id: Some(medicine_id),
        ..BillingFilter::scoped(current_user.scope())
    };
    let billings = state.repo.list_billings(&filter).await.context(context)?;

    Ok(Json(billings))
}

pub async fn billings_by_patient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<Vec<BillingDetail>>, AppError> {
    let filter = BillingFilter {
        patient_name: Some(name),
        ..BillingFilter::scoped(current_user.scope())
    };
    let billings = state
        .repo
        .list_billings(&filter)
        .await
        .context("Failed to fetch prescriptions for patient")?;

    Ok(Json(billings))
}

pub async fn get_billing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<BillingDetail>, AppError> {
    let context = "Failed to fetch prescription";
    let billing = visible_billing(&state, &current_user, id, context).await?;
    Ok(Json(billing_detail(&state, billing.id, context).await?))
}

pub async fn create_billing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(payload): ApiJson<BillingPayload>,
) -> Result<(StatusCode, Json<BillingDetail>), AppError> {
    let context = "Failed to create prescription";

    let (Some(medicine_id), Some(store_id), Some(frequency), Some(name), Some(number)) = (
        payload.medicine_id,
        payload.store_id,
        non_empty(payload.frequency),
        non_empty(payload.name),
        non_empty(payload.number),
    ) else {
        return Err(AppError::bad_request(
            "All fields (medicineId, storeId, frequency, name, number) are required",
        ));
    };

    let frequency = parse_frequency(&frequency)?;

    if !current_user.can_access_store(store_id) {
        return Err(AppError::forbidden("Forbidden: store access denied"));
    }

    let medicine = visible_medicine(&state, &current_user, medicine_id, context).await?;
    require_store(&state, store_id, context).await?;

    if medicine.store_id != store_id {
        return Err(AppError::bad_request(MISMATCH_ERROR));
    }

    if medicine.stock <= 0 {
        return Err(AppError::bad_request("Medicine is out of stock"));
    }

    let billing = state
        .repo
        .insert_billing(NewBilling {
            medicine_id,
            store_id,
            frequency,
            name,
            number,
            description: non_empty(payload.description),
        })
        .await
        .context(context)?;

    // Not atomic with the insert; a concurrent sale may have emptied the stock meanwhile
    if state
        .repo
        .decrement_medicine_stock(medicine_id)
        .await
        .context(context)?
        .is_none()
    {
        log::warn!(
            "Prescription {} created but stock of medicine {} was already exhausted",
            billing.id,
            medicine_id
        );
    }
    log::info!("Created prescription {} for medicine {}", billing.id, medicine_id);

    let detail = billing_detail(&state, billing.id, context).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_billing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<BillingPayload>,
) -> Result<Json<BillingDetail>, AppError> {
    let context = "Failed to update prescription";

    let existing = visible_billing(&state, &current_user, id, context).await?;

    // Blank values count as not provided
    let frequency = non_empty(payload.frequency)
        .as_deref()
        .map(parse_frequency)
        .transpose()?;
    let name = provided(payload.name, "Patient name cannot be empty")?;
    let number = provided(payload.number, "Number cannot be empty")?;

    if let Some(store_id) = payload.store_id {
        if !current_user.can_access_store(store_id) {
            return Err(AppError::forbidden("Forbidden: store access denied"));
        }
        require_store(&state, store_id, context).await?;
    }

    // The medicine and store the record ends up with must still agree
    if payload.medicine_id.is_some() || payload.store_id.is_some() {
        let medicine_id = payload.medicine_id.unwrap_or(existing.medicine_id);
        let store_id = payload.store_id.unwrap_or(existing.store_id);

        let medicine = visible_medicine(&state, &current_user, medicine_id, context).await?;
        if medicine.store_id != store_id {
            return Err(AppError::bad_request(MISMATCH_ERROR));
        }
    }

    let changes = BillingChanges {
        medicine_id: payload.medicine_id,
        store_id: payload.store_id,
        frequency,
        name,
        number,
        description: non_empty(payload.description),
    };
    state
        .repo
        .update_billing(id, changes)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Prescription not found"))?;

    Ok(Json(billing_detail(&state, id, context).await?))
}

pub async fn delete_billing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let context = "Failed to delete prescription";

    visible_billing(&state, &current_user, id, context).await?;

    let prescription = state
        .repo
        .delete_billing(id)
        .await
        .context(context)?
        .ok_or_else(|| AppError::not_found("Prescription not found"))?;
    log::info!("Deleted prescription {}", prescription.id);

    Ok(Json(json!({
        "message": "Prescription deleted successfully",
        "prescription": prescription,
    })))
}

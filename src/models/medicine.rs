use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Scope, StoreRef};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub store_id: Uuid,
    #[serde(rename = "expirydate")]
    pub expiry_date: DateTime<Utc>,
    pub stock: i32,
    pub batch_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A medicine with its store reference resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineDetail {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "storeId")]
    pub store: Option<StoreRef>,
    #[serde(rename = "expirydate")]
    pub expiry_date: DateTime<Utc>,
    pub stock: i32,
    pub batch_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicineDetail {
    pub fn new(medicine: Medicine, store_name: Option<String>) -> Self {
        Self {
            id: medicine.id,
            name: medicine.name,
            store: store_name.map(|name| StoreRef {
                id: medicine.store_id,
                name,
            }),
            expiry_date: medicine.expiry_date,
            stock: medicine.stock,
            batch_number: medicine.batch_number,
            created_at: medicine.created_at,
            updated_at: medicine.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicinePayload {
    pub name: Option<String>,
    pub store_id: Option<Uuid>,
    #[serde(rename = "expirydate")]
    pub expiry_date: Option<String>,
    pub stock: Option<i32>,
    pub batch_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockPayload {
    pub stock: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub store_id: Uuid,
    pub expiry_date: DateTime<Utc>,
    pub stock: i32,
    pub batch_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct MedicineChanges {
    pub name: Option<String>,
    pub store_id: Option<Uuid>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub stock: Option<i32>,
    pub batch_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MedicineFilter {
    pub scope: Scope,
    pub store_id: Option<Uuid>,
}

impl MedicineFilter {
    pub fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            store_id: None,
        }
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_expiry_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Medicine, ParseEnumError, Scope, StoreRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Morning,
    Evening,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Morning => "morning",
            Frequency::Evening => "evening",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(Frequency::Morning),
            "evening" => Ok(Frequency::Evening),
            other => Err(ParseEnumError {
                kind: "frequency",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A prescription dispensed at a store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub medicine_id: Uuid,
    pub store_id: Uuid,
    #[sqlx(try_from = "String")]
    pub frequency: Frequency,
    pub name: String,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The part of a medicine embedded into billing responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "expirydate")]
    pub expiry_date: DateTime<Utc>,
    pub stock: i32,
    pub batch_number: String,
}

impl From<&Medicine> for MedicineRef {
    fn from(medicine: &Medicine) -> Self {
        Self {
            id: medicine.id,
            name: medicine.name.clone(),
            expiry_date: medicine.expiry_date,
            stock: medicine.stock,
            batch_number: medicine.batch_number.clone(),
        }
    }
}

/// A billing with its medicine and store references resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetail {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "medicineId")]
    pub medicine: Option<MedicineRef>,
    #[serde(rename = "storeId")]
    pub store: Option<StoreRef>,
    pub frequency: Frequency,
    pub name: String,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BillingDetail {
    pub fn new(billing: Billing, medicine: Option<MedicineRef>, store: Option<StoreRef>) -> Self {
        Self {
            id: billing.id,
            medicine,
            store,
            frequency: billing.frequency,
            name: billing.name,
            number: billing.number,
            description: billing.description,
            created_at: billing.created_at,
            updated_at: billing.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPayload {
    pub medicine_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub frequency: Option<String>,
    pub name: Option<String>,
    pub number: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBilling {
    pub medicine_id: Uuid,
    pub store_id: Uuid,
    pub frequency: Frequency,
    pub name: String,
    pub number: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BillingChanges {
    pub medicine_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub frequency: Option<Frequency>,
    pub name: Option<String>,
    pub number: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BillingFilter {
    pub scope: Scope,
    pub store_id: Option<Uuid>,
    pub medicine_id: Option<Uuid>,
    /// Case-insensitive substring of the patient name.
    pub patient_name: Option<String>,
}

impl BillingFilter {
    pub fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            store_id: None,
            medicine_id: None,
            patient_name: None,
        }
    }
}

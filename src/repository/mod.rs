//! Storage for stores, medicines, billings and users.
//!
//! Handlers only talk to [`Repository`]; [`PgRepository`] backs the server and
//! [`MemoryRepository`] backs the tests and database-less runs. Both enforce
//! the same unique and reference constraints so handlers see identical errors.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Billing, BillingChanges, BillingDetail, BillingFilter, Medicine, MedicineChanges,
    MedicineDetail, MedicineFilter, NewBilling, NewMedicine, NewUser, Scope, Store, User,
    UserChanges,
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique index rejected the write; carries the index name.
    #[error("unique constraint `{0}` violated")]
    Conflict(String),
    /// A foreign key or check constraint rejected the write.
    #[error("constraint `{0}` violated")]
    Constraint(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            if db_err.is_unique_violation() {
                return RepositoryError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                return RepositoryError::Constraint(constraint);
            }
        }
        RepositoryError::Database(err)
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait Repository: Send + Sync {
    // Stores, ordered by name.
    async fn list_stores(&self, scope: Scope) -> RepositoryResult<Vec<Store>>;
    async fn get_store(&self, id: Uuid) -> RepositoryResult<Option<Store>>;
    async fn find_store_by_name(
        &self,
        name: &str,
        excluding: Option<Uuid>,
    ) -> RepositoryResult<Option<Store>>;
    async fn insert_store(&self, name: &str) -> RepositoryResult<Store>;
    async fn update_store(&self, id: Uuid, name: &str) -> RepositoryResult<Option<Store>>;
    async fn delete_store(&self, id: Uuid) -> RepositoryResult<Option<Store>>;

    // Medicines, ordered by name.
    async fn list_medicines(&self, filter: &MedicineFilter) -> RepositoryResult<Vec<MedicineDetail>>;
    async fn get_medicine(&self, id: Uuid) -> RepositoryResult<Option<Medicine>>;
    async fn get_medicine_detail(&self, id: Uuid) -> RepositoryResult<Option<MedicineDetail>>;
    async fn insert_medicine(&self, medicine: NewMedicine) -> RepositoryResult<Medicine>;
    async fn update_medicine(
        &self,
        id: Uuid,
        changes: MedicineChanges,
    ) -> RepositoryResult<Option<Medicine>>;
    async fn set_medicine_stock(&self, id: Uuid, stock: i32) -> RepositoryResult<Option<Medicine>>;
    /// Takes one unit off the stock; `None` when the medicine is gone or already at zero.
    async fn decrement_medicine_stock(&self, id: Uuid) -> RepositoryResult<Option<Medicine>>;
    async fn delete_medicine(&self, id: Uuid) -> RepositoryResult<Option<Medicine>>;
    async fn count_medicines_for_store(&self, store_id: Uuid) -> RepositoryResult<i64>;

    // Billings, newest first.
    async fn list_billings(&self, filter: &BillingFilter) -> RepositoryResult<Vec<BillingDetail>>;
    async fn get_billing(&self, id: Uuid) -> RepositoryResult<Option<Billing>>;
    async fn get_billing_detail(&self, id: Uuid) -> RepositoryResult<Option<BillingDetail>>;
    async fn insert_billing(&self, billing: NewBilling) -> RepositoryResult<Billing>;
    async fn update_billing(
        &self,
        id: Uuid,
        changes: BillingChanges,
    ) -> RepositoryResult<Option<Billing>>;
    async fn delete_billing(&self, id: Uuid) -> RepositoryResult<Option<Billing>>;
    async fn count_billings_for_store(&self, store_id: Uuid) -> RepositoryResult<i64>;
    async fn count_billings_for_medicine(&self, medicine_id: Uuid) -> RepositoryResult<i64>;

    // Users, ordered by email.
    async fn list_users(&self) -> RepositoryResult<Vec<User>>;
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn insert_user(&self, user: NewUser) -> RepositoryResult<User>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepositoryResult<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> RepositoryResult<Option<User>>;
}

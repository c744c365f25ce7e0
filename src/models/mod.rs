pub mod billing;
pub mod medicine;
pub mod store;
pub mod user;

use thiserror::Error;
use uuid::Uuid;

pub use billing::{
    Billing, BillingChanges, BillingDetail, BillingFilter, BillingPayload, Frequency, MedicineRef,
    NewBilling,
};
pub use medicine::{
    parse_expiry_date, Medicine, MedicineChanges, MedicineDetail, MedicineFilter,
    MedicinePayload, NewMedicine, StockPayload,
};
pub use store::{Store, StorePayload, StoreRef};
pub use user::{normalize_email, NewUser, Role, User, UserChanges, UserPayload, UserResponse};

/// Which stores a caller is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Store(Uuid),
    /// A store user without an assigned store sees nothing.
    Nothing,
}

impl Scope {
    pub fn allows(&self, store_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Store(id) => *id == store_id,
            Scope::Nothing => false,
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid {kind}: `{value}`")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_allows_only_its_store() {
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(Scope::All.allows(other));
        assert!(Scope::Store(mine).allows(mine));
        assert!(!Scope::Store(mine).allows(other));
        assert!(!Scope::Nothing.allows(mine));
    }
}

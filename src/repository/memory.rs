use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{Repository, RepositoryError, RepositoryResult};
use crate::models::{
    Billing, BillingChanges, BillingDetail, BillingFilter, Medicine, MedicineChanges,
    MedicineDetail, MedicineFilter, MedicineRef, NewBilling, NewMedicine, NewUser, Scope, Store,
    StoreRef, User, UserChanges,
};

#[derive(Default)]
struct Tables {
    stores: HashMap<Uuid, Store>,
    medicines: HashMap<Uuid, Medicine>,
    billings: HashMap<Uuid, Billing>,
    users: HashMap<Uuid, User>,
}

impl Tables {
    fn store_ref(&self, id: Uuid) -> Option<StoreRef> {
        self.stores.get(&id).map(|store| StoreRef {
            id: store.id,
            name: store.name.clone(),
        })
    }

    fn medicine_detail(&self, medicine: &Medicine) -> MedicineDetail {
        let store_name = self.stores.get(&medicine.store_id).map(|s| s.name.clone());
        MedicineDetail::new(medicine.clone(), store_name)
    }

    fn billing_detail(&self, billing: &Billing) -> BillingDetail {
        let medicine = self.medicines.get(&billing.medicine_id).map(MedicineRef::from);
        BillingDetail::new(billing.clone(), medicine, self.store_ref(billing.store_id))
    }

    fn require_store(&self, id: Uuid, constraint: &str) -> RepositoryResult<()> {
        if self.stores.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::Constraint(constraint.to_string()))
        }
    }

    fn require_medicine(&self, id: Uuid) -> RepositoryResult<()> {
        if self.medicines.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::Constraint("billings_medicine_id_fkey".to_string()))
        }
    }

    fn store_name_taken(&self, name: &str, excluding: Option<Uuid>) -> bool {
        self.stores
            .values()
            .any(|s| s.name == name && Some(s.id) != excluding)
    }

    fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != excluding)
    }
}

/// Keeps every table in process memory; mirrors the Postgres constraints.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_stores(&self, scope: Scope) -> RepositoryResult<Vec<Store>> {
        let tables = self.tables.read();
        let mut stores: Vec<Store> = tables
            .stores
            .values()
            .filter(|s| scope.allows(s.id))
            .cloned()
            .collect();
        stores.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stores)
    }

    async fn get_store(&self, id: Uuid) -> RepositoryResult<Option<Store>> {
        Ok(self.tables.read().stores.get(&id).cloned())
    }

    async fn find_store_by_name(
        &self,
        name: &str,
        excluding: Option<Uuid>,
    ) -> RepositoryResult<Option<Store>> {
        let tables = self.tables.read();
        Ok(tables
            .stores
            .values()
            .find(|s| s.name == name && Some(s.id) != excluding)
            .cloned())
    }

    async fn insert_store(&self, name: &str) -> RepositoryResult<Store> {
        let mut tables = self.tables.write();
        if tables.store_name_taken(name, None) {
            return Err(RepositoryError::Conflict("stores_name_key".to_string()));
        }
        let now = Utc::now();
        let store = Store {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.stores.insert(store.id, store.clone());
        Ok(store)
    }

    async fn update_store(&self, id: Uuid, name: &str) -> RepositoryResult<Option<Store>> {
        let mut tables = self.tables.write();
        if !tables.stores.contains_key(&id) {
            return Ok(None);
        }
        if tables.store_name_taken(name, Some(id)) {
            return Err(RepositoryError::Conflict("stores_name_key".to_string()));
        }
        let store = tables.stores.get_mut(&id).map(|store| {
            store.name = name.to_string();
            store.updated_at = Utc::now();
            store.clone()
        });
        Ok(store)
    }

    async fn delete_store(&self, id: Uuid) -> RepositoryResult<Option<Store>> {
        let mut tables = self.tables.write();
        if tables.medicines.values().any(|m| m.store_id == id) {
            return Err(RepositoryError::Constraint("medicines_store_id_fkey".to_string()));
        }
        if tables.billings.values().any(|b| b.store_id == id) {
            return Err(RepositoryError::Constraint("billings_store_id_fkey".to_string()));
        }
        let removed = tables.stores.remove(&id);
        if removed.is_some() {
            // users.store_id is ON DELETE SET NULL
            for user in tables.users.values_mut().filter(|u| u.store_id == Some(id)) {
                user.store_id = None;
            }
        }
        Ok(removed)
    }

    async fn list_medicines(&self, filter: &MedicineFilter) -> RepositoryResult<Vec<MedicineDetail>> {
        let tables = self.tables.read();
        let mut medicines: Vec<MedicineDetail> = tables
            .medicines
            .values()
            .filter(|m| filter.scope.allows(m.store_id))
            .filter(|m| filter.store_id.map_or(true, |id| m.store_id == id))
            .map(|m| tables.medicine_detail(m))
            .collect();
        medicines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(medicines)
    }

    async fn get_medicine(&self, id: Uuid) -> RepositoryResult<Option<Medicine>> {
        Ok(self.tables.read().medicines.get(&id).cloned())
    }

    async fn get_medicine_detail(&self, id: Uuid) -> RepositoryResult<Option<MedicineDetail>> {
        let tables = self.tables.read();
        Ok(tables.medicines.get(&id).map(|m| tables.medicine_detail(m)))
    }

    async fn insert_medicine(&self, medicine: NewMedicine) -> RepositoryResult<Medicine> {
        let mut tables = self.tables.write();
        tables.require_store(medicine.store_id, "medicines_store_id_fkey")?;
        if medicine.stock < 0 {
            return Err(RepositoryError::Constraint("medicines_stock_check".to_string()));
        }
        let now = Utc::now();
        let medicine = Medicine {
            id: Uuid::new_v4(),
            name: medicine.name,
            store_id: medicine.store_id,
            expiry_date: medicine.expiry_date,
            stock: medicine.stock,
            batch_number: medicine.batch_number,
            created_at: now,
            updated_at: now,
        };
        tables.medicines.insert(medicine.id, medicine.clone());
        Ok(medicine)
    }

    async fn update_medicine(
        &self,
        id: Uuid,
        changes: MedicineChanges,
    ) -> RepositoryResult<Option<Medicine>> {
        let mut tables = self.tables.write();
        if let Some(store_id) = changes.store_id {
            tables.require_store(store_id, "medicines_store_id_fkey")?;
        }
        if changes.stock.map_or(false, |stock| stock < 0) {
            return Err(RepositoryError::Constraint("medicines_stock_check".to_string()));
        }
        let medicine = tables.medicines.get_mut(&id).map(|medicine| {
            if let Some(name) = changes.name {
                medicine.name = name;
            }
            if let Some(store_id) = changes.store_id {
                medicine.store_id = store_id;
            }
            if let Some(expiry_date) = changes.expiry_date {
                medicine.expiry_date = expiry_date;
            }
            if let Some(stock) = changes.stock {
                medicine.stock = stock;
            }
            if let Some(batch_number) = changes.batch_number {
                medicine.batch_number = batch_number;
            }
            medicine.updated_at = Utc::now();
            medicine.clone()
        });
        Ok(medicine)
    }

    async fn set_medicine_stock(&self, id: Uuid, stock: i32) -> RepositoryResult<Option<Medicine>> {
        self.update_medicine(
            id,
            MedicineChanges {
                stock: Some(stock),
                ..MedicineChanges::default()
            },
        )
        .await
    }

    async fn decrement_medicine_stock(&self, id: Uuid) -> RepositoryResult<Option<Medicine>> {
        let mut tables = self.tables.write();
        let medicine = tables
            .medicines
            .get_mut(&id)
            .filter(|m| m.stock > 0)
            .map(|medicine| {
                medicine.stock -= 1;
                medicine.updated_at = Utc::now();
                medicine.clone()
            });
        Ok(medicine)
    }

    async fn delete_medicine(&self, id: Uuid) -> RepositoryResult<Option<Medicine>> {
        let mut tables = self.tables.write();
        if tables.billings.values().any(|b| b.medicine_id == id) {
            return Err(RepositoryError::Constraint("billings_medicine_id_fkey".to_string()));
        }
        Ok(tables.medicines.remove(&id))
    }

    async fn count_medicines_for_store(&self, store_id: Uuid) -> RepositoryResult<i64> {
        let tables = self.tables.read();
        Ok(tables.medicines.values().filter(|m| m.store_id == store_id).count() as i64)
    }

    async fn list_billings(&self, filter: &BillingFilter) -> RepositoryResult<Vec<BillingDetail>> {
        let tables = self.tables.read();
        let needle = filter.patient_name.as_ref().map(|n| n.to_lowercase());
        let mut billings: Vec<&Billing> = tables
            .billings
            .values()
            .filter(|b| filter.scope.allows(b.store_id))
            .filter(|b| filter.store_id.map_or(true, |id| b.store_id == id))
            .filter(|b| filter.medicine_id.map_or(true, |id| b.medicine_id == id))
            .filter(|b| {
                needle
                    .as_ref()
                    .map_or(true, |n| b.name.to_lowercase().contains(n.as_str()))
            })
            .collect();
        billings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(billings.into_iter().map(|b| tables.billing_detail(b)).collect())
    }

    async fn get_billing(&self, id: Uuid) -> RepositoryResult<Option<Billing>> {
        Ok(self.tables.read().billings.get(&id).cloned())
    }

    async fn get_billing_detail(&self, id: Uuid) -> RepositoryResult<Option<BillingDetail>> {
        let tables = self.tables.read();
        Ok(tables.billings.get(&id).map(|b| tables.billing_detail(b)))
    }

    async fn insert_billing(&self, billing: NewBilling) -> RepositoryResult<Billing> {
        let mut tables = self.tables.write();
        tables.require_medicine(billing.medicine_id)?;
        tables.require_store(billing.store_id, "billings_store_id_fkey")?;
        let now = Utc::now();
        let billing = Billing {
            id: Uuid::new_v4(),
            medicine_id: billing.medicine_id,
            store_id: billing.store_id,
            frequency: billing.frequency,
            name: billing.name,
            number: billing.number,
            description: billing.description,
            created_at: now,
            updated_at: now,
        };
        tables.billings.insert(billing.id, billing.clone());
        Ok(billing)
    }

    async fn update_billing(
        &self,
        id: Uuid,
        changes: BillingChanges,
    ) -> RepositoryResult<Option<Billing>> {
        let mut tables = self.tables.write();
        if let Some(medicine_id) = changes.medicine_id {
            tables.require_medicine(medicine_id)?;
        }
        if let Some(store_id) = changes.store_id {
            tables.require_store(store_id, "billings_store_id_fkey")?;
        }
        let billing = tables.billings.get_mut(&id).map(|billing| {
            if let Some(medicine_id) = changes.medicine_id {
                billing.medicine_id = medicine_id;
            }
            if let Some(store_id) = changes.store_id {
                billing.store_id = store_id;
            }
            if let Some(frequency) = changes.frequency {
                billing.frequency = frequency;
            }
            if let Some(name) = changes.name {
                billing.name = name;
            }
            if let Some(number) = changes.number {
                billing.number = number;
            }
            if let Some(description) = changes.description {
                billing.description = Some(description);
            }
            billing.updated_at = Utc::now();
            billing.clone()
        });
        Ok(billing)
    }

    async fn delete_billing(&self, id: Uuid) -> RepositoryResult<Option<Billing>> {
        Ok(self.tables.write().billings.remove(&id))
    }

    async fn count_billings_for_store(&self, store_id: Uuid) -> RepositoryResult<i64> {
        let tables = self.tables.read();
        Ok(tables.billings.values().filter(|b| b.store_id == store_id).count() as i64)
    }

    async fn count_billings_for_medicine(&self, medicine_id: Uuid) -> RepositoryResult<i64> {
        let tables = self.tables.read();
        Ok(tables
            .billings
            .values()
            .filter(|b| b.medicine_id == medicine_id)
            .count() as i64)
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        let tables = self.tables.read();
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let tables = self.tables.read();
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> RepositoryResult<User> {
        let mut tables = self.tables.write();
        if tables.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict("users_email_key".to_string()));
        }
        if let Some(store_id) = user.store_id {
            tables.require_store(store_id, "users_store_id_fkey")?;
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            store_id: user.store_id,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepositoryResult<Option<User>> {
        let mut tables = self.tables.write();
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(RepositoryError::Conflict("users_email_key".to_string()));
            }
        }
        if let Some(store_id) = changes.store_id {
            tables.require_store(store_id, "users_store_id_fkey")?;
        }
        let user = tables.users.get_mut(&id).map(|user| {
            if let Some(email) = changes.email {
                user.email = email;
            }
            if let Some(password_hash) = changes.password_hash {
                user.password_hash = password_hash;
            }
            if let Some(role) = changes.role {
                user.role = role;
            }
            if let Some(store_id) = changes.store_id {
                user.store_id = Some(store_id);
            }
            user.updated_at = Utc::now();
            user.clone()
        });
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.tables.write().users.remove(&id))
    }
}

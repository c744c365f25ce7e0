use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Repository, RepositoryResult};
use crate::{
    database::Database,
    models::{
        Billing, BillingChanges, BillingDetail, BillingFilter, Medicine, MedicineChanges,
        MedicineDetail, MedicineFilter, MedicineRef, NewBilling, NewMedicine, NewUser, Scope,
        Store, StoreRef, User, UserChanges,
    },
};

const MEDICINE_DETAIL_SELECT: &str = r#"
    SELECT m.id, m.name, m.store_id, m.expiry_date, m.stock, m.batch_number,
           m.created_at, m.updated_at, s.name AS store_name
    FROM medicines m
    LEFT JOIN stores s ON s.id = m.store_id
"#;

const BILLING_DETAIL_SELECT: &str = r#"
    SELECT b.id, b.medicine_id, b.store_id, b.frequency, b.name, b.number, b.description,
           b.created_at, b.updated_at,
           m.name AS medicine_name, m.expiry_date AS medicine_expiry_date,
           m.stock AS medicine_stock, m.batch_number AS medicine_batch_number,
           s.name AS store_name
    FROM billings b
    LEFT JOIN medicines m ON m.id = b.medicine_id
    LEFT JOIN stores s ON s.id = b.store_id
"#;

#[derive(FromRow)]
struct MedicineDetailRow {
    #[sqlx(flatten)]
    medicine: Medicine,
    store_name: Option<String>,
}

impl From<MedicineDetailRow> for MedicineDetail {
    fn from(row: MedicineDetailRow) -> Self {
        MedicineDetail::new(row.medicine, row.store_name)
    }
}

#[derive(FromRow)]
struct BillingDetailRow {
    #[sqlx(flatten)]
    billing: Billing,
    medicine_name: Option<String>,
    medicine_expiry_date: Option<DateTime<Utc>>,
    medicine_stock: Option<i32>,
    medicine_batch_number: Option<String>,
    store_name: Option<String>,
}

impl From<BillingDetailRow> for BillingDetail {
    fn from(row: BillingDetailRow) -> Self {
        let medicine = match (
            row.medicine_name,
            row.medicine_expiry_date,
            row.medicine_stock,
            row.medicine_batch_number,
        ) {
            (Some(name), Some(expiry_date), Some(stock), Some(batch_number)) => Some(MedicineRef {
                id: row.billing.medicine_id,
                name,
                expiry_date,
                stock,
                batch_number,
            }),
            _ => None,
        };
        let store = row.store_name.map(|name| StoreRef {
            id: row.billing.store_id,
            name,
        });
        BillingDetail::new(row.billing, medicine, store)
    }
}

/// Appends ` WHERE ` before the first condition and ` AND ` before the rest.
struct Conditions {
    started: bool,
}

impl Conditions {
    fn new() -> Self {
        Self { started: false }
    }

    fn next<'a>(&mut self, query: &mut QueryBuilder<'a, Postgres>) {
        query.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
    }
}

fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct PgRepository {
    db: Database,
}

impl PgRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn list_stores(&self, scope: Scope) -> RepositoryResult<Vec<Store>> {
        let stores = match scope {
            Scope::All => {
                sqlx::query_as::<_, Store>("SELECT * FROM stores ORDER BY name")
                    .fetch_all(&self.db)
                    .await?
            }
            Scope::Store(id) => {
                sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
                    .bind(id)
                    .fetch_all(&self.db)
                    .await?
            }
            Scope::Nothing => Vec::new(),
        };
        Ok(stores)
    }

    async fn get_store(&self, id: Uuid) -> RepositoryResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(store)
    }

    async fn find_store_by_name(
        &self,
        name: &str,
        excluding: Option<Uuid>,
    ) -> RepositoryResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(
            "SELECT * FROM stores WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(name)
        .bind(excluding)
        .fetch_optional(&self.db)
        .await?;
        Ok(store)
    }

    async fn insert_store(&self, name: &str) -> RepositoryResult<Store> {
        let store = sqlx::query_as::<_, Store>(
            "INSERT INTO stores (id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.db)
        .await?;
        Ok(store)
    }

    async fn update_store(&self, id: Uuid, name: &str) -> RepositoryResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(
            "UPDATE stores SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(store)
    }

    async fn delete_store(&self, id: Uuid) -> RepositoryResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>("DELETE FROM stores WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(store)
    }

    async fn list_medicines(&self, filter: &MedicineFilter) -> RepositoryResult<Vec<MedicineDetail>> {
        let mut query = QueryBuilder::<Postgres>::new(MEDICINE_DETAIL_SELECT);
        let mut conditions = Conditions::new();

        match filter.scope {
            Scope::All => {}
            Scope::Store(id) => {
                conditions.next(&mut query);
                query.push("m.store_id = ").push_bind(id);
            }
            Scope::Nothing => return Ok(Vec::new()),
        }
        if let Some(store_id) = filter.store_id {
            conditions.next(&mut query);
            query.push("m.store_id = ").push_bind(store_id);
        }
        query.push(" ORDER BY m.name");

        let medicines = query
            .build_query_as::<MedicineDetailRow>()
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(MedicineDetail::from)
            .collect();
        Ok(medicines)
    }

    async fn get_medicine(&self, id: Uuid) -> RepositoryResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(medicine)
    }

    async fn get_medicine_detail(&self, id: Uuid) -> RepositoryResult<Option<MedicineDetail>> {
        let mut query = QueryBuilder::<Postgres>::new(MEDICINE_DETAIL_SELECT);
        query.push(" WHERE m.id = ").push_bind(id);

        let medicine = query
            .build_query_as::<MedicineDetailRow>()
            .fetch_optional(&self.db)
            .await?
            .map(MedicineDetail::from);
        Ok(medicine)
    }

    async fn insert_medicine(&self, medicine: NewMedicine) -> RepositoryResult<Medicine> {
        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            INSERT INTO medicines (id, name, store_id, expiry_date, stock, batch_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&medicine.name)
        .bind(medicine.store_id)
        .bind(medicine.expiry_date)
        .bind(medicine.stock)
        .bind(&medicine.batch_number)
        .fetch_one(&self.db)
        .await?;
        Ok(medicine)
    }

    async fn update_medicine(
        &self,
        id: Uuid,
        changes: MedicineChanges,
    ) -> RepositoryResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            UPDATE medicines SET
                name = COALESCE($2, name),
                store_id = COALESCE($3, store_id),
                expiry_date = COALESCE($4, expiry_date),
                stock = COALESCE($5, stock),
                batch_number = COALESCE($6, batch_number),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.store_id)
        .bind(changes.expiry_date)
        .bind(changes.stock)
        .bind(changes.batch_number)
        .fetch_optional(&self.db)
        .await?;
        Ok(medicine)
    }

    async fn set_medicine_stock(&self, id: Uuid, stock: i32) -> RepositoryResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(
            "UPDATE medicines SET stock = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(stock)
        .fetch_optional(&self.db)
        .await?;
        Ok(medicine)
    }

    async fn decrement_medicine_stock(&self, id: Uuid) -> RepositoryResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            UPDATE medicines SET stock = stock - 1, updated_at = NOW()
            WHERE id = $1 AND stock > 0
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(medicine)
    }

    async fn delete_medicine(&self, id: Uuid) -> RepositoryResult<Option<Medicine>> {
        let medicine =
            sqlx::query_as::<_, Medicine>("DELETE FROM medicines WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(medicine)
    }

    async fn count_medicines_for_store(&self, store_id: Uuid) -> RepositoryResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM medicines WHERE store_id = $1")
                .bind(store_id)
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    async fn list_billings(&self, filter: &BillingFilter) -> RepositoryResult<Vec<BillingDetail>> {
        let mut query = QueryBuilder::<Postgres>::new(BILLING_DETAIL_SELECT);
        let mut conditions = Conditions::new();

        match filter.scope {
            Scope::All => {}
            Scope::Store(id) => {
                conditions.next(&mut query);
                query.push("b.store_id = ").push_bind(id);
            }
            Scope::Nothing => return Ok(Vec::new()),
        }
        if let Some(store_id) = filter.store_id {
            conditions.next(&mut query);
            query.push("b.store_id = ").push_bind(store_id);
        }
        if let Some(medicine_id) = filter.medicine_id {
            conditions.next(&mut query);
            query.push("b.medicine_id = ").push_bind(medicine_id);
        }
        if let Some(name) = &filter.patient_name {
            conditions.next(&mut query);
            query
                .push("b.name ILIKE ")
                .push_bind(format!("%{}%", escape_like(name)));
        }
        query.push(" ORDER BY b.created_at DESC");

        let billings = query
            .build_query_as::<BillingDetailRow>()
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(BillingDetail::from)
            .collect();
        Ok(billings)
    }

    async fn get_billing(&self, id: Uuid) -> RepositoryResult<Option<Billing>> {
        let billing = sqlx::query_as::<_, Billing>("SELECT * FROM billings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(billing)
    }

    async fn get_billing_detail(&self, id: Uuid) -> RepositoryResult<Option<BillingDetail>> {
        let mut query = QueryBuilder::<Postgres>::new(BILLING_DETAIL_SELECT);
        query.push(" WHERE b.id = ").push_bind(id);

        let billing = query
            .build_query_as::<BillingDetailRow>()
            .fetch_optional(&self.db)
            .await?
            .map(BillingDetail::from);
        Ok(billing)
    }

    async fn insert_billing(&self, billing: NewBilling) -> RepositoryResult<Billing> {
        let billing = sqlx::query_as::<_, Billing>(
            r#"
            INSERT INTO billings (id, medicine_id, store_id, frequency, name, number, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(billing.medicine_id)
        .bind(billing.store_id)
        .bind(billing.frequency.as_str())
        .bind(&billing.name)
        .bind(&billing.number)
        .bind(&billing.description)
        .fetch_one(&self.db)
        .await?;
        Ok(billing)
    }

    async fn update_billing(
        &self,
        id: Uuid,
        changes: BillingChanges,
    ) -> RepositoryResult<Option<Billing>> {
        let billing = sqlx::query_as::<_, Billing>(
            r#"
            UPDATE billings SET
                medicine_id = COALESCE($2, medicine_id),
                store_id = COALESCE($3, store_id),
                frequency = COALESCE($4, frequency),
                name = COALESCE($5, name),
                number = COALESCE($6, number),
                description = COALESCE($7, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.medicine_id)
        .bind(changes.store_id)
        .bind(changes.frequency.map(|f| f.as_str()))
        .bind(changes.name)
        .bind(changes.number)
        .bind(changes.description)
        .fetch_optional(&self.db)
        .await?;
        Ok(billing)
    }

    async fn delete_billing(&self, id: Uuid) -> RepositoryResult<Option<Billing>> {
        let billing = sqlx::query_as::<_, Billing>("DELETE FROM billings WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(billing)
    }

    async fn count_billings_for_store(&self, store_id: Uuid) -> RepositoryResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM billings WHERE store_id = $1")
                .bind(store_id)
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    async fn count_billings_for_medicine(&self, medicine_id: Uuid) -> RepositoryResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM billings WHERE medicine_id = $1")
                .bind(medicine_id)
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY email")
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> RepositoryResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, role, store_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.store_id)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role),
                store_id = COALESCE($5, store_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.store_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("DELETE FROM users WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

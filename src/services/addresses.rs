use crate::{
    entities::{customer_address, CustomerAddress},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Saved-address service. Every query is scoped by the authenticated user's
/// id; an address belonging to someone else is indistinguishable from a
/// missing one.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Fields accepted when creating or replacing an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub label: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub state: Option<String>,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists a user's addresses, default first, then newest.
    pub async fn list_addresses(
        &self,
        user_id: &str,
    ) -> Result<Vec<customer_address::Model>, ServiceError> {
        Ok(CustomerAddress::find()
            .filter(customer_address::Column::UserId.eq(user_id))
            .order_by_desc(customer_address::Column::IsDefault)
            .order_by_desc(customer_address::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Creates an address. Marking it default demotes the user's previous
    /// default inside the same transaction.
    #[instrument(skip(self, input))]
    pub async fn create_address(
        &self,
        user_id: &str,
        input: AddressInput,
    ) -> Result<customer_address::Model, ServiceError> {
        let txn = self.db.begin().await?;

        if input.is_default {
            self.unset_defaults(&txn, user_id).await?;
        }

        let now = Utc::now();
        let address = customer_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id.to_string()),
            label: Set(input.label),
            line1: Set(input.line1),
            line2: Set(input.line2),
            city: Set(input.city),
            postal_code: Set(input.postal_code),
            state: Set(input.state),
            country: Set(input.country),
            is_default: Set(input.is_default),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::AddressCreated(address.id))
            .await;

        info!("Created address {} for user {}", address.id, user_id);
        Ok(address)
    }

    /// Replaces an address the user owns.
    #[instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        id: Uuid,
        user_id: &str,
        input: AddressInput,
    ) -> Result<customer_address::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = CustomerAddress::find_by_id(id)
            .filter(customer_address::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("address {} not found", id)))?;

        if input.is_default && !existing.is_default {
            self.unset_defaults(&txn, user_id).await?;
        }

        let mut active: customer_address::ActiveModel = existing.into();
        active.label = Set(input.label);
        active.line1 = Set(input.line1);
        active.line2 = Set(input.line2);
        active.city = Set(input.city);
        active.postal_code = Set(input.postal_code);
        active.state = Set(input.state);
        active.country = Set(input.country);
        active.is_default = Set(input.is_default);
        active.updated_at = Set(Utc::now());
        let address = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::AddressUpdated(address.id))
            .await;

        Ok(address)
    }

    /// Deletes an address the user owns.
    #[instrument(skip(self))]
    pub async fn delete_address(&self, id: Uuid, user_id: &str) -> Result<(), ServiceError> {
        let deleted = CustomerAddress::delete_many()
            .filter(customer_address::Column::Id.eq(id))
            .filter(customer_address::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("address {} not found", id)));
        }

        self.event_sender
            .send_or_log(Event::AddressDeleted(id))
            .await;

        Ok(())
    }

    async fn unset_defaults(
        &self,
        conn: &impl ConnectionTrait,
        user_id: &str,
    ) -> Result<(), ServiceError> {
        CustomerAddress::update_many()
            .col_expr(
                customer_address::Column::IsDefault,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(customer_address::Column::UserId.eq(user_id))
            .filter(customer_address::Column::IsDefault.eq(true))
            .exec(conn)
            .await?;
        Ok(())
    }
}

use crate::{
    catalog,
    entities::{
        cart::{self, BillingCycle},
        cart_item::{self, ItemType},
        Cart, CartItem,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Cart service for the storefront session carts.
///
/// Every operation is keyed by the opaque `session_id` the storefront sends
/// with each request and implicitly creates the cart on first access
/// (default: monthly billing, no items). Mutations run read-modify-write
/// inside a transaction; concurrent mutations to the same session are not
/// otherwise coordinated (last write wins).
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the cart for a session, creating an empty one if none exists.
    ///
    /// Get-or-create is an operation in its own right (`GET /cart`), and every
    /// mutating operation performs it first.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, session_id: &str) -> Result<CartWithItems, ServiceError> {
        let cart = self.load_or_create(&*self.db, session_id).await?;
        let items = self.items_for(&*self.db, cart.id).await?;
        Ok(CartWithItems { cart, items })
    }

    /// Adds a plan to the cart.
    ///
    /// Fails with a validation error if `plan_id` is not in the catalog. If
    /// the plan is already in the cart its quantity is incremented by the
    /// requested amount; otherwise a new line is appended. Quantities below 1
    /// are silently clamped to 1.
    #[instrument(skip(self))]
    pub async fn add_plan(
        &self,
        session_id: &str,
        plan_id: &str,
        quantity: i32,
    ) -> Result<CartWithItems, ServiceError> {
        let plan = catalog::lookup_plan(plan_id).ok_or_else(|| {
            ServiceError::ValidationError(format!("unknown plan id: {}", plan_id))
        })?;
        let quantity = quantity.max(1);

        let txn = self.db.begin().await?;
        let cart = self.load_or_create(&txn, session_id).await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ItemId.eq(plan_id))
            .filter(cart_item::Column::ItemType.eq(ItemType::Plan))
            .one(&txn)
            .await?;

        if let Some(item) = existing {
            let current = item.quantity;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(current + quantity);
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        } else {
            let now = Utc::now();
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                item_id: Set(plan.id.clone()),
                item_type: Set(ItemType::Plan),
                name: Set(plan.name.clone()),
                unit_price: Set(plan.monthly_price),
                quantity: Set(quantity),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        let cart = self.touch(&txn, cart).await?;
        let items = self.items_for(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                item_id: plan.id.clone(),
            })
            .await;

        info!("Added plan {} x{} to cart {}", plan.id, quantity, cart.id);
        Ok(CartWithItems { cart, items })
    }

    /// Adds an add-on to the cart. Add-ons are presence-only: adding one that
    /// is already in the cart is a no-op, quantity stays at 1.
    #[instrument(skip(self))]
    pub async fn add_addon(
        &self,
        session_id: &str,
        addon_id: &str,
    ) -> Result<CartWithItems, ServiceError> {
        let addon = catalog::lookup_addon(addon_id).ok_or_else(|| {
            ServiceError::ValidationError(format!("unknown addon id: {}", addon_id))
        })?;

        let txn = self.db.begin().await?;
        let cart = self.load_or_create(&txn, session_id).await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ItemId.eq(addon_id))
            .filter(cart_item::Column::ItemType.eq(ItemType::Addon))
            .one(&txn)
            .await?;

        if existing.is_some() {
            // Already present; nothing to persist.
            let items = self.items_for(&txn, cart.id).await?;
            txn.commit().await?;
            return Ok(CartWithItems { cart, items });
        }

        let now = Utc::now();
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart.id),
            item_id: Set(addon.id.clone()),
            item_type: Set(ItemType::Addon),
            name: Set(addon.name.clone()),
            unit_price: Set(addon.monthly_price),
            quantity: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let cart = self.touch(&txn, cart).await?;
        let items = self.items_for(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                item_id: addon.id.clone(),
            })
            .await;

        info!("Added addon {} to cart {}", addon.id, cart.id);
        Ok(CartWithItems { cart, items })
    }

    /// Sets the quantity of a line item. A quantity of zero or less removes
    /// the item; an unknown item id is a no-op success (already satisfied).
    #[instrument(skip(self))]
    pub async fn set_item_quantity(
        &self,
        session_id: &str,
        item_id: &str,
        quantity: i32,
    ) -> Result<CartWithItems, ServiceError> {
        if quantity <= 0 {
            return self.remove_item(session_id, item_id).await;
        }

        let txn = self.db.begin().await?;
        let cart = self.load_or_create(&txn, session_id).await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ItemId.eq(item_id))
            .one(&txn)
            .await?;

        let Some(item) = existing else {
            let items = self.items_for(&txn, cart.id).await?;
            txn.commit().await?;
            return Ok(CartWithItems { cart, items });
        };

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        item.update(&txn).await?;

        let cart = self.touch(&txn, cart).await?;
        let items = self.items_for(&txn, cart.id).await?;
        txn.commit().await?;

        Ok(CartWithItems { cart, items })
    }

    /// Removes every line matching `item_id`, regardless of item type.
    /// Absence is not an error, and the cart is left untouched in that case.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        session_id: &str,
        item_id: &str,
    ) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;
        let cart = self.load_or_create(&txn, session_id).await?;

        let deleted = CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ItemId.eq(item_id))
            .exec(&txn)
            .await?;

        let cart = if deleted.rows_affected > 0 {
            self.touch(&txn, cart).await?
        } else {
            cart
        };
        let items = self.items_for(&txn, cart.id).await?;
        txn.commit().await?;

        if deleted.rows_affected > 0 {
            self.event_sender
                .send_or_log(Event::CartItemRemoved {
                    cart_id: cart.id,
                    item_id: item_id.to_string(),
                })
                .await;
            info!("Removed item {} from cart {}", item_id, cart.id);
        }

        Ok(CartWithItems { cart, items })
    }

    /// Replaces the cart's billing cycle.
    #[instrument(skip(self))]
    pub async fn set_billing_cycle(
        &self,
        session_id: &str,
        cycle: BillingCycle,
    ) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;
        let cart = self.load_or_create(&txn, session_id).await?;

        let cart_id = cart.id;
        let mut active: cart::ActiveModel = cart.into();
        active.billing_cycle = Set(cycle);
        active.updated_at = Set(Utc::now());
        let cart = active.update(&txn).await?;

        let items = self.items_for(&txn, cart_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartBillingCycleChanged { cart_id, cycle })
            .await;

        Ok(CartWithItems { cart, items })
    }

    async fn load_or_create(
        &self,
        conn: &impl ConnectionTrait,
        session_id: &str,
    ) -> Result<cart::Model, ServiceError> {
        if let Some(cart) = Cart::find()
            .filter(cart::Column::SessionId.eq(session_id))
            .one(conn)
            .await?
        {
            return Ok(cart);
        }

        let cart_id = Uuid::new_v4();
        let now = Utc::now();
        let cart = cart::ActiveModel {
            id: Set(cart_id),
            session_id: Set(session_id.to_string()),
            billing_cycle: Set(BillingCycle::Monthly),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart_id))
            .await;

        info!("Created cart {}", cart_id);
        Ok(cart)
    }

    async fn items_for(
        &self,
        conn: &impl ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<Vec<cart_item::Model>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    async fn touch(
        &self,
        conn: &impl ConnectionTrait,
        cart: cart::Model,
    ) -> Result<cart::Model, ServiceError> {
        let mut active: cart::ActiveModel = cart.into();
        active.updated_at = Set(Utc::now());
        Ok(active.update(conn).await?)
    }
}

/// Cart with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct CartWithItems {
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
}

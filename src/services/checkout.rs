use crate::{
    config::AppConfig,
    entities::{
        cart::BillingCycle,
        order::{self, OrderStatus},
        order_item, Order,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{CreateSessionRequest, PaymentGateway, RecurringInterval, SessionLineItem},
    services::{carts::CartService, pricing},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Checkout service: converts a session cart into an external recurring
/// payment session plus a local order snapshot, and reconciles order status
/// from asynchronous payment notifications.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    cart_service: Arc<CartService>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cart_service: Arc<CartService>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            cart_service,
            gateway,
            event_sender,
            config,
        }
    }

    /// Creates an external checkout session for the cart of `session_id` and
    /// persists a pending order snapshot. Returns the provider redirect URL.
    ///
    /// Per-line charges follow the selected billing cycle: the monthly price
    /// per month, or once per year ten months' worth for plans and twelve for
    /// add-ons. Amounts are rounded to minor units per line, then summed, so
    /// the recorded total matches what the provider will actually charge.
    #[instrument(skip(self))]
    pub async fn create_checkout_session(&self, session_id: &str) -> Result<String, ServiceError> {
        let cart = self.cart_service.get_or_create_cart(session_id).await?;

        if cart.items.is_empty() {
            return Err(ServiceError::ValidationError("cart is empty".to_string()));
        }

        let cycle = cart.cart.billing_cycle;
        let interval = match cycle {
            BillingCycle::Monthly => RecurringInterval::Month,
            BillingCycle::Yearly => RecurringInterval::Year,
        };

        let mut line_items = Vec::with_capacity(cart.items.len());
        let mut total_minor: i64 = 0;

        for item in &cart.items {
            let per_period =
                pricing::recurring_unit_amount(item.unit_price, item.item_type, cycle);
            let unit_amount_minor = pricing::to_minor_units(per_period)?;
            total_minor += unit_amount_minor * i64::from(item.quantity);

            line_items.push(SessionLineItem {
                name: item.name.clone(),
                description: format!("{} - {} billing", item.item_type.as_str(), cycle.as_str()),
                unit_amount_minor,
                interval,
                quantity: i64::from(item.quantity),
            });
        }

        let session = self
            .gateway
            .create_recurring_checkout_session(CreateSessionRequest {
                currency: self.config.currency.clone(),
                line_items,
                success_url: self.config.checkout_success_url(),
                cancel_url: self.config.checkout_cancel_url(),
                metadata: vec![("cart_session_id".to_string(), session_id.to_string())],
            })
            .await?;

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let total_amount = pricing::from_minor_units(total_minor);

        let txn = self.db.begin().await.map_err(|e| self.orphan(&session.id, e))?;

        let insert_result: Result<(), sea_orm::DbErr> = async {
            order::ActiveModel {
                id: Set(order_id),
                cart_id: Set(cart.cart.id),
                checkout_session_id: Set(session.id.clone()),
                billing_cycle: Set(cycle),
                total_amount: Set(total_amount),
                currency: Set(self.config.currency.clone()),
                status: Set(OrderStatus::Pending),
                created_at: Set(now),
                paid_at: Set(None),
            }
            .insert(&txn)
            .await?;

            for item in &cart.items {
                order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order_id),
                    item_id: Set(item.item_id.clone()),
                    item_type: Set(item.item_type),
                    name: Set(item.name.clone()),
                    unit_price: Set(item.unit_price),
                    quantity: Set(item.quantity),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?;
            }

            txn.commit().await
        }
        .await;

        insert_result.map_err(|e| self.orphan(&session.id, e))?;

        self.event_sender
            .send_or_log(Event::CheckoutStarted {
                cart_id: cart.cart.id,
                order_id,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;

        info!(
            "Checkout session {} created for cart {}: order {} pending, total {} {}",
            session.id, cart.cart.id, order_id, total_amount, self.config.currency
        );
        Ok(session.redirect_url)
    }

    /// Applies a normalized payment notification to the matching order.
    ///
    /// Missing orders surface as `NotFound`; the webhook boundary logs and
    /// acknowledges them anyway so the provider stops redelivering. Status
    /// moves through [`OrderStatus::can_transition_to`]: re-delivery of the
    /// current status is a no-op, disallowed regressions are logged and
    /// dropped. A move to `paid` stamps `paid_at`.
    #[instrument(skip(self))]
    pub async fn handle_payment_notification(
        &self,
        checkout_session_id: &str,
        status: OrderStatus,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError> {
        let order = Order::find()
            .filter(order::Column::CheckoutSessionId.eq(checkout_session_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no order for checkout session {}",
                    checkout_session_id
                ))
            })?;

        let old_status = order.status;
        if old_status == status {
            info!(
                "Duplicate notification for order {} ({}), ignoring",
                order.id,
                status.as_str()
            );
            return Ok(());
        }

        if !old_status.can_transition_to(status) {
            warn!(
                "Ignoring out-of-order notification for order {}: {} -> {}",
                order.id,
                old_status.as_str(),
                status.as_str()
            );
            return Ok(());
        }

        let order_id = order.id;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        if status == OrderStatus::Paid {
            active.paid_at = Set(Some(occurred_at.unwrap_or_else(Utc::now)));
        }
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: status,
            })
            .await;

        info!(
            "Order {} status: {} -> {}",
            order_id,
            old_status.as_str(),
            status.as_str()
        );
        Ok(())
    }

    /// An order write failed after the external session was already created.
    /// There is no local record pointing at the session now; flag it loudly
    /// for manual reconciliation.
    fn orphan(&self, checkout_session_id: &str, err: sea_orm::DbErr) -> ServiceError {
        error!(
            "Order persistence failed after creating checkout session {}; external session is orphaned: {}",
            checkout_session_id, err
        );
        ServiceError::DatabaseError(err)
    }
}

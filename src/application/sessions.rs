use super::config::SessionPolicy;
use crate::domain::UserId;
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::OrderStoreBox;
use crate::domain::product::Product;
use crate::domain::session::{Field, Session};
use crate::error::{Result, StorefrontError};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Result of routing a text message through a session.
#[derive(Debug, PartialEq)]
pub enum Input {
    /// A plain annotation was written to the order.
    Saved { order: Order, field: Field },
    /// The text is a payment reference; submitting it is a state transition
    /// the engine performs.
    Reference { order: Order, code: String },
}

/// Per-buyer sessions over the durable order store.
///
/// Mutations for one buyer are linearized by a lock keyed on the buyer id;
/// unrelated buyers never contend. Callers take the lock with [`lock`] and
/// hold it for the whole event.
///
/// [`lock`]: SessionStore::lock
pub struct SessionStore {
    store: OrderStoreBox,
    locks: DashMap<UserId, Arc<Mutex<()>>>,
    policy: SessionPolicy,
}

/// Exclusive access to one buyer's session and orders.
///
/// Dropping it releases the buyer and forgets the lock entry when nobody
/// else is waiting for it, so the lock map only holds buyers in flight.
pub struct BuyerLock<'a> {
    locks: &'a DashMap<UserId, Arc<Mutex<()>>>,
    buyer: UserId,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for BuyerLock<'_> {
    fn drop(&mut self) {
        // The map and this guard hold the only references when idle.
        self.locks
            .remove_if(&self.buyer, |_, lock| Arc::strong_count(lock) == 2);
    }
}

impl SessionStore {
    /// Creates a session store over `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - Durable home of orders and sessions.
    /// * `policy` - What a new purchase does to the buyer's open order.
    pub fn new(store: OrderStoreBox, policy: SessionPolicy) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            policy,
        }
    }

    /// Acquires the buyer's lock. Waits while another event for the same
    /// buyer is in flight.
    pub async fn lock(&self, buyer: UserId) -> BuyerLock<'_> {
        let lock = self.locks.entry(buyer).or_default().clone();
        BuyerLock {
            locks: &self.locks,
            buyer,
            _guard: lock.lock_owned().await,
        }
    }

    /// Starts a new order for `product` and points the buyer's session at it.
    ///
    /// Fails with `ProductUnavailable` when the product is out of stock. The
    /// buyer's previous order is handled according to the session policy.
    ///
    /// # Arguments
    ///
    /// * `buyer` - The purchasing user.
    /// * `product` - The product being bought, as currently stocked.
    /// * `order_id` - A fresh id for the new order.
    pub async fn open(&self, buyer: UserId, product: &Product, order_id: OrderId) -> Result<Order> {
        if !product.stock.is_available() {
            return Err(StorefrontError::ProductUnavailable(product.id.clone()));
        }

        if let Some(prior) = self.session_order(buyer).await? {
            match self.policy {
                SessionPolicy::SingleActive if !prior.state.is_terminal() => {
                    return Err(StorefrontError::OrderInProgress(buyer));
                }
                SessionPolicy::Replace if prior.state.is_buyer_editable() => {
                    debug!(buyer, order_id = %prior.id, "Abandoning unsubmitted order");
                    self.store.remove_order(&prior.id).await?;
                }
                _ => {}
            }
        }

        let order = Order::new(order_id, buyer, product.id.clone());
        self.store.put_order(order.clone()).await?;
        self.store
            .put_session(Session::new(buyer, order.id.clone()))
            .await?;
        Ok(order)
    }

    /// The buyer's session, if they have one.
    pub async fn session(&self, buyer: UserId) -> Result<Option<Session>> {
        self.store.session(buyer).await
    }

    /// The field the session is waiting for; `Field::None` without a session.
    pub async fn current_field(&self, buyer: UserId) -> Result<Field> {
        Ok(self
            .store
            .session(buyer)
            .await?
            .map(|s| s.awaiting)
            .unwrap_or_default())
    }

    /// Makes `field` the one the next text message is written to.
    pub async fn set_field(&self, buyer: UserId, field: Field) -> Result<Session> {
        let mut session = self
            .store
            .session(buyer)
            .await?
            .ok_or(StorefrontError::NoActiveSession(buyer))?;
        session.awaiting = field;
        self.store.put_session(session.clone()).await?;
        Ok(session)
    }

    /// Points the buyer's session at `order_id`, awaiting `field`.
    pub async fn focus(&self, buyer: UserId, order_id: &OrderId, field: Field) -> Result<()> {
        let mut session = Session::new(buyer, order_id.clone());
        session.awaiting = field;
        self.store.put_session(session).await
    }

    /// Points the session back at `order_id`, awaiting `field`, unless the
    /// buyer has moved on to another order since. Returns whether it did.
    pub async fn refocus(&self, buyer: UserId, order_id: &OrderId, field: Field) -> Result<bool> {
        match self.store.session(buyer).await? {
            Some(session) if &session.order_id != order_id => Ok(false),
            _ => {
                self.focus(buyer, order_id, field).await?;
                Ok(true)
            }
        }
    }

    /// Stops waiting for input on `order_id`. A session that has moved on
    /// to another order is left alone.
    pub async fn release(&self, buyer: UserId, order_id: &OrderId) -> Result<()> {
        match self.store.session(buyer).await? {
            Some(mut session) if &session.order_id == order_id => {
                session.awaiting = Field::None;
                self.store.put_session(session).await
            }
            _ => Ok(()),
        }
    }

    /// Routes a text message to the field the session is waiting for.
    ///
    /// A validation failure leaves the session waiting for the same field so
    /// the buyer can simply try again.
    pub async fn record_input(&self, buyer: UserId, value: &str) -> Result<Input> {
        let mut session = match self.store.session(buyer).await? {
            Some(s) if s.awaiting != Field::None => s,
            _ => return Err(StorefrontError::NoActiveSession(buyer)),
        };
        let mut order = self
            .store
            .order(&session.order_id)
            .await?
            .ok_or(StorefrontError::NoActiveSession(buyer))?;

        let field = session.awaiting;
        let value = field.validate(value)?;
        match field {
            Field::Name => order.set_name(value)?,
            Field::Email => order.set_email(value)?,
            Field::PaymentReference => return Ok(Input::Reference { order, code: value }),
            Field::None => return Err(StorefrontError::NoActiveSession(buyer)),
        }

        self.store.put_order(order.clone()).await?;
        session.awaiting = Field::None;
        self.store.put_session(session).await?;
        Ok(Input::Saved { order, field })
    }

    /// Forgets the buyer's session. Their orders are left as they are.
    pub async fn close(&self, buyer: UserId) -> Result<()> {
        self.store.remove_session(buyer).await
    }

    /// Removes the buyer's session only if it still references `order_id`.
    pub async fn close_for(&self, buyer: UserId, order_id: &OrderId) -> Result<()> {
        match self.store.session(buyer).await? {
            Some(session) if &session.order_id == order_id => self.close(buyer).await,
            _ => Ok(()),
        }
    }

    /// The order referenced by the buyer's session, if it still exists.
    pub async fn session_order(&self, buyer: UserId) -> Result<Option<Order>> {
        match self.store.session(buyer).await? {
            Some(session) => self.store.order(&session.order_id).await,
            None => Ok(None),
        }
    }

    pub async fn order(&self, id: &OrderId) -> Result<Option<Order>> {
        self.store.order(id).await
    }

    /// Writes the order through to the store.
    pub async fn save_order(&self, order: Order) -> Result<()> {
        self.store.put_order(order).await
    }

    pub async fn discard_order(&self, id: &OrderId) -> Result<()> {
        self.store.remove_order(id).await
    }

    /// Orders that still await a transition.
    pub async fn open_orders(&self) -> Result<Vec<Order>> {
        let mut orders = self.store.all_orders().await?;
        orders.retain(|o| !o.state.is_terminal());
        Ok(orders)
    }

    /// Every stored order, including terminal ones a crash left behind.
    pub async fn stored_orders(&self) -> Result<Vec<Order>> {
        self.store.all_orders().await
    }
}

use super::config::{EngineConfig, OrderIdGenerator};
use super::gateway::ApprovalGateway;
use super::sessions::{Input, SessionStore};
use crate::domain::UserId;
use crate::domain::event::{Decision, FormStep, InboundEvent};
use crate::domain::notification::{DecisionTicket, Notification};
use crate::domain::order::{Order, OrderId, OrderLogEntry, OrderState};
use crate::domain::ports::{
    CatalogStoreBox, NotifierBox, OrderLogBox, OrderStoreBox, ReferenceGuardBox,
};
use crate::domain::product::Product;
use crate::domain::session::{Field, normalize_reference};
use crate::error::{Result, StorefrontError};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Fresh ids drawn before giving up on an order.
const MAX_ID_ATTEMPTS: usize = 8;

/// How an admin decision ended.
#[derive(Debug, PartialEq)]
pub enum Resolution {
    /// Delivered, logged and stock adjusted.
    Approved(OrderLogEntry),
    /// Discarded without touching stock or the log.
    Rejected(OrderId),
    /// The reference was consumed by another approved order in the meantime;
    /// the order is back to `awaiting_reference`.
    ReferenceConsumed { order_id: OrderId, reference: String },
}

/// The order lifecycle engine.
///
/// Drives every order from product selection to approval or rejection. Each
/// inbound event is handled to completion and the engine returns; nothing
/// blocks waiting for a buyer or an admin.
pub struct StorefrontEngine {
    pub(super) catalog: CatalogStoreBox,
    pub(super) sessions: SessionStore,
    pub(super) log: OrderLogBox,
    pub(super) guard: ReferenceGuardBox,
    pub(super) notifier: NotifierBox,
    pub(super) gateway: ApprovalGateway,
    pub(super) admins: HashSet<UserId>,
    ids: OrderIdGenerator,
}

impl StorefrontEngine {
    /// Creates a new `StorefrontEngine` over the given ports.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Products and payment methods.
    /// * `orders` - Durable home of open orders and sessions.
    /// * `log` - Append-only record of approved orders.
    /// * `guard` - Payment references consumed by approvals.
    /// * `notifier` - Transport towards buyers and admins.
    /// * `config` - Admins, session policy and id strategy.
    pub fn new(
        catalog: CatalogStoreBox,
        orders: OrderStoreBox,
        log: OrderLogBox,
        guard: ReferenceGuardBox,
        notifier: NotifierBox,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            sessions: SessionStore::new(orders, config.session_policy),
            log,
            guard,
            notifier,
            gateway: ApprovalGateway::new(config.admins.clone()),
            admins: config.admins.into_iter().collect(),
            ids: OrderIdGenerator::new(config.id_strategy),
        }
    }

    /// Processes one inbound event.
    ///
    /// User-facing failures are reported to whoever triggered the event and
    /// then returned. A decision on an already resolved order is acknowledged
    /// quietly and counts as success.
    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        let actor = event.actor();
        match self.dispatch(event).await {
            Ok(()) => Ok(()),
            Err(StorefrontError::AlreadyResolved(order_id)) => {
                self.send(Notification::AdminAck {
                    to: actor,
                    order_id: Some(order_id.clone()),
                    text: format!("Order {} not found / already processed", order_id),
                })
                .await;
                Ok(())
            }
            Err(e) => {
                if e.is_user_facing() {
                    self.send(Notification::Error {
                        to: actor,
                        message: e.to_string(),
                    })
                    .await;
                }
                Err(e)
            }
        }
    }

    async fn dispatch(&self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::Start { buyer } => self.start(buyer).await,
            InboundEvent::Browse { buyer, category } => {
                self.browse(buyer, category.as_deref()).await
            }
            InboundEvent::SelectProduct { buyer, product_id } => {
                self.select_product(buyer, &product_id).await.map(drop)
            }
            InboundEvent::AdvanceField { buyer, step } => self.advance_field(buyer, step).await,
            InboundEvent::SubmitFieldValue { buyer, text } => {
                self.submit_field_value(buyer, &text).await
            }
            InboundEvent::SelectPaymentMethod {
                buyer,
                order_id,
                method_id,
            } => self
                .select_payment_method(buyer, order_id.as_ref(), &method_id)
                .await
                .map(drop),
            InboundEvent::SubmitReference {
                buyer,
                order_id,
                code,
            } => self
                .submit_reference(buyer, order_id.as_ref(), &code)
                .await
                .map(drop),
            InboundEvent::AdminDecision {
                admin,
                order_id,
                decision,
            } => self.decide(admin, &order_id, decision).await.map(drop),
            InboundEvent::AddProduct { admin, listing } => {
                self.add_product(admin, &listing).await.map(drop)
            }
            InboundEvent::EditProduct {
                admin,
                product_id,
                listing,
            } => self
                .edit_product(admin, &product_id, &listing)
                .await
                .map(drop),
            InboundEvent::DeleteProduct { admin, product_id } => {
                self.delete_product(admin, &product_id).await
            }
            InboundEvent::AddPaymentMethod { admin, listing } => {
                self.add_payment_method(admin, &listing).await.map(drop)
            }
            InboundEvent::DeletePaymentMethod { admin, method_id } => {
                self.delete_payment_method(admin, &method_id).await
            }
            InboundEvent::AddSlider { admin, listing } => {
                self.add_slider(admin, &listing).await.map(drop)
            }
            InboundEvent::EditSlider {
                admin,
                slider_id,
                listing,
            } => self
                .edit_slider(admin, &slider_id, &listing)
                .await
                .map(drop),
            InboundEvent::DeleteSlider { admin, slider_id } => {
                self.delete_slider(admin, &slider_id).await
            }
            InboundEvent::ListOrders { admin } => self.list_orders(admin).await.map(drop),
            InboundEvent::ListPending { admin } => self.list_pending(admin).await.map(drop),
        }
    }

    /// Re-enumerates persisted state after a restart.
    ///
    /// Resumes the id generator past every known order and brings each stored
    /// order back to a consistent state:
    ///
    /// * a `pending_approval` order already in the Order Log had its approval
    ///   interrupted after logging; it is delivered and cleared.
    /// * a `pending_approval` order whose reference was committed but never
    ///   logged gets the reference back and is re-presented to the admins,
    ///   like every other pending order.
    /// * approved or rejected leftovers get their final message (again) and
    ///   are cleared.
    ///
    /// Returns how many orders were re-presented for a decision.
    pub async fn recover(&self) -> Result<usize> {
        let stored = self.sessions.stored_orders().await?;
        let logged = self.log.entries().await?;

        let highest = stored
            .iter()
            .map(|o| &o.id)
            .chain(logged.iter().map(|e| &e.order_id))
            .filter_map(OrderId::sequence_number)
            .max();
        if let Some(highest) = highest {
            self.ids.resume_after(highest);
        }

        let open = stored.len();
        let mut presented = 0;
        for order in stored {
            let state = order.state;
            match state {
                OrderState::PendingApproval => {
                    if self.resume_pending(order).await? {
                        presented += 1;
                    }
                }
                // Interrupted between the terminal transition and cleanup.
                OrderState::Approved => {
                    warn!(order_id = %order.id, "Finishing delivery of approved order");
                    self.redeliver(&order).await?;
                }
                OrderState::Rejected => {
                    warn!(order_id = %order.id, "Removing rejected order left open");
                    self.sessions.discard_order(&order.id).await?;
                    self.sessions.close_for(order.buyer, &order.id).await?;
                    self.send(Notification::Rejected {
                        to: order.buyer,
                        order_id: order.id,
                    })
                    .await;
                }
                _ => {}
            }
        }
        info!(
            open,
            pending = presented,
            logged = logged.len(),
            "Recovered persisted orders"
        );
        Ok(presented)
    }

    /// Reconciles one stored `pending_approval` order with the log and the
    /// guard. Returns `true` if it still needs a decision.
    async fn resume_pending(&self, mut order: Order) -> Result<bool> {
        if self.log.find_by_order(&order.id).await?.is_some() {
            warn!(order_id = %order.id, "Finishing approval interrupted after logging");
            order.approve()?;
            self.sessions.save_order(order.clone()).await?;
            self.redeliver(&order).await?;
            return Ok(false);
        }

        if let Some(reference) = order.reference.as_deref() {
            // Committed by an approval that died before reaching the log. No
            // approved order holds the code, so it is free again.
            if self.guard.is_known(reference).await?
                && self.log.find_by_reference(reference).await?.is_none()
            {
                warn!(order_id = %order.id, reference, "Releasing reference of an unfinished approval");
                self.guard.revoke(reference).await?;
            }
        }

        self.request_decision(&order).await?;
        Ok(true)
    }

    /// Delivers an approved order whose first delivery was interrupted. The
    /// buyer may get the payload twice; they never miss it.
    async fn redeliver(&self, order: &Order) -> Result<()> {
        match self.catalog.product(&order.product_id).await? {
            Some(product) => self.deliver(order, &product).await,
            None => {
                error!(order_id = %order.id, product_id = %order.product_id, "Approved order lost its product");
                self.alert_admins(
                    order,
                    format!(
                        "ALERT: order {} is approved but product {} is gone; deliver by hand",
                        order.id, order.product_id
                    ),
                )
                .await;
                self.sessions.discard_order(&order.id).await?;
                self.sessions.close_for(order.buyer, &order.id).await
            }
        }
    }

    /// Hands the payload to the buyer and clears the approved order.
    async fn deliver(&self, order: &Order, product: &Product) -> Result<()> {
        self.send(Notification::Delivered {
            to: order.buyer,
            order_id: order.id.clone(),
            kind: product.delivery,
            payload: product.payload.clone(),
        })
        .await;
        self.sessions.discard_order(&order.id).await?;
        self.sessions.close_for(order.buyer, &order.id).await
    }

    async fn alert_admins(&self, order: &Order, text: String) {
        for to in self.gateway.admins().to_vec() {
            self.send(Notification::AdminAlert {
                to,
                order_id: Some(order.id.clone()),
                text: text.clone(),
            })
            .await;
        }
    }

    /// A fresh order id no stored or logged order uses.
    async fn fresh_order_id(&self) -> Result<OrderId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            if self.sessions.order(&id).await?.is_none()
                && self.log.find_by_order(&id).await?.is_none()
            {
                return Ok(id);
            }
            warn!(order_id = %id, "Order id already taken");
        }
        Err(StorefrontError::InvariantViolation(format!(
            "no free order id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    /// Whether `user` may decide orders and manage the catalog.
    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    pub(super) fn require_admin(&self, user: UserId) -> Result<()> {
        if self.is_admin(user) {
            Ok(())
        } else {
            warn!(user, "Rejected admin action from non-admin");
            Err(StorefrontError::Unauthorized(user))
        }
    }

    /// Hands a message to the transport. Delivery failures are logged and
    /// never undo a committed transition.
    pub(super) async fn send(&self, notification: Notification) {
        let kind = notification.kind();
        let to = notification.recipient();
        if let Err(e) = self.notifier.notify(notification).await {
            warn!(to, kind, error = %e, "Failed to deliver notification");
        }
    }

    async fn product(&self, id: &str) -> Result<Product> {
        self.catalog
            .product(id)
            .await?
            .ok_or_else(|| StorefrontError::ProductNotFound(id.to_string()))
    }

    /// Finds the order a buyer event targets: the explicit id when given,
    /// otherwise the session's order. Buyers may only touch their own orders.
    async fn target_order(&self, buyer: UserId, order_id: Option<&OrderId>) -> Result<Order> {
        let order = match order_id {
            Some(id) => self
                .sessions
                .order(id)
                .await?
                .ok_or_else(|| StorefrontError::OrderNotFound(id.clone()))?,
            None => self
                .sessions
                .session_order(buyer)
                .await?
                .ok_or(StorefrontError::NoActiveSession(buyer))?,
        };
        if order.buyer != buyer {
            warn!(buyer, order_id = %order.id, owner = order.buyer, "Buyer touched a foreign order");
            return Err(StorefrontError::Unauthorized(buyer));
        }
        Ok(order)
    }

    /// `SelectProduct`: opens a new order in `collecting_info`.
    ///
    /// Fails with `ProductUnavailable` when the product is out of stock, and
    /// with `OrderInProgress` when the single-active policy forbids a second
    /// purchase.
    pub async fn select_product(&self, buyer: UserId, product_id: &str) -> Result<Order> {
        let _lock = self.sessions.lock(buyer).await;

        let product = self.product(product_id).await?;
        let order = self
            .sessions
            .open(buyer, &product, self.fresh_order_id().await?)
            .await?;

        info!(buyer, order_id = %order.id, product_id, "Order created");
        self.send(Notification::OrderCreated {
            to: buyer,
            order_id: order.id.clone(),
            product_name: product.name,
        })
        .await;
        Ok(order)
    }

    /// `AdvanceField`: chooses the next input, or declares readiness to pay.
    pub async fn advance_field(&self, buyer: UserId, step: FormStep) -> Result<()> {
        let _lock = self.sessions.lock(buyer).await;

        let mut order = self
            .sessions
            .session_order(buyer)
            .await?
            .ok_or(StorefrontError::NoActiveSession(buyer))?;

        let field = match step {
            FormStep::Name => Field::Name,
            FormStep::Email => Field::Email,
            FormStep::Pay => {
                let methods = self.catalog.payment_methods().await?;
                if methods.is_empty() {
                    return Err(StorefrontError::NoPaymentMethods);
                }
                order.request_payment()?;
                self.sessions.save_order(order.clone()).await?;
                self.sessions.set_field(buyer, Field::None).await?;

                self.send(Notification::PaymentOptions {
                    to: buyer,
                    order_id: order.id,
                    methods: methods.into_iter().map(|m| (m.id, m.address)).collect(),
                })
                .await;
                return Ok(());
            }
        };

        if !order.state.is_buyer_editable() {
            return Err(StorefrontError::InvalidTransition {
                order: order.id,
                from: order.state,
                to: order.state,
            });
        }
        self.sessions.set_field(buyer, field).await?;
        self.send(Notification::FieldPrompt {
            to: buyer,
            order_id: order.id,
            field,
        })
        .await;
        Ok(())
    }

    /// `SubmitFieldValue`: writes a text message into the awaited field.
    ///
    /// While a payment reference is awaited the text is submitted as one.
    pub async fn submit_field_value(&self, buyer: UserId, text: &str) -> Result<()> {
        let _lock = self.sessions.lock(buyer).await;

        match self.sessions.record_input(buyer, text).await? {
            Input::Saved { order, field } => {
                self.send(Notification::FieldSaved {
                    to: buyer,
                    order_id: order.id,
                    field,
                })
                .await;
                Ok(())
            }
            Input::Reference { order, code } => {
                self.submit_reference_locked(buyer, order, &code).await.map(drop)
            }
        }
    }

    /// `SelectPaymentMethod`: binds the method and shows where to pay.
    ///
    /// # Arguments
    ///
    /// * `buyer` - The order's owner; other users get `Unauthorized`.
    /// * `order_id` - The order to pay for, or `None` for the session's order.
    /// * `method_id` - The chosen payment method.
    pub async fn select_payment_method(
        &self,
        buyer: UserId,
        order_id: Option<&OrderId>,
        method_id: &str,
    ) -> Result<Order> {
        let _lock = self.sessions.lock(buyer).await;

        let mut order = self.target_order(buyer, order_id).await?;
        let method = self
            .catalog
            .payment_method(method_id)
            .await?
            .ok_or_else(|| StorefrontError::PaymentMethodNotFound(method_id.to_string()))?;
        let product = self.product(&order.product_id).await?;

        order.bind_payment_method(&method.id)?;
        self.sessions.save_order(order.clone()).await?;
        self.sessions
            .focus(buyer, &order.id, Field::PaymentReference)
            .await?;

        self.send(Notification::PaymentInstructions {
            to: buyer,
            order_id: order.id.clone(),
            price: product.price,
            address: method.address,
            qr: method.qr,
        })
        .await;
        Ok(order)
    }

    /// `SubmitReference`: moves the order to `pending_approval` and asks the
    /// admins for a decision.
    ///
    /// # Arguments
    ///
    /// * `buyer` - The order's owner; other users get `Unauthorized`.
    /// * `order_id` - The order paid for, or `None` for the session's order.
    /// * `code` - The payment reference; a code an approved order already
    ///   used fails with `DuplicateReference` and the order keeps waiting.
    pub async fn submit_reference(
        &self,
        buyer: UserId,
        order_id: Option<&OrderId>,
        code: &str,
    ) -> Result<Order> {
        let _lock = self.sessions.lock(buyer).await;

        let order = self.target_order(buyer, order_id).await?;
        let code = normalize_reference(code)?;
        self.submit_reference_locked(buyer, order, &code).await
    }

    // Caller holds the buyer lock and has normalized `code`.
    async fn submit_reference_locked(&self, buyer: UserId, mut order: Order, code: &str) -> Result<Order> {
        if order.state != OrderState::AwaitingReference {
            return Err(StorefrontError::InvalidTransition {
                order: order.id,
                from: order.state,
                to: OrderState::PendingApproval,
            });
        }

        if self.guard.is_known(code).await? {
            warn!(buyer, order_id = %order.id, reference = code, "Duplicate payment reference");
            self.sessions
                .focus(buyer, &order.id, Field::PaymentReference)
                .await?;
            self.send(Notification::DuplicateReference {
                to: buyer,
                order_id: order.id.clone(),
            })
            .await;
            return Err(StorefrontError::DuplicateReference(code.to_string()));
        }

        order.submit_reference(code.to_string())?;
        self.sessions.save_order(order.clone()).await?;
        self.sessions.release(buyer, &order.id).await?;

        info!(buyer, order_id = %order.id, reference = code, "Order submitted for approval");
        self.send(Notification::AwaitingApproval {
            to: buyer,
            order_id: order.id.clone(),
        })
        .await;
        self.request_decision(&order).await?;
        Ok(order)
    }

    /// Records (or re-uses) the decision ticket and presents it to the admins.
    pub(super) async fn request_decision(&self, order: &Order) -> Result<DecisionTicket> {
        let (name, price) = match self.catalog.product(&order.product_id).await? {
            Some(p) => (p.name, p.price),
            None => (order.product_id.clone(), "?".to_string()),
        };
        let ticket = self.gateway.request_decision(order, &name, &price)?;
        for request in self.gateway.presentations(&ticket) {
            self.send(request).await;
        }
        Ok(ticket)
    }

    /// `AdminDecision`: approves or rejects a `pending_approval` order.
    ///
    /// # Arguments
    ///
    /// * `admin` - The deciding user; anyone else gets `Unauthorized`.
    /// * `order_id` - The order the decision request named.
    /// * `decision` - Approve or reject.
    ///
    /// A decision on an order that is no longer pending yields
    /// `AlreadyResolved` and changes nothing.
    pub async fn decide(
        &self,
        admin: UserId,
        order_id: &OrderId,
        decision: Decision,
    ) -> Result<Resolution> {
        self.require_admin(admin)?;

        let buyer = match self.sessions.order(order_id).await? {
            Some(order) => order.buyer,
            None => return Err(StorefrontError::AlreadyResolved(order_id.clone())),
        };
        let _lock = self.sessions.lock(buyer).await;

        // Re-read under the lock; a concurrent decision may have won.
        let order = match self.sessions.order(order_id).await? {
            Some(order) if order.state == OrderState::PendingApproval => order,
            _ => return Err(StorefrontError::AlreadyResolved(order_id.clone())),
        };
        let ticket = self.gateway.on_decision(order_id).ok();

        match decision {
            Decision::Reject => self.reject(admin, order).await,
            Decision::Approve => match self.approve(admin, order).await {
                // The order is still pending unless the log refused it; keep
                // it decidable.
                Err(e) if !matches!(e, StorefrontError::InvariantViolation(_)) => {
                    if let Some(ticket) = ticket {
                        self.gateway.restore(ticket);
                    }
                    Err(e)
                }
                other => other,
            },
        }
    }

    async fn reject(&self, admin: UserId, mut order: Order) -> Result<Resolution> {
        order.reject()?;
        self.sessions.save_order(order.clone()).await?;
        self.sessions.discard_order(&order.id).await?;
        self.sessions.close_for(order.buyer, &order.id).await?;

        info!(admin, order_id = %order.id, "Order rejected");
        self.send(Notification::Rejected {
            to: order.buyer,
            order_id: order.id.clone(),
        })
        .await;
        self.send(Notification::AdminAck {
            to: admin,
            order_id: Some(order.id.clone()),
            text: format!("Order {} rejected", order.id),
        })
        .await;
        Ok(Resolution::Rejected(order.id))
    }

    async fn approve(&self, admin: UserId, mut order: Order) -> Result<Resolution> {
        let reference = order.reference.clone().ok_or_else(|| {
            StorefrontError::InvariantViolation(format!("order {} has no reference", order.id))
        })?;

        // Losing the race for the reference sends the buyer back for a new one.
        if !self.guard.commit(&reference).await? {
            if let Some(entry) = self.log.find_by_order(&order.id).await? {
                // This order holds the code; an earlier attempt logged it but
                // never delivered.
                warn!(admin, order_id = %order.id, "Completing approval logged by an earlier attempt");
                order.approve()?;
                self.sessions.save_order(order.clone()).await?;
                self.redeliver(&order).await?;
                return Ok(Resolution::Approved(entry));
            }

            order.reopen_for_reference()?;
            self.sessions.save_order(order.clone()).await?;
            // A buyer who has moved on resubmits by order id.
            self.sessions
                .refocus(order.buyer, &order.id, Field::PaymentReference)
                .await?;

            warn!(admin, order_id = %order.id, reference = %reference, "Reference consumed by another order");
            self.send(Notification::DuplicateReference {
                to: order.buyer,
                order_id: order.id.clone(),
            })
            .await;
            self.send(Notification::AdminAck {
                to: admin,
                order_id: Some(order.id.clone()),
                text: format!(
                    "Reference {} was already used; buyer asked for a new one",
                    reference
                ),
            })
            .await;
            return Ok(Resolution::ReferenceConsumed {
                order_id: order.id,
                reference,
            });
        }

        // Stock check and decrement happen in one store call.
        let product = match self.product(&order.product_id).await {
            Ok(product) => product,
            Err(e) => {
                self.guard.revoke(&reference).await?;
                return Err(e);
            }
        };
        if let Err(e) = self.catalog.take_unit(&product.id).await {
            self.guard.revoke(&reference).await?;
            warn!(admin, order_id = %order.id, product_id = %product.id, error = %e, "Approval failed");
            return Err(e);
        }

        // Logged before delivery; delivery cannot be taken back.
        order.approve()?;
        let entry = OrderLogEntry::from_approved(&order, &product.name)?;
        match self.log.append(entry.clone()).await {
            Ok(()) => {}
            Err(e @ StorefrontError::InvariantViolation(_)) => {
                return Err(self.abort_approval(admin, &order, &product, e).await);
            }
            Err(e) => {
                // Nothing was recorded; undo the take and the commit so the
                // order can be decided again.
                warn!(admin, order_id = %order.id, error = %e, "Order log unavailable");
                self.catalog.return_unit(&product.id).await?;
                self.guard.revoke(&reference).await?;
                return Err(e);
            }
        }

        // A restart redelivers an order stored as approved.
        self.sessions.save_order(order.clone()).await?;
        self.deliver(&order, &product).await?;

        info!(admin, order_id = %order.id, reference = %reference, product_id = %product.id, "Order approved");
        self.send(Notification::AdminAck {
            to: admin,
            order_id: Some(order.id.clone()),
            text: format!("Order {} approved & delivered", order.id),
        })
        .await;
        Ok(Resolution::Approved(entry))
    }

    /// The log refused the entry: two approved orders would share a
    /// reference. The order is rejected and the stock unit handed back.
    async fn abort_approval(
        &self,
        admin: UserId,
        order: &Order,
        product: &Product,
        cause: StorefrontError,
    ) -> StorefrontError {
        error!(admin, order_id = %order.id, error = %cause, "Order log rejected approved order");

        if let Err(e) = self.catalog.return_unit(&product.id).await {
            error!(product_id = %product.id, error = %e, "Failed to return stock unit");
        }
        if let Err(e) = self.sessions.discard_order(&order.id).await {
            error!(order_id = %order.id, error = %e, "Failed to discard order");
        }
        if let Err(e) = self.sessions.close_for(order.buyer, &order.id).await {
            error!(order_id = %order.id, error = %e, "Failed to close session");
        }

        self.send(Notification::Rejected {
            to: order.buyer,
            order_id: order.id.clone(),
        })
        .await;
        self.alert_admins(order, format!("ALERT: order {} rejected: {}", order.id, cause))
            .await;

        cause
    }

    /// Session for `buyer`, if any. Mostly useful to transports rendering the
    /// current form.
    pub async fn session(&self, buyer: UserId) -> Result<Option<crate::domain::session::Session>> {
        self.sessions.session(buyer).await
    }

    /// An order still open in the store. Approved and rejected orders are
    /// gone once their decision completes; approvals live on in the Order Log.
    pub async fn order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.sessions.order(order_id).await
    }

    /// Decision tickets still waiting for an admin, oldest first.
    pub fn outstanding_decisions(&self) -> Vec<DecisionTicket> {
        self.gateway.outstanding()
    }
}

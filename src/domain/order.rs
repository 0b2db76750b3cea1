use super::UserId;
use crate::error::{Result, StorefrontError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-shareable order identifier, e.g. `ORD-9F2A61C4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    const PREFIX: &'static str = "ORD-";

    pub fn random() -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", Self::PREFIX, token[..8].to_ascii_uppercase()))
    }

    pub fn sequential(n: u64) -> Self {
        Self(format!("{}{:08}", Self::PREFIX, n))
    }

    /// Numeric suffix, when the id has one. Used to resume a sequential
    /// generator after a restart.
    pub fn sequence_number(&self) -> Option<u64> {
        self.0.strip_prefix(Self::PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value.trim().to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    CollectingInfo,
    AwaitingPaymentMethod,
    AwaitingReference,
    PendingApproval,
    Approved,
    Rejected,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Approved | OrderState::Rejected)
    }

    /// States in which the buyer may still edit the order.
    pub fn is_buyer_editable(&self) -> bool {
        matches!(
            self,
            OrderState::CollectingInfo
                | OrderState::AwaitingPaymentMethod
                | OrderState::AwaitingReference
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderState::CollectingInfo => "collecting_info",
            OrderState::AwaitingPaymentMethod => "awaiting_payment_method",
            OrderState::AwaitingReference => "awaiting_reference",
            OrderState::PendingApproval => "pending_approval",
            OrderState::Approved => "approved",
            OrderState::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// An in-flight purchase.
///
/// Owned by the engine while open. Every mutation goes through one of the
/// transition methods below, which refuse anything but forward moves.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub buyer: UserId,
    pub product_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub payment_method: Option<String>,
    pub reference: Option<String>,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(id: OrderId, buyer: UserId, product_id: impl Into<String>) -> Self {
        Self {
            id,
            buyer,
            product_id: product_id.into(),
            name: None,
            email: None,
            payment_method: None,
            reference: None,
            state: OrderState::CollectingInfo,
            created_at: Utc::now(),
        }
    }

    fn invalid(&self, to: OrderState) -> StorefrontError {
        StorefrontError::InvalidTransition {
            order: self.id.clone(),
            from: self.state,
            to,
        }
    }

    pub fn set_name(&mut self, name: String) -> Result<()> {
        if !self.state.is_buyer_editable() {
            return Err(self.invalid(self.state));
        }
        self.name = Some(name);
        Ok(())
    }

    pub fn set_email(&mut self, email: String) -> Result<()> {
        if !self.state.is_buyer_editable() {
            return Err(self.invalid(self.state));
        }
        self.email = Some(email);
        Ok(())
    }

    /// Buyer is ready to pay. Repeating the request while already waiting for
    /// a method is allowed so the options can be shown again.
    pub fn request_payment(&mut self) -> Result<()> {
        match self.state {
            OrderState::CollectingInfo | OrderState::AwaitingPaymentMethod => {
                self.state = OrderState::AwaitingPaymentMethod;
                Ok(())
            }
            _ => Err(self.invalid(OrderState::AwaitingPaymentMethod)),
        }
    }

    pub fn bind_payment_method(&mut self, method_id: &str) -> Result<()> {
        if self.state != OrderState::AwaitingPaymentMethod {
            return Err(self.invalid(OrderState::AwaitingReference));
        }
        self.payment_method = Some(method_id.to_string());
        self.state = OrderState::AwaitingReference;
        Ok(())
    }

    pub fn submit_reference(&mut self, code: String) -> Result<()> {
        if self.state != OrderState::AwaitingReference {
            return Err(self.invalid(OrderState::PendingApproval));
        }
        self.reference = Some(code);
        self.state = OrderState::PendingApproval;
        Ok(())
    }

    /// Sends a submitted order back for a fresh reference after its code was
    /// consumed by another order at approval time.
    pub fn reopen_for_reference(&mut self) -> Result<()> {
        if self.state != OrderState::PendingApproval {
            return Err(self.invalid(OrderState::AwaitingReference));
        }
        self.reference = None;
        self.state = OrderState::AwaitingReference;
        Ok(())
    }

    pub fn approve(&mut self) -> Result<()> {
        if self.state != OrderState::PendingApproval {
            return Err(self.invalid(OrderState::Approved));
        }
        self.state = OrderState::Approved;
        Ok(())
    }

    /// Rejection is terminal from any non-terminal state.
    pub fn reject(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid(OrderState::Rejected));
        }
        self.state = OrderState::Rejected;
        Ok(())
    }
}

/// Write-once record of an approved order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderLogEntry {
    pub order_id: OrderId,
    pub buyer: UserId,
    pub product_id: String,
    pub product_name: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub reference: String,
    pub status: OrderState,
    pub created_at: DateTime<Utc>,
    pub approved_at: DateTime<Utc>,
}

impl OrderLogEntry {
    pub fn from_approved(order: &Order, product_name: &str) -> Result<Self> {
        let reference = match (&order.reference, order.state) {
            (Some(reference), OrderState::Approved) => reference.clone(),
            _ => {
                return Err(StorefrontError::InvariantViolation(format!(
                    "order {} logged without an approved reference",
                    order.id
                )));
            }
        };

        Ok(Self {
            order_id: order.id.clone(),
            buyer: order.buyer,
            product_id: order.product_id.clone(),
            product_name: product_name.to_string(),
            name: order.name.clone(),
            email: order.email.clone(),
            reference,
            status: order.state,
            created_at: order.created_at,
            approved_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_awaiting_reference() -> Order {
        let mut order = Order::new(OrderId::sequential(1), 42, "P0001");
        order.request_payment().unwrap();
        order.bind_payment_method("PM0001").unwrap();
        order
    }

    #[test]
    fn test_order_id_formats() {
        let random = OrderId::random();
        assert!(random.as_str().starts_with("ORD-"));
        assert_eq!(random.as_str().len(), 12);
        assert_eq!(OrderId::sequential(7).as_str(), "ORD-00000007");
        assert_eq!(OrderId::sequential(7).sequence_number(), Some(7));
        assert_eq!(OrderId::from("ORD-ABCDEF12").sequence_number(), None);
    }

    #[test]
    fn test_forward_transitions() {
        let mut order = order_awaiting_reference();
        assert_eq!(order.state, OrderState::AwaitingReference);
        assert_eq!(order.payment_method.as_deref(), Some("PM0001"));

        order.submit_reference("TXN1".into()).unwrap();
        assert_eq!(order.state, OrderState::PendingApproval);

        order.approve().unwrap();
        assert_eq!(order.state, OrderState::Approved);
        assert!(order.state.is_terminal());
    }

    #[test]
    fn test_payment_method_requires_readiness() {
        let mut order = Order::new(OrderId::sequential(1), 42, "P0001");
        let err = order.bind_payment_method("PM0001").unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidTransition { .. }));
        assert_eq!(order.state, OrderState::CollectingInfo);
    }

    #[test]
    fn test_request_payment_is_repeatable() {
        let mut order = Order::new(OrderId::sequential(1), 42, "P0001");
        order.request_payment().unwrap();
        order.request_payment().unwrap();
        assert_eq!(order.state, OrderState::AwaitingPaymentMethod);
    }

    #[test]
    fn test_submitted_order_is_frozen_for_buyer() {
        let mut order = order_awaiting_reference();
        order.submit_reference("TXN1".into()).unwrap();

        assert!(order.set_name("Mallory".into()).is_err());
        assert!(order.submit_reference("TXN2".into()).is_err());
        assert_eq!(order.reference.as_deref(), Some("TXN1"));
    }

    #[test]
    fn test_no_transition_out_of_terminal_states() {
        let mut order = order_awaiting_reference();
        order.reject().unwrap();
        assert!(order.approve().is_err());
        assert!(order.reject().is_err());
        assert_eq!(order.state, OrderState::Rejected);
    }

    #[test]
    fn test_reopen_clears_reference() {
        let mut order = order_awaiting_reference();
        order.submit_reference("TXN1".into()).unwrap();
        order.reopen_for_reference().unwrap();
        assert_eq!(order.state, OrderState::AwaitingReference);
        assert_eq!(order.reference, None);
    }

    #[test]
    fn test_log_entry_requires_approval() {
        let mut order = order_awaiting_reference();
        order.submit_reference("TXN1".into()).unwrap();
        assert!(OrderLogEntry::from_approved(&order, "Ebook").is_err());

        order.approve().unwrap();
        let entry = OrderLogEntry::from_approved(&order, "Ebook").unwrap();
        assert_eq!(entry.reference, "TXN1");
        assert_eq!(entry.status, OrderState::Approved);
        assert_eq!(entry.product_name, "Ebook");
    }
}

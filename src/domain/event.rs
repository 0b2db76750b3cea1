use super::UserId;
use super::order::OrderId;
use crate::error::StorefrontError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl FromStr for Decision {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "ap" => Ok(Decision::Approve),
            "reject" | "rej" => Ok(Decision::Reject),
            other => Err(StorefrontError::MalformedInput(format!(
                "unknown decision '{}'",
                other
            ))),
        }
    }
}

/// Buttons on the order form.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FormStep {
    Name,
    Email,
    /// Buyer is done annotating and wants to pay.
    Pay,
}

impl FromStr for FormStep {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(FormStep::Name),
            "email" => Ok(FormStep::Email),
            "pay" => Ok(FormStep::Pay),
            other => Err(StorefrontError::MalformedInput(format!(
                "unknown form step '{}'",
                other
            ))),
        }
    }
}

/// Everything the transport can hand to the engine.
///
/// Buyer events that carry an optional order id fall back to the order held
/// by the buyer's session. Admin decisions always name their order.
#[derive(Debug, PartialEq, Clone)]
pub enum InboundEvent {
    Start {
        buyer: UserId,
    },
    Browse {
        buyer: UserId,
        category: Option<String>,
    },
    SelectProduct {
        buyer: UserId,
        product_id: String,
    },
    AdvanceField {
        buyer: UserId,
        step: FormStep,
    },
    SubmitFieldValue {
        buyer: UserId,
        text: String,
    },
    SelectPaymentMethod {
        buyer: UserId,
        order_id: Option<OrderId>,
        method_id: String,
    },
    SubmitReference {
        buyer: UserId,
        order_id: Option<OrderId>,
        code: String,
    },
    AdminDecision {
        admin: UserId,
        order_id: OrderId,
        decision: Decision,
    },
    AddProduct {
        admin: UserId,
        listing: String,
    },
    EditProduct {
        admin: UserId,
        product_id: String,
        listing: String,
    },
    DeleteProduct {
        admin: UserId,
        product_id: String,
    },
    AddPaymentMethod {
        admin: UserId,
        listing: String,
    },
    DeletePaymentMethod {
        admin: UserId,
        method_id: String,
    },
    AddSlider {
        admin: UserId,
        listing: String,
    },
    EditSlider {
        admin: UserId,
        slider_id: String,
        listing: String,
    },
    DeleteSlider {
        admin: UserId,
        slider_id: String,
    },
    ListOrders {
        admin: UserId,
    },
    ListPending {
        admin: UserId,
    },
}

impl InboundEvent {
    /// The user who triggered the event.
    pub fn actor(&self) -> UserId {
        match self {
            InboundEvent::Start { buyer }
            | InboundEvent::Browse { buyer, .. }
            | InboundEvent::SelectProduct { buyer, .. }
            | InboundEvent::AdvanceField { buyer, .. }
            | InboundEvent::SubmitFieldValue { buyer, .. }
            | InboundEvent::SelectPaymentMethod { buyer, .. }
            | InboundEvent::SubmitReference { buyer, .. } => *buyer,
            InboundEvent::AdminDecision { admin, .. }
            | InboundEvent::AddProduct { admin, .. }
            | InboundEvent::EditProduct { admin, .. }
            | InboundEvent::DeleteProduct { admin, .. }
            | InboundEvent::AddPaymentMethod { admin, .. }
            | InboundEvent::DeletePaymentMethod { admin, .. }
            | InboundEvent::AddSlider { admin, .. }
            | InboundEvent::EditSlider { admin, .. }
            | InboundEvent::DeleteSlider { admin, .. }
            | InboundEvent::ListOrders { admin }
            | InboundEvent::ListPending { admin } => *admin,
        }
    }
}

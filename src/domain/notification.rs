use super::UserId;
use super::order::OrderId;
use super::product::{DeliveryKind, Stock};
use super::session::Field;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The approval context presented to an admin for one submitted order.
///
/// There is at most one ticket per order; presenting it again reuses it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DecisionTicket {
    pub order_id: OrderId,
    pub buyer: UserId,
    pub product_name: String,
    pub price: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    /// How many times this ticket has been presented to the admins.
    pub presentations: u32,
}

/// Outbound messages handed to the transport.
#[derive(Debug, PartialEq, Clone)]
pub enum Notification {
    /// A start-screen banner with a link button.
    Slider {
        to: UserId,
        slider_id: String,
        image: String,
        text: String,
        link: String,
    },
    Categories {
        to: UserId,
        categories: Vec<String>,
    },
    ProductCard {
        to: UserId,
        product_id: String,
        name: String,
        price: String,
        stock: Stock,
        image: String,
    },
    NoProducts {
        to: UserId,
    },
    OrderCreated {
        to: UserId,
        order_id: OrderId,
        product_name: String,
    },
    FieldPrompt {
        to: UserId,
        order_id: OrderId,
        field: Field,
    },
    FieldSaved {
        to: UserId,
        order_id: OrderId,
        field: Field,
    },
    PaymentOptions {
        to: UserId,
        order_id: OrderId,
        methods: Vec<(String, String)>,
    },
    PaymentInstructions {
        to: UserId,
        order_id: OrderId,
        price: String,
        address: String,
        qr: String,
    },
    DuplicateReference {
        to: UserId,
        order_id: OrderId,
    },
    AwaitingApproval {
        to: UserId,
        order_id: OrderId,
    },
    DecisionRequest {
        to: UserId,
        ticket: DecisionTicket,
    },
    Delivered {
        to: UserId,
        order_id: OrderId,
        kind: DeliveryKind,
        payload: String,
    },
    Rejected {
        to: UserId,
        order_id: OrderId,
    },
    Error {
        to: UserId,
        message: String,
    },
    AdminAck {
        to: UserId,
        order_id: Option<OrderId>,
        text: String,
    },
    AdminAlert {
        to: UserId,
        order_id: Option<OrderId>,
        text: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> UserId {
        match self {
            Notification::Slider { to, .. }
            | Notification::Categories { to, .. }
            | Notification::ProductCard { to, .. }
            | Notification::NoProducts { to }
            | Notification::OrderCreated { to, .. }
            | Notification::FieldPrompt { to, .. }
            | Notification::FieldSaved { to, .. }
            | Notification::PaymentOptions { to, .. }
            | Notification::PaymentInstructions { to, .. }
            | Notification::DuplicateReference { to, .. }
            | Notification::AwaitingApproval { to, .. }
            | Notification::DecisionRequest { to, .. }
            | Notification::Delivered { to, .. }
            | Notification::Rejected { to, .. }
            | Notification::Error { to, .. }
            | Notification::AdminAck { to, .. }
            | Notification::AdminAlert { to, .. } => *to,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Slider { .. } => "slider",
            Notification::Categories { .. } => "categories",
            Notification::ProductCard { .. } => "product_card",
            Notification::NoProducts { .. } => "no_products",
            Notification::OrderCreated { .. } => "order_created",
            Notification::FieldPrompt { .. } => "field_prompt",
            Notification::FieldSaved { .. } => "field_saved",
            Notification::PaymentOptions { .. } => "payment_options",
            Notification::PaymentInstructions { .. } => "payment_instructions",
            Notification::DuplicateReference { .. } => "duplicate_reference",
            Notification::AwaitingApproval { .. } => "awaiting_approval",
            Notification::DecisionRequest { .. } => "decision_request",
            Notification::Delivered { .. } => "delivered",
            Notification::Rejected { .. } => "rejected",
            Notification::Error { .. } => "error",
            Notification::AdminAck { .. } => "admin_ack",
            Notification::AdminAlert { .. } => "admin_alert",
        }
    }

    /// Correlation id carried by the message, if it concerns an order.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            Notification::OrderCreated { order_id, .. }
            | Notification::FieldPrompt { order_id, .. }
            | Notification::FieldSaved { order_id, .. }
            | Notification::PaymentOptions { order_id, .. }
            | Notification::PaymentInstructions { order_id, .. }
            | Notification::DuplicateReference { order_id, .. }
            | Notification::AwaitingApproval { order_id, .. }
            | Notification::Delivered { order_id, .. }
            | Notification::Rejected { order_id, .. } => Some(order_id),
            Notification::DecisionRequest { ticket, .. } => Some(&ticket.order_id),
            Notification::AdminAck { order_id, .. } | Notification::AdminAlert { order_id, .. } => {
                order_id.as_ref()
            }
            Notification::Slider { .. }
            | Notification::Categories { .. }
            | Notification::ProductCard { .. }
            | Notification::NoProducts { .. }
            | Notification::Error { .. } => None,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Slider {
                image, text, link, ..
            } => write!(f, "[photo: {}] [{}]({})", image, text, link),
            Notification::Categories { categories, .. } => {
                write!(f, "Welcome! Choose a category: All")?;
                for category in categories {
                    write!(f, ", {}", category)?;
                }
                Ok(())
            }
            Notification::ProductCard {
                product_id,
                name,
                price,
                stock,
                ..
            } => write!(f, "[{}] {} | {} | {}", product_id, name, price, stock),
            Notification::NoProducts { .. } => write!(f, "No products found in this category."),
            Notification::OrderCreated {
                order_id,
                product_name,
                ..
            } => write!(f, "Order #{} created for {}.", order_id, product_name),
            Notification::FieldPrompt { field, .. } => match field {
                Field::Name => write!(f, "Please enter your full name:"),
                Field::Email => write!(f, "Please enter your email:"),
                Field::PaymentReference => {
                    write!(f, "Send the payment, then reply with the UTR / transaction id.")
                }
                Field::None => Ok(()),
            },
            Notification::FieldSaved { field, .. } => match field {
                Field::Name => write!(f, "Name saved."),
                Field::Email => write!(f, "Email saved."),
                other => write!(f, "{} saved.", other),
            },
            Notification::PaymentOptions { methods, .. } => {
                write!(f, "Choose payment method:")?;
                for (id, address) in methods {
                    write!(f, " [{}] {}", id, address)?;
                }
                Ok(())
            }
            Notification::PaymentInstructions {
                price,
                address,
                qr,
                ..
            } => write!(
                f,
                "Pay {} to {} (QR: {}), then reply with the UTR / transaction id.",
                price, address, qr
            ),
            Notification::DuplicateReference { order_id, .. } => write!(
                f,
                "This payment reference was already used. Please send a new one for order {}.",
                order_id
            ),
            Notification::AwaitingApproval { .. } => {
                write!(f, "Thank you! Order sent for approval. Please wait...")
            }
            Notification::DecisionRequest { ticket, .. } => write!(
                f,
                "New order {} | {} | {} | name: {} | email: {} | UTR: {} | {} | [approve] [reject]",
                ticket.order_id,
                ticket.product_name,
                ticket.price,
                ticket.name.as_deref().unwrap_or("-"),
                ticket.email.as_deref().unwrap_or("-"),
                ticket.reference,
                ticket.created_at.to_rfc3339(),
            ),
            Notification::Delivered {
                order_id,
                kind,
                payload,
                ..
            } => match kind {
                DeliveryKind::File => write!(
                    f,
                    "Order {} approved! Thank you! [document: {}]",
                    order_id, payload
                ),
                DeliveryKind::Link => {
                    write!(f, "Order {} approved! Thank you! {}", order_id, payload)
                }
            },
            Notification::Rejected { order_id, .. } => {
                write!(f, "Order {} was rejected.", order_id)
            }
            Notification::Error { message, .. } => write!(f, "{}", message),
            Notification::AdminAck { text, .. } | Notification::AdminAlert { text, .. } => {
                write!(f, "{}", text)
            }
        }
    }
}

use crate::domain::order::{OrderId, OrderState};
use crate::domain::UserId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Product {0} is out of stock")]
    ProductUnavailable(String),
    #[error("No input is awaited from user {0}")]
    NoActiveSession(UserId),
    #[error("Payment reference {0} has already been used")]
    DuplicateReference(String),
    #[error("Product {0} ran out of stock before the order could be approved")]
    OutOfStockAtApproval(String),
    #[error("User {0} is not allowed to perform this action")]
    Unauthorized(UserId),
    #[error("Order {0} has already been processed")]
    AlreadyResolved(OrderId),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Product {0} not found")]
    ProductNotFound(String),
    #[error("Payment method {0} not found")]
    PaymentMethodNotFound(String),
    #[error("Slider {0} not found")]
    SliderNotFound(String),
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),
    #[error("Order {order} cannot move from {from} to {to}")]
    InvalidTransition {
        order: OrderId,
        from: OrderState,
        to: OrderState,
    },
    #[error("No payment methods available")]
    NoPaymentMethods,
    #[error("User {0} already has an order in progress")]
    OrderInProgress(UserId),
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl StorefrontError {
    /// Errors the initiating party can act on. These are reported back to them
    /// as a chat message; everything else is an infrastructure failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::ProductUnavailable(_)
                | Self::NoActiveSession(_)
                | Self::DuplicateReference(_)
                | Self::OutOfStockAtApproval(_)
                | Self::Unauthorized(_)
                | Self::MalformedInput(_)
                | Self::ProductNotFound(_)
                | Self::PaymentMethodNotFound(_)
                | Self::SliderNotFound(_)
                | Self::OrderNotFound(_)
                | Self::InvalidTransition { .. }
                | Self::NoPaymentMethods
                | Self::OrderInProgress(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

use super::UserId;
use super::notification::Notification;
use super::order::{Order, OrderId, OrderLogEntry};
use super::payment::PaymentMethod;
use super::product::{Product, Stock};
use super::session::Session;
use super::slider::Slider;
use crate::error::Result;
use async_trait::async_trait;

/// Products, payment methods and sliders. Read by everyone, written by admins.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn put_product(&self, product: Product) -> Result<()>;
    async fn product(&self, id: &str) -> Result<Option<Product>>;
    async fn remove_product(&self, id: &str) -> Result<bool>;
    /// All products ordered by id.
    async fn products(&self) -> Result<Vec<Product>>;
    /// Atomically takes one unit of stock and returns what is left.
    ///
    /// Fails with `OutOfStockAtApproval` when the finite stock is already zero.
    async fn take_unit(&self, id: &str) -> Result<Stock>;
    async fn return_unit(&self, id: &str) -> Result<()>;

    async fn put_payment_method(&self, method: PaymentMethod) -> Result<()>;
    async fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>>;
    async fn remove_payment_method(&self, id: &str) -> Result<bool>;
    /// All payment methods ordered by id.
    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>>;

    async fn put_slider(&self, slider: Slider) -> Result<()>;
    async fn slider(&self, id: &str) -> Result<Option<Slider>>;
    async fn remove_slider(&self, id: &str) -> Result<bool>;
    /// All sliders ordered by id.
    async fn sliders(&self) -> Result<Vec<Slider>>;
}

/// Durable home of open orders and the sessions that point at them.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn put_order(&self, order: Order) -> Result<()>;
    async fn order(&self, id: &OrderId) -> Result<Option<Order>>;
    async fn remove_order(&self, id: &OrderId) -> Result<()>;
    /// Every stored order, oldest first.
    async fn all_orders(&self) -> Result<Vec<Order>>;

    async fn put_session(&self, session: Session) -> Result<()>;
    async fn session(&self, buyer: UserId) -> Result<Option<Session>>;
    async fn remove_session(&self, buyer: UserId) -> Result<()>;
}

/// Append-only record of approved orders.
#[async_trait]
pub trait OrderLog: Send + Sync {
    /// Appends one entry. Fails with `InvariantViolation` if the order id or
    /// its payment reference is already in the log; the log is left untouched.
    async fn append(&self, entry: OrderLogEntry) -> Result<()>;
    async fn entries(&self) -> Result<Vec<OrderLogEntry>>;
    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<OrderLogEntry>>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<OrderLogEntry>>;
}

/// Set of payment references consumed by approved orders.
#[async_trait]
pub trait ReferenceGuard: Send + Sync {
    async fn is_known(&self, code: &str) -> Result<bool>;
    /// Compare-and-set. Returns `true` if the code was newly committed and
    /// `false` if it was already present.
    async fn commit(&self, code: &str) -> Result<bool>;
    /// Undoes a commit whose approval could not be completed.
    async fn revoke(&self, code: &str) -> Result<()>;
}

/// Message transport towards buyers and admins.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

pub type CatalogStoreBox = Box<dyn CatalogStore>;
pub type OrderStoreBox = Box<dyn OrderStore>;
pub type OrderLogBox = Box<dyn OrderLog>;
pub type ReferenceGuardBox = Box<dyn ReferenceGuard>;
pub type NotifierBox = Box<dyn Notifier>;

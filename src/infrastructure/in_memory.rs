use crate::domain::UserId;
use crate::domain::notification::Notification;
use crate::domain::order::{Order, OrderId, OrderLogEntry};
use crate::domain::payment::PaymentMethod;
use crate::domain::ports::{CatalogStore, Notifier, OrderLog, OrderStore, ReferenceGuard};
use crate::domain::product::{Product, Stock};
use crate::domain::session::Session;
use crate::domain::slider::Slider;
use crate::error::{Result, StorefrontError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A thread-safe in-memory catalog.
///
/// `BTreeMap` keeps listings ordered by id, which is what buyers browse in.
#[derive(Default, Clone)]
pub struct InMemoryCatalogStore {
    products: Arc<RwLock<BTreeMap<String, Product>>>,
    payment_methods: Arc<RwLock<BTreeMap<String, PaymentMethod>>>,
    sliders: Arc<RwLock<BTreeMap<String, Slider>>>,
}

impl InMemoryCatalogStore {
    /// Creates a new, empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn put_product(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn product(&self, id: &str) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(id).cloned())
    }

    async fn remove_product(&self, id: &str) -> Result<bool> {
        let mut products = self.products.write().await;
        Ok(products.remove(id).is_some())
    }

    async fn products(&self) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products.values().cloned().collect())
    }

    async fn take_unit(&self, id: &str) -> Result<Stock> {
        // Read and decrement under one write guard.
        let mut products = self.products.write().await;
        let product = products
            .get_mut(id)
            .ok_or_else(|| StorefrontError::ProductNotFound(id.to_string()))?;
        let remaining = product
            .stock
            .take_one()
            .ok_or_else(|| StorefrontError::OutOfStockAtApproval(id.to_string()))?;
        product.stock = remaining;
        Ok(remaining)
    }

    async fn return_unit(&self, id: &str) -> Result<()> {
        let mut products = self.products.write().await;
        if let Some(product) = products.get_mut(id) {
            product.stock = product.stock.return_one();
        }
        Ok(())
    }

    async fn put_payment_method(&self, method: PaymentMethod) -> Result<()> {
        let mut methods = self.payment_methods.write().await;
        methods.insert(method.id.clone(), method);
        Ok(())
    }

    async fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>> {
        let methods = self.payment_methods.read().await;
        Ok(methods.get(id).cloned())
    }

    async fn remove_payment_method(&self, id: &str) -> Result<bool> {
        let mut methods = self.payment_methods.write().await;
        Ok(methods.remove(id).is_some())
    }

    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let methods = self.payment_methods.read().await;
        Ok(methods.values().cloned().collect())
    }

    async fn put_slider(&self, slider: Slider) -> Result<()> {
        let mut sliders = self.sliders.write().await;
        sliders.insert(slider.id.clone(), slider);
        Ok(())
    }

    async fn slider(&self, id: &str) -> Result<Option<Slider>> {
        let sliders = self.sliders.read().await;
        Ok(sliders.get(id).cloned())
    }

    async fn remove_slider(&self, id: &str) -> Result<bool> {
        let mut sliders = self.sliders.write().await;
        Ok(sliders.remove(id).is_some())
    }

    async fn sliders(&self) -> Result<Vec<Slider>> {
        let sliders = self.sliders.read().await;
        Ok(sliders.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for open orders and buyer sessions.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    sessions: Arc<RwLock<HashMap<UserId, Session>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn put_order(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(id).cloned())
    }

    async fn remove_order(&self, id: &OrderId) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.remove(id);
        Ok(())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn put_session(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.buyer, session);
        Ok(())
    }

    async fn session(&self, buyer: UserId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&buyer).cloned())
    }

    async fn remove_session(&self, buyer: UserId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&buyer);
        Ok(())
    }
}

/// In-memory append-only order log.
#[derive(Default, Clone)]
pub struct InMemoryOrderLog {
    entries: Arc<RwLock<Vec<OrderLogEntry>>>,
}

impl InMemoryOrderLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderLog for InMemoryOrderLog {
    async fn append(&self, entry: OrderLogEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries
            .iter()
            .find(|e| e.order_id == entry.order_id || e.reference == entry.reference)
        {
            return Err(StorefrontError::InvariantViolation(format!(
                "order log already holds {} with reference {}",
                existing.order_id, existing.reference
            )));
        }
        entries.push(entry);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<OrderLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.clone())
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<OrderLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| &e.order_id == order_id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<OrderLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.reference == reference).cloned())
    }
}

/// In-memory duplicate-reference guard.
#[derive(Default, Clone)]
pub struct InMemoryReferenceGuard {
    codes: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryReferenceGuard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferenceGuard for InMemoryReferenceGuard {
    async fn is_known(&self, code: &str) -> Result<bool> {
        let codes = self.codes.lock().await;
        Ok(codes.contains(code))
    }

    async fn commit(&self, code: &str) -> Result<bool> {
        let mut codes = self.codes.lock().await;
        Ok(codes.insert(code.to_string()))
    }

    async fn revoke(&self, code: &str) -> Result<()> {
        let mut codes = self.codes.lock().await;
        codes.remove(code);
        Ok(())
    }
}

/// Notifier that keeps every message in memory. Handy for tests and for
/// embedding the engine behind a transport that polls.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message so far, in send order.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Messages addressed to one user.
    pub async fn sent_to(&self, user: UserId) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.recipient() == user)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

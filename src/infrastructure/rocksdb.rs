use crate::domain::UserId;
use crate::domain::order::{Order, OrderId, OrderLogEntry};
use crate::domain::payment::PaymentMethod;
use crate::domain::ports::{CatalogStore, OrderLog, OrderStore, ReferenceGuard};
use crate::domain::product::{Product, Stock};
use crate::domain::session::Session;
use crate::domain::slider::Slider;
use crate::error::{Result, StorefrontError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for catalog products.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for payment methods.
pub const CF_PAYMENT_METHODS: &str = "payment_methods";
/// Column Family for start-screen sliders.
pub const CF_SLIDERS: &str = "sliders";
/// Column Family for open orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for buyer sessions.
pub const CF_SESSIONS: &str = "sessions";
/// Column Family for the approved order log, keyed by order id.
pub const CF_ORDER_LOG: &str = "order_log";
/// Column Family indexing the order log by payment reference.
pub const CF_LOG_REFERENCES: &str = "log_references";
/// Column Family for references committed by the duplicate guard.
pub const CF_REFERENCES: &str = "references";

const COLUMN_FAMILIES: [&str; 8] = [
    CF_PRODUCTS,
    CF_PAYMENT_METHODS,
    CF_SLIDERS,
    CF_ORDERS,
    CF_SESSIONS,
    CF_ORDER_LOG,
    CF_LOG_REFERENCES,
    CF_REFERENCES,
];

/// A persistent store implementation using RocksDB.
///
/// Implements every storage port, one Column Family per record kind. Each
/// order transition is written through before the engine answers, so a
/// restart resumes from the last committed state.
///
/// Read-modify-write operations (stock takes, guard commits, log appends)
/// run under a single write lock so they are atomic with their reads.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

fn internal(message: String) -> StorefrontError {
    StorefrontError::InternalError(Box::new(std::io::Error::other(message)))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("{} column family not found", name)))
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let handle = self.handle(cf)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(handle, key, bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.handle(cf)?;
        match self.db.get_cf(handle, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, cf: &str, key: &[u8]) -> Result<bool> {
        let handle = self.handle(cf)?;
        // Just check if the key exists without retrieving the value
        Ok(self.db.get_pinned_cf(handle, key)?.is_some())
    }

    fn delete(&self, cf: &str, key: &[u8]) -> Result<()> {
        let handle = self.handle(cf)?;
        self.db.delete_cf(handle, key)?;
        Ok(())
    }

    fn scan_json<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let handle = self.handle(cf)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(handle, IteratorMode::Start) {
            let (_key, value) = item
                .map_err(|e| internal(format!("RocksDB iteration error in {}: {}", cf, e)))?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    async fn adjust_stock(&self, id: &str, change: fn(Stock) -> Option<Stock>) -> Result<Stock> {
        let _guard = self.write_lock.lock().await;
        let mut product: Product = self
            .get_json(CF_PRODUCTS, id.as_bytes())?
            .ok_or_else(|| StorefrontError::ProductNotFound(id.to_string()))?;
        product.stock = change(product.stock)
            .ok_or_else(|| StorefrontError::OutOfStockAtApproval(id.to_string()))?;
        self.put_json(CF_PRODUCTS, id.as_bytes(), &product)?;
        Ok(product.stock)
    }
}

#[async_trait]
impl CatalogStore for RocksDBStore {
    async fn put_product(&self, product: Product) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put_json(CF_PRODUCTS, product.id.as_bytes(), &product)
    }

    async fn product(&self, id: &str) -> Result<Option<Product>> {
        self.get_json(CF_PRODUCTS, id.as_bytes())
    }

    async fn remove_product(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let existed = self.exists(CF_PRODUCTS, id.as_bytes())?;
        self.delete(CF_PRODUCTS, id.as_bytes())?;
        Ok(existed)
    }

    async fn products(&self) -> Result<Vec<Product>> {
        self.scan_json(CF_PRODUCTS)
    }

    async fn take_unit(&self, id: &str) -> Result<Stock> {
        self.adjust_stock(id, Stock::take_one).await
    }

    async fn return_unit(&self, id: &str) -> Result<()> {
        match self.adjust_stock(id, |stock| Some(stock.return_one())).await {
            Ok(_) | Err(StorefrontError::ProductNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn put_payment_method(&self, method: PaymentMethod) -> Result<()> {
        self.put_json(CF_PAYMENT_METHODS, method.id.as_bytes(), &method)
    }

    async fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>> {
        self.get_json(CF_PAYMENT_METHODS, id.as_bytes())
    }

    async fn remove_payment_method(&self, id: &str) -> Result<bool> {
        let existed = self.exists(CF_PAYMENT_METHODS, id.as_bytes())?;
        self.delete(CF_PAYMENT_METHODS, id.as_bytes())?;
        Ok(existed)
    }

    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        self.scan_json(CF_PAYMENT_METHODS)
    }

    async fn put_slider(&self, slider: Slider) -> Result<()> {
        self.put_json(CF_SLIDERS, slider.id.as_bytes(), &slider)
    }

    async fn slider(&self, id: &str) -> Result<Option<Slider>> {
        self.get_json(CF_SLIDERS, id.as_bytes())
    }

    async fn remove_slider(&self, id: &str) -> Result<bool> {
        let existed = self.exists(CF_SLIDERS, id.as_bytes())?;
        self.delete(CF_SLIDERS, id.as_bytes())?;
        Ok(existed)
    }

    async fn sliders(&self) -> Result<Vec<Slider>> {
        self.scan_json(CF_SLIDERS)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn put_order(&self, order: Order) -> Result<()> {
        self.put_json(CF_ORDERS, order.id.as_str().as_bytes(), &order)
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, id.as_str().as_bytes())
    }

    async fn remove_order(&self, id: &OrderId) -> Result<()> {
        self.delete(CF_ORDERS, id.as_str().as_bytes())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let mut all: Vec<Order> = self.scan_json(CF_ORDERS)?;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn put_session(&self, session: Session) -> Result<()> {
        self.put_json(CF_SESSIONS, &session.buyer.to_be_bytes(), &session)
    }

    async fn session(&self, buyer: UserId) -> Result<Option<Session>> {
        self.get_json(CF_SESSIONS, &buyer.to_be_bytes())
    }

    async fn remove_session(&self, buyer: UserId) -> Result<()> {
        self.delete(CF_SESSIONS, &buyer.to_be_bytes())
    }
}

#[async_trait]
impl OrderLog for RocksDBStore {
    async fn append(&self, entry: OrderLogEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let order_key = entry.order_id.as_str().as_bytes();
        let reference_key = entry.reference.as_bytes();
        if self.exists(CF_ORDER_LOG, order_key)? || self.exists(CF_LOG_REFERENCES, reference_key)? {
            return Err(StorefrontError::InvariantViolation(format!(
                "order log already holds order {} or reference {}",
                entry.order_id, entry.reference
            )));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(self.handle(CF_ORDER_LOG)?, order_key, serde_json::to_vec(&entry)?);
        batch.put_cf(self.handle(CF_LOG_REFERENCES)?, reference_key, order_key);
        self.db.write(batch)?;
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<OrderLogEntry>> {
        let mut entries: Vec<OrderLogEntry> = self.scan_json(CF_ORDER_LOG)?;
        entries.sort_by(|a, b| a.approved_at.cmp(&b.approved_at));
        Ok(entries)
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<OrderLogEntry>> {
        self.get_json(CF_ORDER_LOG, order_id.as_str().as_bytes())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<OrderLogEntry>> {
        let handle = self.handle(CF_LOG_REFERENCES)?;
        match self.db.get_cf(handle, reference.as_bytes())? {
            Some(order_key) => self.get_json(CF_ORDER_LOG, &order_key),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ReferenceGuard for RocksDBStore {
    async fn is_known(&self, code: &str) -> Result<bool> {
        self.exists(CF_REFERENCES, code.as_bytes())
    }

    async fn commit(&self, code: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.exists(CF_REFERENCES, code.as_bytes())? {
            return Ok(false);
        }
        let handle = self.handle(CF_REFERENCES)?;
        self.db.put_cf(handle, code.as_bytes(), [1u8])?;
        Ok(true)
    }

    async fn revoke(&self, code: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.delete(CF_REFERENCES, code.as_bytes())
    }
}

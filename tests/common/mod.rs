#![allow(dead_code)]

use std::fs::File;
use std::io::Error;
use std::path::Path;
use storefront::application::config::{EngineConfig, IdStrategy, SessionPolicy};
use storefront::application::engine::StorefrontEngine;
use storefront::domain::UserId;
use storefront::domain::event::FormStep;
use storefront::domain::order::Order;
use storefront::domain::payment::PaymentMethod;
use storefront::domain::ports::CatalogStore;
use storefront::domain::product::{DeliveryKind, Product, Stock};
use storefront::infrastructure::in_memory::{
    InMemoryCatalogStore, InMemoryOrderLog, InMemoryOrderStore, InMemoryReferenceGuard,
    RecordingNotifier,
};

pub const ADMIN: UserId = 1;
pub const SECOND_ADMIN: UserId = 2;

/// Engine over in-memory stores, with handles kept for inspection.
pub struct TestBed {
    pub engine: StorefrontEngine,
    pub catalog: InMemoryCatalogStore,
    pub orders: InMemoryOrderStore,
    pub log: InMemoryOrderLog,
    pub guard: InMemoryReferenceGuard,
    pub notifier: RecordingNotifier,
}

impl TestBed {
    pub async fn new(stock: Stock, policy: SessionPolicy) -> Self {
        let catalog = InMemoryCatalogStore::new();
        seed_catalog(&catalog, stock).await;
        Self::over(
            catalog,
            InMemoryOrderStore::new(),
            InMemoryOrderLog::new(),
            InMemoryReferenceGuard::new(),
            policy,
        )
    }

    /// A fresh engine over existing stores, as after a restart.
    pub fn over(
        catalog: InMemoryCatalogStore,
        orders: InMemoryOrderStore,
        log: InMemoryOrderLog,
        guard: InMemoryReferenceGuard,
        policy: SessionPolicy,
    ) -> Self {
        let notifier = RecordingNotifier::new();
        let engine = StorefrontEngine::new(
            Box::new(catalog.clone()),
            Box::new(orders.clone()),
            Box::new(log.clone()),
            Box::new(guard.clone()),
            Box::new(notifier.clone()),
            EngineConfig {
                admins: vec![ADMIN, SECOND_ADMIN],
                session_policy: policy,
                id_strategy: IdStrategy::Sequential,
            },
        );
        Self {
            engine,
            catalog,
            orders,
            log,
            guard,
            notifier,
        }
    }

    pub async fn stock(&self) -> Stock {
        stock_of(&self.catalog).await
    }
}

pub async fn stock_of(catalog: &InMemoryCatalogStore) -> Stock {
    catalog.product("P1").await.unwrap().unwrap().stock
}

pub async fn set_stock(catalog: &InMemoryCatalogStore, stock: Stock) {
    let mut product = catalog.product("P1").await.unwrap().unwrap();
    product.stock = stock;
    catalog.put_product(product).await.unwrap();
}

pub async fn seed_catalog(catalog: &dyn CatalogStore, stock: Stock) {
    catalog
        .put_product(Product {
            id: "P1".into(),
            name: "Ebook".into(),
            price: "199".into(),
            image: "https://img.example.com/ebook.png".into(),
            category: "Books".into(),
            delivery: DeliveryKind::Link,
            payload: "https://example.com/ebook".into(),
            stock,
        })
        .await
        .unwrap();
    catalog
        .put_payment_method(PaymentMethod {
            id: "PM1".into(),
            address: "shop@upi".into(),
            qr: "qr-file".into(),
        })
        .await
        .unwrap();
}

/// Walks a buyer from product selection to an order ready for a reference.
pub async fn order_ready_to_pay(engine: &StorefrontEngine, buyer: UserId) -> Order {
    let order = engine.select_product(buyer, "P1").await.unwrap();
    engine.advance_field(buyer, FormStep::Pay).await.unwrap();
    engine
        .select_payment_method(buyer, Some(&order.id), "PM1")
        .await
        .unwrap()
}

/// Walks a buyer all the way to `pending_approval`.
pub async fn submitted_order(engine: &StorefrontEngine, buyer: UserId, code: &str) -> Order {
    let order = order_ready_to_pay(engine, buyer).await;
    engine
        .submit_reference(buyer, Some(&order.id), code)
        .await
        .unwrap()
}

/// Writes an event stream where `buyers` buyers each buy `P0001` and admin
/// `1` approves every order. Assumes sequential order ids.
pub fn generate_events_csv(path: &Path, buyers: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["type", "actor", "order", "target", "value"])?;

    for i in 1..=buyers {
        let buyer = (100 + i).to_string();
        let order = format!("ORD-{:08}", i);
        wtr.write_record(["select_product", &buyer, "", "P0001", ""])?;
        wtr.write_record(["advance", &buyer, "", "", "pay"])?;
        wtr.write_record(["select_payment", &buyer, &order, "PM0001", ""])?;
        wtr.write_record(["reference", &buyer, &order, "", &format!("UTR{:06}", i)])?;
        wtr.write_record(["decision", "1", &order, "", "approve"])?;
    }

    wtr.flush()?;
    Ok(())
}

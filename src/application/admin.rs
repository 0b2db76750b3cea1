//! Catalog browsing and the admin panel.

use super::engine::StorefrontEngine;
use crate::domain::UserId;
use crate::domain::notification::{DecisionTicket, Notification};
use crate::domain::order::{OrderLogEntry, OrderState};
use crate::domain::payment::PaymentMethod;
use crate::domain::product::Product;
use crate::domain::slider::Slider;
use crate::error::{Result, StorefrontError};
use std::collections::BTreeSet;
use tracing::info;

const ALL_CATEGORIES: &str = "All";

/// Next free id of the form `<prefix><nnnn>`.
fn next_catalog_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let highest = existing
        .filter_map(|id| id.strip_prefix(prefix)?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:04}", prefix, highest + 1)
}

impl StorefrontEngine {
    /// `Start`: shows every slider, then greets the buyer with the catalog
    /// categories.
    pub async fn start(&self, buyer: UserId) -> Result<()> {
        for slider in self.catalog.sliders().await? {
            self.send(Notification::Slider {
                to: buyer,
                slider_id: slider.id,
                image: slider.image,
                text: slider.text,
                link: slider.link,
            })
            .await;
        }
        let categories: BTreeSet<String> = self
            .catalog
            .products()
            .await?
            .into_iter()
            .map(|p| p.category)
            .collect();
        self.send(Notification::Categories {
            to: buyer,
            categories: categories.into_iter().collect(),
        })
        .await;
        Ok(())
    }

    /// `Browse`: one product card per product in `category`.
    pub async fn browse(&self, buyer: UserId, category: Option<&str>) -> Result<()> {
        let wanted = category
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(ALL_CATEGORIES));
        let products: Vec<Product> = self
            .catalog
            .products()
            .await?
            .into_iter()
            .filter(|p| wanted.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
            .collect();

        if products.is_empty() {
            self.send(Notification::NoProducts { to: buyer }).await;
            return Ok(());
        }
        for product in products {
            self.send(Notification::ProductCard {
                to: buyer,
                product_id: product.id,
                name: product.name,
                price: product.price,
                stock: product.stock,
                image: product.image,
            })
            .await;
        }
        Ok(())
    }

    pub async fn add_product(&self, admin: UserId, listing: &str) -> Result<Product> {
        self.require_admin(admin)?;

        let products = self.catalog.products().await?;
        let id = next_catalog_id("P", products.iter().map(|p| p.id.as_str()));
        let product = Product::parse_listing(id, listing)?;
        self.catalog.put_product(product.clone()).await?;

        info!(admin, product_id = %product.id, "Product added");
        self.ack(admin, format!("Product added • ID: {}", product.id))
            .await;
        Ok(product)
    }

    /// Replaces every field of an existing product.
    pub async fn edit_product(&self, admin: UserId, product_id: &str, listing: &str) -> Result<Product> {
        self.require_admin(admin)?;

        if self.catalog.product(product_id).await?.is_none() {
            return Err(StorefrontError::ProductNotFound(product_id.to_string()));
        }
        let product = Product::parse_listing(product_id, listing)?;
        self.catalog.put_product(product.clone()).await?;

        info!(admin, product_id, "Product updated");
        self.ack(admin, format!("Product {} updated", product_id))
            .await;
        Ok(product)
    }

    /// Orders already placed for the product keep their own copy of its id
    /// and are decided as usual.
    pub async fn delete_product(&self, admin: UserId, product_id: &str) -> Result<()> {
        self.require_admin(admin)?;

        if !self.catalog.remove_product(product_id).await? {
            return Err(StorefrontError::ProductNotFound(product_id.to_string()));
        }
        info!(admin, product_id, "Product deleted");
        self.ack(admin, format!("Product {} deleted", product_id))
            .await;
        Ok(())
    }

    pub async fn add_payment_method(&self, admin: UserId, listing: &str) -> Result<PaymentMethod> {
        self.require_admin(admin)?;

        let methods = self.catalog.payment_methods().await?;
        let id = next_catalog_id("PM", methods.iter().map(|m| m.id.as_str()));
        let method = PaymentMethod::parse_listing(id, listing)?;
        self.catalog.put_payment_method(method.clone()).await?;

        info!(admin, method_id = %method.id, "Payment method added");
        self.ack(admin, format!("Payment method added • ID: {}", method.id))
            .await;
        Ok(method)
    }

    pub async fn delete_payment_method(&self, admin: UserId, method_id: &str) -> Result<()> {
        self.require_admin(admin)?;

        if !self.catalog.remove_payment_method(method_id).await? {
            return Err(StorefrontError::PaymentMethodNotFound(method_id.to_string()));
        }
        info!(admin, method_id, "Payment method deleted");
        self.ack(admin, format!("Payment method {} deleted", method_id))
            .await;
        Ok(())
    }

    pub async fn add_slider(&self, admin: UserId, listing: &str) -> Result<Slider> {
        self.require_admin(admin)?;

        let sliders = self.catalog.sliders().await?;
        let id = next_catalog_id("S", sliders.iter().map(|s| s.id.as_str()));
        let slider = Slider::parse_listing(id, listing)?;
        self.catalog.put_slider(slider.clone()).await?;

        info!(admin, slider_id = %slider.id, "Slider added");
        self.ack(admin, format!("Slider added • ID: {}", slider.id))
            .await;
        Ok(slider)
    }

    pub async fn edit_slider(&self, admin: UserId, slider_id: &str, listing: &str) -> Result<Slider> {
        self.require_admin(admin)?;

        if self.catalog.slider(slider_id).await?.is_none() {
            return Err(StorefrontError::SliderNotFound(slider_id.to_string()));
        }
        let slider = Slider::parse_listing(slider_id, listing)?;
        self.catalog.put_slider(slider.clone()).await?;

        info!(admin, slider_id, "Slider updated");
        self.ack(admin, format!("Slider {} updated", slider_id))
            .await;
        Ok(slider)
    }

    pub async fn delete_slider(&self, admin: UserId, slider_id: &str) -> Result<()> {
        self.require_admin(admin)?;

        if !self.catalog.remove_slider(slider_id).await? {
            return Err(StorefrontError::SliderNotFound(slider_id.to_string()));
        }
        info!(admin, slider_id, "Slider deleted");
        self.ack(admin, format!("Slider {} deleted", slider_id))
            .await;
        Ok(())
    }

    /// `ListOrders`: the Order Log, one line per approved order.
    pub async fn list_orders(&self, admin: UserId) -> Result<Vec<OrderLogEntry>> {
        self.require_admin(admin)?;

        let entries = self.log.entries().await?;
        let text = if entries.is_empty() {
            "No saved orders yet.".to_string()
        } else {
            entries
                .iter()
                .map(|e| format!("{} | {} | {}", e.order_id, e.product_name, e.status))
                .collect::<Vec<_>>()
                .join("\n")
        };
        self.ack(admin, text).await;
        Ok(entries)
    }

    /// `ListPending`: re-presents every outstanding decision request.
    pub async fn list_pending(&self, admin: UserId) -> Result<Vec<DecisionTicket>> {
        self.require_admin(admin)?;

        let mut tickets = Vec::new();
        for order in self.sessions.open_orders().await? {
            if order.state == OrderState::PendingApproval {
                tickets.push(self.request_decision(&order).await?);
            }
        }
        if tickets.is_empty() {
            self.ack(admin, "No orders awaiting approval.".to_string())
                .await;
        }
        Ok(tickets)
    }

    async fn ack(&self, admin: UserId, text: String) {
        self.send(Notification::AdminAck {
            to: admin,
            order_id: None,
            text,
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::EngineConfig;
    use crate::domain::ports::CatalogStore;
    use crate::domain::product::Stock;
    use crate::infrastructure::in_memory::{
        InMemoryCatalogStore, InMemoryOrderLog, InMemoryOrderStore, InMemoryReferenceGuard,
        RecordingNotifier,
    };

    const ADMIN: UserId = 1;

    fn engine() -> (StorefrontEngine, InMemoryCatalogStore, RecordingNotifier) {
        let catalog = InMemoryCatalogStore::new();
        let notifier = RecordingNotifier::new();
        let engine = StorefrontEngine::new(
            Box::new(catalog.clone()),
            Box::new(InMemoryOrderStore::new()),
            Box::new(InMemoryOrderLog::new()),
            Box::new(InMemoryReferenceGuard::new()),
            Box::new(notifier.clone()),
            EngineConfig {
                admins: vec![ADMIN],
                ..EngineConfig::default()
            },
        );
        (engine, catalog, notifier)
    }

    #[test]
    fn test_next_catalog_id() {
        assert_eq!(next_catalog_id("P", std::iter::empty()), "P0001");
        assert_eq!(next_catalog_id("P", ["P0001", "P0007", "X9"].into_iter()), "P0008");
        assert_eq!(next_catalog_id("PM", ["PM0002"].into_iter()), "PM0003");
    }

    #[tokio::test]
    async fn test_add_edit_delete_product() {
        let (engine, catalog, _) = engine();
        let product = engine
            .add_product(ADMIN, "Ebook|199|img|Books|link|https://x|5")
            .await
            .unwrap();
        assert_eq!(product.id, "P0001");
        assert_eq!(product.stock, Stock::Finite(5));

        engine
            .edit_product(ADMIN, "P0001", "Ebook v2|249|img|Books|link|https://y|unlimited")
            .await
            .unwrap();
        let stored = catalog.product("P0001").await.unwrap().unwrap();
        assert_eq!(stored.name, "Ebook v2");
        assert_eq!(stored.stock, Stock::Unlimited);

        engine.delete_product(ADMIN, "P0001").await.unwrap();
        assert!(matches!(
            engine.delete_product(ADMIN, "P0001").await,
            Err(StorefrontError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_catalog_changes_require_admin() {
        let (engine, catalog, _) = engine();
        let err = engine
            .add_product(7, "Ebook|199|img|Books|link|https://x|5")
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::Unauthorized(7)));
        assert!(catalog.products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_listing() {
        let (engine, _, _) = engine();
        assert!(matches!(
            engine.add_product(ADMIN, "Ebook|199").await,
            Err(StorefrontError::MalformedInput(_))
        ));
        assert!(matches!(
            engine.add_payment_method(ADMIN, "shop@upi").await,
            Err(StorefrontError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_browse_filters_by_category() {
        let (engine, _, notifier) = engine();
        engine
            .add_product(ADMIN, "Ebook|199|img|Books|link|https://x|5")
            .await
            .unwrap();
        engine
            .add_product(ADMIN, "Course|999|img|Courses|file|FILE1|unlimited")
            .await
            .unwrap();

        engine.browse(10, Some("books")).await.unwrap();
        engine.browse(11, Some("All")).await.unwrap();
        engine.browse(12, Some("Music")).await.unwrap();

        assert_eq!(notifier.sent_to(10).await.len(), 1);
        assert_eq!(notifier.sent_to(11).await.len(), 2);
        assert!(matches!(
            notifier.sent_to(12).await.as_slice(),
            [Notification::NoProducts { .. }]
        ));
    }

    #[tokio::test]
    async fn test_start_lists_distinct_categories() {
        let (engine, _, notifier) = engine();
        for listing in [
            "A|1|img|Books|link|x|1",
            "B|1|img|Books|link|x|1",
            "C|1|img|Courses|link|x|1",
        ] {
            engine.add_product(ADMIN, listing).await.unwrap();
        }
        engine.start(10).await.unwrap();
        let sent = notifier.sent_to(10).await;
        let [Notification::Categories { categories, .. }] = sent.as_slice() else {
            panic!("expected one categories message");
        };
        assert_eq!(categories, &vec!["Books".to_string(), "Courses".to_string()]);
    }

    #[tokio::test]
    async fn test_add_edit_delete_slider() {
        let (engine, catalog, _) = engine();
        let slider = engine
            .add_slider(ADMIN, "banner.png|Sale|https://shop")
            .await
            .unwrap();
        assert_eq!(slider.id, "S0001");

        engine.edit_slider(ADMIN, "S0001", "banner2.png").await.unwrap();
        let stored = catalog.slider("S0001").await.unwrap().unwrap();
        assert_eq!(stored.image, "banner2.png");
        assert_eq!(stored.text, "Visit");

        assert!(matches!(
            engine.edit_slider(ADMIN, "S0009", "x.png").await,
            Err(StorefrontError::SliderNotFound(_))
        ));
        engine.delete_slider(ADMIN, "S0001").await.unwrap();
        assert!(matches!(
            engine.delete_slider(ADMIN, "S0001").await,
            Err(StorefrontError::SliderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_slider_changes_require_admin() {
        let (engine, catalog, _) = engine();
        engine.add_slider(ADMIN, "banner.png").await.unwrap();

        assert!(matches!(
            engine.add_slider(7, "other.png").await,
            Err(StorefrontError::Unauthorized(7))
        ));
        assert!(matches!(
            engine.edit_slider(7, "S0001", "other.png").await,
            Err(StorefrontError::Unauthorized(7))
        ));
        assert!(matches!(
            engine.delete_slider(7, "S0001").await,
            Err(StorefrontError::Unauthorized(7))
        ));
        assert_eq!(catalog.sliders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_sends_sliders_before_categories() {
        let (engine, _, notifier) = engine();
        engine.add_product(ADMIN, "A|1|img|Books|link|x|1").await.unwrap();
        engine.add_slider(ADMIN, "one.png").await.unwrap();
        engine.add_slider(ADMIN, "two.png|Deals|https://deals").await.unwrap();

        engine.start(10).await.unwrap();
        let sent = notifier.sent_to(10).await;
        let kinds: Vec<&str> = sent.iter().map(Notification::kind).collect();
        assert_eq!(kinds, ["slider", "slider", "categories"]);
        assert!(matches!(&sent[1], Notification::Slider { link, .. } if link == "https://deals"));
    }
}

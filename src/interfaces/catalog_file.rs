use crate::domain::payment::PaymentMethod;
use crate::domain::ports::CatalogStore;
use crate::domain::product::Product;
use crate::domain::slider::Slider;
use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use tracing::{debug, info};

/// Catalog seed file:
///
/// ```json
/// {
///   "products": { "P0001": { "name": "Ebook", "price": "199", "image": "...",
///                 "category": "Books", "delivery_type": "link",
///                 "data": "https://...", "stock": "unlimited" } },
///   "payment_methods": { "PM0001": { "upi": "shop@upi", "qr": "..." } },
///   "sliders": { "S0001": { "image": "...", "text": "Visit", "link": "https://..." } }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: BTreeMap<String, Product>,
    #[serde(default)]
    pub payment_methods: BTreeMap<String, PaymentMethod>,
    #[serde(default)]
    pub sliders: BTreeMap<String, Slider>,
}

impl CatalogFile {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    /// Inserts entries the store does not know yet. Entries already in the
    /// store win, so re-seeding a persistent store never resets stock.
    pub async fn seed(self, catalog: &dyn CatalogStore) -> Result<usize> {
        let mut inserted = 0;
        for (id, mut product) in self.products {
            if catalog.product(&id).await?.is_some() {
                debug!(product_id = %id, "Keeping stored product");
                continue;
            }
            product.id = id;
            catalog.put_product(product).await?;
            inserted += 1;
        }
        for (id, mut method) in self.payment_methods {
            if catalog.payment_method(&id).await?.is_some() {
                debug!(method_id = %id, "Keeping stored payment method");
                continue;
            }
            method.id = id;
            catalog.put_payment_method(method).await?;
            inserted += 1;
        }
        for (id, mut slider) in self.sliders {
            if catalog.slider(&id).await?.is_some() {
                debug!(slider_id = %id, "Keeping stored slider");
                continue;
            }
            slider.id = id;
            catalog.put_slider(slider).await?;
            inserted += 1;
        }
        info!(inserted, "Catalog seeded");
        Ok(inserted)
    }
}

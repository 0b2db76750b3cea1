use crate::error::{Result, StorefrontError};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Inventory level of a product.
///
/// Digital goods with no ceiling use `Unlimited`; everything else carries a
/// finite unit count that is decremented once per approved order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stock {
    Finite(u32),
    Unlimited,
}

impl Stock {
    pub fn is_available(&self) -> bool {
        match self {
            Stock::Unlimited => true,
            Stock::Finite(units) => *units > 0,
        }
    }

    /// Removes one unit. Taking from an empty finite stock is an error, never
    /// a silent clamp.
    pub fn take_one(self) -> Option<Stock> {
        match self {
            Stock::Unlimited => Some(Stock::Unlimited),
            Stock::Finite(0) => None,
            Stock::Finite(units) => Some(Stock::Finite(units - 1)),
        }
    }

    pub fn return_one(self) -> Stock {
        match self {
            Stock::Unlimited => Stock::Unlimited,
            Stock::Finite(units) => Stock::Finite(units.saturating_add(1)),
        }
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stock::Unlimited => write!(f, "Unlimited"),
            Stock::Finite(units) => write!(f, "Stock: {}", units),
        }
    }
}

impl std::str::FromStr for Stock {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") {
            return Ok(Stock::Unlimited);
        }
        s.parse::<u32>().map(Stock::Finite).map_err(|_| {
            StorefrontError::MalformedInput(format!(
                "stock must be 'unlimited' or a non-negative number, got '{}'",
                s
            ))
        })
    }
}

// Stored as either the string "unlimited" or a plain integer.
impl Serialize for Stock {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Stock::Unlimited => serializer.serialize_str("unlimited"),
            Stock::Finite(units) => serializer.serialize_u32(*units),
        }
    }
}

impl<'de> Deserialize<'de> for Stock {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StockVisitor;

        impl Visitor<'_> for StockVisitor {
            type Value = Stock;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("\"unlimited\" or a non-negative integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Stock, E> {
                u32::try_from(v)
                    .map(Stock::Finite)
                    .map_err(|_| E::custom("stock out of range"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Stock, E> {
                u32::try_from(v)
                    .map(Stock::Finite)
                    .map_err(|_| E::custom("stock must be non-negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Stock, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(StockVisitor)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    File,
    Link,
}

impl std::str::FromStr for DeliveryKind {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(DeliveryKind::File),
            "link" => Ok(DeliveryKind::Link),
            other => Err(StorefrontError::MalformedInput(format!(
                "delivery type must be 'file' or 'link', got '{}'",
                other
            ))),
        }
    }
}

/// A catalog entry.
///
/// `price` is an opaque, admin-formatted string; nothing in the engine does
/// arithmetic on it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub price: String,
    pub image: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(rename = "delivery_type")]
    pub delivery: DeliveryKind,
    /// File reference or URL handed to the buyer on approval.
    #[serde(rename = "data")]
    pub payload: String,
    pub stock: Stock,
}

fn default_category() -> String {
    "General".to_string()
}

impl Product {
    /// Parses the admin listing format
    /// `name|price|image_url|category|type(file/link)|data|stock`.
    pub fn parse_listing(id: impl Into<String>, line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        let &[name, price, image, category, delivery, payload, stock] = parts.as_slice() else {
            return Err(StorefrontError::MalformedInput(format!(
                "expected 7 '|'-separated fields, got {}",
                parts.len()
            )));
        };
        if name.is_empty() || price.is_empty() || payload.is_empty() {
            return Err(StorefrontError::MalformedInput(
                "name, price and data must not be empty".to_string(),
            ));
        }

        Ok(Self {
            id: id.into(),
            name: name.to_string(),
            price: price.to_string(),
            image: image.to_string(),
            category: if category.is_empty() {
                default_category()
            } else {
                category.to_string()
            },
            delivery: delivery.parse()?,
            payload: payload.to_string(),
            stock: stock.parse()?,
        })
    }
}

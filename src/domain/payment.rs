use crate::error::{Result, StorefrontError};
use serde::{Deserialize, Serialize};

/// A way for buyers to pay, e.g. a UPI handle with its QR code.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentMethod {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "upi")]
    pub address: String,
    pub qr: String,
}

impl PaymentMethod {
    /// Parses the admin format `address|qr_image`.
    pub fn parse_listing(id: impl Into<String>, line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        match parts.as_slice() {
            &[address, qr] if !address.is_empty() => Ok(Self {
                id: id.into(),
                address: address.to_string(),
                qr: qr.to_string(),
            }),
            _ => Err(StorefrontError::MalformedInput(
                "expected 'address|qr_image'".to_string(),
            )),
        }
    }
}

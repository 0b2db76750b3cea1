use crate::error::{Result, StorefrontError};
use serde::{Deserialize, Serialize};

/// A promotional banner shown to buyers on start, ahead of the categories.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Slider {
    #[serde(default)]
    pub id: String,
    pub image: String,
    /// Caption of the link button.
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_link")]
    pub link: String,
}

fn default_text() -> String {
    "Visit".to_string()
}

fn default_link() -> String {
    "https://t.me".to_string()
}

impl Slider {
    /// Parses the admin format `image|text|link`. Text and link may be left
    /// out or empty.
    pub fn parse_listing(id: impl Into<String>, line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        let (image, text, link) = match parts.as_slice() {
            &[image] => (image, "", ""),
            &[image, text] => (image, text, ""),
            &[image, text, link] => (image, text, link),
            _ => {
                return Err(StorefrontError::MalformedInput(
                    "expected 'image|text|link'".to_string(),
                ));
            }
        };
        if image.is_empty() {
            return Err(StorefrontError::MalformedInput(
                "slider image must not be empty".to_string(),
            ));
        }

        Ok(Self {
            id: id.into(),
            image: image.to_string(),
            text: if text.is_empty() {
                default_text()
            } else {
                text.to_string()
            },
            link: if link.is_empty() {
                default_link()
            } else {
                link.to_string()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing() {
        let s = Slider::parse_listing("S0001", "banner.png | Sale | https://shop").unwrap();
        assert_eq!(s.id, "S0001");
        assert_eq!(s.image, "banner.png");
        assert_eq!(s.text, "Sale");
        assert_eq!(s.link, "https://shop");

        let s = Slider::parse_listing("S0002", "banner.png").unwrap();
        assert_eq!(s.text, "Visit");
        assert_eq!(s.link, "https://t.me");

        assert!(Slider::parse_listing("S0003", " | Sale | https://shop").is_err());
        assert!(Slider::parse_listing("S0003", "a|b|c|d").is_err());
    }

    #[test]
    fn test_slider_json_defaults() {
        let s: Slider = serde_json::from_str(r#"{"image":"banner.png"}"#).unwrap();
        assert_eq!(s.text, "Visit");
        assert_eq!(s.link, "https://t.me");
    }
}

use crate::common::lenient::{self, Fields};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Korean,
    Japanese,
    Chinese,
    Other(String),
}

impl Category {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "korean" => Category::Korean,
            "japanese" => Category::Japanese,
            "chinese" => Category::Chinese,
            _ => Category::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Korean => "KOREAN",
            Category::Japanese => "JAPANESE",
            Category::Chinese => "CHINESE",
            Category::Other(raw) => raw,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other("ETC".to_string())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Restaurant {
    pub id: Option<i64>,
    pub name: String,
    pub category: Category,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub is_sponsored: bool,
}

impl Restaurant {
    pub fn from_json(v: &Value) -> Self {
        let f = Fields::new(v);
        let id = f.id(&["id", "_id", "rid", "restaurantId"]);
        Self {
            id,
            name: f
                .text(&["name", "restaurantName"])
                .unwrap_or_else(|| match id {
                    Some(id) => format!("Restaurant #{}", id),
                    None => "Unnamed".to_string(),
                }),
            category: f.text(&["category", "cat", "type"]).map(|c| Category::parse(&c)).unwrap_or_default(),
            address: f.string(&["address", "roadAddress"]),
            telephone: f.string(&["telephone", "tel", "phone"]),
            is_sponsored: f.flag(&["is_sponsored", "isSponsored", "sponsored"]),
        }
    }
}

lenient::deserialize_via_adapter!(Restaurant);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestaurantPage {
    pub items: Vec<Restaurant>,
    pub page: u64,
    pub limit: u64,
    pub has_next: bool,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantQuery {
    pub page: u64,
    pub limit: u64,
    pub q: Option<String>,
    /// `ALL` or absent means no category filter.
    pub category: Option<String>,
    pub sponsored_only: Option<String>,
}

impl Default for RestaurantQuery {
    fn default() -> Self {
        Self { page: 1, limit: 5, q: None, category: None, sponsored_only: None }
    }
}

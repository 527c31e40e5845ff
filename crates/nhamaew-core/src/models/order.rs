use serde::{Deserialize, Serialize};

use super::CartItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_item_id: String,
    pub product_item_quantity_id: String,
    pub product_quantity_id: String,
    pub quantity: u32,
}

impl From<&CartItem> for OrderItem {
    /// Missing identifiers are sent as empty strings, which the order
    /// endpoint accepts for products without variants or pack sizes.
    fn from(item: &CartItem) -> Self {
        Self {
            product_item_id: item.product_item_id.clone().unwrap_or_default(),
            product_item_quantity_id: item.product_item_quantity_id.clone().unwrap_or_default(),
            product_quantity_id: item.product_quantity_id.clone().unwrap_or_default(),
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub line_user_id: String,
    pub order_item_list: Vec<OrderItem>,
}

impl CreateOrderRequest {
    pub fn from_cart(line_user_id: &str, items: &[CartItem]) -> Self {
        Self {
            line_user_id: line_user_id.to_string(),
            order_item_list: items.iter().map(OrderItem::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    #[serde(default)]
    pub success: bool,
    pub order_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryItem {
    pub id: i64,
    pub product_id: String,
    pub product_item_id: Option<String>,
    pub product_name: String,
    pub product_item_name: Option<String>,
    pub product_item_quantity_name: Option<String>,
    pub product_quantity_name: Option<String>,
    pub product_item_quantity_id: Option<String>,
    pub product_quantity_id: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub price: f64,
    pub quantity: u32,
}

impl OrderHistoryItem {
    /// Variant, pack and quantity names joined, skipping the missing ones.
    pub fn variant_label(&self) -> String {
        [
            &self.product_item_name,
            &self.product_item_quantity_name,
            &self.product_quantity_name,
        ]
        .into_iter()
        .filter_map(|s| s.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistory {
    pub id: String,
    pub order_code: String,
    pub status: String,
    pub transaction_date: String,
    #[serde(default)]
    pub order_item_list: Vec<OrderHistoryItem>,
}

impl OrderHistory {
    pub fn total(&self) -> f64 {
        self.order_item_list
            .iter()
            .map(|i| i.price * f64::from(i.quantity))
            .sum()
    }

    pub fn item_count(&self) -> u32 {
        self.order_item_list.iter().map(|i| i.quantity).sum()
    }
}

use serde::{Deserialize, Serialize};

/// A line in the customer's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: i64,
    pub product_id: String,
    #[serde(default)]
    pub product_item_id: Option<String>,
    pub product_name: String,
    #[serde(default)]
    pub product_item_name: Option<String>,
    pub product_item_quantity_name: Option<String>,
    pub product_quantity_name: Option<String>,
    pub product_item_quantity_id: Option<String>,
    pub product_quantity_id: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub original_price: f64,
    pub quantity: u32,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl CartItem {
    /// The variant/pack line shown under the product name.
    ///
    /// The variant name wins over the pack-size name; the per-variant pack
    /// name is appended. Returns `None` when the item has neither an option
    /// name nor a quantity name, so no empty line is rendered.
    pub fn option_line(&self) -> Option<String> {
        let option = non_blank(&self.product_item_name).or_else(|| non_blank(&self.product_quantity_name));
        let pack = non_blank(&self.product_item_quantity_name);
        match (option, pack) {
            (None, None) => None,
            (Some(o), None) => Some(o.to_string()),
            (None, Some(p)) => Some(p.to_string()),
            (Some(o), Some(p)) => Some(format!("{} {}", o, p)),
        }
    }

    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    pub fn is_discounted(&self) -> bool {
        self.original_price > self.price
    }
}

/// Sum of all line totals.
pub fn subtotal(items: &[CartItem]) -> f64 {
    items.iter().map(CartItem::line_total).sum()
}

/// Amount saved against original prices across discounted lines.
pub fn total_savings(items: &[CartItem]) -> f64 {
    items
        .iter()
        .filter(|i| i.is_discounted())
        .map(|i| (i.original_price - i.price) * f64::from(i.quantity))
        .sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct CartCount {
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItem {
    pub line_user_id: String,
    pub product_item_id: String,
    pub product_item_quantity_id: String,
    pub product_quantity_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCartItem {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartQuantity {
    pub id: i64,
    pub line_user_id: String,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> CartItem {
        CartItem {
            id: 1,
            product_id: "P1".into(),
            product_item_id: Some("I1".into()),
            product_name: "Cat food".into(),
            product_item_name: None,
            product_item_quantity_name: None,
            product_quantity_name: None,
            product_item_quantity_id: None,
            product_quantity_id: None,
            image_url: String::new(),
            price: 120.0,
            original_price: 150.0,
            quantity: 2,
        }
    }

    #[test]
    fn test_option_line_hidden_when_names_missing() {
        assert_eq!(item().option_line(), None);

        let mut blank = item();
        blank.product_item_name = Some("  ".into());
        blank.product_quantity_name = Some(String::new());
        assert_eq!(blank.option_line(), None);
    }

    #[test]
    fn test_option_line_prefers_item_name() {
        let mut i = item();
        i.product_item_name = Some("Salmon".into());
        i.product_quantity_name = Some("2 kg".into());
        assert_eq!(i.option_line().as_deref(), Some("Salmon"));

        i.product_item_quantity_name = Some("x3".into());
        assert_eq!(i.option_line().as_deref(), Some("Salmon x3"));
    }

    #[test]
    fn test_option_line_falls_back_to_quantity_name() {
        let mut i = item();
        i.product_quantity_name = Some("2 kg".into());
        assert_eq!(i.option_line().as_deref(), Some("2 kg"));
    }

    #[test]
    fn test_subtotal() {
        let mut second = item();
        second.price = 35.5;
        second.quantity = 1;
        assert_eq!(subtotal(&[item(), second]), 275.5);
        assert!(item().is_discounted());
    }

    #[test]
    fn test_total_savings_ignores_full_price_lines() {
        let mut full_price = item();
        full_price.original_price = 0.0;
        // (150 - 120) * 2
        assert_eq!(total_savings(&[item(), full_price]), 60.0);
    }
}

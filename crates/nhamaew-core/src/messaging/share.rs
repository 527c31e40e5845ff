//! LINE message payloads for sharing and for the admin chat.
//!
//! Flex bubbles follow the layout the storefront has always shared: hero
//! image, bold name, price in the brand colour, a "view product" button.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{subtotal, CartItem, ProductDetail};
use crate::utils::{format_baht, truncate};

const PRICE_COLOUR: &str = "#E91E63";
const MUTED_COLOUR: &str = "#666666";
const DESCRIPTION_MAX_CHARS: usize = 120;

/// One message in the LINE Messaging API shape, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShareMessage {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "originalContentUrl")]
        original_content_url: String,
        #[serde(rename = "previewImageUrl")]
        preview_image_url: String,
    },
    Location {
        title: String,
        address: String,
        latitude: f64,
        longitude: f64,
    },
    Sticker {
        #[serde(rename = "packageId")]
        package_id: String,
        #[serde(rename = "stickerId")]
        sticker_id: String,
    },
    Flex {
        #[serde(rename = "altText")]
        alt_text: String,
        contents: Value,
    },
}

impl ShareMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ShareMessage::Text { text: text.into() }
    }

    pub fn image(original_content_url: impl Into<String>, preview_image_url: impl Into<String>) -> Self {
        ShareMessage::Image {
            original_content_url: original_content_url.into(),
            preview_image_url: preview_image_url.into(),
        }
    }

    pub fn location(title: impl Into<String>, address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        ShareMessage::Location {
            title: title.into(),
            address: address.into(),
            latitude,
            longitude,
        }
    }

    pub fn sticker(package_id: impl Into<String>, sticker_id: impl Into<String>) -> Self {
        ShareMessage::Sticker {
            package_id: package_id.into(),
            sticker_id: sticker_id.into(),
        }
    }

    pub fn flex(alt_text: impl Into<String>, contents: Value) -> Self {
        ShareMessage::Flex {
            alt_text: alt_text.into(),
            contents,
        }
    }
}

/// Plain text message.
pub fn text(text: impl Into<String>) -> ShareMessage {
    ShareMessage::text(text)
}

/// Price as the product page shows it. The backend sends prices as strings.
fn display_price(price: Option<&str>) -> String {
    match price.map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => match raw.replace(',', "").parse::<f64>() {
            Ok(amount) => format_baht(amount),
            Err(_) => format!("฿{}", raw),
        },
        None => format_baht(0.0),
    }
}

fn text_component(text: &str, size: &str) -> Value {
    json!({ "type": "text", "text": text, "size": size, "wrap": true })
}

/// Flex bubble advertising a product, linking to `{store_url}/product/{id}`.
pub fn product_message(product: &ProductDetail, store_url: &str) -> ShareMessage {
    let product_url = format!("{}/product/{}", store_url.trim_end_matches('/'), product.product_id);

    let mut body = vec![
        json!({
            "type": "text",
            "text": product.product_name,
            "weight": "bold",
            "size": "xl",
            "wrap": true,
        }),
        json!({
            "type": "text",
            "text": display_price(product.price.as_deref()),
            "weight": "bold",
            "size": "lg",
            "color": PRICE_COLOUR,
        }),
    ];
    if let Some(details) = product.product_details.as_deref().filter(|d| !d.trim().is_empty()) {
        let mut description = text_component(&truncate(details.trim(), DESCRIPTION_MAX_CHARS), "sm");
        description["color"] = json!(MUTED_COLOUR);
        body.push(description);
    }

    let mut bubble = json!({
        "type": "bubble",
        "body": { "type": "box", "layout": "vertical", "contents": body },
        "footer": {
            "type": "box",
            "layout": "vertical",
            "spacing": "sm",
            "contents": [{
                "type": "button",
                "style": "primary",
                "height": "sm",
                "action": { "type": "uri", "label": "ดูสินค้า", "uri": product_url },
            }],
        },
    });
    if let Some(image) = product.image_urls().first() {
        bubble["hero"] = json!({
            "type": "image",
            "url": image,
            "size": "full",
            "aspectRatio": "20:13",
            "aspectMode": "cover",
        });
    }

    ShareMessage::flex(format!("สินค้า: {}", product.product_name), bubble)
}

/// Flex bubble summarising a cart: one row per line plus the subtotal.
pub fn cart_message(items: &[CartItem], customer_name: &str) -> ShareMessage {
    let mut rows: Vec<Value> = Vec::with_capacity(items.len() + 2);
    rows.push(json!({
        "type": "text",
        "text": format!("คำสั่งซื้อของ {}", customer_name),
        "weight": "bold",
        "size": "md",
        "wrap": true,
    }));

    for item in items {
        let mut lines = vec![text_component(&item.product_name, "sm")];
        if let Some(option) = item.option_line() {
            let mut option_text = text_component(&option, "xs");
            option_text["color"] = json!(MUTED_COLOUR);
            lines.push(option_text);
        }
        lines.push(json!({
            "type": "text",
            "text": format!("{} x{}", format_baht(item.price), item.quantity),
            "size": "xs",
            "align": "end",
        }));
        rows.push(json!({ "type": "box", "layout": "vertical", "contents": lines }));
    }

    rows.push(json!({ "type": "separator" }));
    rows.push(json!({
        "type": "box",
        "layout": "horizontal",
        "contents": [
            { "type": "text", "text": "รวม", "weight": "bold" },
            {
                "type": "text",
                "text": format_baht(subtotal(items)),
                "weight": "bold",
                "align": "end",
                "color": PRICE_COLOUR,
            },
        ],
    }));

    let bubble = json!({
        "type": "bubble",
        "body": { "type": "box", "layout": "vertical", "spacing": "md", "contents": rows },
    });
    ShareMessage::flex(format!("ตะกร้าสินค้า ({} รายการ)", items.len()), bubble)
}

use serde::{Deserialize, Serialize};

/// Product card as returned by search, favourites and related-product lists.
/// Prices and counters arrive pre-formatted as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub rating: Option<String>,
    pub sold: Option<String>,
    pub for_pets: Vec<String>,
}

impl Product {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Whether the original price should be shown struck through.
    pub fn is_discounted(&self) -> bool {
        match (&self.price, &self.original_price) {
            (Some(price), Some(original)) => !original.is_empty() && price != original,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Available,
    Unavailable,
    OutOfStock,
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockStatus::Available => write!(f, "พร้อมส่ง"),
            StockStatus::Unavailable => write!(f, "ไม่พร้อมขาย"),
            StockStatus::OutOfStock => write!(f, "สินค้าหมด"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileData {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub name_origin: Option<String>,
    pub file_type: String,
    pub mime_type: Option<String>,
    pub file_size_kb: f64,
    pub file_size_mb: f64,
    pub file_size_gb: f64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFile {
    pub product_id: String,
    pub name: String,
    pub name_origin: String,
    pub url: String,
    pub file_type: String,
    pub mime_type: String,
}

/// A pack-size choice, e.g. "1 kg" or "x3".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityOption {
    pub product_quantity_id: String,
    pub product_id: String,
    pub product_quantity_name: String,
    #[serde(default)]
    pub product_quantity: f64,
    #[serde(default)]
    pub price: f64,
    pub percent_discount: Option<f64>,
    #[serde(default)]
    pub discount_price: f64,
    pub status: StockStatus,
    #[serde(default)]
    pub file: FileData,
    #[serde(default)]
    pub show_delete: bool,
    #[serde(default)]
    pub delete: bool,
}

impl QuantityOption {
    /// Price actually charged: the discount price when a discount applies.
    pub fn effective_price(&self) -> f64 {
        match self.percent_discount {
            Some(pct) if pct > 0.0 && self.discount_price > 0.0 => self.discount_price,
            _ => self.price,
        }
    }
}

/// A product variant (flavour, colour, size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSize {
    pub product_item_id: String,
    pub product_id: String,
    pub product_item_name: String,
    #[serde(default)]
    pub type_size: String,
    pub price: Option<f64>,
    pub percent_discount: Option<f64>,
    #[serde(default)]
    pub discount_price: f64,
    pub status: StockStatus,
    pub sku: Option<String>,
    #[serde(default)]
    pub file: FileData,
    #[serde(default)]
    pub quantity_list: Vec<QuantityOption>,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub show_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub product_id: String,
    #[serde(default)]
    pub product_url: String,
    pub product_name: String,
    #[serde(default)]
    pub price_range: String,
    pub product_details: Option<String>,
    pub product_suitable_for: Option<String>,
    pub ingredients: Option<String>,
    pub nutritional_info: Option<String>,
    pub recommend: Option<String>,
    pub other_recommend: Option<String>,
    pub cautions: Option<String>,
    pub other_product_info: Option<String>,
    pub frequently_asked_questions: Option<String>,
    pub sold: Option<String>,
    pub original_price: Option<String>,
    pub price: Option<String>,
    pub product_balance: Option<String>,
    pub average_review_score: Option<f64>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub file_list: Vec<ProductFile>,
    #[serde(default)]
    pub type_size_list: Vec<TypeSize>,
    #[serde(default)]
    pub quantity_list: Vec<QuantityOption>,
}

impl ProductDetail {
    /// Variants the customer can still pick, hiding soft-deleted entries.
    pub fn available_variants(&self) -> impl Iterator<Item = &TypeSize> {
        self.type_size_list
            .iter()
            .filter(|t| !t.delete && t.status == StockStatus::Available)
    }

    pub fn image_urls(&self) -> Vec<&str> {
        self.file_list.iter().map(|f| f.url.as_str()).collect()
    }
}

/// Sort order understood by `search-products`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProductSort {
    #[default]
    #[serde(rename = "BSP")]
    BestSelling,
    #[serde(rename = "LP")]
    Latest,
    #[serde(rename = "ASC")]
    PriceLowToHigh,
    #[serde(rename = "DESC")]
    PriceHighToLow,
}

impl ProductSort {
    pub const ALL: [ProductSort; 4] = [
        ProductSort::BestSelling,
        ProductSort::Latest,
        ProductSort::PriceLowToHigh,
        ProductSort::PriceHighToLow,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ProductSort::BestSelling => "BSP",
            ProductSort::Latest => "LP",
            ProductSort::PriceLowToHigh => "ASC",
            ProductSort::PriceHighToLow => "DESC",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProductSort::BestSelling => "สินค้าขายดี",
            ProductSort::Latest => "ล่าสุด",
            ProductSort::PriceLowToHigh => "ราคาต่ำ>สูง",
            ProductSort::PriceHighToLow => "ราคาสูง>ต่ำ",
        }
    }

    /// Parse a sort code, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(code.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetType {
    Cat,
    Dog,
    Rabbit,
    Bird,
}

impl PetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PetType::Cat => "cat",
            PetType::Dog => "dog",
            PetType::Rabbit => "rabbit",
            PetType::Bird => "bird",
        }
    }
}

/// Parameters for `search-products`, with the backend defaults filled in.
///
/// Every field is concrete so two searches that differ only in whether a
/// default was spelled out compare (and cache) equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearch {
    pub keyword: String,
    pub page: u32,
    pub size: u32,
    pub product_category_id: Option<i64>,
    pub sort_direction: ProductSort,
}

/// Default page size for every paginated endpoint.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

impl Default for ProductSearch {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            product_category_id: None,
            sort_direction: ProductSort::default(),
        }
    }
}

impl ProductSearch {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().trim().to_string(),
            ..Self::default()
        }
    }

    pub fn in_category(category_id: i64) -> Self {
        Self {
            product_category_id: Some(category_id),
            ..Self::default()
        }
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    pub fn sorted_by(mut self, sort: ProductSort) -> Self {
        self.sort_direction = sort;
        self
    }
}

/// Body for `update-favorites`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavouriteUpdate {
    pub line_user_id: String,
    pub product_id: String,
    pub is_favorite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_search_serializes_wire_names() {
        let search = ProductSearch::in_category(42).sorted_by(ProductSort::PriceLowToHigh);
        let value = serde_json::to_value(&search).expect("serialize search");
        assert_eq!(value["productCategoryId"], 42);
        assert_eq!(value["sortDirection"], "ASC");
        assert_eq!(value["size"], 10);
        assert_eq!(value["keyword"], "");
    }

    #[test]
    fn test_sort_from_code() {
        assert_eq!(ProductSort::from_code("bsp"), Some(ProductSort::BestSelling));
        assert_eq!(ProductSort::from_code(" DESC "), Some(ProductSort::PriceHighToLow));
        assert_eq!(ProductSort::from_code("price"), None);
    }

    #[test]
    fn test_parse_product_detail() {
        let json = r#"{
            "productId":"P1","productUrl":"","productName":"Royal Canin","priceRange":"฿100 - ฿300",
            "isFavorite":true,
            "typeSizeList":[{"productItemId":"I1","productId":"P1","productItemName":"Kitten","typeSize":"",
                "price":null,"percentDiscount":null,"discountPrice":0,"status":"OUT_OF_STOCK","sku":null,
                "quantityList":[],"delete":false,"showDelete":false}],
            "quantityList":[{"productQuantityId":"Q1","productId":"P1","productQuantityName":"2 kg",
                "productQuantity":2,"price":300,"percentDiscount":10,"discountPrice":270,"status":"AVAILABLE",
                "showDelete":false,"delete":false}]
        }"#;
        let detail: ProductDetail = serde_json::from_str(json).expect("detail json");
        assert!(detail.is_favorite);
        assert_eq!(detail.available_variants().count(), 0);
        assert_eq!(detail.quantity_list[0].effective_price(), 270.0);
    }

    #[test]
    fn test_is_discounted() {
        let product = Product {
            price: Some("90".into()),
            original_price: Some("120".into()),
            ..Product::default()
        };
        assert!(product.is_discounted());
        assert!(!Product::default().is_discounted());
    }
}

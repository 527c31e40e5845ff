//! Cache keys for every storefront read.
//!
//! Operation names match the ones the web storefront used, so invalidation
//! rules read the same on both sides.

use serde::Serialize;
use serde_json::Value;

use crate::cache::QueryKey;
use crate::models::ProductSearch;

pub const BANNERS: &str = "getBannersAndCategory";
pub const CATEGORIES: &str = "getCategories";
pub const PRODUCTS: &str = "getProducts";
pub const PRODUCT_DETAIL: &str = "getProductDetail";
pub const INTERESTING_PRODUCTS: &str = "getInterestingProducts";
pub const PRODUCT_REVIEWS: &str = "getProductReviews";
pub const FAVOURITES: &str = "getFavouriteData";
pub const CART_ITEMS: &str = "getMyCartData";
pub const CART_COUNT: &str = "getMyCartCount";
pub const ORDER_HISTORY: &str = "getOrderHistory";
pub const SHIPPING_ADDRESS: &str = "getShippingAddress";
pub const USER_PROFILE: &str = "userProfile";

/// Key whose parameters are the serialized fields of `params`.
pub fn from_params<P: Serialize>(operation: &str, params: &P) -> QueryKey {
    let mut key = QueryKey::new(operation);
    if let Ok(Value::Object(fields)) = serde_json::to_value(params) {
        for (name, value) in fields {
            key = key.param(&name, value);
        }
    }
    key
}

/// Key for a read scoped to one LINE user.
pub fn user(operation: &str, line_user_id: &str) -> QueryKey {
    QueryKey::new(operation).param("lineUserId", line_user_id)
}

pub fn banners() -> QueryKey {
    QueryKey::new(BANNERS)
}

pub fn categories(animal_type: &str) -> QueryKey {
    QueryKey::new(CATEGORIES).param("animalType", animal_type)
}

pub fn products(search: &ProductSearch) -> QueryKey {
    from_params(PRODUCTS, search)
}

pub fn product_detail(product_id: &str, line_user_id: &str) -> QueryKey {
    QueryKey::new(PRODUCT_DETAIL)
        .param("productId", product_id)
        .param("lineUserId", line_user_id)
}

fn product_page(operation: &str, product_id: &str, page: u32, size: u32) -> QueryKey {
    QueryKey::new(operation)
        .param("productId", product_id)
        .param("page", page)
        .param("size", size)
}

pub fn interesting_products(product_id: &str, page: u32, size: u32) -> QueryKey {
    product_page(INTERESTING_PRODUCTS, product_id, page, size)
}

pub fn product_reviews(product_id: &str, page: u32, size: u32) -> QueryKey {
    product_page(PRODUCT_REVIEWS, product_id, page, size)
}

pub fn favourites(line_user_id: &str, page: u32, size: u32) -> QueryKey {
    user(FAVOURITES, line_user_id).param("page", page).param("size", size)
}

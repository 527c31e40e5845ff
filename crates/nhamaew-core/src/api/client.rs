//! API client for communicating with the pet store REST API.
//!
//! This module provides the `ApiClient` struct. It performs no caching;
//! `crate::storefront::Storefront` layers the query cache on top of it.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    AddCartItem, BannerAndCategoryData, CartCount, CartItem, Category, CategoryResponse,
    ChatAdminRequest, ChatAdminResponse, CreateOrderRequest, CreateOrderResponse, DeleteCartItem,
    FavouriteUpdate, LineProfile, OrderHistory, Page, Product, ProductDetail, ProductSearch,
    ProfileUpdate, ProfileUpdateResponse, Review, ShippingAddress, UpdateCartQuantity,
    UpdateShippingAddress,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Path prefix shared by every storefront endpoint
const API_PREFIX: &str = "/api/pet-store/v1";

/// HTTP request timeout in seconds, matching the web storefront.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRequest<'a> {
    line_user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnimalTypeRequest<'a> {
    animal_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductDetailRequest<'a> {
    product_id: &'a str,
    line_user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductPageRequest<'a> {
    product_id: &'a str,
    page: u32,
    size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FavouritesRequest<'a> {
    line_user_id: &'a str,
    page: u32,
    size: u32,
}

/// Acknowledgement bodies from write endpoints vary; keep them opaque.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Ack(pub serde_json::Value);

/// API client for the pet store backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (scheme and host, no path)
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, path)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, retrying rate-limited responses with exponential backoff.
    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut builder = self.client.request(method.clone(), &url);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send {} request to {}", method, url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response
                        .text()
                        .await
                        .with_context(|| format!("Failed to read response body from {}", url))?;
                    debug!(url = %url, bytes = text.len(), "Response received");
                    return Self::parse_body(&text)
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    /// Parse a response body. Write endpoints sometimes answer with an empty
    /// body, which is read as JSON `null`.
    fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T> {
        let text = if text.trim().is_empty() { "null" } else { text };
        serde_json::from_str(text).map_err(|e| ApiError::InvalidResponse(e.to_string()).into())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    // ===== Catalogue =====

    /// Fetch home page banners and the per-animal category tiles
    pub async fn fetch_banners(&self) -> Result<BannerAndCategoryData> {
        self.get("get-banners").await
    }

    /// Fetch the full category tree for one animal type
    pub async fn fetch_categories(&self, animal_type: &str) -> Result<Vec<Category>> {
        let response: CategoryResponse = self
            .post("products-category-all", &AnimalTypeRequest { animal_type })
            .await?;
        Ok(response.products_category_list)
    }

    pub async fn search_products(&self, search: &ProductSearch) -> Result<Page<Product>> {
        self.post("search-products", search).await
    }

    /// Fetch a product page; `line_user_id` may be empty for guests
    pub async fn fetch_product_detail(&self, product_id: &str, line_user_id: &str) -> Result<ProductDetail> {
        self.post("get-product-detail", &ProductDetailRequest { product_id, line_user_id })
            .await
    }

    /// Fetch products related to `product_id`
    pub async fn fetch_interesting_products(&self, product_id: &str, page: u32, size: u32) -> Result<Page<Product>> {
        self.post("interesting-products", &ProductPageRequest { product_id, page, size })
            .await
    }

    pub async fn fetch_reviews(&self, product_id: &str, page: u32, size: u32) -> Result<Page<Review>> {
        self.post("review-product", &ProductPageRequest { product_id, page, size })
            .await
    }

    // ===== Favourites =====

    pub async fn fetch_favourites(&self, line_user_id: &str, page: u32, size: u32) -> Result<Page<Product>> {
        self.post("get-favorites", &FavouritesRequest { line_user_id, page, size })
            .await
    }

    pub async fn update_favourite(&self, update: &FavouriteUpdate) -> Result<Ack> {
        self.request(Method::PUT, "update-favorites", Some(update)).await
    }

    // ===== Cart =====

    pub async fn fetch_cart_items(&self, line_user_id: &str) -> Result<Vec<CartItem>> {
        let items: Option<Vec<CartItem>> = self
            .post("get-items-my-cart", &UserRequest { line_user_id })
            .await?;
        Ok(items.unwrap_or_default())
    }

    pub async fn fetch_cart_count(&self, line_user_id: &str) -> Result<CartCount> {
        self.post("get-items-my-cart-total", &UserRequest { line_user_id })
            .await
    }

    pub async fn add_cart_item(&self, item: &AddCartItem) -> Result<Ack> {
        self.post("add-items-my-cart", item).await
    }

    pub async fn delete_cart_item(&self, item: &DeleteCartItem) -> Result<Ack> {
        self.request(Method::DELETE, "delete-items-my-cart", Some(item)).await
    }

    pub async fn update_cart_quantity(&self, update: &UpdateCartQuantity) -> Result<Ack> {
        self.request(Method::PATCH, "items-my-cart-patch-quantity", Some(update))
            .await
    }

    // ===== Orders =====

    pub async fn create_order(&self, order: &CreateOrderRequest) -> Result<CreateOrderResponse> {
        self.post("create-order", order).await
    }

    pub async fn fetch_order_history(&self, line_user_id: &str) -> Result<Vec<OrderHistory>> {
        let orders: Option<Vec<OrderHistory>> = self
            .post("get-order", &UserRequest { line_user_id })
            .await?;
        Ok(orders.unwrap_or_default())
    }

    // ===== Shipping address =====

    pub async fn fetch_shipping_address(&self, line_user_id: &str) -> Result<ShippingAddress> {
        let address: Option<ShippingAddress> = self
            .post("get-shipping-address", &UserRequest { line_user_id })
            .await?;
        Ok(address.unwrap_or_default())
    }

    pub async fn update_shipping_address(&self, update: &UpdateShippingAddress) -> Result<ShippingAddress> {
        self.request(Method::PUT, "update-shipping-address", Some(update))
            .await
    }

    // ===== Profile & chat =====

    pub async fn fetch_line_profile(&self, line_user_id: &str) -> Result<LineProfile> {
        if line_user_id.is_empty() || line_user_id.contains('/') {
            return Err(ApiError::InvalidResponse(format!("Invalid LINE user id: {:?}", line_user_id)).into());
        }
        self.get(&format!("get-line-profile/{}", line_user_id)).await
    }

    pub async fn register_update_profile(&self, update: &ProfileUpdate) -> Result<ProfileUpdateResponse> {
        self.post("register-update-profile", update).await
    }

    pub async fn chat_with_admin(&self, request: &ChatAdminRequest) -> Result<ChatAdminResponse> {
        self.post("chat-admin", request).await
    }
}

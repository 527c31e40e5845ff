//! The storefront service: the typed API client behind the query cache.
//!
//! Every read goes through `QueryClient::query` under a key from `keys`.
//! Every write goes through `QueryClient::mutate` with the keys it makes
//! stale:
//!
//! | Write | Invalidates |
//! |---|---|
//! | add / delete / change quantity of a cart item | cart items, cart count |
//! | create order | cart items, cart count, order history |
//! | update shipping address | shipping address, then re-seeded |
//! | toggle favourite | favourites, product detail |
//! | update profile | user profile |
//! | chat with admin | nothing |
//!
//! Reads and writes scoped to the signed-in user are disabled without a
//! session: they return `Ok(None)` and never reach the network.

pub mod keys;

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::client::Ack;
use crate::api::ApiClient;
use crate::auth::{Session, SessionData};
use crate::cache::{CacheError, KeyPattern, QueryClient, QueryOptions};
use crate::config::Config;
use crate::messaging::Bridge;
use crate::models::{
    AddCartItem, BannerAndCategoryData, CartCount, CartItem, Category, ChatAdminRequest,
    ChatAdminResponse, CreateOrderRequest, CreateOrderResponse, DeleteCartItem, FavouriteUpdate,
    LineProfile, OrderHistory, Page, Product, ProductDetail, ProductSearch, ProfileUpdate,
    ProfileUpdateResponse, Review, ShippingAddress, UpdateCartQuantity, UpdateShippingAddress,
    DEFAULT_PAGE_SIZE,
};
use crate::pagination::InfiniteList;

/// Page fetcher behind a storefront feed.
pub type PageFetcher<T> = Box<dyn Fn(u32) -> BoxFuture<'static, Result<Page<T>, CacheError>> + Send + Sync>;

/// An infinitely scrolling list whose pages are served through the cache.
pub type Feed<T> = InfiniteList<T, PageFetcher<T>>;

/// Why an order could not be submitted.
#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Sign in before placing an order")]
    NotSignedIn,

    #[error("The cart is empty")]
    EmptyCart,

    #[error("Add a shipping address before placing an order")]
    MissingShippingAddress,

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// The product variant and pack size to add to the cart. Missing ids are
/// sent as empty strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSelection {
    pub product_item_id: String,
    pub product_item_quantity_id: Option<String>,
    pub product_quantity_id: Option<String>,
    pub quantity: u32,
}

#[derive(Clone)]
pub struct Storefront {
    api: ApiClient,
    cache: QueryClient,
    session: Arc<RwLock<Session>>,
    options: QueryOptions,
}

impl Storefront {
    pub fn new(api: ApiClient, cache: QueryClient, session: Session) -> Self {
        Self {
            api,
            cache,
            session: Arc::new(RwLock::new(session)),
            options: QueryOptions::default(),
        }
    }

    /// Build the API client from `config` and restore the saved session.
    /// An unreadable session file is ignored (signed out).
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api = ApiClient::new(&config.api_base_url, config.request_timeout_secs)?;
        let mut session = Session::new(config.cache_dir()?);
        if let Err(e) = session.load() {
            warn!(error = %e, "Ignoring unreadable session");
        }
        Ok(Self::new(api, QueryClient::new(), session))
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(&self) -> &QueryClient {
        &self.cache
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_mut(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// LINE user id of the current session, if signed in.
    pub fn line_user_id(&self) -> Option<String> {
        self.session().line_user_id().map(str::to_string)
    }

    pub fn session_data(&self) -> Option<SessionData> {
        let session = self.session();
        session.is_valid().then(|| session.data.clone()).flatten()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session().is_valid()
    }

    /// When the signed-in user's read for `operation` (one of the `keys`
    /// constants) was last stored in the cache.
    pub async fn last_updated(&self, operation: &str) -> Option<DateTime<Utc>> {
        let user = self.line_user_id()?;
        self.cache.cached_at(&keys::user(operation, &user)).await
    }

    // ===== Session =====

    /// Start a session for a LINE user.
    ///
    /// The stored profile (gender, birth date) is read back and re-registered
    /// together with the LINE display name and picture. If that fails the
    /// user is still signed in, with `profile_updated = false`.
    pub async fn sign_in(&self, profile: &LineProfile, access_token: Option<String>) -> anyhow::Result<SessionData> {
        if profile.user_id.is_empty() || profile.user_id.contains('/') {
            bail!("Invalid LINE user id: {:?}", profile.user_id);
        }

        let profile_updated = match self.register_profile(profile).await {
            Ok(response) => {
                debug!(message = %response.message, "Profile registered");
                true
            }
            Err(e) => {
                warn!(error = %e, "Profile registration failed, signing in anyway");
                false
            }
        };

        let data = SessionData {
            picture_url: Some(profile.picture_url.clone()).filter(|p| !p.is_empty()),
            access_token,
            profile_updated,
            ..SessionData::new(profile.user_id.clone(), profile.display_name.clone())
        };

        {
            let mut session = self.session_mut();
            session.update(data.clone());
            session.save().context("Failed to save session")?;
        }
        self.cache
            .invalidate(&[KeyPattern::Exact(keys::user(keys::USER_PROFILE, &data.line_user_id))])
            .await;
        info!(user = %data.line_user_id, profile_updated, "Signed in");
        Ok(data)
    }

    async fn register_profile(&self, profile: &LineProfile) -> anyhow::Result<ProfileUpdateResponse> {
        let stored = self.api.fetch_line_profile(&profile.user_id).await?;
        let update = ProfileUpdate {
            line_user_id: profile.user_id.clone(),
            display_name: Some(profile.display_name.clone()),
            picture_url: Some(profile.picture_url.clone()),
            gender: Some(stored.gender.unwrap_or_default()),
            birth_date: Some(stored.birth_date.unwrap_or_default()),
        };
        self.api.register_update_profile(&update).await
    }

    /// Sign in as whoever the messaging platform says is using the app.
    pub async fn sign_in_with_bridge(&self, bridge: &Bridge) -> anyhow::Result<SessionData> {
        let profile = bridge
            .get_profile()
            .await
            .context("Failed to read the LINE profile")?;
        let access_token = match bridge.access_token().await {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "No access token from messaging platform");
                None
            }
        };
        self.sign_in(&profile, access_token).await
    }

    /// End the session and drop every cached read.
    pub async fn sign_out(&self) -> anyhow::Result<()> {
        self.session_mut().clear().context("Failed to remove session")?;
        self.cache.clear().await;
        info!("Signed out");
        Ok(())
    }

    // ===== Helpers =====

    /// Cached read scoped to the signed-in user. Disabled without a session.
    async fn user_query<T, F, Fut>(&self, operation: &'static str, fetch: F) -> Result<Option<T>, CacheError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(ApiClient, String) -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let Some(user) = self.line_user_id() else {
            debug!(operation, "No session, query disabled");
            return Ok(None);
        };
        let key = keys::user(operation, &user);
        let api = self.api.clone();
        self.cache
            .query(key, self.options, move || fetch(api, user))
            .await
            .map(Some)
    }

    /// Write scoped to the signed-in user. Disabled without a session.
    async fn user_mutation<T, F, Fut>(&self, invalidates: &[&str], mutation: F) -> Result<Option<T>, CacheError>
    where
        F: FnOnce(ApiClient, String) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let Some(user) = self.line_user_id() else {
            debug!("No session, mutation disabled");
            return Ok(None);
        };
        let patterns: Vec<KeyPattern> = invalidates.iter().map(|op| KeyPattern::operation(*op)).collect();
        let api = self.api.clone();
        self.cache
            .mutate(&patterns, move || mutation(api, user))
            .await
            .map(Some)
    }

    // ===== Catalogue =====

    pub async fn banners_and_categories(&self) -> Result<BannerAndCategoryData, CacheError> {
        let api = self.api.clone();
        self.cache
            .query(keys::banners(), self.options, move || async move { api.fetch_banners().await })
            .await
    }

    /// Category tree for one animal type. Disabled for an empty type.
    pub async fn categories(&self, animal_type: &str) -> Result<Option<Vec<Category>>, CacheError> {
        let animal_type = animal_type.trim().to_string();
        if animal_type.is_empty() {
            return Ok(None);
        }
        let api = self.api.clone();
        self.cache
            .query(keys::categories(&animal_type), self.options, move || async move {
                api.fetch_categories(&animal_type).await
            })
            .await
            .map(Some)
    }

    pub async fn search_products(&self, search: &ProductSearch) -> Result<Page<Product>, CacheError> {
        let api = self.api.clone();
        let search = search.clone();
        self.cache
            .query(keys::products(&search), self.options, move || async move {
                api.search_products(&search).await
            })
            .await
    }

    /// Product page. Guests get it too, without their favourite flag.
    pub async fn product_detail(&self, product_id: &str) -> Result<ProductDetail, CacheError> {
        let api = self.api.clone();
        let product_id = product_id.to_string();
        let user = self.line_user_id().unwrap_or_default();
        self.cache
            .query(keys::product_detail(&product_id, &user), self.options, move || async move {
                api.fetch_product_detail(&product_id, &user).await
            })
            .await
    }

    pub async fn interesting_products(&self, product_id: &str, page: u32, size: u32) -> Result<Page<Product>, CacheError> {
        let api = self.api.clone();
        let product_id = product_id.to_string();
        self.cache
            .query(keys::interesting_products(&product_id, page, size), self.options, move || async move {
                api.fetch_interesting_products(&product_id, page, size).await
            })
            .await
    }

    pub async fn product_reviews(&self, product_id: &str, page: u32, size: u32) -> Result<Page<Review>, CacheError> {
        let api = self.api.clone();
        let product_id = product_id.to_string();
        self.cache
            .query(keys::product_reviews(&product_id, page, size), self.options, move || async move {
                api.fetch_reviews(&product_id, page, size).await
            })
            .await
    }

    // ===== User-scoped reads =====

    pub async fn favourites(&self, page: u32, size: u32) -> Result<Option<Page<Product>>, CacheError> {
        let Some(user) = self.line_user_id() else {
            return Ok(None);
        };
        let api = self.api.clone();
        self.cache
            .query(keys::favourites(&user, page, size), self.options, move || async move {
                api.fetch_favourites(&user, page, size).await
            })
            .await
            .map(Some)
    }

    pub async fn cart_items(&self) -> Result<Option<Vec<CartItem>>, CacheError> {
        self.user_query(keys::CART_ITEMS, |api, user| async move { api.fetch_cart_items(&user).await })
            .await
    }

    pub async fn cart_count(&self) -> Result<Option<CartCount>, CacheError> {
        self.user_query(keys::CART_COUNT, |api, user| async move { api.fetch_cart_count(&user).await })
            .await
    }

    pub async fn order_history(&self) -> Result<Option<Vec<OrderHistory>>, CacheError> {
        self.user_query(keys::ORDER_HISTORY, |api, user| async move {
            api.fetch_order_history(&user).await
        })
        .await
    }

    pub async fn shipping_address(&self) -> Result<Option<ShippingAddress>, CacheError> {
        self.user_query(keys::SHIPPING_ADDRESS, |api, user| async move {
            api.fetch_shipping_address(&user).await
        })
        .await
    }

    pub async fn line_profile(&self) -> Result<Option<LineProfile>, CacheError> {
        self.user_query(keys::USER_PROFILE, |api, user| async move { api.fetch_line_profile(&user).await })
            .await
    }

    // ===== Writes =====

    pub async fn add_to_cart(&self, selection: CartSelection) -> Result<Option<Ack>, CacheError> {
        self.user_mutation(&[keys::CART_ITEMS, keys::CART_COUNT], |api, user| async move {
            let item = AddCartItem {
                line_user_id: user,
                product_item_id: selection.product_item_id,
                product_item_quantity_id: selection.product_item_quantity_id.unwrap_or_default(),
                product_quantity_id: selection.product_quantity_id.unwrap_or_default(),
                quantity: selection.quantity.max(1),
            };
            api.add_cart_item(&item).await
        })
        .await
    }

    pub async fn delete_cart_item(&self, cart_item_id: i64) -> Result<Option<Ack>, CacheError> {
        self.user_mutation(&[keys::CART_ITEMS, keys::CART_COUNT], |api, _user| async move {
            api.delete_cart_item(&DeleteCartItem { id: cart_item_id }).await
        })
        .await
    }

    pub async fn update_cart_quantity(&self, cart_item_id: i64, quantity: u32) -> Result<Option<Ack>, CacheError> {
        self.user_mutation(&[keys::CART_ITEMS, keys::CART_COUNT], |api, user| async move {
            let update = UpdateCartQuantity {
                id: cart_item_id,
                line_user_id: user,
                quantity,
            };
            api.update_cart_quantity(&update).await
        })
        .await
    }

    pub async fn create_order(&self, items: &[CartItem]) -> Result<Option<CreateOrderResponse>, CacheError> {
        let items = items.to_vec();
        self.user_mutation(
            &[keys::CART_ITEMS, keys::CART_COUNT, keys::ORDER_HISTORY],
            |api, user| async move {
                let order = CreateOrderRequest::from_cart(&user, &items);
                api.create_order(&order).await
            },
        )
        .await
    }

    /// Save the shipping address, then seed the cache with what the backend
    /// stored so the next read needs no round trip.
    pub async fn update_shipping_address(&self, address: ShippingAddress) -> Result<Option<ShippingAddress>, CacheError> {
        let Some(user) = self.line_user_id() else {
            return Ok(None);
        };
        let update = UpdateShippingAddress {
            line_user_id: user.clone(),
            recipient_full_name: address.recipient_full_name,
            recipient_phone_number: address.recipient_phone_number,
            shipping_address: address.shipping_address,
            additional_address: address.additional_address,
        };
        let api = self.api.clone();
        let saved = self
            .cache
            .mutate(&[KeyPattern::operation(keys::SHIPPING_ADDRESS)], move || async move {
                api.update_shipping_address(&update).await
            })
            .await?;
        self.cache
            .set_query_data(keys::user(keys::SHIPPING_ADDRESS, &user), saved.clone(), self.options)
            .await;
        Ok(Some(saved))
    }

    pub async fn toggle_favourite(&self, product_id: &str, is_favorite: bool) -> Result<Option<Ack>, CacheError> {
        let product_id = product_id.to_string();
        self.user_mutation(&[keys::FAVOURITES, keys::PRODUCT_DETAIL], |api, user| async move {
            let update = FavouriteUpdate {
                line_user_id: user,
                product_id,
                is_favorite,
            };
            api.update_favourite(&update).await
        })
        .await
    }

    /// Update the stored profile. `line_user_id` is taken from the session.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Option<ProfileUpdateResponse>, CacheError> {
        self.user_mutation(&[keys::USER_PROFILE], |api, user| async move {
            let update = ProfileUpdate {
                line_user_id: user,
                ..update
            };
            api.register_update_profile(&update).await
        })
        .await
    }

    /// Ask the backend to open a chat with the shop admin, optionally about
    /// one product.
    pub async fn chat_with_admin(&self, product_id: Option<&str>) -> Result<Option<ChatAdminResponse>, CacheError> {
        let product_id = product_id.map(str::to_string);
        self.user_mutation(&[], |api, user| async move {
            let request = ChatAdminRequest {
                line_user_id: user,
                product_id,
            };
            api.chat_with_admin(&request).await
        })
        .await
    }

    /// Submit the current cart as an order.
    ///
    /// Requires a session, a non-empty cart and a saved shipping address.
    pub async fn checkout(&self) -> Result<CreateOrderResponse, CheckoutError> {
        if !self.is_signed_in() {
            return Err(CheckoutError::NotSignedIn);
        }
        let items = self.cart_items().await?.unwrap_or_default();
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let address = self.shipping_address().await?.unwrap_or_default();
        if address.is_empty() {
            return Err(CheckoutError::MissingShippingAddress);
        }

        info!(items = items.len(), "Submitting order");
        self.create_order(&items)
            .await?
            .ok_or(CheckoutError::NotSignedIn)
    }

    // ===== Feeds =====

    fn feed<T, F, Fut>(&self, fetch: F) -> Feed<T>
    where
        T: Clone + Send + 'static,
        F: Fn(Storefront, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>, CacheError>> + Send + 'static,
    {
        let this = self.clone();
        let fetch_page: PageFetcher<T> =
            Box::new(move |page| -> BoxFuture<'static, Result<Page<T>, CacheError>> {
                Box::pin(fetch(this.clone(), page))
            });
        InfiniteList::new(fetch_page)
    }

    /// Search results, one page per `fetch_next`.
    pub fn product_feed(&self, search: ProductSearch) -> Feed<Product> {
        self.feed(move |store, page| {
            let search = search.with_page(page);
            async move { store.search_products(&search).await }
        })
    }

    pub fn review_feed(&self, product_id: &str, size: u32) -> Feed<Review> {
        let product_id = product_id.to_string();
        let size = if size == 0 { DEFAULT_PAGE_SIZE } else { size };
        self.feed(move |store, page| {
            let product_id = product_id.clone();
            async move { store.product_reviews(&product_id, page, size).await }
        })
    }

    /// Products related to `product_id`.
    pub fn interesting_feed(&self, product_id: &str, size: u32) -> Feed<Product> {
        let product_id = product_id.to_string();
        let size = if size == 0 { DEFAULT_PAGE_SIZE } else { size };
        self.feed(move |store, page| {
            let product_id = product_id.clone();
            async move { store.interesting_products(&product_id, page, size).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryKey;
    use crate::pagination::FetchNext;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{tempdir, TempDir};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Nothing listens here, so any request that escapes the cache fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    /// Decodes as every write response the storefront reads back: an address
    /// for the shipping update, an opaque body for the rest.
    const SAVED_ADDRESS: &str = r#"{"recipientFullName":"Mali Jaidee","recipientPhoneNumber":"0812345678","shippingAddress":"1 Silom, Bangkok","additionalAddress":""}"#;

    fn storefront_at(base_url: &str, signed_in_as: Option<&str>) -> (Storefront, TempDir) {
        let dir = tempdir().expect("temp dir");
        let api = ApiClient::new(base_url, 2).expect("client");
        let mut session = Session::new(dir.path().to_path_buf());
        if let Some(user) = signed_in_as {
            session.update(SessionData::new(user, "Mali"));
        }
        (Storefront::new(api, QueryClient::new(), session), dir)
    }

    fn storefront(signed_in_as: Option<&str>) -> (Storefront, TempDir) {
        storefront_at(UNREACHABLE, signed_in_as)
    }

    /// Read one HTTP/1.1 request, headers and body.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Local backend answering every request with `200` and `body`.
    /// Returns its base URL and a count of requests served.
    async fn backend(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let served = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&served);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{}", addr), served)
    }

    async fn seed(store: &Storefront, key: QueryKey) {
        store.cache().set_query_data(key, "cached", QueryOptions::default()).await;
    }

    async fn is_cached(store: &Storefront, key: QueryKey) -> bool {
        store.cache().cached_at(&key).await.is_some()
    }

    fn cart_line(id: i64) -> CartItem {
        serde_json::from_value(serde_json::json!({
            "id": id, "productId": "P1", "productName": "Cat food",
            "productItemQuantityName": null, "productQuantityName": null,
            "productItemQuantityId": null, "productQuantityId": null,
            "price": 120.0, "quantity": 1
        }))
        .expect("cart json")
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            recipient_full_name: "Mali Jaidee".into(),
            recipient_phone_number: "0812345678".into(),
            shipping_address: "99 Sukhumvit, Bangkok".into(),
            additional_address: String::new(),
        }
    }

    fn product_page(ids: &[&str], last: bool) -> Page<Product> {
        Page {
            content: ids
                .iter()
                .map(|id| Product {
                    id: Some(id.to_string()),
                    ..Product::default()
                })
                .collect(),
            first: false,
            last,
            total_pages: 2,
            total_elements: 3,
            empty: false,
        }
    }

    #[tokio::test]
    async fn test_user_queries_disabled_without_session() {
        let (store, _dir) = storefront(None);
        assert_eq!(store.cart_items().await.expect("cart"), None);
        assert_eq!(store.cart_count().await.expect("count"), None);
        assert_eq!(store.order_history().await.expect("orders"), None);
        assert_eq!(store.shipping_address().await.expect("address"), None);
        assert!(store.favourites(0, 10).await.expect("favourites").is_none());
        assert!(store.last_updated(keys::CART_ITEMS).await.is_none());
        assert!(store.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_user_mutations_disabled_without_session() {
        let (store, _dir) = storefront(None);
        assert!(store.delete_cart_item(1).await.expect("delete").is_none());
        assert!(store.update_shipping_address(address()).await.expect("address").is_none());
        assert!(store.chat_with_admin(None).await.expect("chat").is_none());
    }

    #[tokio::test]
    async fn test_empty_animal_type_disabled() {
        let (store, _dir) = storefront(None);
        assert_eq!(store.categories("  ").await.expect("categories"), None);
    }

    #[tokio::test]
    async fn test_reads_served_from_cache() {
        let (store, _dir) = storefront(Some("U1"));
        store
            .cache()
            .set_query_data(keys::user(keys::CART_ITEMS, "U1"), vec![cart_line(1)], QueryOptions::default())
            .await;

        let items = store.cart_items().await.expect("cart").expect("enabled");
        assert_eq!(items.len(), 1);
        assert!(store.last_updated(keys::CART_ITEMS).await.is_some());
        assert!(store.last_updated(keys::ORDER_HISTORY).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let (store, _dir) = storefront(Some("U1"));
        let key = keys::user(keys::CART_ITEMS, "U1");
        store
            .cache()
            .set_query_data(key.clone(), vec![cart_line(1)], QueryOptions::default())
            .await;

        assert!(store.delete_cart_item(1).await.is_err());
        assert!(store.cache().get_query_data::<Vec<CartItem>>(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_cart_writes_invalidate_cart_and_count() {
        let (url, _served) = backend(SAVED_ADDRESS).await;
        let (store, _dir) = storefront_at(&url, Some("U1"));
        let cart = || keys::user(keys::CART_ITEMS, "U1");
        let count = || keys::user(keys::CART_COUNT, "U1");
        let orders = || keys::user(keys::ORDER_HISTORY, "U1");

        for step in 0..3 {
            seed(&store, cart()).await;
            seed(&store, count()).await;
            seed(&store, orders()).await;

            let ack = match step {
                0 => {
                    let selection = CartSelection {
                        product_item_id: "I1".into(),
                        quantity: 2,
                        ..CartSelection::default()
                    };
                    store.add_to_cart(selection).await
                }
                1 => store.delete_cart_item(7).await,
                _ => store.update_cart_quantity(7, 3).await,
            };
            assert!(ack.expect("write succeeds").is_some(), "step {}", step);

            assert!(!is_cached(&store, cart()).await, "step {}", step);
            assert!(!is_cached(&store, count()).await, "step {}", step);
            assert!(is_cached(&store, orders()).await, "step {}", step);
        }
    }

    #[tokio::test]
    async fn test_create_order_also_invalidates_history() {
        let (url, _served) = backend(SAVED_ADDRESS).await;
        let (store, _dir) = storefront_at(&url, Some("U1"));
        let address_key = keys::user(keys::SHIPPING_ADDRESS, "U1");
        for key in [
            keys::user(keys::CART_ITEMS, "U1"),
            keys::user(keys::CART_COUNT, "U1"),
            keys::user(keys::ORDER_HISTORY, "U1"),
            address_key.clone(),
        ] {
            seed(&store, key).await;
        }

        store.create_order(&[cart_line(1)]).await.expect("order").expect("enabled");

        assert!(!is_cached(&store, keys::user(keys::CART_ITEMS, "U1")).await);
        assert!(!is_cached(&store, keys::user(keys::CART_COUNT, "U1")).await);
        assert!(!is_cached(&store, keys::user(keys::ORDER_HISTORY, "U1")).await);
        assert!(is_cached(&store, address_key).await);
    }

    #[tokio::test]
    async fn test_favourite_toggle_invalidates_favourites_and_detail() {
        let (url, _served) = backend(SAVED_ADDRESS).await;
        let (store, _dir) = storefront_at(&url, Some("U1"));
        seed(&store, keys::favourites("U1", 0, 10)).await;
        seed(&store, keys::favourites("U1", 1, 10)).await;
        seed(&store, keys::product_detail("P1", "U1")).await;
        seed(&store, keys::user(keys::CART_ITEMS, "U1")).await;

        store.toggle_favourite("P1", true).await.expect("toggle").expect("enabled");

        assert!(!is_cached(&store, keys::favourites("U1", 0, 10)).await);
        assert!(!is_cached(&store, keys::favourites("U1", 1, 10)).await);
        assert!(!is_cached(&store, keys::product_detail("P1", "U1")).await);
        assert!(is_cached(&store, keys::user(keys::CART_ITEMS, "U1")).await);
    }

    #[tokio::test]
    async fn test_profile_update_and_chat() {
        let (url, _served) = backend(SAVED_ADDRESS).await;
        let (store, _dir) = storefront_at(&url, Some("U1"));
        seed(&store, keys::user(keys::USER_PROFILE, "U1")).await;
        seed(&store, keys::user(keys::CART_ITEMS, "U1")).await;

        store.chat_with_admin(Some("P1")).await.expect("chat").expect("enabled");
        assert!(is_cached(&store, keys::user(keys::USER_PROFILE, "U1")).await);
        assert!(is_cached(&store, keys::user(keys::CART_ITEMS, "U1")).await);

        let update = ProfileUpdate {
            line_user_id: String::new(),
            display_name: Some("Mali".into()),
            picture_url: None,
            gender: Some("F".into()),
            birth_date: None,
        };
        store.update_profile(update).await.expect("profile").expect("enabled");
        assert!(!is_cached(&store, keys::user(keys::USER_PROFILE, "U1")).await);
        assert!(is_cached(&store, keys::user(keys::CART_ITEMS, "U1")).await);
    }

    #[tokio::test]
    async fn test_shipping_address_update_reseeds_cache() {
        let (url, served) = backend(SAVED_ADDRESS).await;
        let (store, _dir) = storefront_at(&url, Some("U1"));
        store
            .cache()
            .set_query_data(keys::user(keys::SHIPPING_ADDRESS, "U1"), address(), QueryOptions::default())
            .await;

        let saved = store
            .update_shipping_address(address())
            .await
            .expect("update")
            .expect("enabled");
        assert_eq!(saved.shipping_address, "1 Silom, Bangkok");
        assert_eq!(served.load(Ordering::SeqCst), 1);

        // Served from the re-seeded entry, not the backend
        let cached = store.shipping_address().await.expect("read").expect("enabled");
        assert_eq!(cached, saved);
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_checkout_preconditions() {
        let (guest, _guest_dir) = storefront(None);
        assert!(matches!(guest.checkout().await, Err(CheckoutError::NotSignedIn)));

        let (store, _dir) = storefront(Some("U1"));
        let options = QueryOptions::default();
        store
            .cache()
            .set_query_data(keys::user(keys::CART_ITEMS, "U1"), Vec::<CartItem>::new(), options)
            .await;
        assert!(matches!(store.checkout().await, Err(CheckoutError::EmptyCart)));

        store
            .cache()
            .set_query_data(keys::user(keys::CART_ITEMS, "U1"), vec![cart_line(1)], options)
            .await;
        store
            .cache()
            .set_query_data(keys::user(keys::SHIPPING_ADDRESS, "U1"), ShippingAddress::default(), options)
            .await;
        assert!(matches!(store.checkout().await, Err(CheckoutError::MissingShippingAddress)));

        // Everything present: the order request itself fails against no server
        store
            .cache()
            .set_query_data(keys::user(keys::SHIPPING_ADDRESS, "U1"), address(), options)
            .await;
        assert!(matches!(store.checkout().await, Err(CheckoutError::Cache(_))));
    }

    #[tokio::test]
    async fn test_product_feed_pages_through_cache() {
        let (store, _dir) = storefront(None);
        let search = ProductSearch::keyword("treats");
        let options = QueryOptions::default();
        store
            .cache()
            .set_query_data(keys::products(&search.with_page(0)), product_page(&["a", "b"], false), options)
            .await;
        store
            .cache()
            .set_query_data(keys::products(&search.with_page(1)), product_page(&["c"], true), options)
            .await;

        let feed = store.product_feed(search);
        assert_eq!(feed.fetch_next().await.expect("page 0"), FetchNext::Appended(2));
        assert_eq!(feed.fetch_next().await.expect("page 1"), FetchNext::Appended(1));
        assert_eq!(feed.fetch_next().await.expect("done"), FetchNext::Exhausted);

        let ids: Vec<_> = feed.items().into_iter().filter_map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_sign_in_survives_failed_registration() {
        let dir = tempdir().expect("temp dir");
        let api = ApiClient::new(UNREACHABLE, 2).expect("client");
        let store = Storefront::new(api, QueryClient::new(), Session::new(dir.path().to_path_buf()));

        let profile = LineProfile {
            user_id: "U77".into(),
            display_name: "Somchai".into(),
            ..LineProfile::default()
        };
        let data = store.sign_in(&profile, None).await.expect("sign in");
        assert!(!data.profile_updated);
        assert_eq!(store.line_user_id().as_deref(), Some("U77"));

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(reloaded.load().expect("load"));

        store.sign_out().await.expect("sign out");
        assert!(!store.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_in_rejects_blank_user() {
        let (store, _dir) = storefront(None);
        assert!(store.sign_in(&LineProfile::default(), None).await.is_err());
    }
}

//! Data models for the pet store backend.
//!
//! Payloads are passed through with their wire names preserved via serde
//! renames. The backend mixes camelCase (products, cart, orders) and
//! snake_case (categories, reviews), so each module follows its endpoint.
//!
//! - `Category`: the product category tree used by the drill-down menu
//! - `Product`, `ProductDetail`: search results and product pages
//! - `Page<T>`: one page of a paginated collection
//! - `CartItem`, order and review types, shipping address, LINE profile

pub mod address;
pub mod banner;
pub mod cart;
pub mod category;
pub mod chat;
pub mod order;
pub mod page;
pub mod product;
pub mod review;
pub mod user;

pub use address::{ShippingAddress, UpdateShippingAddress};
pub use banner::{AnimalCategory, Banner, BannerAndCategoryData};
pub use cart::{subtotal, total_savings, AddCartItem, CartCount, CartItem, DeleteCartItem, UpdateCartQuantity};
pub use category::{Category, CategoryResponse};
pub use chat::{ChatAdminRequest, ChatAdminResponse};
pub use order::{CreateOrderRequest, CreateOrderResponse, OrderHistory, OrderHistoryItem, OrderItem};
pub use page::Page;
pub use product::{
    FavouriteUpdate, FileData, PetType, Product, ProductDetail, ProductFile, ProductSearch,
    ProductSort, QuantityOption, StockStatus, TypeSize, DEFAULT_PAGE_SIZE,
};
pub use review::{Review, ReviewFile, ReviewSummary};
pub use user::{Gender, LineProfile, ProfileUpdate, ProfileUpdateResponse};

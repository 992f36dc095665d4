//! Synchronous client for a grocery e-commerce REST API.
//!
//! # Overview
//! Log in with a customer account, search the product catalog and change or
//! list the shopping basket. Every command is one blocking GET against a
//! single endpoint; arguments travel in the query string and answers come
//! back as JSON carrying a `StatusCode` (zero on success).
//!
//! # Design
//! - `GroceryClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` turns an `HttpResponse` into a typed record or an `ApiError`.
//! - `Session` adds the login state and a `Transport` to run the round-trip.
//!   `UreqTransport` is the default; tests inject their own.
//! - The upstream service emits two known kinds of malformed JSON; `repair`
//!   patches them before decoding.
//! - No retries, caching or pagination: each call is one request and either
//!   a complete record or exactly one error.
//!
//! ```no_run
//! use grocery_core::Session;
//!
//! let mut session = Session::new("developer-key", "application-key");
//! session.login("shopper@example.com", "secret")?;
//! let page = session.product_search("semi skimmed milk", 1, false)?;
//! if let Some(product) = page.products.first() {
//!     session.change_basket(&product.product_id, 2, false)?;
//! }
//! let basket = session.list_basket(true)?;
//! println!("{} items", basket.basket_quantity);
//! # Ok::<(), grocery_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod repair;
pub mod session;
pub mod types;

pub use client::GroceryClient;
pub use config::{Config, Endpoint};
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use session::{Credentials, Session, SessionState};
pub use types::{
    BasketLine, BasketListing, ChangeBasketResult, Ingredient, LoginResult, Nutrient, Product,
    SearchResult, Status,
};
pub use url::Url;

//! Stateless request builder and response parser for the grocery API.
//!
//! # Design
//! `GroceryClient` holds only the endpoint and carries no mutable state
//! between calls. Each command is split into a `build_*` method that produces
//! an `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! `Session` runs the round-trip in between and tracks the session key; the
//! split keeps this layer deterministic and easy to test against recorded
//! payloads.
//!
//! Parsing is: lossy UTF-8, the command's repair patch (if any), serde
//! decode, then the status check.

use std::borrow::Cow;

use log::debug;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::query::{encode, yes_no, Command};
use crate::repair::{insert_missing_commas, unquote_status_code};
use crate::types::{BasketListing, ChangeBasketResult, LoginResult, SearchResult, Status};

/// Synchronous, stateless client for the grocery API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroceryClient {
    endpoint: Url,
}

impl GroceryClient {
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn build_login(
        &self,
        developer_key: &str,
        application_key: &str,
        email: &str,
        password: &str,
    ) -> HttpRequest {
        self.request(
            Command::Login,
            &[
                ("DEVELOPERKEY", developer_key),
                ("APPLICATIONKEY", application_key),
                ("EMAIL", email),
                ("PASSWORD", password),
            ],
        )
    }

    pub fn build_product_search(
        &self,
        session_key: &str,
        search_text: &str,
        page: u32,
        extended: bool,
    ) -> HttpRequest {
        let page = page.to_string();
        self.request(
            Command::ProductSearch,
            &[
                ("SESSIONKEY", session_key),
                ("SEARCHTEXT", search_text),
                ("PAGE", page.as_str()),
                ("EXTENDEDINFO", yes_no(extended)),
            ],
        )
    }

    pub fn build_change_basket(
        &self,
        session_key: &str,
        product_id: &str,
        quantity: i32,
        substitute: bool,
    ) -> HttpRequest {
        let quantity = quantity.to_string();
        self.request(
            Command::ChangeBasket,
            &[
                ("SESSIONKEY", session_key),
                ("PRODUCTID", product_id),
                ("CHANGEQUANTITY", quantity.as_str()),
                ("SUBSTITUTION", yes_no(substitute)),
            ],
        )
    }

    pub fn build_list_basket(&self, session_key: &str, fast: bool) -> HttpRequest {
        self.request(
            Command::ListBasket,
            &[("SESSIONKEY", session_key), ("FAST", yes_no(fast))],
        )
    }

    /// Login failures may carry a quoted status code; it is unquoted first.
    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResult, ApiError> {
        let raw = String::from_utf8_lossy(&response.body);
        let text = unquote_status_code(&raw);
        if matches!(text, Cow::Owned(_)) {
            debug!("Unquoted status code in {} response", Command::Login);
        }
        check_status(decode(&text, &raw)?)
    }

    /// `extended` must match the flag the request was built with: extended
    /// payloads are missing commas between array objects and get patched.
    pub fn parse_product_search(
        &self,
        response: HttpResponse,
        extended: bool,
    ) -> Result<SearchResult, ApiError> {
        let raw = String::from_utf8_lossy(&response.body);
        let text = if extended {
            insert_missing_commas(&raw)
        } else {
            Cow::Borrowed(&*raw)
        };
        if matches!(text, Cow::Owned(_)) {
            debug!("Inserted missing commas in {} response", Command::ProductSearch);
        }
        check_status(decode(&text, &raw)?)
    }

    pub fn parse_change_basket(
        &self,
        response: HttpResponse,
    ) -> Result<ChangeBasketResult, ApiError> {
        let raw = String::from_utf8_lossy(&response.body);
        check_status(decode(&raw, &raw)?)
    }

    pub fn parse_list_basket(&self, response: HttpResponse) -> Result<BasketListing, ApiError> {
        let raw = String::from_utf8_lossy(&response.body);
        check_status(decode(&raw, &raw)?)
    }

    fn request(&self, command: Command, params: &[(&str, &str)]) -> HttpRequest {
        HttpRequest {
            url: encode(&self.endpoint, command, params),
        }
    }
}

impl Default for GroceryClient {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for GroceryClient {
    fn from(config: &Config) -> Self {
        Self::new(config.endpoint.clone())
    }
}

/// Decode `text`; on failure keep `raw`, the payload as received.
fn decode<T: DeserializeOwned>(text: &str, raw: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|source| ApiError::Decode {
        source,
        raw: raw.to_string(),
    })
}

/// Map a non-zero status code to `ApiError::Server`.
fn check_status<T: Status>(result: T) -> Result<T, ApiError> {
    match result.status_code() {
        0 => Ok(result),
        code => Err(ApiError::Server {
            code,
            info: result.status_info().to_string(),
        }),
    }
}

//! Authenticated conversation with the grocery API.
//!
//! # Design
//! A `Session` owns the credentials, a `GroceryClient`, a `Transport` and the
//! current `SessionState`. Logging in is the only transition: a successful
//! `login` moves the session to `Authenticated` with the server-issued key,
//! and the key is then attached to every later command.
//!
//! `product_search` and `change_basket` refuse to run while unauthenticated
//! and return `ApiError::NotLoggedIn` without touching the transport.
//! `list_basket` does not check: it sends whatever key it has, empty if none,
//! and the server decides. A warning is logged when that happens.
//!
//! A session is not synchronised. Share it across threads behind a lock.

use std::fmt;

use log::{debug, info, warn};

use crate::client::GroceryClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::query::Command;
use crate::types::{BasketListing, ChangeBasketResult, LoginResult, SearchResult};

/// Developer and application keys issued by the API registration portal.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub developer_key: String,
    pub application_key: String,
}

impl Credentials {
    pub fn new(developer_key: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            developer_key: developer_key.into(),
            application_key: application_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("developer_key", &"<redacted>")
            .field("application_key", &"<redacted>")
            .finish()
    }
}

/// Whether the session holds a server-issued key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated { session_key: String },
}

impl SessionState {
    pub fn session_key(&self) -> Option<&str> {
        match self {
            SessionState::Unauthenticated => None,
            SessionState::Authenticated { session_key } => Some(session_key),
        }
    }
}

/// A client session: credentials, transport and login state.
#[derive(Debug)]
pub struct Session<T = UreqTransport> {
    client: GroceryClient,
    transport: T,
    credentials: Credentials,
    state: SessionState,
}

impl Session<UreqTransport> {
    /// A session against the default endpoint.
    ///
    /// Call `login` before anything else.
    pub fn new(developer_key: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self::with_config(&Config::default(), Credentials::new(developer_key, application_key))
    }

    pub fn with_config(config: &Config, credentials: Credentials) -> Self {
        Self::with_transport(config, UreqTransport::from_config(config), credentials)
    }
}

impl<T: Transport> Session<T> {
    pub fn with_transport(config: &Config, transport: T, credentials: Credentials) -> Self {
        Self {
            client: GroceryClient::from(config),
            transport,
            credentials,
            state: SessionState::Unauthenticated,
        }
    }

    /// Log in with a customer account and keep the returned session key.
    ///
    /// A successful login always replaces the previous key; one that returns
    /// an empty key leaves the session unauthenticated. On any error the
    /// previous state, authenticated or not, is kept.
    pub fn login(&mut self, email: &str, password: &str) -> Result<LoginResult, ApiError> {
        let Credentials {
            developer_key,
            application_key,
        } = &self.credentials;
        let request = self
            .client
            .build_login(developer_key, application_key, email, password);
        let result = self.client.parse_login(self.execute(Command::Login, request)?)?;

        if result.session_key.is_empty() {
            warn!("{} succeeded without a session key", Command::Login);
            self.state = SessionState::Unauthenticated;
        } else {
            info!("Logged in as customer {}", result.customer_id);
            self.state = SessionState::Authenticated {
                session_key: result.session_key.clone(),
            };
        }
        Ok(result)
    }

    /// Search the catalog by text or by 13-digit barcode. Pages start at 1.
    ///
    /// Extended results add nutrition, ingredients and long descriptions, and
    /// are slow on broad searches; keep them to product id or barcode lookups.
    pub fn product_search(
        &self,
        search_text: &str,
        page: u32,
        extended: bool,
    ) -> Result<SearchResult, ApiError> {
        let session_key = self.require_session_key()?;
        let request = self
            .client
            .build_product_search(session_key, search_text, page, extended);
        let response = self.execute(Command::ProductSearch, request)?;
        self.client.parse_product_search(response, extended)
    }

    /// Add products to or remove them from the basket.
    ///
    /// `quantity` is applied relative to what is already there:
    /// - a product not yet in the basket is inserted at `quantity`;
    /// - a product already in the basket has `quantity` added, or subtracted
    ///   when negative;
    /// - a negative `quantity` at least as large as the current amount
    ///   removes the line.
    ///
    /// Quantities always count items, even for products priced by weight:
    /// `2` apples is two apples, not two kilos.
    ///
    /// `substitute` allows the shopper to pick a replacement if the product
    /// is unavailable.
    pub fn change_basket(
        &self,
        product_id: &str,
        quantity: i32,
        substitute: bool,
    ) -> Result<ChangeBasketResult, ApiError> {
        let session_key = self.require_session_key()?;
        let request = self
            .client
            .build_change_basket(session_key, product_id, quantity, substitute);
        let response = self.execute(Command::ChangeBasket, request)?;
        self.client.parse_change_basket(response)
    }

    /// List the basket.
    ///
    /// `fast` lets the server skip looking up some product attributes, such
    /// as the barcode, which then come back empty.
    ///
    /// Sent even without a session key; the server answers with an error
    /// status in that case.
    pub fn list_basket(&self, fast: bool) -> Result<BasketListing, ApiError> {
        let session_key = match self.state.session_key() {
            Some(key) => key,
            None => {
                warn!("{} issued without a session key", Command::ListBasket);
                ""
            }
        };
        let request = self.client.build_list_basket(session_key, fast);
        let response = self.execute(Command::ListBasket, request)?;
        self.client.parse_list_basket(response)
    }

    /// Forget the session key. Nothing is sent to the server.
    pub fn logout(&mut self) {
        self.state = SessionState::Unauthenticated;
    }

    pub fn session_key(&self) -> Option<&str> {
        self.state.session_key()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_key().is_some()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn client(&self) -> &GroceryClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn require_session_key(&self) -> Result<&str, ApiError> {
        self.state.session_key().ok_or(ApiError::NotLoggedIn)
    }

    fn execute(&self, command: Command, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!("Sending {command} to {}", self.client.endpoint());
        let response = self.transport.get(&request.url)?;
        debug!(
            "{command} answered with HTTP {} ({} bytes)",
            response.status,
            response.body.len()
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use url::Url;

    use super::*;
    use crate::http::TransportError;

    /// Replays canned responses and records every URL it is asked for.
    #[derive(Default)]
    struct StubTransport {
        responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        urls: RefCell<Vec<String>>,
    }

    impl StubTransport {
        fn respond(self, body: &str) -> Self {
            self.responses
                .borrow_mut()
                .push_back(Ok(HttpResponse::ok(body)));
            self
        }

        fn fail(self, message: &str) -> Self {
            self.responses.borrow_mut().push_back(Err(message.into()));
            self
        }

        fn urls(&self) -> Vec<String> {
            self.urls.borrow().clone()
        }
    }

    impl Transport for StubTransport {
        fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.urls.borrow_mut().push(url.to_string());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err("no canned response left".into()))
        }
    }

    const LOGIN_OK: &str = r#"{"StatusCode": 0, "StatusInfo": "Command Processed OK",
        "CustomerId": "42", "SessionKey": "k-123", "InAmendOrderMode": "N"}"#;

    const BASKET: &str = r#"{"StatusCode": 0, "BasketID": "9", "BasketQuantity": "5",
        "BasketLines": [{"ProductId": "1", "BasketLineQuantity": "5"}]}"#;

    fn session(transport: StubTransport) -> Session<StubTransport> {
        let config = Config::new(Url::parse("http://localhost:3000/restservice.aspx").unwrap());
        Session::with_transport(&config, transport, Credentials::new("dev", "app"))
    }

    #[test]
    fn product_search_before_login_sends_nothing() {
        let s = session(StubTransport::default());
        let err = s.product_search("milk", 1, false).unwrap_err();
        assert!(matches!(err, ApiError::NotLoggedIn));
        assert_eq!(err.to_string(), "no session key, must log in first");
        assert!(s.transport().urls().is_empty());
    }

    #[test]
    fn change_basket_before_login_sends_nothing() {
        let s = session(StubTransport::default());
        let err = s.change_basket("1", 2, false).unwrap_err();
        assert!(matches!(err, ApiError::NotLoggedIn));
        assert!(s.transport().urls().is_empty());
    }

    #[test]
    fn login_stores_session_key_for_later_calls() {
        let mut s = session(
            StubTransport::default()
                .respond(LOGIN_OK)
                .respond(r#"{"StatusCode": 0, "Products": []}"#),
        );
        assert!(!s.is_authenticated());

        let result = s.login("shopper@example.com", "secret").unwrap();
        assert_eq!(result.session_key, "k-123");
        assert_eq!(s.session_key(), Some("k-123"));
        assert_eq!(
            s.state(),
            &SessionState::Authenticated {
                session_key: "k-123".to_string()
            }
        );

        s.product_search("milk", 1, false).unwrap();
        let urls = s.transport().urls();
        assert!(urls[0].contains("COMMAND=LOGIN&DEVELOPERKEY=dev&APPLICATIONKEY=app"));
        assert!(urls[1].contains("COMMAND=PRODUCTSEARCH&SESSIONKEY=k-123&SEARCHTEXT=milk"));
    }

    #[test]
    fn failed_login_keeps_previous_key() {
        let mut s = session(StubTransport::default().respond(LOGIN_OK).respond(
            r#"{"StatusCode": "150", "StatusInfo": "Login failed"}"#,
        ));
        s.login("shopper@example.com", "secret").unwrap();

        let err = s.login("shopper@example.com", "wrong").unwrap_err();
        assert_eq!(err.to_string(), "150: Login failed");
        assert_eq!(s.session_key(), Some("k-123"));
    }

    #[test]
    fn login_without_key_stays_unauthenticated() {
        let mut s = session(StubTransport::default().respond(r#"{"StatusCode": 0}"#));
        s.login("shopper@example.com", "secret").unwrap();
        assert!(!s.is_authenticated());
    }

    #[test]
    fn login_without_key_drops_previous_key() {
        let mut s = session(
            StubTransport::default()
                .respond(LOGIN_OK)
                .respond(r#"{"StatusCode": 0, "SessionKey": ""}"#),
        );
        s.login("shopper@example.com", "secret").unwrap();
        assert_eq!(s.session_key(), Some("k-123"));

        let result = s.login("shopper@example.com", "secret").unwrap();
        assert_eq!(result.session_key, "");
        assert_eq!(s.session_key(), None);
        assert_eq!(s.state(), &SessionState::Unauthenticated);
    }

    #[test]
    fn list_basket_without_login_sends_empty_key() {
        let s = session(
            StubTransport::default()
                .respond(r#"{"StatusCode": 110, "StatusInfo": "Session key is not valid"}"#),
        );
        let err = s.list_basket(true).unwrap_err();
        assert_eq!(err.to_string(), "110: Session key is not valid");
        assert!(s.transport().urls()[0].ends_with("COMMAND=LISTBASKET&SESSIONKEY=&FAST=Y"));
    }

    #[test]
    fn list_basket_twice_returns_identical_listing() {
        let mut s = session(
            StubTransport::default()
                .respond(LOGIN_OK)
                .respond(BASKET)
                .respond(BASKET),
        );
        s.login("shopper@example.com", "secret").unwrap();
        let first = s.list_basket(false).unwrap();
        let second = s.list_basket(false).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.basket_lines.len(), 1);
    }

    #[test]
    fn transport_failure_is_returned_verbatim() {
        let mut s = session(StubTransport::default().fail("connection refused"));
        let err = s.login("shopper@example.com", "secret").unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.to_string(), "connection refused");
        assert!(!s.is_authenticated());
    }

    #[test]
    fn logout_forgets_key_locally() {
        let mut s = session(StubTransport::default().respond(LOGIN_OK));
        s.login("shopper@example.com", "secret").unwrap();
        s.logout();
        assert!(!s.is_authenticated());
        assert!(matches!(
            s.change_basket("1", 1, false).unwrap_err(),
            ApiError::NotLoggedIn
        ));
        assert_eq!(s.transport().urls().len(), 1);
    }

    #[test]
    fn credentials_are_redacted_in_debug_output() {
        let debug = format!("{:?}", Credentials::new("dev-secret", "app-secret"));
        assert!(!debug.contains("dev-secret"));
        assert!(!debug.contains("app-secret"));
    }
}

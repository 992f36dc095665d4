//! Where the client sends its requests and how long the bundled transport waits.

use std::fmt;
use std::time::Duration;

use url::Url;

/// Known deployments of the grocery REST service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// Stable beta.
    Beta1,
    /// Stable nightly build.
    Nightly,
    /// Unstable operations test deployment.
    #[default]
    OpsTest,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Beta1 => "https://secure.techfortesco.com/groceryapi_b1/restservice.aspx",
            Endpoint::Nightly => "https://secure.techfortesco.com/groceryapi/restservice.aspx",
            Endpoint::OpsTest => "https://secure.techfortesco.com/groceryapi_ops/restservice.aspx",
        }
    }

    pub fn url(self) -> Url {
        Url::parse(self.as_str()).expect("Literal is valid URL")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client configuration.
///
/// `timeout` is only honoured by `UreqTransport`; injected transports carry
/// their own policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Url,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Endpoint::default().url())
    }
}

impl From<Endpoint> for Config {
    fn from(endpoint: Endpoint) -> Self {
        Self::new(endpoint.url())
    }
}

//! Query-string assembly for the single REST endpoint.
//!
//! Every command is a GET against the same URL; the command name and its
//! arguments travel as `key=value` pairs. Pairs are emitted in the order
//! given, each value form-urlencoded independently.

use std::fmt;

use url::Url;

/// The `COMMAND` values understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Login,
    ProductSearch,
    ChangeBasket,
    ListBasket,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Login => "LOGIN",
            Command::ProductSearch => "PRODUCTSEARCH",
            Command::ChangeBasket => "CHANGEBASKET",
            Command::ListBasket => "LISTBASKET",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append `COMMAND=<command>` followed by `params` to `endpoint`.
pub fn encode(endpoint: &Url, command: Command, params: &[(&str, &str)]) -> String {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("COMMAND", command.as_str())
        .extend_pairs(params);
    url.into()
}

/// The service spells booleans as `Y` / `N`.
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Y"
    } else {
        "N"
    }
}

//! Parsing of the redirect URL the keychain sends back to the app.

use url::Url;

use crate::{KeychainError, Result};

/// Query parameters of a callback redirect, url-decoded once.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pairs: Vec<(String, String)>,
}

impl CallbackParams {
    /// Parse the query of a redirect URL.
    pub fn parse(redirect: &str) -> Result<Self> {
        let url = Url::parse(redirect).map_err(|e| KeychainError::InvalidUrl(e.to_string()))?;
        let pairs = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Self { pairs })
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Like `get`, but a missing or empty value is an error.
    pub fn require(&self, name: &'static str) -> Result<&str> {
        match self.get(name) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(KeychainError::MissingField(name)),
        }
    }

    /// All values for a repeated parameter, in order of appearance.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

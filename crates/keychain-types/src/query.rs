//! Query strings as the keychain reads them.
//!
//! Values are escaped like JavaScript's `encodeURIComponent`: a space is
//! `%20` and `+` is `%2B`, so `decodeURIComponent` restores them exactly.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes `encodeURIComponent` leaves unescaped, besides alphanumerics.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escape one query component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// `name=value&name=value` builder, order preserved.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: String,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one escaped `name=value` pair.
    pub fn append(&mut self, name: &str, value: &str) -> &mut Self {
        if !self.query.is_empty() {
            self.query.push('&');
        }
        self.query.push_str(&encode_component(name));
        self.query.push('=');
        self.query.push_str(&encode_component(value));
        self
    }

    pub fn finish(&self) -> String {
        self.query.clone()
    }
}

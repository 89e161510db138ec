//! # Symbol Cache
//!
//! Read-only tables mapping well-known string keys to handles the engine has
//! already interned, so the request hot path neither parses nor allocates them.
//!
//! Tables are built exactly once, after the engine reports readiness, and are
//! never mutated afterwards. Lookups are exact-match; a key outside the table
//! is simply absent and callers compute it on demand.

use std::collections::HashMap;
use std::fmt;

use enginepool_api::Engine;

/// Frequent request headers, keyed by lowercase name, with the CGI-style
/// variable the engine expects.
pub const COMMON_REQUEST_HEADERS: &[(&str, &str)] = &[
    ("accept", "HTTP_ACCEPT"),
    ("accept-charset", "HTTP_ACCEPT_CHARSET"),
    ("accept-encoding", "HTTP_ACCEPT_ENCODING"),
    ("accept-language", "HTTP_ACCEPT_LANGUAGE"),
    ("access-control-request-headers", "HTTP_ACCESS_CONTROL_REQUEST_HEADERS"),
    ("access-control-request-method", "HTTP_ACCESS_CONTROL_REQUEST_METHOD"),
    ("authorization", "HTTP_AUTHORIZATION"),
    ("cache-control", "HTTP_CACHE_CONTROL"),
    ("connection", "HTTP_CONNECTION"),
    ("content-disposition", "HTTP_CONTENT_DISPOSITION"),
    ("content-encoding", "HTTP_CONTENT_ENCODING"),
    ("content-length", "HTTP_CONTENT_LENGTH"),
    ("content-type", "HTTP_CONTENT_TYPE"),
    ("cookie", "HTTP_COOKIE"),
    ("date", "HTTP_DATE"),
    ("dnt", "HTTP_DNT"),
    ("early-data", "HTTP_EARLY_DATA"),
    ("expect", "HTTP_EXPECT"),
    ("forwarded", "HTTP_FORWARDED"),
    ("from", "HTTP_FROM"),
    ("host", "HTTP_HOST"),
    ("if-match", "HTTP_IF_MATCH"),
    ("if-modified-since", "HTTP_IF_MODIFIED_SINCE"),
    ("if-none-match", "HTTP_IF_NONE_MATCH"),
    ("if-range", "HTTP_IF_RANGE"),
    ("if-unmodified-since", "HTTP_IF_UNMODIFIED_SINCE"),
    ("keep-alive", "HTTP_KEEP_ALIVE"),
    ("max-forwards", "HTTP_MAX_FORWARDS"),
    ("origin", "HTTP_ORIGIN"),
    ("pragma", "HTTP_PRAGMA"),
    ("proxy-authorization", "HTTP_PROXY_AUTHORIZATION"),
    ("range", "HTTP_RANGE"),
    ("referer", "HTTP_REFERER"),
    ("sec-fetch-dest", "HTTP_SEC_FETCH_DEST"),
    ("sec-fetch-mode", "HTTP_SEC_FETCH_MODE"),
    ("sec-fetch-site", "HTTP_SEC_FETCH_SITE"),
    ("sec-fetch-user", "HTTP_SEC_FETCH_USER"),
    ("te", "HTTP_TE"),
    ("upgrade", "HTTP_UPGRADE"),
    ("upgrade-insecure-requests", "HTTP_UPGRADE_INSECURE_REQUESTS"),
    ("user-agent", "HTTP_USER_AGENT"),
    ("via", "HTTP_VIA"),
    ("x-forwarded-for", "HTTP_X_FORWARDED_FOR"),
    ("x-forwarded-host", "HTTP_X_FORWARDED_HOST"),
    ("x-forwarded-proto", "HTTP_X_FORWARDED_PROTO"),
    ("x-real-ip", "HTTP_X_REAL_IP"),
    ("x-requested-with", "HTTP_X_REQUESTED_WITH"),
];

/// Server variables populated on every request.
pub const KNOWN_SERVER_KEYS: &[&str] = &[
    "AUTH_TYPE",
    "CONTENT_LENGTH",
    "CONTENT_TYPE",
    "DOCUMENT_ROOT",
    "DOCUMENT_URI",
    "GATEWAY_INTERFACE",
    "HTTP_HOST",
    "HTTPS",
    "PATH_INFO",
    "PATH_TRANSLATED",
    "PHP_SELF",
    "QUERY_STRING",
    "REMOTE_ADDR",
    "REMOTE_HOST",
    "REMOTE_IDENT",
    "REMOTE_PORT",
    "REMOTE_USER",
    "REQUEST_METHOD",
    "REQUEST_SCHEME",
    "REQUEST_URI",
    "SCRIPT_FILENAME",
    "SCRIPT_NAME",
    "SERVER_NAME",
    "SERVER_PORT",
    "SERVER_PROTOCOL",
    "SERVER_SOFTWARE",
    "SSL_CIPHER",
    "SSL_PROTOCOL",
];

/// CGI-style variable name for a header outside the cached set.
///
/// `x-custom-thing` becomes `HTTP_X_CUSTOM_THING`.
pub fn header_variable_name(header: &str) -> String {
    let mut name = String::with_capacity(header.len() + 5);
    name.push_str("HTTP_");
    for c in header.chars() {
        match c {
            '-' => name.push('_'),
            c => name.push(c.to_ascii_uppercase()),
        }
    }
    name
}

/// Immutable key → interned handle table.
pub struct SymbolCache<S> {
    entries: HashMap<&'static str, S>,
}

impl<S> fmt::Debug for SymbolCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolCache")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<S> SymbolCache<S> {
    /// Interns every `(key, native_name)` pair through `engine`.
    pub fn build<E, I>(engine: &E, table: I) -> Self
    where
        E: Engine<Symbol = S>,
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let entries = table
            .into_iter()
            .map(|(key, native)| (key, engine.intern(native)))
            .collect();
        Self { entries }
    }

    /// Cache of [`COMMON_REQUEST_HEADERS`].
    pub fn common_headers<E: Engine<Symbol = S>>(engine: &E) -> Self {
        Self::build(engine, COMMON_REQUEST_HEADERS.iter().copied())
    }

    /// Cache of [`KNOWN_SERVER_KEYS`], each key mapping to itself.
    pub fn server_keys<E: Engine<Symbol = S>>(engine: &E) -> Self {
        Self::build(engine, KNOWN_SERVER_KEYS.iter().map(|key| (*key, *key)))
    }

    /// Exact-match lookup. `None` means "not cached".
    pub fn get(&self, key: &str) -> Option<&S> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_variable_name() {
        assert_eq!(header_variable_name("x-custom-thing"), "HTTP_X_CUSTOM_THING");
        assert_eq!(header_variable_name("Accept"), "HTTP_ACCEPT");
    }

    #[test]
    fn test_tables_agree_with_fallback() {
        for (header, variable) in COMMON_REQUEST_HEADERS {
            assert_eq!(header_variable_name(header), *variable, "header {header}");
            assert_eq!(header.to_ascii_lowercase(), *header);
        }
    }

    #[test]
    fn test_tables_have_no_duplicates() {
        let headers: std::collections::HashSet<_> =
            COMMON_REQUEST_HEADERS.iter().map(|(k, _)| k).collect();
        assert_eq!(headers.len(), COMMON_REQUEST_HEADERS.len());

        let keys: std::collections::HashSet<_> = KNOWN_SERVER_KEYS.iter().collect();
        assert_eq!(keys.len(), KNOWN_SERVER_KEYS.len());
    }
}

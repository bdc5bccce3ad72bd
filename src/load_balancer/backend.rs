//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its base URL
//! - Hold the ordered, immutable set of backends
//! - Give every backend a stable slot index for the health table

use std::fmt;

use url::Url;

/// A single backend server.
#[derive(Debug, Clone)]
pub struct Backend {
    /// Position in the backend set (and health table slot).
    index: usize,
    /// Base URL without a trailing slash, e.g. `http://10.0.0.1:8080`.
    base: String,
    /// Parsed form of `base`.
    url: Url,
}

impl Backend {
    fn new(index: usize, address: &str) -> Result<Self, BackendSetError> {
        let url = Url::parse(address).map_err(|source| BackendSetError {
            address: address.to_string(),
            source,
        })?;
        Ok(Self {
            index,
            base: address.trim_end_matches('/').to_string(),
            url,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The configured base address, without a trailing slash.
    pub fn address(&self) -> &str {
        &self.base
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Join a request path (and query) onto the base address.
    pub fn target(&self, path_and_query: &str) -> String {
        if path_and_query.starts_with('/') {
            format!("{}{}", self.base, path_and_query)
        } else {
            format!("{}/{}", self.base, path_and_query)
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// A backend address that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid backend address '{address}': {source}")]
pub struct BackendSetError {
    pub address: String,
    #[source]
    pub source: url::ParseError,
}

/// The ordered set of backends, fixed for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct BackendSet {
    backends: Vec<Backend>,
}

impl BackendSet {
    /// Build the set from configured base URLs, preserving order.
    pub fn from_addresses<S: AsRef<str>>(addresses: &[S]) -> Result<Self, BackendSetError> {
        let backends = addresses
            .iter()
            .enumerate()
            .map(|(index, address)| Backend::new(index, address.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { backends })
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Backend> {
        self.backends.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Backend> {
        self.backends.iter()
    }
}

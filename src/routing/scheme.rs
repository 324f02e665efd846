//! Source descriptor classification.
//!
//! # Design Decisions
//! - The proxy-capable scheme set is a value owned by each router
//! - Scheme comparison is case-insensitive
//! - A descriptor that does not parse as an absolute URI names a local handler

use std::collections::BTreeSet;

use url::{ParseError, Url};

/// What a source descriptor resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Forward to this origin.
    Proxy(Url),
    /// Bind the registered handler with this identity.
    Local(String),
    /// A scheme the router does not proxy; served as not-found.
    Unsupported(String),
    /// Looks like a URI but does not parse.
    Invalid(String),
}

/// Set of schemes whose origins are reverse-proxied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemePolicy {
    proxy: BTreeSet<String>,
}

impl SchemePolicy {
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            proxy: schemes
                .into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_proxy(&self, scheme: &str) -> bool {
        self.proxy.contains(&scheme.to_ascii_lowercase())
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.proxy.iter().map(String::as_str)
    }

    /// Classify a source descriptor.
    pub fn classify(&self, descriptor: &str) -> SourceKind {
        match Url::parse(descriptor) {
            Ok(url) if self.is_proxy(url.scheme()) => SourceKind::Proxy(url),
            Ok(url) => SourceKind::Unsupported(url.scheme().to_string()),
            Err(ParseError::RelativeUrlWithoutBase) => SourceKind::Local(descriptor.to_string()),
            Err(e) => SourceKind::Invalid(e.to_string()),
        }
    }
}

impl Default for SchemePolicy {
    /// Only plain HTTP origins are proxied.
    fn default() -> Self {
        Self::new(["http"])
    }
}

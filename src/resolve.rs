//! Page URL resolution against the configured origin server.

use url::Url;

use crate::error::ConfigError;

/// Rewrites page-relative paths into absolute URLs rooted at the origin
/// server, optionally under a mount-path prefix.
///
/// Pure and stateless after construction: the origin is parsed and
/// validated exactly once, so `resolve` itself has no failure mode beyond
/// the fallibility of joining an arbitrary string.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    origin: Url,
}

impl UrlResolver {
    /// Parse and validate the origin URL.
    pub fn new(origin: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(origin).map_err(|source| ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::OpaqueOrigin(origin.to_string()));
        }
        Ok(Self { origin: parsed })
    }

    /// Resolve `prefix/pathname` against the origin with standard URL
    /// resolution rules. One leading `/` is stripped from both parts, so
    /// `/page` and `page` are equivalent (same for the prefix).
    pub fn resolve(&self, pathname: &str, prefix: &str) -> Result<Url, url::ParseError> {
        let pathname = pathname.strip_prefix('/').unwrap_or(pathname);
        let prefix = prefix.strip_prefix('/').unwrap_or(prefix);
        self.origin.join(&format!("{}/{}", prefix, pathname))
    }

    /// The validated origin.
    pub fn origin(&self) -> &Url {
        &self.origin
    }
}

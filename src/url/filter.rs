//! Link filter: resolves raw hrefs and decides which ones are crawl targets

use crate::config::FilterConfig;
use crate::url::normalize::{canonical_string, canonicalize};
use crate::{ConfigError, UrlError};
use regex::{Regex, RegexBuilder};
use thiserror::Error;
use url::Url;

/// Why a discovered link was not turned into a crawl target
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkRejection {
    #[error("empty href")]
    Empty,

    #[error("unresolvable href: {0}")]
    Unresolvable(String),

    #[error("unsupported scheme: {0}")]
    Scheme(String),

    #[error("link carries a fragment")]
    Fragment,

    #[error("host not allowed: {0}")]
    Host(String),

    #[error("path outside prefix {0}")]
    PathPrefix(String),

    #[error("denied segment: {0}")]
    Denied(String),
}

/// Resolves hrefs against their page and applies the host policy and denylist
#[derive(Debug, Clone)]
pub struct LinkFilter {
    allowed_hosts: Vec<String>,
    path_prefix: Option<String>,
    deny: Option<Regex>,
}

impl LinkFilter {
    /// Builds a filter from configuration
    ///
    /// Deny segments are matched case-insensitively as literal substrings.
    pub fn new(config: &FilterConfig) -> Result<Self, ConfigError> {
        let deny = if config.deny_segments.is_empty() {
            None
        } else {
            let alternation = config
                .deny_segments
                .iter()
                .map(|segment| regex::escape(segment))
                .collect::<Vec<_>>()
                .join("|");
            let regex = RegexBuilder::new(&alternation)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
            Some(regex)
        };

        Ok(Self {
            allowed_hosts: config
                .allowed_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            path_prefix: config.path_prefix.clone(),
            deny,
        })
    }

    /// Turns a raw href found on `base` into a canonical crawl target
    ///
    /// Relative references are resolved with standard URL-joining rules,
    /// so `..` and `.` segments collapse against the base path.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The canonical absolute URL
    /// * `Err(LinkRejection)` - Why the link is not followed
    pub fn accept(&self, href: &str, base: &Url) -> Result<String, LinkRejection> {
        let href = href.trim();
        if href.is_empty() {
            return Err(LinkRejection::Empty);
        }

        let resolved = base
            .join(href)
            .map_err(|e| LinkRejection::Unresolvable(e.to_string()))?;

        if resolved.fragment().is_some() {
            return Err(LinkRejection::Fragment);
        }

        let canonical = canonicalize(resolved).map_err(|e| match e {
            UrlError::InvalidScheme(scheme) => LinkRejection::Scheme(scheme),
            other => LinkRejection::Unresolvable(other.to_string()),
        })?;

        self.check(&canonical)?;

        Ok(canonical_string(&canonical))
    }

    /// Applies host, prefix and denylist checks to a canonicalized URL
    fn check(&self, url: &Url) -> Result<(), LinkRejection> {
        let host = url.host_str().unwrap_or_default();
        if !self
            .allowed_hosts
            .iter()
            .any(|pattern| host_matches(pattern, host))
        {
            return Err(LinkRejection::Host(host.to_string()));
        }

        if let Some(prefix) = &self.path_prefix {
            if !url.path().starts_with(prefix.as_str()) {
                return Err(LinkRejection::PathPrefix(prefix.clone()));
            }
        }

        if let Some(deny) = &self.deny {
            let target = match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            };
            if let Some(found) = deny.find(&target) {
                return Err(LinkRejection::Denied(found.as_str().to_ascii_lowercase()));
            }
        }

        Ok(())
    }
}

/// Exact host match, or `*.base` matching `base` and any subdomain of it
fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|rest| rest.ends_with('.'))
        }
        None => host == pattern,
    }
}

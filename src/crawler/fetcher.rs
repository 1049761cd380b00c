//! HTTP fetcher implementation
//!
//! This module handles all content requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - One bounded-time GET per URL
//! - Error classification into [`FailureKind`]
//!
//! There is no retry: a failed fetch marks the URL done-failed for the session.

use crate::config::UserAgentConfig;
use crate::state::FailureKind;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Any status other than 200
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body read failure)
    NetworkError {
        /// Error description
        error: String,
        /// How the failure is recorded
        kind: FailureKind,
    },
}

impl FetchResult {
    /// The failure this result maps to, if it is not a success
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::ContentMismatch { .. } => Some(FailureKind::ContentMismatch),
            Self::HttpError { status_code } => Some(FailureKind::HttpStatus(*status_code)),
            Self::NetworkError { kind, .. } => Some(*kind),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout covering connect, send and body read
///
/// # Example
///
/// ```no_run
/// use ripple_index::config::UserAgentConfig;
/// use ripple_index::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "RippleIndex".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 200 with HTML or no Content-Type | Success |
/// | HTTP 200 with another Content-Type | ContentMismatch |
/// | Any other status | HttpError |
/// | Timeout | NetworkError (Timeout) |
/// | Connection or body error | NetworkError (Network) |
pub async fn fetch_page(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if status != StatusCode::OK {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !content_type.to_ascii_lowercase().contains("html") {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => classify_error(e),
    }
}

fn classify_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            kind: FailureKind::Timeout,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: "Connection refused".to_string(),
            kind: FailureKind::Network,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            kind: FailureKind::Network,
        }
    }
}

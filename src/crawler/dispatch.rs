//! Link dispatch: where accepted links go
//!
//! Local dispatch admits links into this unit's frontier. Remote dispatch
//! forwards each link to a peer unit's `/crawl` endpoint, one request per
//! link, with no retry.

use crate::config::{DispatchConfig, DispatchMode, UserAgentConfig};
use crate::{ConfigError, RippleError};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Timeout for one forward to a peer
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(10);

/// How discovered links leave a worker
#[derive(Debug, Clone)]
pub enum LinkDispatch {
    /// Feed links back into the local frontier
    Local,
    /// Forward links to a peer crawling unit
    Remote(RemotePeer),
}

impl LinkDispatch {
    /// Builds the dispatch mode described by the configuration
    pub fn from_config(
        config: &DispatchConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, RippleError> {
        match config.mode {
            DispatchMode::Local => Ok(Self::Local),
            DispatchMode::Remote => {
                let peer = config.peer.as_deref().ok_or_else(|| {
                    ConfigError::Validation("remote dispatch requires a peer".to_string())
                })?;
                Ok(Self::Remote(RemotePeer::new(peer, user_agent)?))
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// A peer unit reachable over HTTP
#[derive(Debug, Clone)]
pub struct RemotePeer {
    client: Client,
    endpoint: Url,
}

impl RemotePeer {
    /// Creates a peer from its base URL, e.g. `http://crawler-2:8080`
    pub fn new(base: &str, user_agent: &UserAgentConfig) -> Result<Self, RippleError> {
        let endpoint = Url::parse(base)?.join("/crawl")?;
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(FORWARD_TIMEOUT)
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends `GET {peer}/crawl?url=..&depth=..`
    ///
    /// Any 2xx answer is a delivery; anything else is an error for the caller
    /// to log and count.
    pub async fn forward(&self, url: &str, depth: u32) -> Result<(), RippleError> {
        let mut request_url = self.endpoint.clone();
        request_url
            .query_pairs_mut()
            .append_pair("url", url)
            .append_pair("depth", &depth.to_string());

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    RippleError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    RippleError::Http {
                        url: url.to_string(),
                        source,
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RippleError::Dispatch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::trace!("Forwarded {} at depth {} to {}", url, depth, self.endpoint);
        Ok(())
    }
}

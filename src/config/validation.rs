use crate::config::types::{
    Config, CrawlerConfig, DispatchConfig, DispatchMode, FilterConfig, UserAgentConfig,
};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_filter_config(&config.filter)?;
    validate_dispatch_config(&config.dispatch)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    config.server.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid bind address '{}': {}", config.server.bind, e))
    })?;

    for seed in &config.seeds {
        validate_http_url(seed, "seed")?;
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > 256 {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and 256, got {}",
            config.worker_count
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "queue_capacity must be >= 1".to_string(),
        ));
    }

    if config.max_fan_out < 1 {
        return Err(ConfigError::Validation(
            "max_fan_out must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.session_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "session_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    if !config.contact_email.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            config.contact_email
        )));
    }

    Ok(())
}

fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if config.allowed_hosts.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_hosts must list at least one host".to_string(),
        ));
    }

    for pattern in &config.allowed_hosts {
        validate_host_pattern(pattern)?;
    }

    if let Some(prefix) = &config.path_prefix {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "path_prefix must start with '/', got '{}'",
                prefix
            )));
        }
    }

    if config.deny_segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::Validation(
            "deny_segments cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_dispatch_config(config: &DispatchConfig) -> Result<(), ConfigError> {
    match (config.mode, &config.peer) {
        (DispatchMode::Remote, None) => Err(ConfigError::Validation(
            "remote dispatch requires a peer".to_string(),
        )),
        (_, Some(peer)) => validate_http_url(peer, "peer"),
        (DispatchMode::Local, None) => Ok(()),
    }
}

fn validate_http_url(raw: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} URL '{}': {}", what, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} URL '{}' must use http or https",
            what, raw
        )));
    }

    Ok(())
}

/// Validates a host pattern (exact host or `*.` wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' has no host",
            pattern
        )));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' has an empty label",
            host
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{OutputConfig, ServerConfig};

    fn base_config() -> Config {
        Config {
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig {
                crawler_name: "TestCrawler".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            filter: FilterConfig {
                allowed_hosts: vec!["en.wikipedia.org".to_string()],
                path_prefix: Some("/wiki/".to_string()),
                deny_segments: vec!["login".to_string()],
            },
            output: OutputConfig {
                database_path: "./test.db".to_string(),
            },
            dispatch: DispatchConfig::default(),
            server: ServerConfig::default(),
            seeds: vec!["https://en.wikipedia.org/wiki/Rust".to_string()],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_validate_host_pattern() {
        assert!(validate_host_pattern("example.com").is_ok());
        assert!(validate_host_pattern("*.example.com").is_ok());
        assert!(validate_host_pattern("127.0.0.1").is_ok());
        assert!(validate_host_pattern("localhost").is_ok());

        assert!(validate_host_pattern("").is_err());
        assert!(validate_host_pattern("*.").is_err());
        assert!(validate_host_pattern(".example.com").is_err());
        assert!(validate_host_pattern("example..com").is_err());
        assert!(validate_host_pattern("exa mple.com").is_err());
    }

    #[test]
    fn test_remote_mode_requires_peer() {
        let mut config = base_config();
        config.dispatch.mode = DispatchMode::Remote;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));

        config.dispatch.peer = Some("http://manager:8081".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_seed_rejected() {
        let mut config = base_config();
        config.seeds.push("ftp://example.com/file".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_zero_fan_out_rejected() {
        let mut config = base_config();
        config.crawler.max_fan_out = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_path_prefix_must_be_absolute() {
        let mut config = base_config();
        config.filter.path_prefix = Some("wiki/".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_bind_address() {
        let mut config = base_config();
        config.server.bind = "not-an-address".to_string();
        assert!(validate(&config).is_err());
    }
}

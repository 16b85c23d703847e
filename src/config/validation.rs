use crate::config::types::{
    Config, CrawlerConfig, GraphConfig, OutputConfig, QueueBackend, QueueConfig, SteamApiConfig,
    StorageConfig,
};
use crate::ConfigError;
use url::Url;

/// Highest `max-crawl-level` accepted; each extra level multiplies the fan-out
const MAX_CRAWL_LEVEL_LIMIT: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_graph_config(&config.graph)?;
    validate_steam_api_config(&config.steam_api)?;
    validate_queue_config(&config.queue)?;
    validate_storage_config(&config.storage)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl pool configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_worker_count("crawler.worker-count", config.worker_count)?;

    if config.max_crawl_level < 1 || config.max_crawl_level > MAX_CRAWL_LEVEL_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-crawl-level must be between 1 and {}, got {}",
            MAX_CRAWL_LEVEL_LIMIT, config.max_crawl_level
        )));
    }

    Ok(())
}

/// Validates graph collector configuration
fn validate_graph_config(config: &GraphConfig) -> Result<(), ConfigError> {
    validate_worker_count("graph.worker-count", config.worker_count)?;

    if config.job_capacity == 0 {
        return Err(ConfigError::Validation(
            "graph.job-capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_worker_count(key: &str, count: u32) -> Result<(), ConfigError> {
    if !(1..=100).contains(&count) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and 100, got {}",
            key, count
        )));
    }
    Ok(())
}

/// Validates Steam Web API configuration
///
/// The api key is checked after the environment fallback has been applied.
fn validate_steam_api_config(config: &SteamApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", config.base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.api_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api-key is empty and STEAM_API_KEY is not set".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates job queue configuration
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.subject.trim().is_empty() {
        return Err(ConfigError::Validation(
            "queue.subject cannot be empty".to_string(),
        ));
    }

    if config.queue_group.trim().is_empty() {
        return Err(ConfigError::Validation(
            "queue.queue-group cannot be empty".to_string(),
        ));
    }

    if config.backend == QueueBackend::Nats {
        let url = Url::parse(&config.nats_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", config.nats_url, e)))?;
        if url.scheme() != "nats" {
            return Err(ConfigError::InvalidUrl(format!(
                "nats-url must use the nats:// scheme, got '{}'",
                config.nats_url
            )));
        }
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.export_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "export-dir cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                worker_count: 10,
                max_crawl_level: 3,
                publish_retry_delay_ms: 200,
            },
            graph: GraphConfig::default(),
            steam_api: SteamApiConfig {
                base_url: "https://api.steampowered.com".to_string(),
                api_key: "ABCDEF".to_string(),
                request_timeout_secs: 30,
            },
            queue: QueueConfig::default(),
            storage: StorageConfig {
                database_path: "./steamgraph.db".to_string(),
            },
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_worker_count_bounds() {
        let mut config = valid_config();
        config.crawler.worker_count = 0;
        assert!(validate(&config).is_err());

        config.crawler.worker_count = 101;
        assert!(validate(&config).is_err());

        config.crawler.worker_count = 100;
        assert!(validate(&config).is_ok());

        config.graph.worker_count = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_max_crawl_level_bounds() {
        let mut config = valid_config();
        config.crawler.max_crawl_level = 0;
        assert!(validate(&config).is_err());

        config.crawler.max_crawl_level = 11;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_job_capacity_rejected() {
        let mut config = valid_config();
        config.graph.job_capacity = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_base_url_scheme() {
        let mut config = valid_config();
        config.steam_api.base_url = "ftp://api.steampowered.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.steam_api.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let mut config = valid_config();
        config.steam_api.api_key = "   ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_nats_backend_requires_nats_url() {
        let mut config = valid_config();
        config.queue.backend = QueueBackend::Nats;
        assert!(validate(&config).is_ok());

        config.queue.nats_url = "http://127.0.0.1:4222".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        // Memory backend never looks at the url
        config.queue.backend = QueueBackend::Memory;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_paths_rejected() {
        let mut config = valid_config();
        config.storage.database_path = String::new();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.output.export_dir = String::new();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.queue.subject = String::new();
        assert!(validate(&config).is_err());
    }
}

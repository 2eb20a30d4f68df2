use crate::config::types::{Config, CrawlerConfig, ExtractionConfig, FetcherConfig, SafetyConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_crawler_config(&config.crawler)?;
    validate_safety_config(&config.safety)?;
    validate_extraction_config(&config.extraction)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(format!(
            "user_agent must not contain control characters, got {:?}",
            config.user_agent
        )));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.max_hops < 1 || config.max_hops > 20 {
        return Err(ConfigError::Validation(format!(
            "max_hops must be between 1 and 20, got {}",
            config.max_hops
        )));
    }

    if config.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= 1024, got {}",
            config.max_body_bytes
        )));
    }

    if config.max_text_chars < 1 {
        return Err(ConfigError::Validation(
            "max_text_chars must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth < 1 || config.max_depth > 5 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be between 1 and 5, got {}",
            config.max_depth
        )));
    }

    if config.default_depth < 1 || config.default_depth > config.max_depth {
        return Err(ConfigError::Validation(format!(
            "default_depth must be between 1 and max_depth ({}), got {}",
            config.max_depth, config.default_depth
        )));
    }

    if config.sub_page_limit < 1 {
        return Err(ConfigError::Validation(
            "sub_page_limit must be >= 1".to_string(),
        ));
    }

    if config.job_page_limit < 1 {
        return Err(ConfigError::Validation(
            "job_page_limit must be >= 1".to_string(),
        ));
    }

    if config.crawl_deadline_secs < 1 {
        return Err(ConfigError::Validation(
            "crawl_deadline_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_safety_config(config: &SafetyConfig) -> Result<(), ConfigError> {
    for pattern in &config.blocked_hosts {
        validate_host_pattern(pattern)?;
    }

    for host in &config.allowed_hosts {
        if host.is_empty() || host.starts_with("*.") {
            return Err(ConfigError::InvalidPattern(format!(
                "allowed host '{}' must be an exact hostname or IP",
                host
            )));
        }
        validate_host_string(host.trim_start_matches('[').trim_end_matches(']'))?;
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_input_chars < 1 {
        return Err(ConfigError::Validation(
            "max_input_chars must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates a host pattern (supports a leading "*." wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(base) => validate_host_string(base),
        None => validate_host_string(pattern),
    }
}

/// Validates a hostname or IP literal (without wildcard prefix)
fn validate_host_string(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == ':')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}

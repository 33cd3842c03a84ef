use crate::config::types::{
    Config, CrawlerConfig, OriginConfig, OutputConfig, SourcesConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_origin_config(&config.origin)?;
    validate_output_config(&config.output)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_workers < 1 || config.page_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "page_workers must be between 1 and 64, got {}",
            config.page_workers
        )));
    }

    if config.item_workers < 1 || config.item_workers > 32 {
        return Err(ConfigError::Validation(format!(
            "item_workers must be between 1 and 32, got {}",
            config.item_workers
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.connect_timeout < 1 || config.connect_timeout > config.request_timeout {
        return Err(ConfigError::Validation(format!(
            "connect_timeout must be between 1 and request_timeout ({}s), got {}s",
            config.request_timeout, config.connect_timeout
        )));
    }

    Ok(())
}

/// Validates user agent configuration
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

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates origin URLs
fn validate_origin_config(config: &OriginConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;
    validate_http_url("source_list_url", &config.source_list_url)?;

    if !config.board_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "board_path must start with '/', got '{}'",
            config.board_path
        )));
    }

    if config.source_list_charset.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source_list_charset cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates explicit source codes
fn validate_sources(config: &SourcesConfig) -> Result<(), ConfigError> {
    for code in &config.codes {
        validate_source_code(code)?;
    }
    Ok(())
}

/// Validates one source code (e.g. "005930")
pub(crate) fn validate_source_code(code: &str) -> Result<(), ConfigError> {
    if code.is_empty() {
        return Err(ConfigError::InvalidSource(
            "source code cannot be empty".to_string(),
        ));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidSource(format!(
            "'{}' must contain only ASCII letters and digits",
            code
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email.split_once('@').ok_or_else(|| {
        ConfigError::Validation(format!("Invalid email format: '{}'", email))
    })?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

use crate::config::types::{
    Config, ListingSource, OutputConfig, ScraperConfig, SelectorConfig, ID_PLACEHOLDER,
};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::BTreeMap;
use url::Url;

/// Upper bound on concurrent review collections
const MAX_WORKERS_LIMIT: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_headers(&config.headers)?;
    validate_selectors(&config.selectors)?;
    validate_output_config(&config.output)?;
    validate_listings(&config.listings)?;
    Ok(())
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > MAX_WORKERS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and {}, got {}",
            MAX_WORKERS_LIMIT, config.max_workers
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_review_template("favorable_review_url", &config.favorable_review_url)?;
    validate_review_template("unfavorable_review_url", &config.unfavorable_review_url)?;

    Ok(())
}

/// Validates a review URL template: it must carry the id placeholder and
/// form a valid URL once the placeholder is filled in
fn validate_review_template(field: &str, template: &str) -> Result<(), ConfigError> {
    if !template.contains(ID_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "{} must contain the '{}' placeholder, got '{}'",
            field, ID_PLACEHOLDER, template
        )));
    }

    let sample = template.replace(ID_PLACEHOLDER, "tt0000000");
    validate_http_url(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    Ok(())
}

/// Validates outbound header names and values
fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("invalid header name '{}'", name)))?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::InvalidHeader(format!("invalid value for header '{}'", name))
        })?;
    }
    Ok(())
}

/// Validates review page selectors
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    if config.review_container.trim().is_empty() {
        return Err(ConfigError::Validation(
            "review-container selector cannot be empty".to_string(),
        ));
    }

    if config.review_text.trim().is_empty() {
        return Err(ConfigError::Validation(
            "review-text selector cannot be empty".to_string(),
        ));
    }

    if config.rating.trim().is_empty() {
        return Err(ConfigError::Validation(
            "rating selector cannot be empty".to_string(),
        ));
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

/// Validates listing sources
fn validate_listings(listings: &[ListingSource]) -> Result<(), ConfigError> {
    if listings.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[listing]] entry is required".to_string(),
        ));
    }

    for listing in listings {
        validate_http_url(&listing.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid listing URL '{}': {}", listing.url, e))
        })?;
    }

    Ok(())
}

/// Checks that a string parses as an http or https URL
fn validate_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_review_template() {
        assert!(validate_review_template("t", "https://example.com/title/{id}/reviews").is_ok());

        assert!(validate_review_template("t", "https://example.com/title/reviews").is_err());
        assert!(validate_review_template("t", "not a url {id}").is_err());
        assert!(validate_review_template("t", "ftp://example.com/{id}").is_err());
    }

    #[test]
    fn test_validate_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), "Mozilla/5.0".to_string());
        assert!(validate_headers(&headers).is_ok());

        headers.insert("Bad Header".to_string(), "x".to_string());
        assert!(matches!(
            validate_headers(&headers),
            Err(ConfigError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_validate_header_value() {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "text/html\n".to_string());
        assert!(validate_headers(&headers).is_err());
    }

    #[test]
    fn test_validate_listings() {
        assert!(validate_listings(&[]).is_err());

        let listing = ListingSource {
            rated: crate::config::RatedType::Top,
            category: crate::config::Category::Movie,
            url: "mailto:someone@example.com".to_string(),
        };
        assert!(matches!(
            validate_listings(&[listing]),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_selectors() {
        assert!(validate_selectors(&SelectorConfig::default()).is_ok());

        let blank = SelectorConfig {
            review_text: "  ".to_string(),
            ..SelectorConfig::default()
        };
        assert!(validate_selectors(&blank).is_err());

        let no_container = SelectorConfig {
            review_container: String::new(),
            ..SelectorConfig::default()
        };
        assert!(validate_selectors(&no_container).is_err());
    }
}

//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
///
/// A missing access token is not an error here: it may be supplied per
/// request, and is checked when an agent is built.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.timeout_secs == 0 {
        errors.push("provider.timeout_secs must be > 0".to_string());
    }
    if let Some(base) = &config.provider.api_base {
        if !base.trim().is_empty() && !base.starts_with("http://") && !base.starts_with("https://")
        {
            errors.push("provider.api_base must be an http(s) URL".to_string());
        }
    }

    let sampling = &config.agent.sampling;
    if !(0.0..=2.0).contains(&sampling.temperature) {
        errors.push("agent.sampling.temperature must be in [0.0, 2.0]".to_string());
    }
    if !(sampling.top_p > 0.0 && sampling.top_p <= 1.0) {
        errors.push("agent.sampling.top_p must be in (0.0, 1.0]".to_string());
    }
    if sampling.max_new_tokens == 0 {
        errors.push("agent.sampling.max_new_tokens must be > 0".to_string());
    }
    if sampling.repetition_penalty <= 0.0 {
        errors.push("agent.sampling.repetition_penalty must be > 0".to_string());
    }
    if config.agent.fallback_reply.trim().is_empty() {
        errors.push("agent.fallback_reply must not be empty".to_string());
    }

    if config.server.port == 0 {
        errors.push("server.port must be > 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.provider.model = " ".to_string();
        config.agent.sampling.max_new_tokens = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("provider.model"));
        assert!(err.contains("max_new_tokens"));
    }

    #[test]
    fn test_validate_rejects_non_http_base() {
        let mut config = Config::default();
        config.provider.api_base = Some("ftp://example.com".to_string());

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("provider.api_base"));
    }
}

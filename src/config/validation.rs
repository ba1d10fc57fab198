//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks value ranges and
//! cross-field consistency. Every problem is reported, not just the first.

use std::collections::HashSet;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid port")]
    InvalidPort { field: String, value: String },

    #[error("backend route '{0}' is listed more than once")]
    DuplicateRoute(String),

    #[error("backend route '{0}' collides with the front-door port")]
    RouteCollidesWithServer(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("health check endpoint key '{0}' not found in backend.endpoints")]
    MissingHealthEndpoint(String),

    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("health endpoint '{0}' does not resolve to a path starting with '/'")]
    InvalidHealthPath(String),
}

/// Parse a port string, rejecting 0 and anything outside `u16`.
pub fn parse_port(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok().filter(|p| *p != 0)
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let server_port = parse_port(&config.server.port);
    if server_port.is_none() {
        errors.push(ValidationError::InvalidPort {
            field: "server.port".to_string(),
            value: config.server.port.clone(),
        });
    }

    let mut seen = HashSet::new();
    for route in &config.backend.routes {
        match parse_port(route) {
            Some(port) => {
                if !seen.insert(port) {
                    errors.push(ValidationError::DuplicateRoute(route.clone()));
                }
                if Some(port) == server_port {
                    errors.push(ValidationError::RouteCollidesWithServer(route.clone()));
                }
            }
            None => errors.push(ValidationError::InvalidPort {
                field: "backend.routes".to_string(),
                value: route.clone(),
            }),
        }
    }

    if config.server.timeout == 0 {
        errors.push(ValidationError::ZeroDuration("server.timeout"));
    }
    if config.health_check_interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration("healthCheck_ticker_time_seconds"));
    }
    if config.graceful_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration("graceful_timeout_seconds"));
    }
    if config.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    match config.health_endpoint() {
        Some(endpoint) if endpoint.timeout == 0 => {
            errors.push(ValidationError::ZeroDuration("health endpoint timeout"));
        }
        Some(endpoint) if !endpoint.path().starts_with('/') => {
            errors.push(ValidationError::InvalidHealthPath(endpoint.url.clone()));
        }
        Some(_) => {}
        None => errors.push(ValidationError::MissingHealthEndpoint(
            config.health_check_endpoint_key.clone(),
        )),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.backend.routes = vec!["8081".into(), "8082".into()];
        config
    }

    #[test]
    fn default_with_routes_is_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn empty_backend_list_is_valid() {
        let config = ProxyConfig::default();
        assert!(config.backend.routes.is_empty());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn reports_all_errors() {
        let mut config = valid();
        config.server.port = "not-a-port".into();
        config.backend.routes = vec!["8081".into(), "8081".into(), "70000".into()];
        config.graceful_timeout_secs = 0;
        config.health_check_endpoint_key = "missing".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.contains(&ValidationError::DuplicateRoute("8081".into())));
        assert!(errors.contains(&ValidationError::ZeroDuration("graceful_timeout_seconds")));
        assert!(errors.contains(&ValidationError::MissingHealthEndpoint("missing".into())));
    }

    #[test]
    fn route_may_not_shadow_front_door() {
        let mut config = valid();
        config.backend.routes.push("8080".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::RouteCollidesWithServer("8080".into())]);
    }

    #[test]
    fn schemeless_health_url_is_rejected() {
        let mut config = valid();
        for endpoint in config.backend.endpoints.values_mut() {
            endpoint.url = "localhost:8080/health".into();
        }

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidHealthPath("localhost:8080/health".into())]
        );
    }

    #[test]
    fn full_health_url_is_accepted() {
        let mut config = valid();
        for endpoint in config.backend.endpoints.values_mut() {
            endpoint.url = "http://localhost:8080/health".into();
        }
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn port_parsing() {
        assert_eq!(parse_port("8080"), Some(8080));
        assert_eq!(parse_port(" 9000 "), Some(9000));
        assert_eq!(parse_port("0"), None);
        assert_eq!(parse_port("65536"), None);
        assert_eq!(parse_port(""), None);
    }
}

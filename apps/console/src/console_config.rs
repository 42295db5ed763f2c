use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use capacita_core::{AppError, AppResult};
use capacita_domain::GradeScale;
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080/api";

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub api_token: String,
    pub http_timeout: Duration,
    pub grade_scale: GradeScale,
}

impl ConsoleConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let raw_base_url = lookup("CAPACITA_API_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let api_base_url = Url::parse(raw_base_url.trim()).map_err(|error| {
            AppError::Validation(format!(
                "invalid CAPACITA_API_BASE_URL value '{raw_base_url}': {error}"
            ))
        })?;

        let api_token = lookup("CAPACITA_API_TOKEN")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::Validation("CAPACITA_API_TOKEN is required".to_owned()))?;

        let timeout_secs = parse_var(&lookup, "CAPACITA_HTTP_TIMEOUT_SECS", 15_u64)?;
        if timeout_secs == 0 {
            return Err(AppError::Validation(
                "CAPACITA_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        let grade_min = parse_var(&lookup, "CAPACITA_GRADE_MIN", 0.0_f64)?;
        let grade_max = parse_var(&lookup, "CAPACITA_GRADE_MAX", 100.0_f64)?;
        let grade_scale = GradeScale::new(grade_min, grade_max).map_err(|error| {
            AppError::Validation(format!("invalid CAPACITA_GRADE_MIN/CAPACITA_GRADE_MAX: {error}"))
        })?;

        Ok(Self {
            api_base_url: api_base_url.as_str().trim_end_matches('/').to_owned(),
            api_token: api_token.trim().to_owned(),
            http_timeout: Duration::from_secs(timeout_secs),
            grade_scale,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use capacita_core::AppError;

    use super::ConsoleConfig;

    fn names_variable(result: &Result<ConsoleConfig, AppError>, name: &str) -> bool {
        matches!(result, Err(AppError::Validation(message)) if message.contains(name))
    }

    fn load(values: &[(&str, &str)]) -> Result<ConsoleConfig, AppError> {
        let values: HashMap<String, String> = values
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ConsoleConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let Ok(config) = load(&[("CAPACITA_API_TOKEN", "token-1")]) else {
            panic!("config should load");
        };

        assert_eq!(config.api_base_url, "http://127.0.0.1:8080/api");
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.grade_scale.max(), 100.0);
    }

    #[test]
    fn missing_token_is_rejected() {
        assert!(names_variable(&load(&[]), "CAPACITA_API_TOKEN"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let Ok(config) = load(&[
            ("CAPACITA_API_TOKEN", "token-1"),
            ("CAPACITA_API_BASE_URL", "https://training.example.com/api/"),
        ]) else {
            panic!("config should load");
        };

        assert_eq!(config.api_base_url, "https://training.example.com/api");
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let zero_timeout = load(&[
            ("CAPACITA_API_TOKEN", "token-1"),
            ("CAPACITA_HTTP_TIMEOUT_SECS", "0"),
        ]);
        let inverted_scale = load(&[
            ("CAPACITA_API_TOKEN", "token-1"),
            ("CAPACITA_GRADE_MIN", "10"),
            ("CAPACITA_GRADE_MAX", "5"),
        ]);
        let bad_url = load(&[
            ("CAPACITA_API_TOKEN", "token-1"),
            ("CAPACITA_API_BASE_URL", "not a url"),
        ]);

        assert!(names_variable(&zero_timeout, "CAPACITA_HTTP_TIMEOUT_SECS"));
        assert!(names_variable(&inverted_scale, "CAPACITA_GRADE_MIN"));
        assert!(names_variable(&bad_url, "CAPACITA_API_BASE_URL"));
    }
}

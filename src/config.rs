use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Server
    pub port: u16,
    pub cors_origins: Vec<String>,

    // Paging
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Database
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,

            // Server
            port: parse_or("PORT", 8080)?,
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|_| {
                    vec![
                        "http://localhost:3000".to_string(),
                        "http://frontend:3000".to_string(),
                    ]
                }),

            // Paging
            default_page_size: parse_or("DEFAULT_PAGE_SIZE", 10)?,
            max_page_size: parse_or("MAX_PAGE_SIZE", 100)?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
/// A value that is set but malformed is an error rather than silently ignored.
fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, value)),
        Err(_) => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("http://a:3000, http://b:3000,,"),
            vec!["http://a:3000".to_string(), "http://b:3000".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_parse_or_default_when_unset() {
        let value: u32 = parse_or("GAME_LOCALIZATION_TEST_UNSET_VAR", 7).expect("default");
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_or_reads_value() {
        std::env::set_var("GAME_LOCALIZATION_TEST_PORT_VAR", " 9090 ");
        let value: u16 = parse_or("GAME_LOCALIZATION_TEST_PORT_VAR", 8080).expect("parse");
        assert_eq!(value, 9090);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        std::env::set_var("GAME_LOCALIZATION_TEST_BAD_VAR", "lots");
        let result: Result<u32> = parse_or("GAME_LOCALIZATION_TEST_BAD_VAR", 5);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("GAME_LOCALIZATION_TEST_BAD_VAR"));
    }
}

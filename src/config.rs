use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::services::recommendation::RecommendationConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub logging: LogConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `learnquest_backend=debug`.
    pub level: String,
    pub file_enabled: bool,
    pub dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            dir: PathBuf::from("./logs"),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            level: lookup("RUST_LOG")
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.level),
            file_enabled: lookup("ENABLE_FILE_LOGS")
                .map(|value| matches!(value.trim(), "true" | "1"))
                .unwrap_or(defaults.file_enabled),
            dir: lookup("LOG_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        Self {
            host,
            port,
            logging: LogConfig::from_env(),
            recommendation: recommendation_from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn recommendation_from_env() -> RecommendationConfig {
    let defaults = RecommendationConfig::default();

    let default_limit = std::env::var("RECOMMENDATION_DEFAULT_LIMIT")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(defaults.default_limit);

    let default_ttl_hours = std::env::var("RECOMMENDATION_DEFAULT_TTL_HOURS")
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|hours| hours.is_finite() && *hours >= 0.0)
        .unwrap_or(defaults.default_ttl_hours);

    let history_window = std::env::var("RECOMMENDATION_HISTORY_WINDOW")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|window| *window > 0)
        .unwrap_or(defaults.history_window);

    RecommendationConfig {
        default_limit,
        default_ttl_hours,
        history_window,
        ..defaults
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_log_config_defaults() {
        assert_eq!(LogConfig::from_lookup(lookup(&[])), LogConfig::default());
    }

    #[test]
    fn test_log_config_reads_file_settings() {
        let config = LogConfig::from_lookup(lookup(&[
            ("RUST_LOG", "debug"),
            ("ENABLE_FILE_LOGS", "1"),
            ("LOG_DIR", "/var/log/learnquest"),
        ]));
        assert_eq!(config.level, "debug");
        assert!(config.file_enabled);
        assert_eq!(config.dir, PathBuf::from("/var/log/learnquest"));

        let disabled = LogConfig::from_lookup(lookup(&[("ENABLE_FILE_LOGS", "yes")]));
        assert!(!disabled.file_enabled);
    }
}

//! Crawler Configuration Settings
//!
//! Configuration types for the crawler, loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::ChannelType;

/// Where exchange metadata is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// Local JSON document.
    File(PathBuf),
    /// Base URL serving `{base}/{Exchange}.json`.
    Url(String),
}

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Keepalive interval.
    pub heartbeat_interval: Duration,
    /// Inbound silence after which the connection is considered dead.
    pub heartbeat_timeout: Duration,
    /// Limit on the TCP, TLS and WebSocket handshake of one attempt.
    pub connect_timeout: Duration,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Minimum delay between reconnection attempts.
    pub reconnect_delay_min: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay_initial: Duration::from_secs(1),
            reconnect_delay_min: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(60),
            reconnect_delay_multiplier: 2.0,
        }
    }
}

impl WebSocketSettings {
    /// Reject timings the connection loop cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero heartbeat interval or
    /// connect timeout, or a heartbeat timeout shorter than the interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "CRAWLER_HEARTBEAT_INTERVAL_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        if self.heartbeat_timeout < self.heartbeat_interval {
            return Err(ConfigError::InvalidValue {
                key: "CRAWLER_HEARTBEAT_TIMEOUT_SECS".to_string(),
                value: format!(
                    "{}s (below heartbeat interval of {}s)",
                    self.heartbeat_timeout.as_secs(),
                    self.heartbeat_interval.as_secs()
                ),
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "CRAWLER_CONNECT_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Server port settings.
#[derive(Debug, Clone, Default)]
pub struct ServerSettings {
    /// Health check and metrics HTTP port (0 = disabled).
    pub health_port: u16,
}

/// Complete crawler configuration.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Exchange to crawl.
    pub exchange: String,
    /// Channel types to subscribe.
    pub channels: Vec<ChannelType>,
    /// Normalized pairs to subscribe; empty means every listed pair.
    pub pairs: Vec<String>,
    /// Metadata directory location.
    pub metadata: MetadataSource,
    /// Server port settings.
    pub server: ServerSettings,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
}

impl CrawlerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CrawlerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let exchange = lookup("CRAWLER_EXCHANGE")
            .ok_or_else(|| ConfigError::MissingEnvVar("CRAWLER_EXCHANGE".to_string()))?;
        let exchange = exchange.trim().to_string();
        if exchange.is_empty() {
            return Err(ConfigError::EmptyValue("CRAWLER_EXCHANGE".to_string()));
        }

        let channels = match lookup("CRAWLER_CHANNELS") {
            Some(raw) => split_list(&raw)
                .map(|item| {
                    item.parse::<ChannelType>()
                        .map_err(|_| ConfigError::InvalidValue {
                            key: "CRAWLER_CHANNELS".to_string(),
                            value: item.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![ChannelType::Trade],
        };
        if channels.is_empty() {
            return Err(ConfigError::EmptyValue("CRAWLER_CHANNELS".to_string()));
        }

        let pairs = lookup("CRAWLER_PAIRS")
            .map(|raw| split_list(&raw).map(str::to_string).collect())
            .unwrap_or_default();

        let metadata = metadata_source(&lookup)?;

        let server = ServerSettings {
            health_port: parse_env_u16(&lookup, "CRAWLER_HEALTH_PORT", 0),
        };

        let defaults = WebSocketSettings::default();
        let websocket = WebSocketSettings {
            heartbeat_interval: parse_env_duration_secs(
                &lookup,
                "CRAWLER_HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval,
            ),
            heartbeat_timeout: parse_env_duration_secs(
                &lookup,
                "CRAWLER_HEARTBEAT_TIMEOUT_SECS",
                defaults.heartbeat_timeout,
            ),
            connect_timeout: parse_env_duration_secs(
                &lookup,
                "CRAWLER_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout,
            ),
            reconnect_delay_initial: parse_env_duration_millis(
                &lookup,
                "CRAWLER_RECONNECT_DELAY_INITIAL_MS",
                defaults.reconnect_delay_initial,
            ),
            reconnect_delay_min: parse_env_duration_millis(
                &lookup,
                "CRAWLER_RECONNECT_DELAY_MIN_MS",
                defaults.reconnect_delay_min,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                &lookup,
                "CRAWLER_RECONNECT_DELAY_MAX_SECS",
                defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env_f64(
                &lookup,
                "CRAWLER_RECONNECT_DELAY_MULTIPLIER",
                defaults.reconnect_delay_multiplier,
            ),
        };
        websocket.validate()?;

        Ok(Self {
            exchange,
            channels,
            pairs,
            metadata,
            server,
            websocket,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

fn metadata_source<F>(lookup: &F) -> Result<MetadataSource, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = lookup("CRAWLER_METADATA_FILE").filter(|v| !v.trim().is_empty());
    let url = lookup("CRAWLER_METADATA_URL").filter(|v| !v.trim().is_empty());

    match (file, url) {
        (Some(path), None) => Ok(MetadataSource::File(PathBuf::from(path.trim()))),
        (None, Some(url)) => Ok(MetadataSource::Url(url.trim().trim_end_matches('/').to_string())),
        (Some(_), Some(url)) => Err(ConfigError::InvalidValue {
            key: "CRAWLER_METADATA_URL".to_string(),
            value: format!("{url} (CRAWLER_METADATA_FILE is also set)"),
        }),
        (None, None) => Err(ConfigError::MissingEnvVar(
            "CRAWLER_METADATA_FILE or CRAWLER_METADATA_URL".to_string(),
        )),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_env_u16<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u16) -> u16 {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_env_f64<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: f64) -> f64 {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_env_duration_secs<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<CrawlerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CrawlerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = config(&[
            ("CRAWLER_EXCHANGE", "Binance"),
            ("CRAWLER_METADATA_FILE", "/tmp/Binance.json"),
        ])
        .unwrap();

        assert_eq!(config.exchange, "Binance");
        assert_eq!(config.channels, vec![ChannelType::Trade]);
        assert!(config.pairs.is_empty());
        assert_eq!(
            config.metadata,
            MetadataSource::File(PathBuf::from("/tmp/Binance.json"))
        );
        assert_eq!(config.server.health_port, 0);
        assert_eq!(config.websocket.heartbeat_interval, Duration::from_secs(30));
    }

    #[test]
    fn parses_lists_and_overrides() {
        let config = config(&[
            ("CRAWLER_EXCHANGE", "MXC"),
            ("CRAWLER_CHANNELS", "trade, OrderBookUpdate"),
            ("CRAWLER_PAIRS", "BTC_USDT,ETH_USDT,"),
            ("CRAWLER_METADATA_URL", "https://metadata.local/exchanges/"),
            ("CRAWLER_HEALTH_PORT", "8090"),
            ("CRAWLER_RECONNECT_DELAY_MIN_MS", "750"),
            ("CRAWLER_RECONNECT_DELAY_MULTIPLIER", "1.5"),
        ])
        .unwrap();

        assert_eq!(
            config.channels,
            vec![ChannelType::Trade, ChannelType::OrderBookUpdate]
        );
        assert_eq!(config.pairs, vec!["BTC_USDT", "ETH_USDT"]);
        assert_eq!(
            config.metadata,
            MetadataSource::Url("https://metadata.local/exchanges".to_string())
        );
        assert_eq!(config.server.health_port, 8090);
        assert_eq!(config.websocket.reconnect_delay_min, Duration::from_millis(750));
        assert!((config.websocket.reconnect_delay_multiplier - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_heartbeat_interval_rejected() {
        let err = config(&[
            ("CRAWLER_EXCHANGE", "Binance"),
            ("CRAWLER_METADATA_FILE", "x.json"),
            ("CRAWLER_HEARTBEAT_INTERVAL_SECS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "CRAWLER_HEARTBEAT_INTERVAL_SECS"
        ));
    }

    #[test]
    fn heartbeat_timeout_below_interval_rejected() {
        let err = config(&[
            ("CRAWLER_EXCHANGE", "Binance"),
            ("CRAWLER_METADATA_FILE", "x.json"),
            ("CRAWLER_HEARTBEAT_INTERVAL_SECS", "30"),
            ("CRAWLER_HEARTBEAT_TIMEOUT_SECS", "10"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "CRAWLER_HEARTBEAT_TIMEOUT_SECS"
        ));
    }

    #[test]
    fn zero_connect_timeout_rejected() {
        let err = config(&[
            ("CRAWLER_EXCHANGE", "Binance"),
            ("CRAWLER_METADATA_FILE", "x.json"),
            ("CRAWLER_CONNECT_TIMEOUT_SECS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "CRAWLER_CONNECT_TIMEOUT_SECS"
        ));
    }

    #[test]
    fn missing_exchange() {
        let err = config(&[("CRAWLER_METADATA_FILE", "x.json")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "CRAWLER_EXCHANGE"));
    }

    #[test]
    fn empty_exchange() {
        let err = config(&[("CRAWLER_EXCHANGE", " "), ("CRAWLER_METADATA_FILE", "x.json")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(_)));
    }

    #[test]
    fn invalid_channel() {
        let err = config(&[
            ("CRAWLER_EXCHANGE", "Binance"),
            ("CRAWLER_CHANNELS", "Trade,Candles"),
            ("CRAWLER_METADATA_FILE", "x.json"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref value, .. } if value == "Candles"));
    }

    #[test]
    fn empty_channel_list() {
        let err = config(&[
            ("CRAWLER_EXCHANGE", "Binance"),
            ("CRAWLER_CHANNELS", " , "),
            ("CRAWLER_METADATA_FILE", "x.json"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(ref k) if k == "CRAWLER_CHANNELS"));
    }

    #[test]
    fn metadata_source_required() {
        let err = config(&[("CRAWLER_EXCHANGE", "Binance")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn metadata_sources_are_exclusive() {
        let err = config(&[
            ("CRAWLER_EXCHANGE", "Binance"),
            ("CRAWLER_METADATA_FILE", "x.json"),
            ("CRAWLER_METADATA_URL", "https://metadata.local"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let config = config(&[
            ("CRAWLER_EXCHANGE", "Binance"),
            ("CRAWLER_METADATA_FILE", "x.json"),
            ("CRAWLER_HEALTH_PORT", "not-a-port"),
            ("CRAWLER_HEARTBEAT_TIMEOUT_SECS", "-1"),
        ])
        .unwrap();
        assert_eq!(config.server.health_port, 0);
        assert_eq!(config.websocket.heartbeat_timeout, Duration::from_secs(60));
    }

    #[test]
    fn websocket_settings_defaults() {
        let settings = WebSocketSettings::default();
        assert_eq!(settings.heartbeat_timeout, Duration::from_secs(60));
        assert_eq!(settings.reconnect_delay_initial, Duration::from_secs(1));
        assert_eq!(settings.reconnect_delay_min, Duration::from_millis(500));
        assert_eq!(settings.reconnect_delay_max, Duration::from_secs(60));
    }
}

//! Configuration Module
//!
//! Configuration loading for the crawler binary.

mod settings;

pub use settings::{
    ConfigError, CrawlerConfig, MetadataSource, ServerSettings, WebSocketSettings,
};

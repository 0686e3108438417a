/// Configuration management for Social Service
///
/// Loads configuration from environment variables (and a `.env` file when present).
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Page sizes and fan-out tuning
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// tracing filter directive used when RUST_LOG is unset
    pub log_filter: String,
}

/// Feed, listing and fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Home feed page size
    #[serde(default = "default_feed_page_size")]
    pub feed_page_size: usize,
    /// Post history and bookmarks page size
    #[serde(default = "default_posts_page_size")]
    pub posts_page_size: usize,
    /// Comment list page size
    #[serde(default = "default_comments_page_size")]
    pub comments_page_size: usize,
    /// Followers / following page size
    #[serde(default = "default_follows_page_size")]
    pub follows_page_size: usize,
    /// Max concurrent feed writes per fan-out
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
}

// Default values
fn default_feed_page_size() -> usize {
    5
}

fn default_posts_page_size() -> usize {
    12
}

fn default_comments_page_size() -> usize {
    20
}

fn default_follows_page_size() -> usize {
    20
}

fn default_fanout_concurrency() -> usize {
    32
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_page_size: default_feed_page_size(),
            posts_page_size: default_posts_page_size(),
            comments_page_size: default_comments_page_size(),
            follows_page_size: default_follows_page_size(),
            fanout_concurrency: default_fanout_concurrency(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                env: "development".to_string(),
                log_filter: "info".to_string(),
            },
            feed: FeedConfig::default(),
        }
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("{} must be a positive integer, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            log_filter: std::env::var("LOG_FILTER").unwrap_or_else(|_| "info".to_string()),
        };

        let feed = FeedConfig {
            feed_page_size: env_usize("FEED_PAGE_SIZE", default_feed_page_size())?,
            posts_page_size: env_usize("POSTS_PAGE_SIZE", default_posts_page_size())?,
            comments_page_size: env_usize("COMMENTS_PAGE_SIZE", default_comments_page_size())?,
            follows_page_size: env_usize("FOLLOWS_PAGE_SIZE", default_follows_page_size())?,
            fanout_concurrency: env_usize("FANOUT_CONCURRENCY", default_fanout_concurrency())?,
        };

        let config = Config { app, feed };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("FEED_PAGE_SIZE", self.feed.feed_page_size),
            ("POSTS_PAGE_SIZE", self.feed.posts_page_size),
            ("COMMENTS_PAGE_SIZE", self.feed.comments_page_size),
            ("FOLLOWS_PAGE_SIZE", self.feed.follows_page_size),
        ];
        for (name, size) in sizes {
            if size == 0 || size > 100 {
                bail!("{} must be 1-100, got {}", name, size);
            }
        }
        if self.feed.fanout_concurrency == 0 {
            bail!("FANOUT_CONCURRENCY must be >= 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "APP_ENV",
        "FEED_PAGE_SIZE",
        "POSTS_PAGE_SIZE",
        "COMMENTS_PAGE_SIZE",
        "FOLLOWS_PAGE_SIZE",
        "FANOUT_CONCURRENCY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_default_values() {
        clear_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.feed.feed_page_size, 5);
        assert_eq!(config.feed.posts_page_size, 12);
        assert_eq!(config.feed.comments_page_size, 20);
        assert_eq!(config.feed.follows_page_size, 20);
        assert_eq!(config.feed.fanout_concurrency, 32);
    }

    #[test]
    #[serial]
    fn test_overrides_and_validation() {
        clear_env();
        std::env::set_var("FEED_PAGE_SIZE", "10");
        std::env::set_var("FANOUT_CONCURRENCY", "4");

        let config = Config::from_env().unwrap();
        assert_eq!(config.feed.feed_page_size, 10);
        assert_eq!(config.feed.fanout_concurrency, 4);

        std::env::set_var("FEED_PAGE_SIZE", "0");
        assert!(Config::from_env().is_err());

        std::env::set_var("FEED_PAGE_SIZE", "many");
        assert!(Config::from_env().is_err());

        clear_env();
    }
}

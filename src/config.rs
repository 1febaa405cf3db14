use std::time::Duration;
use tracing::warn;

pub const DEFAULT_USER_AGENT: &str = "saber-feed/0.1 +https://github.com/hideselfview/saber-feed";

/// Scraper configuration
/// In debug builds: loads a .env file first, then environment variables
/// In release builds: environment variables only
#[derive(Clone, Debug, PartialEq)]
pub struct ScraperConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request timeout; a timeout is reported as a transport failure
    pub request_timeout: Duration,
    /// Maximum number of pages fetched at once (0 = no limit)
    pub max_concurrent_pages: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            max_concurrent_pages: 10,
        }
    }
}

impl ScraperConfig {
    /// Load configuration based on build mode
    pub fn load() -> Self {
        #[cfg(debug_assertions)]
        {
            if dotenvy::dotenv().is_ok() {
                tracing::info!("Config: Dev mode activated - loaded .env file");
            }
        }

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from a variable lookup, falling back to defaults
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let user_agent = lookup("SABER_FEED_USER_AGENT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.user_agent);

        let request_timeout = parse_var(&lookup, "SABER_FEED_TIMEOUT_SECS")
            .filter(|&secs| {
                if secs == 0 {
                    warn!("Config: ignoring SABER_FEED_TIMEOUT_SECS=0, a timeout must be positive");
                }
                secs > 0
            })
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let max_concurrent_pages = parse_var(&lookup, "SABER_FEED_MAX_CONCURRENT_PAGES")
            .map(|v| v as usize)
            .unwrap_or(defaults.max_concurrent_pages);

        Self {
            user_agent,
            request_timeout,
            max_concurrent_pages,
        }
    }
}

fn parse_var<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Config: ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ScraperConfig::from_vars(|_| None);
        assert_eq!(config, ScraperConfig::default());
        assert_eq!(config.max_concurrent_pages, 10);
    }

    #[test]
    fn test_overrides_from_vars() {
        let env = vars(&[
            ("SABER_FEED_USER_AGENT", "tester/1.0"),
            ("SABER_FEED_TIMEOUT_SECS", "5"),
            ("SABER_FEED_MAX_CONCURRENT_PAGES", "0"),
        ]);
        let config = ScraperConfig::from_vars(|k| env.get(k).cloned());
        assert_eq!(config.user_agent, "tester/1.0");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_pages, 0);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let env = vars(&[
            ("SABER_FEED_TIMEOUT_SECS", "soon"),
            ("SABER_FEED_MAX_CONCURRENT_PAGES", "-3"),
        ]);
        let config = ScraperConfig::from_vars(|k| env.get(k).cloned());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_pages, 10);
    }

    #[test]
    fn test_zero_timeout_falls_back() {
        let env = vars(&[("SABER_FEED_TIMEOUT_SECS", "0")]);
        let config = ScraperConfig::from_vars(|k| env.get(k).cloned());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}

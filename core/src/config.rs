//! Runtime configuration loaded from environment variables.

use std::time::Duration;

/// Tunable knobs for the allocation core.
///
/// Everything has a code default; deployments override through `RIFA_*`
/// environment variables. There is no config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Poll interval for reviewer queues and the admin number grid.
    pub review_poll_interval: Duration,
    /// Poll interval for the buyer-facing number grid (kept a little
    /// slower than the review cadence; 3-5s keeps selections fresh).
    pub storefront_poll_interval: Duration,
    /// Minimum ticket numbers per purchase submission.
    pub min_ticket_count: u32,
}

impl CoreConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default | Meaning |
    /// |---|---|---|
    /// | `RIFA_REVIEW_POLL_MS` | `3000` | reviewer/admin poll cadence |
    /// | `RIFA_STOREFRONT_POLL_MS` | `5000` | buyer grid poll cadence |
    /// | `RIFA_MIN_TICKETS` | `2` | minimum numbers per purchase |
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            review_poll_interval: parse_millis(
                std::env::var("RIFA_REVIEW_POLL_MS").ok(),
                defaults.review_poll_interval,
            ),
            storefront_poll_interval: parse_millis(
                std::env::var("RIFA_STOREFRONT_POLL_MS").ok(),
                defaults.storefront_poll_interval,
            ),
            min_ticket_count: parse_count(
                std::env::var("RIFA_MIN_TICKETS").ok(),
                defaults.min_ticket_count,
            ),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            review_poll_interval: Duration::from_millis(3000),
            storefront_poll_interval: Duration::from_millis(5000),
            min_ticket_count: 2,
        }
    }
}

fn parse_millis(raw: Option<String>, default: Duration) -> Duration {
    raw.and_then(|s| s.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn parse_count(raw: Option<String>, default: u32) -> u32 {
    raw.and_then(|s| s.parse::<u32>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_cadences() {
        let config = CoreConfig::default();
        assert_eq!(config.review_poll_interval, Duration::from_millis(3000));
        assert_eq!(config.storefront_poll_interval, Duration::from_millis(5000));
        assert_eq!(config.min_ticket_count, 2);
    }

    #[test]
    fn parse_millis_accepts_overrides_and_falls_back() {
        let default = Duration::from_millis(3000);
        assert_eq!(
            parse_millis(Some("1500".to_string()), default),
            Duration::from_millis(1500)
        );
        assert_eq!(parse_millis(Some("garbage".to_string()), default), default);
        assert_eq!(parse_millis(None, default), default);
    }

    #[test]
    fn parse_count_rejects_non_numeric() {
        assert_eq!(parse_count(Some("5".to_string()), 2), 5);
        assert_eq!(parse_count(Some("-1".to_string()), 2), 2);
        assert_eq!(parse_count(None, 2), 2);
    }
}

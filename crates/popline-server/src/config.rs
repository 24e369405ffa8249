//! Server configuration types.

use std::time::Duration;

/// Per-session server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inactivity deadline: the session closes if no request line arrives
    /// within this duration. RFC 1939 asks for at least 10 minutes.
    pub timeout: Duration,
    /// Whether the greeting advertises an APOP challenge.
    pub advertise_apop: bool,
    /// Maximum accepted request-line length in bytes, delimiter included.
    /// Defends the scanner against unbounded memory growth.
    pub max_line_length: usize,
}

impl Config {
    /// Creates a configuration with RFC-motivated defaults: a 10-minute
    /// autologout timer, APOP advertised, and a 1024-byte line ceiling.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            advertise_apop: true,
            max_line_length: 1024,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for server configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    timeout: Duration,
    advertise_apop: bool,
    max_line_length: usize,
}

impl ConfigBuilder {
    /// Creates a new builder with the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        let defaults = Config::new();
        Self {
            timeout: defaults.timeout,
            advertise_apop: defaults.advertise_apop,
            max_line_length: defaults.max_line_length,
        }
    }

    /// Sets the inactivity timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether APOP is advertised.
    #[must_use]
    pub const fn advertise_apop(mut self, advertise: bool) -> Self {
        self.advertise_apop = advertise;
        self
    }

    /// Sets the maximum accepted request-line length.
    #[must_use]
    pub const fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub const fn build(self) -> Config {
        Config {
            timeout: self.timeout,
            advertise_apop: self.advertise_apop,
            max_line_length: self.max_line_length,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert!(config.advertise_apop);
        assert_eq!(config.max_line_length, 1024);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::builder()
            .timeout(Duration::from_secs(30))
            .advertise_apop(false)
            .max_line_length(512)
            .build();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.advertise_apop);
        assert_eq!(config.max_line_length, 512);
    }
}

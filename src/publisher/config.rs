//! Publisher configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Default size of the client pool
pub const DEFAULT_MAX_CLIENTS: usize = 16;

/// Default number of segments replayed to a new client
pub const DEFAULT_PREBUFFER_SEGMENTS: usize = 10;

/// Default capacity of each client's private ring
pub const DEFAULT_CLIENT_BUFFER_SEGMENTS: usize = 32;

/// Default capacity of the ingest ring
pub const DEFAULT_INGEST_CAPACITY: usize = 4;

/// Publisher configuration options
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Number of client slots
    pub max_clients: usize,

    /// Capacity of the prebuffer ring
    ///
    /// The ring slides as soon as it fills, so a new client is replayed at
    /// most `prebuffer_segments - 1` segments. A value of 1 disables replay.
    pub prebuffer_segments: usize,

    /// Capacity of each client's private ring
    pub client_buffer_segments: usize,

    /// Capacity of the ingest ring
    pub ingest_capacity: usize,

    /// Longest a writer sleeps before re-polling an empty ring
    pub writer_poll_interval: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_clients: DEFAULT_MAX_CLIENTS,
            prebuffer_segments: DEFAULT_PREBUFFER_SEGMENTS,
            client_buffer_segments: DEFAULT_CLIENT_BUFFER_SEGMENTS,
            ingest_capacity: DEFAULT_INGEST_CAPACITY,
            writer_poll_interval: Duration::from_millis(100),
        }
    }
}

impl PublisherConfig {
    /// Set the client pool size
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the prebuffer window
    pub fn prebuffer_segments(mut self, segments: usize) -> Self {
        self.prebuffer_segments = segments;
        self
    }

    /// Set the private ring capacity
    pub fn client_buffer_segments(mut self, segments: usize) -> Self {
        self.client_buffer_segments = segments;
        self
    }

    /// Set the ingest ring capacity
    pub fn ingest_capacity(mut self, segments: usize) -> Self {
        self.ingest_capacity = segments;
        self
    }

    /// Set the writer poll interval
    pub fn writer_poll_interval(mut self, interval: Duration) -> Self {
        self.writer_poll_interval = interval;
        self
    }

    /// Check the configuration for values the publisher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(Error::InvalidConfig("max_clients must be > 0".into()));
        }
        if self.prebuffer_segments == 0 {
            return Err(Error::InvalidConfig(
                "prebuffer_segments must be > 0".into(),
            ));
        }
        if self.ingest_capacity == 0 {
            return Err(Error::InvalidConfig("ingest_capacity must be > 0".into()));
        }
        // A freshly committed client must hold the whole replay window
        if self.client_buffer_segments < self.prebuffer_segments {
            return Err(Error::InvalidConfig(format!(
                "client_buffer_segments ({}) must be >= prebuffer_segments ({})",
                self.client_buffer_segments, self.prebuffer_segments
            )));
        }
        if self.writer_poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "writer_poll_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PublisherConfig::default();

        assert_eq!(config.max_clients, DEFAULT_MAX_CLIENTS);
        assert_eq!(config.prebuffer_segments, DEFAULT_PREBUFFER_SEGMENTS);
        assert_eq!(config.client_buffer_segments, DEFAULT_CLIENT_BUFFER_SEGMENTS);
        assert_eq!(config.ingest_capacity, DEFAULT_INGEST_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let config = PublisherConfig::default()
            .max_clients(4)
            .prebuffer_segments(5)
            .client_buffer_segments(8)
            .ingest_capacity(2)
            .writer_poll_interval(Duration::from_millis(10));

        assert_eq!(config.max_clients, 4);
        assert_eq!(config.prebuffer_segments, 5);
        assert_eq!(config.client_buffer_segments, 8);
        assert_eq!(config.ingest_capacity, 2);
        assert_eq!(config.writer_poll_interval, Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_clients() {
        let config = PublisherConfig::default().max_clients(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_zero_prebuffer() {
        let config = PublisherConfig::default().prebuffer_segments(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_zero_ingest() {
        let config = PublisherConfig::default().ingest_capacity(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_client_buffer_smaller_than_prebuffer() {
        let config = PublisherConfig::default()
            .prebuffer_segments(10)
            .client_buffer_segments(9);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let config = PublisherConfig::default().writer_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}

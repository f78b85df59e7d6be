//! Public configuration for the TTS client.

use std::time::Duration;

/// Server address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9090";

/// Configuration for the TTS client.
///
/// Use the builder methods to customize the client configuration.
///
/// # Example
///
/// ```
/// use readaloud_tts::TtsClientConfig;
/// use std::time::Duration;
///
/// let config = TtsClientConfig::new()
///     .with_base_url("http://tts.local:9090")
///     .with_timeout(Duration::from_secs(90));
/// ```
#[derive(Debug, Clone)]
pub struct TtsClientConfig {
    /// Root URL of the TTS server
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Per-request timeout (synthesis of long segments can be slow)
    pub(crate) timeout: Duration,
    /// Output sample rate requested from the server
    pub(crate) sample_rate: u32,
    /// Target bitrate for compressed formats
    pub(crate) bitrate: u32,
    /// Bitrate mode for compressed formats
    pub(crate) vbr: String,
    /// Container/codec requested from the server (`wav`, `mp3`)
    pub(crate) format: String,
}

impl Default for TtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("readaloud-tts/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(60),
            sample_rate: 24_000,
            bitrate: 24_000,
            vbr: "constrained".to_string(),
            format: "wav".to_string(),
        }
    }
}

impl TtsClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server root URL.
    ///
    /// Defaults to [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    ///
    /// Defaults to 60 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    #[must_use]
    pub const fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Set the audio format requested from the server.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// The configured server root URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

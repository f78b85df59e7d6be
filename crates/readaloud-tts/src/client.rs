//! TTS server client.

use readaloud_core::{Backend, PlaybackConfig};
use url::Url;

use crate::config::TtsClientConfig;
use crate::error::{TtsError, TtsResult};
use crate::http::{HttpBackend, ReqwestBackend};
use crate::models::{CancelRequest, SynthesizeRequest, VoicesResponse};

// ============================================================================
// Type Aliases
// ============================================================================

/// Default TTS client using the reqwest HTTP backend.
pub type DefaultTtsClient = TtsClient<ReqwestBackend>;

// ============================================================================
// Client
// ============================================================================

/// Client for the TTS server.
///
/// Generic over an HTTP backend so the request logic can be tested without a
/// socket. Use [`DefaultTtsClient`] in production code.
pub struct TtsClient<B: HttpBackend> {
    pub(crate) backend: B,
    pub(crate) config: TtsClientConfig,
    pub(crate) base_url: Url,
}

impl DefaultTtsClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TtsClientConfig) -> TtsResult<Self> {
        let backend = ReqwestBackend::new(config.timeout, &config.user_agent)?;
        Self::with_backend(config, backend)
    }

    /// Create a new client with default configuration.
    pub fn default_client() -> TtsResult<Self> {
        Self::new(TtsClientConfig::default())
    }
}

impl<B: HttpBackend> TtsClient<B> {
    /// Create a client over a custom backend.
    pub(crate) fn with_backend(config: TtsClientConfig, backend: B) -> TtsResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        Ok(Self {
            backend,
            config,
            base_url,
        })
    }

    /// Root URL requests are resolved against (always ends in `/`).
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> TtsResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// `POST /synthesize`. Empty bodies are reported as [`TtsError::EmptyAudio`].
    pub(crate) async fn synthesize_bytes(
        &self,
        text: &str,
        config: &PlaybackConfig,
    ) -> TtsResult<Vec<u8>> {
        let url = self.endpoint("synthesize")?;
        let body = serde_json::to_value(SynthesizeRequest {
            text,
            voice: &config.voice,
            speed: config.speed,
            backend: config.backend.id(),
            sample_rate: self.config.sample_rate,
            bitrate: self.config.bitrate,
            vbr: &self.config.vbr,
            format: &self.config.format,
        })?;

        let bytes = self.backend.post_json(&url, &body).await?;
        if bytes.is_empty() {
            return Err(TtsError::EmptyAudio);
        }
        Ok(bytes)
    }

    /// `GET /voices?backend=<id>`.
    pub(crate) async fn voice_ids(&self, backend: Backend) -> TtsResult<Vec<String>> {
        let mut url = self.endpoint("voices")?;
        url.query_pairs_mut().append_pair("backend", backend.id());
        let response: VoicesResponse = self.backend.get_json(&url).await?;
        Ok(response.into_ids())
    }

    /// `POST /cancel`. The response body is ignored.
    pub(crate) async fn cancel_backend(&self, backend: Backend) -> TtsResult<()> {
        let url = self.endpoint("cancel")?;
        let body = serde_json::to_value(CancelRequest {
            backend: backend.id(),
        })?;
        self.backend.post_json(&url, &body).await?;
        Ok(())
    }
}

/// Parse the configured root URL so that relative joins append to its path.
fn parse_base_url(raw: &str) -> TtsResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

//! [`SynthesisPort`] implementation for [`TtsClient`].

use async_trait::async_trait;
use readaloud_core::{Backend, PlaybackConfig, SynthesisError, SynthesisPort};

use crate::client::TtsClient;
use crate::http::HttpBackend;

#[async_trait]
impl<B: HttpBackend> SynthesisPort for TtsClient<B> {
    async fn synthesize(
        &self,
        text: &str,
        config: &PlaybackConfig,
    ) -> Result<Vec<u8>, SynthesisError> {
        tracing::debug!(
            chars = text.chars().count(),
            backend = %config.backend,
            voice = %config.voice,
            speed = config.speed,
            "Synthesizing segment"
        );

        match self.synthesize_bytes(text, config).await {
            Ok(bytes) => {
                tracing::debug!(bytes = bytes.len(), "Synthesis complete");
                Ok(bytes)
            }
            Err(e) => {
                tracing::warn!(error = %e, backend = %config.backend, "Synthesis failed");
                Err(e.into())
            }
        }
    }

    async fn list_voices(&self, backend: Backend) -> Result<Vec<String>, SynthesisError> {
        let voices = self.voice_ids(backend).await.map_err(SynthesisError::from)?;
        tracing::debug!(%backend, count = voices.len(), "Listed voices");
        Ok(voices)
    }

    async fn cancel(&self, backend: Backend) -> Result<(), SynthesisError> {
        self.cancel_backend(backend).await.map_err(|e| {
            tracing::debug!(error = %e, %backend, "Cancel request failed");
            SynthesisError::from(e)
        })
    }
}

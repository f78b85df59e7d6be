//! Wire types exchanged with the TTS server.

use serde::{Deserialize, Serialize};

/// Body of `POST /synthesize`.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizeRequest<'a> {
    pub text: &'a str,
    pub voice: &'a str,
    pub speed: f32,
    pub backend: &'a str,
    pub sample_rate: u32,
    pub bitrate: u32,
    pub vbr: &'a str,
    pub format: &'a str,
}

/// Body of `POST /cancel`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelRequest<'a> {
    pub backend: &'a str,
}

/// Response of `GET /voices`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<VoiceEntry>,
}

/// A voice as listed by the server: either a bare id or an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VoiceEntry {
    Id(String),
    Detailed {
        id: String,
        #[serde(default)]
        #[allow(dead_code)]
        name: Option<String>,
    },
}

impl VoiceEntry {
    pub fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Detailed { id, .. } => id,
        }
    }
}

impl VoicesResponse {
    /// Non-empty voice ids in server order, duplicates removed.
    pub fn into_ids(self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.voices.len());
        for id in self.voices.into_iter().map(VoiceEntry::into_id) {
            let id = id.trim().to_string();
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

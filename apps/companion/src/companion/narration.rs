use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{wav, Companion};
use crate::assets::{AudioBlob, AudioKey};
use crate::quota::Action;

/// Markers a script uses for a breathing pause.
pub const PAUSE_MARKERS: [&str; 2] = ["[PAUSA]", "[PAUSE]"];
const NEURAL_PAUSE: &str = " ... ";
const DEVICE_PAUSE: &str = ", , , ";
const DEVICE_SPEECH_RATE: f32 = 0.9;

fn default_locale() -> String {
    "es-ES".to_string()
}

fn default_mode() -> String {
    "meditation".to_string()
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    /// Stable id for curated scripts. Ad-hoc scripts are keyed by content.
    #[serde(default)]
    pub content_id: Option<String>,
    pub script: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl NarrationRequest {
    pub fn cache_key(&self) -> AudioKey {
        match self.content_id.as_deref() {
            Some(id) if !id.trim().is_empty() => {
                AudioKey::new(id.trim(), &self.locale, &self.mode, self.version)
            }
            _ => AudioKey::for_script(&self.script, &self.locale, &self.mode, self.version),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Depleted,
    Timeout,
    Failed,
}

/// Everything a client needs to speak the script with the on-device voice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceNarration {
    pub script: String,
    pub locale: String,
    pub rate: f32,
    pub reason: FallbackReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Narration {
    Cached(AudioBlob),
    Generated(AudioBlob),
    Device(DeviceNarration),
}

impl Narration {
    pub fn source(&self) -> &'static str {
        match self {
            Narration::Cached(_) => "cache",
            Narration::Generated(_) => "neural",
            Narration::Device(_) => "device",
        }
    }
}

fn replace_pauses(script: &str, pause: &str) -> String {
    PAUSE_MARKERS
        .iter()
        .fold(script.to_string(), |text, marker| text.replace(marker, pause))
}

/// Script for the neural voice: pauses become soft ellipses.
pub fn neural_script(script: &str) -> String {
    replace_pauses(script, NEURAL_PAUSE)
}

/// Script for on-device synthesis: pauses become runs of commas.
pub fn device_script(script: &str) -> String {
    replace_pauses(script, DEVICE_PAUSE)
}

impl Companion {
    /// Read-through narration. Cache hits are free; a miss charges
    /// `neural_tts` only when generation succeeds within the timeout.
    pub async fn narrate(&self, request: &NarrationRequest) -> Narration {
        let key = request.cache_key().to_string();
        if let Some(audio) = self.cache.get_audio(&key).await {
            debug!("Narration served from cache: {key}");
            return Narration::Cached(audio);
        }

        let device = |reason: FallbackReason, message: Option<String>| {
            Narration::Device(DeviceNarration {
                script: device_script(&request.script),
                locale: request.locale.clone(),
                rate: DEVICE_SPEECH_RATE,
                reason,
                message,
            })
        };

        if !self.ledger.can_afford(Action::NeuralTts).await {
            return device(
                FallbackReason::Depleted,
                Some(self.ledger.depleted_message().to_string()),
            );
        }

        let script = neural_script(&request.script);
        // Dropping the losing future cancels the in-flight request.
        match timeout(
            self.narration_timeout,
            self.ai.generate_speech(&script, &self.voice),
        )
        .await
        {
            Ok(Ok(raw)) => {
                let audio = wav::into_playable(raw);
                self.cache.save_audio(&key, &audio).await;
                if !self.ledger.consume(Action::NeuralTts).await {
                    warn!("Generated narration {key} but the budget was gone by completion");
                }
                info!("Generated narration {key} ({} bytes)", audio.bytes.len());
                Narration::Generated(audio)
            }
            Ok(Err(e)) => {
                warn!("Speech generation failed, using device voice: {e}");
                device(FallbackReason::Failed, None)
            }
            Err(_) => {
                warn!(
                    "Speech generation exceeded {}s, using device voice",
                    self.narration_timeout.as_secs()
                );
                device(FallbackReason::Timeout, None)
            }
        }
    }
}

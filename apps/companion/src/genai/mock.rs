//! Configurable `GenerativeAi` double for unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{AiError, GenerativeAi, ResponseFormat, VoiceConfig};
use crate::assets::AudioBlob;

pub struct MockAi {
    response: String,
    speech: AudioBlob,
    speech_delay: Duration,
    available: AtomicBool,
    call_count: AtomicU32,
    last_prompt: Mutex<Option<String>>,
}

impl MockAi {
    pub fn new() -> Self {
        Self {
            response: "Mock response".to_string(),
            speech: AudioBlob {
                bytes: Bytes::from_static(&[0, 0, 1, 0]),
                content_type: "audio/L16;codec=pcm;rate=24000".to_string(),
            },
            speech_delay: Duration::ZERO,
            available: AtomicBool::new(true),
            call_count: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.response = content.into();
        self
    }

    /// Delays speech generation, for timeout tests under paused time.
    pub fn with_speech_delay(mut self, delay: Duration) -> Self {
        self.speech_delay = delay;
        self
    }

    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    fn record(&self, prompt: &str) -> Result<(), AiError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AiError::Api {
                status: 503,
                message: "mock unavailable".to_string(),
            })
        }
    }
}

#[async_trait]
impl GenerativeAi for MockAi {
    async fn generate_text(
        &self,
        prompt: &str,
        _system: Option<&str>,
        _format: ResponseFormat,
    ) -> Result<String, AiError> {
        self.record(prompt)?;
        Ok(self.response.clone())
    }

    async fn generate_speech(
        &self,
        script: &str,
        _voice: &VoiceConfig,
    ) -> Result<AudioBlob, AiError> {
        self.record(script)?;
        if !self.speech_delay.is_zero() {
            tokio::time::sleep(self.speech_delay).await;
        }
        Ok(self.speech.clone())
    }

    async fn transcribe_audio(&self, _audio: &[u8], mime_type: &str) -> Result<String, AiError> {
        self.record(mime_type)?;
        Ok(self.response.clone())
    }

    async fn analyze_image(
        &self,
        _image: &[u8],
        _mime_type: &str,
        prompt: &str,
    ) -> Result<String, AiError> {
        self.record(prompt)?;
        Ok(self.response.clone())
    }
}

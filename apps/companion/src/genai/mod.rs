/// Generative AI client: the single point of entry for all model calls.
///
/// No other module talks to the Gemini API directly. Everything goes through
/// the `GenerativeAi` trait so the companion actions can be tested against a
/// mock and the HTTP client can be tested against a local server.
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::assets::AudioBlob;

#[cfg(test)]
pub mod mock;
pub mod prompts;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
/// Model used for chat, vision, transcription and JSON extraction.
pub const TEXT_MODEL: &str = "gemini-2.5-flash";
/// Model used for narration audio.
pub const SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";
/// Attempts per call, so at most two backoff sleeps (base, then 2x base).
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Model returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    /// Ask for `application/json` and strip any code fences from the reply.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    pub voice_name: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_name: DEFAULT_VOICE.to_string(),
        }
    }
}

#[async_trait]
pub trait GenerativeAi: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        system: Option<&str>,
        format: ResponseFormat,
    ) -> Result<String, AiError>;

    /// Returns the audio exactly as the model produced it (usually raw PCM).
    async fn generate_speech(&self, script: &str, voice: &VoiceConfig)
        -> Result<AudioBlob, AiError>;

    async fn transcribe_audio(&self, audio: &[u8], mime_type: &str) -> Result<String, AiError>;

    async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, AiError>;
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    #[serde(rename_all = "camelCase")]
    InlineData { mime_type: &'a str, data: String },
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceSelection<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    /// Concatenated text of the first candidate's text parts.
    pub fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn inline_data(&self) -> Option<&InlineData> {
        self.parts().find_map(|p| p.inline_data.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Gemini `generateContent` over REST, with retry on 429 and 5xx.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry_base: Duration,
}

/// Delay before retry number `attempt` (1-based): doubles from `base`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * (1 << attempt.saturating_sub(1))
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, AiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| GEMINI_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            retry_base: Duration::from_secs(1),
        })
    }

    /// Overrides the first backoff delay (doubled on each retry).
    #[cfg(test)]
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    async fn call(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, AiError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let mut last_error: Option<AiError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base, attempt);
                warn!(
                    "Gemini call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(request)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AiError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Gemini API returned {}: {}", status, body);
                last_error = Some(AiError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(AiError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: GenerateResponse = response.json().await?;
            if let Some(usage) = &parsed.usage_metadata {
                debug!(
                    "Gemini call succeeded ({model}): prompt_tokens={}, output_tokens={}",
                    usage.prompt_token_count, usage.candidates_token_count
                );
            }
            return Ok(parsed);
        }

        Err(last_error.unwrap_or(AiError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn call_text(
        &self,
        parts: Vec<Part<'_>>,
        system: Option<&str>,
        format: ResponseFormat,
    ) -> Result<String, AiError> {
        let generation_config = match format {
            ResponseFormat::Text => None,
            ResponseFormat::Json => Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                ..GenerationConfig::default()
            }),
        };
        let request = GenerateRequest {
            contents: vec![Content { role: "user", parts }],
            system_instruction: system.map(|text| SystemInstruction {
                parts: vec![Part::Text(text)],
            }),
            generation_config,
        };

        let response = self.call(TEXT_MODEL, &request).await?;
        let text = response.text().ok_or(AiError::EmptyContent)?;
        Ok(match format {
            ResponseFormat::Text => text.trim().to_string(),
            ResponseFormat::Json => strip_json_fences(&text).to_string(),
        })
    }
}

#[async_trait]
impl GenerativeAi for GeminiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        system: Option<&str>,
        format: ResponseFormat,
    ) -> Result<String, AiError> {
        self.call_text(vec![Part::Text(prompt)], system, format)
            .await
    }

    async fn generate_speech(
        &self,
        script: &str,
        voice: &VoiceConfig,
    ) -> Result<AudioBlob, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::Text(script)],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO"]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceSelection {
                        prebuilt_voice_config: PrebuiltVoice {
                            voice_name: &voice.voice_name,
                        },
                    },
                }),
                ..GenerationConfig::default()
            }),
        };

        let response = self.call(SPEECH_MODEL, &request).await?;
        let inline = response.inline_data().ok_or(AiError::EmptyContent)?;
        let bytes = BASE64.decode(inline.data.as_bytes())?;
        if bytes.is_empty() {
            return Err(AiError::EmptyContent);
        }
        Ok(AudioBlob {
            bytes: bytes.into(),
            content_type: inline.mime_type.clone(),
        })
    }

    async fn transcribe_audio(&self, audio: &[u8], mime_type: &str) -> Result<String, AiError> {
        let parts = vec![
            Part::InlineData {
                mime_type,
                data: BASE64.encode(audio),
            },
            Part::Text(prompts::TRANSCRIBE),
        ];
        self.call_text(parts, None, ResponseFormat::Text).await
    }

    async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, AiError> {
        let parts = vec![
            Part::InlineData {
                mime_type,
                data: BASE64.encode(image),
            },
            Part::Text(prompt),
        ];
        self.call_text(parts, None, ResponseFormat::Text).await
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

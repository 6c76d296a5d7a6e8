//! Costed AI actions.
//!
//! Every action follows the same gate: check the budget, call the model,
//! and charge only once the call has succeeded. A failed call costs nothing.

pub mod handlers;
pub mod narration;
pub mod wav;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assets::AssetCache;
use crate::genai::{prompts, AiError, GenerativeAi, ResponseFormat, VoiceConfig};
use crate::models::Profile;
use crate::quota::{Action, QuotaLedger};

pub use narration::{DeviceNarration, FallbackReason, Narration, NarrationRequest};

pub const DEFAULT_NARRATION_TIMEOUT: Duration = Duration::from_secs(45);

/// Shown when the model cannot be reached.
pub const CONNECTION_FALLBACK: &str =
    "connection error. stay calm, breathe, and try again in a moment.";

/// Outcome of a gated action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply<T> {
    Answered { answer: T },
    Depleted { message: String },
    Unavailable { message: String },
}

impl<T> Reply<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Reply::Answered { answer } => Reply::Answered { answer: f(answer) },
            Reply::Depleted { message } => Reply::Depleted { message },
            Reply::Unavailable { message } => Reply::Unavailable { message },
        }
    }
}

/// Mood and one-line insight extracted from a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub mood: String,
    pub insight: String,
}

impl Reflection {
    fn fallback() -> Self {
        Self {
            mood: "reflective".to_string(),
            insight: "outer order begins with inner order.".to_string(),
        }
    }
}

pub struct Companion {
    ledger: Arc<QuotaLedger>,
    cache: Arc<AssetCache>,
    ai: Arc<dyn GenerativeAi>,
    voice: VoiceConfig,
    narration_timeout: Duration,
}

impl Companion {
    pub fn new(
        ledger: Arc<QuotaLedger>,
        cache: Arc<AssetCache>,
        ai: Arc<dyn GenerativeAi>,
        narration_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            cache,
            ai,
            voice: VoiceConfig::default(),
            narration_timeout,
        }
    }

    async fn gated<T, F, Fut>(&self, action: Action, call: F) -> Reply<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AiError>>,
    {
        if !self.ledger.can_afford(action).await {
            debug!("Blocked {action}: energy depleted");
            return Reply::Depleted {
                message: self.ledger.depleted_message().to_string(),
            };
        }

        match call().await {
            Ok(answer) => {
                if !self.ledger.consume(action).await {
                    // Another request spent the budget while this one ran.
                    warn!("Served {action} but the budget was gone by completion");
                }
                Reply::Answered { answer }
            }
            Err(e) => {
                warn!("{action} failed: {e}");
                Reply::Unavailable {
                    message: CONNECTION_FALLBACK.to_string(),
                }
            }
        }
    }

    pub async fn chat(&self, message: &str, profile: &Profile) -> Reply<String> {
        let system = prompts::mentor_system(profile);
        self.gated(Action::TextChat, || {
            self.ai
                .generate_text(message, Some(system.as_str()), ResponseFormat::Text)
        })
        .await
    }

    pub async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
        question: Option<&str>,
    ) -> Reply<String> {
        let prompt = question.unwrap_or(prompts::VISION_DEFAULT);
        self.gated(Action::Vision, || {
            self.ai.analyze_image(image, mime_type, prompt)
        })
        .await
    }

    pub async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Reply<String> {
        self.gated(Action::LiveSession, || {
            self.ai.transcribe_audio(audio, mime_type)
        })
        .await
    }

    /// Distills a free-form statement into a one-line purpose, lowercased.
    pub async fn discover_ikigai(&self, input: &str) -> Reply<String> {
        let prompt = prompts::ikigai(input.trim());
        self.gated(Action::Ikigai, || {
            self.ai.generate_text(&prompt, None, ResponseFormat::Text)
        })
        .await
        .map(|text| text.trim().to_lowercase())
    }

    /// Mood and insight for a journal entry. A reply that is not the expected
    /// JSON still counts as answered, with a generic reflection.
    pub async fn reflect(&self, text: &str) -> Reply<Reflection> {
        let prompt = prompts::reflection(text);
        self.gated(Action::TextChat, || {
            self.ai.generate_text(&prompt, None, ResponseFormat::Json)
        })
        .await
        .map(|raw| {
            serde_json::from_str::<Reflection>(&raw).unwrap_or_else(|e| {
                warn!("Unparsable reflection, using fallback: {e}");
                Reflection::fallback()
            })
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assets::blob::testing::MemoryBlobStore;
    use crate::clock::testing::FixedClock;
    use crate::genai::mock::MockAi;
    use crate::storage::{LocalRepository, MemoryStore};

    pub struct Fixture {
        pub local: Arc<LocalRepository>,
        pub ledger: Arc<QuotaLedger>,
        pub cache: Arc<AssetCache>,
        pub ai: Arc<MockAi>,
        pub companion: Companion,
    }

    pub async fn fixture_with(ai: MockAi) -> Fixture {
        let local = Arc::new(LocalRepository::new(Arc::new(MemoryStore::new())));
        let clock = Arc::new(FixedClock::at(2026, 2, 10, 8));
        let ledger = Arc::new(QuotaLedger::new(local.clone(), clock.clone()));
        let cache = Arc::new(AssetCache::open(Arc::new(MemoryBlobStore::new()), clock, 1 << 20).await);
        let ai = Arc::new(ai);
        let companion = Companion::new(
            ledger.clone(),
            cache.clone(),
            ai.clone(),
            DEFAULT_NARRATION_TIMEOUT,
        );
        Fixture {
            local,
            ledger,
            cache,
            ai,
            companion,
        }
    }

    #[tokio::test]
    async fn test_chat_charges_after_success() {
        let f = fixture_with(MockAi::new().with_response("breathe")).await;
        let reply = f.companion.chat("hello", &Profile::default()).await;
        assert_eq!(
            reply,
            Reply::Answered {
                answer: "breathe".to_string()
            }
        );
        assert_eq!(f.ledger.get_energy().await, 98);
    }

    #[tokio::test]
    async fn test_failed_call_is_free() {
        let f = fixture_with(MockAi::new().with_available(false)).await;
        let reply = f.companion.chat("hello", &Profile::default()).await;
        assert_eq!(
            reply,
            Reply::Unavailable {
                message: CONNECTION_FALLBACK.to_string()
            }
        );
        assert_eq!(f.ledger.get_energy().await, 100);
    }

    #[tokio::test]
    async fn test_depleted_budget_skips_the_model() {
        let f = fixture_with(MockAi::new()).await;
        for _ in 0..3 {
            assert!(f.ledger.consume(Action::LiveSession).await);
        }
        // 10 left, vision costs 25.
        let reply = f.companion.analyze_image(b"img", "image/png", None).await;
        assert!(matches!(reply, Reply::Depleted { .. }));
        assert_eq!(f.ai.call_count(), 0);
        assert_eq!(f.ledger.get_energy().await, 10);
    }

    #[tokio::test]
    async fn test_vision_uses_default_prompt() {
        let f = fixture_with(MockAi::new()).await;
        f.companion.analyze_image(b"img", "image/png", None).await;
        assert_eq!(f.ai.last_prompt().as_deref(), Some(prompts::VISION_DEFAULT));
        assert_eq!(f.ledger.get_energy().await, 75);
    }

    #[tokio::test]
    async fn test_transcribe_costs_live_session() {
        let f = fixture_with(MockAi::new().with_response("hola")).await;
        let reply = f.companion.transcribe(b"audio", "audio/webm").await;
        assert!(matches!(reply, Reply::Answered { .. }));
        assert_eq!(f.ledger.get_energy().await, 70);
    }

    #[tokio::test]
    async fn test_ikigai_is_trimmed_and_lowercased() {
        let f = fixture_with(MockAi::new().with_response("  Build Order From Chaos.\n")).await;
        let reply = f.companion.discover_ikigai("i like fixing things").await;
        assert_eq!(
            reply,
            Reply::Answered {
                answer: "build order from chaos.".to_string()
            }
        );
        assert_eq!(f.ledger.get_energy().await, 90);
    }

    #[tokio::test]
    async fn test_reflect_parses_json() {
        let f = fixture_with(
            MockAi::new().with_response(r#"{"mood":"calm","insight":"control what you can."}"#),
        )
        .await;
        let reply = f.companion.reflect("long day").await;
        assert_eq!(
            reply,
            Reply::Answered {
                answer: Reflection {
                    mood: "calm".to_string(),
                    insight: "control what you can.".to_string(),
                }
            }
        );
    }

    #[tokio::test]
    async fn test_reflect_falls_back_on_malformed_json() {
        let f = fixture_with(MockAi::new().with_response("not json")).await;
        let reply = f.companion.reflect("long day").await;
        assert_eq!(
            reply,
            Reply::Answered {
                answer: Reflection::fallback()
            }
        );
    }

    #[tokio::test]
    async fn test_premium_is_never_blocked() {
        let f = fixture_with(MockAi::new()).await;
        f.local
            .store_profile(&Profile {
                is_premium: true,
                ..Profile::default()
            })
            .await
            .unwrap();
        for _ in 0..10 {
            let reply = f.companion.transcribe(b"a", "audio/webm").await;
            assert!(matches!(reply, Reply::Answered { .. }));
        }
        assert_eq!(f.ai.call_count(), 10);
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Costed, AI-backed actions. Costs share the unit space of the daily budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TextChat,
    Vision,
    LiveSession,
    NeuralTts,
    Ikigai,
}

#[derive(Debug, Error)]
#[error("Unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl Action {
    pub const ALL: [Action; 5] = [
        Action::TextChat,
        Action::Vision,
        Action::LiveSession,
        Action::NeuralTts,
        Action::Ikigai,
    ];

    pub fn cost(self) -> u32 {
        match self {
            Action::TextChat => 2,
            Action::Vision => 25,
            Action::LiveSession => 30,
            Action::NeuralTts => 15,
            Action::Ikigai => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::TextChat => "text_chat",
            Action::Vision => "vision",
            Action::LiveSession => "live_session",
            Action::NeuralTts => "neural_tts",
            Action::Ikigai => "ikigai",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

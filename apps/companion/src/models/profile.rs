use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tone {
    #[default]
    #[serde(rename = "directo")]
    Direct,
    #[serde(rename = "empático")]
    Empathetic,
    #[serde(rename = "motivador")]
    Motivating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Depth {
    #[serde(rename = "breve")]
    Brief,
    #[default]
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "profunda")]
    Deep,
}

/// User profile as cached locally and mirrored to `users/{uid}.profile`.
///
/// Every field has a default, so a stored profile written by an older client
/// loads with the missing fields filled in while present fields are kept
/// verbatim. Fields this version does not know about are carried in `extra`
/// and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub is_anon: bool,
    pub ikigai: String,
    pub ai_tone: Tone,
    pub ai_depth: Depth,
    pub spiritual_mode: bool,
    pub dark_mode: bool,
    pub notifications: bool,
    pub haptics: bool,
    pub cloud_sync: bool,
    pub performance_mode: bool,
    pub check_in_time: String,
    pub goals: Vec<String>,
    pub xp: u64,
    pub unlocked_achievements: BTreeSet<String>,
    pub is_premium: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_anon: false,
            ikigai: String::new(),
            ai_tone: Tone::default(),
            ai_depth: Depth::default(),
            spiritual_mode: false,
            dark_mode: true,
            notifications: true,
            haptics: true,
            cloud_sync: true,
            performance_mode: false,
            check_in_time: "20:00".to_string(),
            goals: Vec::new(),
            xp: 0,
            unlocked_achievements: BTreeSet::new(),
            is_premium: false,
            extra: Map::new(),
        }
    }
}

impl Profile {
    /// Decodes a stored profile field by field. A field that is null or of the
    /// wrong type keeps its default instead of making the whole profile
    /// unreadable; anything that is not an object decodes as the default.
    pub fn from_stored(stored: Value) -> Self {
        let Value::Object(stored) = stored else {
            return Self::default();
        };
        let Ok(Value::Object(mut merged)) = serde_json::to_value(Self::default()) else {
            return Self::default();
        };

        for (field, value) in stored {
            let previous = merged.insert(field.clone(), value);
            if serde_json::from_value::<Self>(Value::Object(merged.clone())).is_err() {
                match previous {
                    Some(previous) => merged.insert(field, previous),
                    None => merged.remove(&field),
                };
            }
        }

        serde_json::from_value(Value::Object(merged)).unwrap_or_default()
    }
}

use std::fmt;

use sha2::{Digest, Sha256};

/// Identity of a generated audio asset. Two requests with equal keys must be
/// satisfiable by the same bytes; bump `version` when the script or voice
/// pipeline changes so old entries stop matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioKey {
    pub content_id: String,
    pub locale: String,
    pub mode: String,
    pub version: u32,
}

impl AudioKey {
    pub fn new(content_id: &str, locale: &str, mode: &str, version: u32) -> Self {
        Self {
            content_id: content_id.to_string(),
            locale: locale.to_string(),
            mode: mode.to_string(),
            version,
        }
    }

    /// Keys a script by its content, for scripts without a stable id.
    pub fn for_script(script: &str, locale: &str, mode: &str, version: u32) -> Self {
        Self::new(&script_fingerprint(script), locale, mode, version)
    }
}

impl fmt::Display for AudioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_v{}",
            self.content_id, self.locale, self.mode, self.version
        )
    }
}

/// First 16 hex chars of the script's SHA-256.
pub fn script_fingerprint(script: &str) -> String {
    let digest = hex::encode(Sha256::digest(script.as_bytes()));
    digest[..16].to_string()
}

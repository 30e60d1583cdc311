use serde::{Deserialize, Serialize};

/// An animal character from the static catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Slug identity (e.g., "wise-owl")
    pub id: String,
    /// Display name, unique after case folding (e.g., "Wise Owl")
    pub name: String,
    pub species: String,
    /// Ordered, never empty
    pub traits: Vec<String>,
    pub base_story: String,
    pub image_url: String,
}

/// The unit every analysis path produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIAnalysisResult {
    /// Canonical catalog name of the matched character
    pub suggested_character: String,
    /// Always within `[0.0, 1.0]`
    pub confidence: f64,
    /// Never empty
    pub traits: Vec<String>,
    pub reasoning: String,
    pub personalized_story: String,
}

/// Caller-facing envelope composed from a result and its resolved character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub character: Character,
    pub story: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Descriptive signal used on the simulated path. Created per analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalitySignal {
    pub expression: String,
    pub energy: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// A raw upload as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub size_bytes: u64,
}

impl ImageUpload {
    /// Wrap raw bytes, taking the size from the buffer length.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            bytes,
            content_type: content_type.into(),
            size_bytes,
        }
    }
}

use crate::catalog::CharacterCatalog;
use crate::error::ParseError;
use crate::types::AIAnalysisResult;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Confidence used when the model omits the field or sends a non-number.
pub const DEFAULT_CONFIDENCE: f64 = 0.75;

/// Wire shape of the model's JSON. Every field is optional; the validator
/// decides what a missing value turns into.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    suggested_character: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    confidence: Option<f64>,
    traits: Option<Vec<String>>,
    reasoning: Option<String>,
    personalized_story: Option<String>,
}

/// Accept a JSON number or a numeric string. Anything else reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Clamp a model-supplied confidence into `[0.0, 1.0]`.
///
/// `None` and non-finite values become [`DEFAULT_CONFIDENCE`].
pub fn sanitize_confidence(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Parse cleaned JSON into a fully populated [`AIAnalysisResult`].
///
/// The suggested character is resolved case-insensitively against the
/// catalog. A name that does not resolve is replaced by the first catalog
/// entry and logged; it is never returned as-is. Missing or empty traits
/// are filled from the resolved character.
///
/// # Errors
///
/// - [`ParseError::Malformed`] if `json_text` is not a JSON object of the
///   expected shape
/// - [`ParseError::EmptyCatalog`] if there is nothing to resolve against
pub fn validate(json_text: &str, catalog: &CharacterCatalog) -> Result<AIAnalysisResult, ParseError> {
    let raw: RawAnalysis = serde_json::from_str(json_text)?;

    let suggested = raw.suggested_character.unwrap_or_default();
    let character = match catalog.find_by_name(&suggested) {
        Some(character) => character,
        None => {
            let fallback = catalog.first().ok_or(ParseError::EmptyCatalog)?;
            tracing::warn!(
                suggested = %suggested,
                substitute = %fallback.name,
                "Model suggested an unknown character, substituting first catalog entry"
            );
            fallback
        }
    };

    let traits = match raw.traits {
        Some(traits) if !traits.is_empty() => traits,
        _ => character.traits.clone(),
    };

    Ok(AIAnalysisResult {
        suggested_character: character.name.clone(),
        confidence: sanitize_confidence(raw.confidence),
        traits,
        reasoning: raw.reasoning.unwrap_or_default(),
        personalized_story: raw.personalized_story.unwrap_or_default(),
    })
}

//! Offline personality matching.
//!
//! Used whenever the real model is unavailable: a [`PersonalitySignal`] is
//! drawn with bounded randomness, mapped to a catalog character by a small
//! rule table and rendered into a story by template substitution.

use crate::catalog::CharacterCatalog;
use crate::types::{AIAnalysisResult, Character, PersonalitySignal};
use rand::Rng;

pub const EXPRESSIONS: [&str; 5] = [
    "warm and approachable smile",
    "thoughtful and contemplative expression",
    "confident and determined gaze",
    "playful and energetic demeanor",
    "calm and serene presence",
];

pub const ENERGIES: [&str; 5] = [
    "vibrant and dynamic energy",
    "steady and grounded presence",
    "gentle and nurturing aura",
    "intense and focused determination",
    "balanced and harmonious disposition",
];

/// Lower bound of a simulated confidence.
pub const SIGNAL_CONFIDENCE_BASE: f64 = 0.75;
/// Width of the simulated confidence band.
pub const SIGNAL_CONFIDENCE_SPREAD: f64 = 0.2;

/// Archetype rules: expression keyword, preferred character id, and the
/// catalog index used when that id is missing. First match wins.
const ARCHETYPE_RULES: [(&str, &str, usize); 4] = [
    ("thoughtful", "wise-owl", 0),
    ("playful", "playful-otter", 1),
    ("confident", "noble-lion", 2),
    ("warm", "gentle-deer", 4),
];

/// Draw a signal: one expression, one energy, and a confidence in
/// `[0.75, 0.95)`.
pub fn generate_signal<R: Rng>(rng: &mut R) -> PersonalitySignal {
    let expression = EXPRESSIONS[rng.random_range(0..EXPRESSIONS.len())];
    let energy = ENERGIES[rng.random_range(0..ENERGIES.len())];
    let confidence = SIGNAL_CONFIDENCE_BASE + rng.random::<f64>() * SIGNAL_CONFIDENCE_SPREAD;

    PersonalitySignal {
        expression: expression.to_string(),
        energy: energy.to_string(),
        confidence,
        reasoning: format!(
            "I notice your {} combined with {}. These visual cues suggest a personality that resonates strongly with specific animal characteristics.",
            expression, energy
        ),
    }
}

/// Pick the character matching a signal's expression.
///
/// Returns `None` only when the catalog is empty. Expressions matching no
/// rule get a uniformly random character.
pub fn match_character<'a, R: Rng>(
    signal: &PersonalitySignal,
    catalog: &'a CharacterCatalog,
    rng: &mut R,
) -> Option<&'a Character> {
    if catalog.is_empty() {
        return None;
    }

    let expression = signal.expression.to_lowercase();
    for (keyword, id, fallback_index) in ARCHETYPE_RULES {
        if expression.contains(keyword) {
            tracing::debug!(keyword, id, "Matched archetype rule");
            return catalog
                .find_by_id(id)
                .or_else(|| catalog.get(fallback_index))
                .or_else(|| catalog.first());
        }
    }

    let index = rng.random_range(0..catalog.len());
    tracing::debug!(index, "No archetype rule matched, picking at random");
    catalog.get(index)
}

/// The verb phrase describing how a character carries itself.
pub fn character_action(id: &str) -> &'static str {
    match id {
        "wise-owl" => "observes the world with keen insight",
        "playful-otter" => "brings joy to every moment",
        "noble-lion" => "leads with courage and strength",
        "curious-fox" => "explores with clever ingenuity",
        "gentle-deer" => "moves through life with grace",
        "mighty-dragon" => "soars above limitations",
        "loyal-wolf" => "protects those they care about",
        "free-eagle" => "embraces boundless freedom",
        "creative-peacock" => "expresses unique beauty",
        "steady-turtle" => "perseveres with patience",
        _ => "embodies their true nature",
    }
}

/// One-line summary of what a character's people care about.
pub fn personality_insight(id: &str) -> &'static str {
    match id {
        "wise-owl" => "values deep understanding and thoughtful analysis",
        "playful-otter" => "finds delight in connection and shared adventure",
        "noble-lion" => "stands up for others and takes the lead when it matters",
        "curious-fox" => "thrives on puzzles and unexpected solutions",
        "gentle-deer" => "senses what others feel and answers with kindness",
        "mighty-dragon" => "chases big goals with unwavering passion",
        "loyal-wolf" => "puts the people they love first",
        "free-eagle" => "needs room to think big and chart their own path",
        "creative-peacock" => "turns everyday moments into something beautiful",
        "steady-turtle" => "trusts patience and persistence over shortcuts",
        _ => "lives authentically",
    }
}

/// Render the personalized story for a character and signal.
pub fn compose_story(character: &Character, signal: &PersonalitySignal) -> String {
    let first = character
        .traits
        .first()
        .map(String::as_str)
        .unwrap_or("authentic");
    let second = character.traits.get(1).map(String::as_str).unwrap_or(first);
    let leading_traits = character
        .traits
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{base}\n\n\
         Looking at your photo, I can see your {expression}, which perfectly mirrors the essence of the {name}. \
         Your {energy} tells a story of someone who embodies the {leading_traits} qualities that define this magnificent creature.\n\n\
         Just as the {name} {action}, you too carry these traits within you. \
         Your unique combination of {first} nature, combined with your evident {second} spirit, \
         creates a personality that's both distinctive and remarkable. \
         At heart, you are someone who {insight}. \
         This connection goes beyond mere coincidence; it's a reflection of your authentic self.",
        base = character.base_story,
        expression = signal.expression,
        name = character.name,
        energy = signal.energy,
        leading_traits = leading_traits,
        action = character_action(&character.id),
        first = first,
        second = second,
        insight = personality_insight(&character.id),
    )
}

/// Assemble the full simulated result for a matched character.
pub fn simulated_result(character: &Character, signal: &PersonalitySignal) -> AIAnalysisResult {
    AIAnalysisResult {
        suggested_character: character.name.clone(),
        confidence: signal.confidence.clamp(0.0, 1.0),
        traits: character.traits.clone(),
        reasoning: signal.reasoning.clone(),
        personalized_story: compose_story(character, signal),
    }
}

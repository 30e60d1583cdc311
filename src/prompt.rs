use crate::catalog::CharacterCatalog;
use std::path::Path;

/// Placeholder in prompt templates replaced by the character list.
pub const CHARACTERS_PLACEHOLDER: &str = "{characters}";

const RESPONSE_SHAPE: &str = r#"{
  "suggestedCharacter": "Animal Name",
  "confidence": 0.75,
  "traits": ["trait1", "trait2", "trait3", "trait4"],
  "reasoning": "Based on their expression and features",
  "personalizedStory": "A personalized story about their character"
}"#;

/// One line per character: `Name - trait, trait, trait`.
pub fn character_list(catalog: &CharacterCatalog) -> String {
    catalog
        .all()
        .iter()
        .map(|c| {
            let traits = c.traits.iter().take(3).cloned().collect::<Vec<_>>();
            format!("{} - {}", c.name, traits.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The built-in instructional prompt for the given catalog.
pub fn default_prompt(catalog: &CharacterCatalog) -> String {
    format!(
        "Analyze the person in this image and match them to an animal character:\n\n{}\n\nReturn JSON only:\n{}",
        character_list(catalog),
        RESPONSE_SHAPE
    )
}

/// Substitute the character list into a template.
pub fn render(template: &str, catalog: &CharacterCatalog) -> String {
    template.replace(CHARACTERS_PLACEHOLDER, &character_list(catalog))
}

/// Load a prompt template, falling back to [`default_prompt`].
///
/// A missing, unreadable or blank file is logged and replaced by the default.
pub fn load_prompt(path: Option<&Path>, catalog: &CharacterCatalog) -> String {
    let Some(path) = path else {
        return default_prompt(catalog);
    };

    match std::fs::read_to_string(path) {
        Ok(template) if !template.trim().is_empty() => {
            tracing::debug!(path = %path.display(), "Loaded prompt template");
            render(&template, catalog)
        }
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Prompt template is empty, using default prompt");
            default_prompt(catalog)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read prompt template, using default prompt");
            default_prompt(catalog)
        }
    }
}

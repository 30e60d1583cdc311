//! Read-only character catalog.
//!
//! Loaded once at startup and shared behind an `Arc`; nothing mutates it
//! afterwards, so concurrent readers need no synchronization.

use crate::error::CatalogError;
use crate::types::Character;
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../data/characters.json");

/// Ordered, validated list of [`Character`] records.
#[derive(Debug, Clone, Default)]
pub struct CharacterCatalog {
    characters: Vec<Character>,
}

impl CharacterCatalog {
    /// Validate and wrap a list of characters.
    ///
    /// Rejects duplicate ids, names that collide after case folding, and
    /// characters without traits.
    pub fn new(characters: Vec<Character>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();

        for character in &characters {
            if !ids.insert(character.id.as_str()) {
                return Err(CatalogError::DuplicateId(character.id.clone()));
            }
            if !names.insert(fold(&character.name)) {
                return Err(CatalogError::DuplicateName(character.name.clone()));
            }
            if character.traits.is_empty() {
                return Err(CatalogError::MissingTraits(character.id.clone()));
            }
        }

        Ok(Self { characters })
    }

    /// A catalog with no characters. Analyses fall through to the demo default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The ten characters bundled with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse a JSON array of characters.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let characters: Vec<Character> = serde_json::from_str(json)?;
        Self::new(characters)
    }

    /// Read and parse a catalog file.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Load a catalog file, degrading to an empty catalog on failure.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(catalog) => {
                tracing::info!(count = catalog.len(), path = %path.display(), "Loaded characters");
                catalog
            }
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "Failed to load characters");
                Self::empty()
            }
        }
    }

    pub fn all(&self) -> &[Character] {
        &self.characters
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn first(&self) -> Option<&Character> {
        self.characters.first()
    }

    pub fn get(&self, index: usize) -> Option<&Character> {
        self.characters.get(index)
    }

    /// Exact lookup by slug.
    pub fn find_by_id(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Case-insensitive lookup by display name. Surrounding whitespace is ignored.
    pub fn find_by_name(&self, name: &str) -> Option<&Character> {
        let wanted = fold(name);
        self.characters.iter().find(|c| fold(&c.name) == wanted)
    }
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(id: &str, name: &str) -> Character {
        Character {
            id: id.to_string(),
            name: name.to_string(),
            species: "Test".to_string(),
            traits: vec!["trait1".to_string(), "trait2".to_string()],
            base_story: format!("{} story", name),
            image_url: format!("/images/{}.jpg", id),
        }
    }

    #[test]
    fn builtin_has_ten_characters() {
        let catalog = CharacterCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.first().unwrap().id, "wise-owl");
        assert!(catalog.find_by_id("steady-turtle").is_some());
        assert!(catalog.all().iter().all(|c| c.traits.len() >= 2));
    }

    #[test]
    fn find_by_name_ignores_case() {
        let catalog = CharacterCatalog::builtin().unwrap();
        assert_eq!(catalog.find_by_name("noble lion").unwrap().id, "noble-lion");
        assert_eq!(catalog.find_by_name("  PLAYFUL OTTER ").unwrap().id, "playful-otter");
        assert!(catalog.find_by_name("Sneaky Cat").is_none());
    }

    #[test]
    fn find_by_id_is_exact() {
        let catalog = CharacterCatalog::builtin().unwrap();
        assert!(catalog.find_by_id("Wise-Owl").is_none());
        assert!(catalog.find_by_id("wise-owl").is_some());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = CharacterCatalog::new(vec![character("a", "A"), character("a", "B")]);
        assert!(matches!(result, Err(CatalogError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn rejects_names_colliding_after_case_fold() {
        let result =
            CharacterCatalog::new(vec![character("a", "Wise Owl"), character("b", "WISE OWL")]);
        assert!(matches!(result, Err(CatalogError::DuplicateName(_))));
    }

    #[test]
    fn rejects_missing_traits() {
        let mut bare = character("a", "A");
        bare.traits.clear();
        let result = CharacterCatalog::new(vec![bare]);
        assert!(matches!(result, Err(CatalogError::MissingTraits(_))));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            CharacterCatalog::from_json("not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn load_or_empty_degrades() {
        let catalog = CharacterCatalog::load_or_empty(Path::new("/nonexistent/characters.json"));
        assert!(catalog.is_empty());
        assert!(catalog.first().is_none());
    }
}

//! # animal-analyzer
//!
//! Matches a photo of a person to an animal character and writes them a
//! short personalized story.
//!
//! ## Features
//!
//! - **Image preprocessing**: validates uploads (JPEG/PNG, 10 MiB) and
//!   normalizes them to a base64 JPEG no larger than 1024 px
//! - **Vision model analysis** through the Anthropic Messages API, behind a
//!   swappable [`VisionAdapter`] trait
//! - **Robust extraction** of the JSON object from free-form model output,
//!   repairing literal `\n` sequences that leak between tokens
//! - **Always answers**: any model failure falls back to an offline
//!   simulated match, and an empty catalog falls back to a fixed demo result
//! - **Reproducible** simulated analyses with a configured seed
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use animal_analyzer::{AnalysisOrchestrator, AnalyzerConfig, CharacterCatalog, ImageUpload};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::from_env();
//!     let catalog = Arc::new(CharacterCatalog::builtin()?);
//!     let analyzer = AnalysisOrchestrator::new(config, catalog);
//!
//!     let bytes = std::fs::read("selfie.jpg")?;
//!     let response = analyzer
//!         .analyze_upload(&ImageUpload::new(bytes, "image/jpeg"))
//!         .await?;
//!
//!     println!("You are a {} ({:.0}%)", response.character.name, response.confidence * 100.0);
//!     println!("{}", response.story);
//!     Ok(())
//! }
//! ```
//!
//! ## Extraction
//!
//! ```rust
//! use animal_analyzer::{extract_json, validate, CharacterCatalog};
//!
//! let raw = "Sure! {\"suggestedCharacter\": \"wise owl\",\\n \"confidence\": 1.4}";
//! let catalog = CharacterCatalog::builtin().unwrap();
//! let result = validate(&extract_json(raw), &catalog).unwrap();
//!
//! assert_eq!(result.suggested_character, "Wise Owl");
//! assert_eq!(result.confidence, 1.0);
//! assert_eq!(result.traits[0], "analytical");
//! ```

pub mod adapter;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod parser;
pub mod preprocess;
pub mod prompt;
pub mod types;
pub mod validator;

// Re-export main types at crate root
pub use adapter::{AnthropicAdapter, VisionAdapter};
pub use cache::{fingerprint, ResultCache};
pub use catalog::CharacterCatalog;
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder};
pub use error::{
    AdapterError, AnalyzerError, CatalogError, ParseError, RealCallError, Result, ValidationError,
};
pub use matcher::{compose_story, generate_signal, match_character};
pub use orchestrator::{demo_default, AnalysisOrchestrator, AnalysisOrchestratorBuilder, AnalysisOutcome};
pub use parser::extract_json;
pub use prompt::{default_prompt, load_prompt};
pub use types::{AIAnalysisResult, AnalysisResponse, Character, ImageUpload, PersonalitySignal};
pub use validator::{sanitize_confidence, validate};

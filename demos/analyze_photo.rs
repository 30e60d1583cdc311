use animal_analyzer::{AnalysisOrchestrator, AnalyzerConfig, CharacterCatalog, ImageUpload};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let image_path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: analyze_photo <image_path> [characters.json]");
        std::process::exit(1);
    });

    let catalog = match std::env::args().nth(2) {
        Some(path) => CharacterCatalog::load_or_empty(Path::new(&path)),
        None => CharacterCatalog::builtin()?,
    };

    let content_type = match Path::new(&image_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    };

    let config = AnalyzerConfig::from_env();
    let analyzer = AnalysisOrchestrator::new(config, Arc::new(catalog));

    let bytes = std::fs::read(&image_path)?;
    println!("Analyzing {} ({} bytes)...", image_path, bytes.len());

    let response = analyzer
        .analyze_upload(&ImageUpload::new(bytes, content_type))
        .await?;

    println!();
    println!(
        "You are a {} ({}), confidence {:.0}%",
        response.character.name,
        response.character.species,
        response.confidence * 100.0
    );
    println!("Traits: {}", response.character.traits.join(", "));
    println!();
    println!("{}", response.reasoning);
    println!();
    println!("{}", response.story);

    Ok(())
}

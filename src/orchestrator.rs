use crate::adapter::{AnthropicAdapter, VisionAdapter};
use crate::cache::{fingerprint, ResultCache};
use crate::catalog::CharacterCatalog;
use crate::config::AnalyzerConfig;
use crate::error::{AdapterError, RealCallError, Result};
use crate::matcher;
use crate::parser::extract_json;
use crate::preprocess;
use crate::prompt::load_prompt;
use crate::types::{AIAnalysisResult, AnalysisResponse, Character, ImageUpload, PersonalitySignal};
use crate::validator::validate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;

/// Which path produced a result.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The model answered and the answer validated.
    RealCall(AIAnalysisResult),
    /// Offline match. `fell_back` is true when a real call was attempted
    /// and failed.
    Simulated {
        result: AIAnalysisResult,
        signal: PersonalitySignal,
        fell_back: bool,
    },
    /// Fixed result used when nothing else can produce a character.
    DemoDefault(AIAnalysisResult),
}

impl AnalysisOutcome {
    pub fn result(&self) -> &AIAnalysisResult {
        match self {
            AnalysisOutcome::RealCall(result)
            | AnalysisOutcome::Simulated { result, .. }
            | AnalysisOutcome::DemoDefault(result) => result,
        }
    }

    pub fn into_result(self) -> AIAnalysisResult {
        match self {
            AnalysisOutcome::RealCall(result)
            | AnalysisOutcome::Simulated { result, .. }
            | AnalysisOutcome::DemoDefault(result) => result,
        }
    }

    /// Short label for logs.
    pub fn source(&self) -> &'static str {
        match self {
            AnalysisOutcome::RealCall(_) => "real",
            AnalysisOutcome::Simulated { fell_back: true, .. } => "fallback",
            AnalysisOutcome::Simulated { .. } => "simulated",
            AnalysisOutcome::DemoDefault(_) => "demo",
        }
    }
}

/// The fixed last-resort result.
pub fn demo_default() -> AIAnalysisResult {
    AIAnalysisResult {
        suggested_character: "Wise Owl".to_string(),
        confidence: 0.85,
        traits: ["analytical", "observant", "thoughtful", "knowledgeable"]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        reasoning: "Demo: Based on analytical expression, the Wise Owl represents your thoughtful nature."
            .to_string(),
        personalized_story:
            "Demo: Like the wise owl who sees in the darkness, you possess deep insight and understanding."
                .to_string(),
    }
}

/// Runs the analysis fallback chain: real call, then simulation, then the
/// demo default.
///
/// Holds no per-request state; share one instance behind an `Arc` and call
/// it concurrently.
pub struct AnalysisOrchestrator {
    config: AnalyzerConfig,
    catalog: Arc<CharacterCatalog>,
    adapter: Option<Arc<dyn VisionAdapter>>,
    prompt: String,
    cache: ResultCache,
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("model", &self.adapter.as_ref().map(|a| a.model_name()))
            .field("characters", &self.catalog.len())
            .field("cached", &self.cache.len())
            .field("seed", &self.config.seed)
            .finish()
    }
}

impl AnalysisOrchestrator {
    /// Orchestrator with the default adapter and prompt.
    pub fn new(config: AnalyzerConfig, catalog: Arc<CharacterCatalog>) -> Self {
        Self::builder(config).catalog(catalog).build()
    }

    pub fn builder(config: AnalyzerConfig) -> AnalysisOrchestratorBuilder {
        AnalysisOrchestratorBuilder::new(config)
    }

    pub fn catalog(&self) -> &CharacterCatalog {
        &self.catalog
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// True when requests will attempt the real model first.
    pub fn real_api_enabled(&self) -> bool {
        self.adapter.is_some()
    }

    /// Run the chain for one preprocessed image and report which path won.
    pub async fn run(&self, image_b64: &str) -> AnalysisOutcome {
        let started = Instant::now();

        let fell_back = match &self.adapter {
            Some(adapter) => match self.real_call(adapter.as_ref(), image_b64).await {
                Ok(result) => {
                    let outcome = AnalysisOutcome::RealCall(result);
                    self.log_completion(&outcome, started);
                    return outcome;
                }
                Err(e) => {
                    tracing::warn!(
                        model = adapter.model_name(),
                        error = %e,
                        "Real analysis failed, falling back to simulation"
                    );
                    true
                }
            },
            None => false,
        };

        let outcome = self.simulate(fell_back).await;
        self.log_completion(&outcome, started);
        outcome
    }

    /// Run the chain and return only the result.
    pub async fn analyze(&self, image_b64: &str) -> AIAnalysisResult {
        self.run(image_b64).await.into_result()
    }

    /// Validate an upload, analyze it and build the caller-facing envelope.
    ///
    /// # Errors
    ///
    /// Only image validation fails; every analysis problem degrades to a
    /// fallback result.
    pub async fn analyze_upload(&self, upload: &ImageUpload) -> Result<AnalysisResponse> {
        let image_b64 =
            preprocess::process(&upload.bytes, &upload.content_type, upload.size_bytes)?;
        let result = self.analyze(&image_b64).await;
        Ok(self.respond(result))
    }

    /// Compose the envelope for a result, resolving its character.
    pub fn respond(&self, result: AIAnalysisResult) -> AnalysisResponse {
        let character = match self.catalog.find_by_name(&result.suggested_character) {
            Some(character) => character.clone(),
            None => match self.catalog.first() {
                Some(substitute) => {
                    tracing::warn!(
                        suggested = %result.suggested_character,
                        substitute = %substitute.name,
                        "Result names an unknown character, substituting first catalog entry"
                    );
                    substitute.clone()
                }
                None => {
                    tracing::debug!(
                        suggested = %result.suggested_character,
                        "Catalog is empty, synthesizing character"
                    );
                    synthesize_character(&result)
                }
            },
        };

        AnalysisResponse {
            character,
            story: result.personalized_story,
            confidence: result.confidence,
            reasoning: result.reasoning,
        }
    }

    async fn real_call(
        &self,
        adapter: &dyn VisionAdapter,
        image_b64: &str,
    ) -> std::result::Result<AIAnalysisResult, RealCallError> {
        let key = fingerprint(image_b64);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(fingerprint = %key, "Result cache hit");
            return Ok(cached);
        }

        let raw = tokio::time::timeout(self.config.timeout, adapter.analyze(image_b64, &self.prompt))
            .await
            .map_err(|_| AdapterError::Timeout(self.config.timeout))??;

        tracing::debug!(response_len = raw.len(), "Extracting analysis JSON");
        let result = validate(&extract_json(&raw), &self.catalog)?;

        self.cache.insert(key, result.clone());
        Ok(result)
    }

    async fn simulate(&self, fell_back: bool) -> AnalysisOutcome {
        if !self.config.simulated_delay.is_zero() {
            tokio::time::sleep(self.config.simulated_delay).await;
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let signal = matcher::generate_signal(&mut rng);
        match matcher::match_character(&signal, &self.catalog, &mut rng) {
            Some(character) => {
                tracing::debug!(
                    expression = %signal.expression,
                    character = %character.name,
                    "Simulated match"
                );
                AnalysisOutcome::Simulated {
                    result: matcher::simulated_result(character, &signal),
                    signal,
                    fell_back,
                }
            }
            None => {
                tracing::warn!("Character catalog is empty, returning demo default");
                AnalysisOutcome::DemoDefault(demo_default())
            }
        }
    }

    fn log_completion(&self, outcome: &AnalysisOutcome, started: Instant) {
        let result = outcome.result();
        tracing::info!(
            source = outcome.source(),
            character = %result.suggested_character,
            confidence = result.confidence,
            duration_ms = started.elapsed().as_millis() as u64,
            "Analysis completed"
        );
    }
}

/// Character for a result whose name is not in the catalog.
fn synthesize_character(result: &AIAnalysisResult) -> Character {
    Character {
        id: result.suggested_character.to_lowercase().replace(' ', "-"),
        name: result.suggested_character.clone(),
        species: String::new(),
        traits: result.traits.clone(),
        base_story: String::new(),
        image_url: String::new(),
    }
}

/// Builder for [`AnalysisOrchestrator`].
pub struct AnalysisOrchestratorBuilder {
    config: AnalyzerConfig,
    catalog: Option<Arc<CharacterCatalog>>,
    adapter: Option<Arc<dyn VisionAdapter>>,
    prompt: Option<String>,
}

impl AnalysisOrchestratorBuilder {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            catalog: None,
            adapter: None,
            prompt: None,
        }
    }

    /// Character catalog. Defaults to an empty catalog.
    pub fn catalog(mut self, catalog: Arc<CharacterCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the Anthropic adapter. Only used when the config enables the
    /// real API.
    pub fn adapter(mut self, adapter: Arc<dyn VisionAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Override the prompt instead of loading it from `config.prompt_path`.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn build(self) -> AnalysisOrchestrator {
        let catalog = self.catalog.unwrap_or_default();
        let prompt = self
            .prompt
            .unwrap_or_else(|| load_prompt(self.config.prompt_path.as_deref(), &catalog));

        let adapter = if self.config.real_api_enabled() {
            let adapter: Arc<dyn VisionAdapter> = match self.adapter {
                Some(adapter) => adapter,
                None => Arc::new(AnthropicAdapter::new(&self.config)),
            };
            tracing::info!(model = adapter.model_name(), "Real model analysis enabled");
            Some(adapter)
        } else {
            if self.config.use_real_api {
                tracing::warn!("Real API requested without a usable key, using simulated analysis");
            } else {
                tracing::info!("Real API disabled, using simulated analysis");
            }
            None
        };

        AnalysisOrchestrator {
            cache: ResultCache::new(self.config.cache_capacity, self.config.cache_ttl),
            config: self.config,
            catalog,
            adapter,
            prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalyzerError, ValidationError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ── Mock adapters ──

    struct FixedAdapter {
        reply: std::result::Result<String, u16>,
        calls: AtomicUsize,
    }

    impl FixedAdapter {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn http(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionAdapter for FixedAdapter {
        async fn analyze(&self, _image_b64: &str, _prompt: &str) -> std::result::Result<String, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(AdapterError::Http {
                    status: *status,
                    body: "boom".to_string(),
                }),
            }
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct SlowAdapter;

    #[async_trait]
    impl VisionAdapter for SlowAdapter {
        async fn analyze(&self, _image_b64: &str, _prompt: &str) -> std::result::Result<String, AdapterError> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(r#"{"suggestedCharacter": "Noble Lion", "confidence": 0.9}"#.to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    const LION_REPLY: &str = "Here you go:\n{\"suggestedCharacter\": \"noble lion\",\\n \"confidence\": 0.93, \"traits\": null, \"reasoning\": \"Strong gaze\", \"personalizedStory\": \"A leader.\"}";

    fn enabled() -> AnalyzerConfig {
        AnalyzerConfig::builder()
            .use_real_api(true)
            .api_key("sk-test")
            .simulated_delay(Duration::ZERO)
            .seed(7)
            .build()
    }

    fn disabled() -> AnalyzerConfig {
        AnalyzerConfig::builder()
            .simulated_delay(Duration::ZERO)
            .seed(7)
            .build()
    }

    fn builtin() -> Arc<CharacterCatalog> {
        Arc::new(CharacterCatalog::builtin().unwrap())
    }

    fn with_adapter(config: AnalyzerConfig, adapter: Arc<dyn VisionAdapter>) -> AnalysisOrchestrator {
        AnalysisOrchestrator::builder(config)
            .catalog(builtin())
            .adapter(adapter)
            .build()
    }

    // ── Real path ──

    #[tokio::test]
    async fn real_call_result_is_validated() {
        let adapter = FixedAdapter::ok(LION_REPLY);
        let orchestrator = with_adapter(enabled(), adapter.clone());

        let outcome = orchestrator.run("AAAA").await;
        let AnalysisOutcome::RealCall(result) = outcome else {
            panic!("expected real call");
        };
        assert_eq!(result.suggested_character, "Noble Lion");
        assert_eq!(result.confidence, 0.93);
        assert_eq!(result.traits[0], "confident");
        assert_eq!(result.reasoning, "Strong gaze");
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn repeated_image_hits_cache() {
        let adapter = FixedAdapter::ok(LION_REPLY);
        let orchestrator = with_adapter(enabled(), adapter.clone());

        let first = orchestrator.analyze("AAAA").await;
        let second = orchestrator.analyze("AAAA").await;
        assert_eq!(first, second);
        assert_eq!(adapter.calls(), 1);

        orchestrator.analyze("BBBB").await;
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn http_failure_falls_back() {
        let orchestrator = with_adapter(enabled(), FixedAdapter::http(500));
        let outcome = orchestrator.run("AAAA").await;
        assert!(matches!(outcome, AnalysisOutcome::Simulated { fell_back: true, .. }));
        assert_eq!(outcome.source(), "fallback");
        let result = outcome.result();
        assert!((0.75..=0.95).contains(&result.confidence));
    }

    #[tokio::test]
    async fn garbage_reply_falls_back_and_is_not_cached() {
        let adapter = FixedAdapter::ok("I cannot analyze this image.");
        let orchestrator = with_adapter(enabled(), adapter.clone());

        assert!(matches!(
            orchestrator.run("AAAA").await,
            AnalysisOutcome::Simulated { fell_back: true, .. }
        ));
        orchestrator.run("AAAA").await;
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_adapter_times_out_into_fallback() {
        let config = AnalyzerConfig::builder()
            .use_real_api(true)
            .api_key("sk-test")
            .timeout(Duration::from_secs(5))
            .build();
        let orchestrator = with_adapter(config, Arc::new(SlowAdapter));

        let started = tokio::time::Instant::now();
        let outcome = orchestrator.run("AAAA").await;
        let elapsed = started.elapsed();

        assert!(matches!(outcome, AnalysisOutcome::Simulated { fell_back: true, .. }));
        // 5 s timeout plus the 2 s simulated delay, never the adapter's 120 s.
        assert!(elapsed >= Duration::from_secs(7));
        assert!(elapsed < Duration::from_secs(120));
    }

    // ── Simulated path ──

    #[tokio::test]
    async fn disabled_never_calls_adapter() {
        let adapter = FixedAdapter::ok(LION_REPLY);
        let orchestrator = with_adapter(disabled(), adapter.clone());
        assert!(!orchestrator.real_api_enabled());

        let outcome = orchestrator.run("AAAA").await;
        assert!(matches!(outcome, AnalysisOutcome::Simulated { fell_back: false, .. }));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn placeholder_key_counts_as_disabled() {
        let config = AnalyzerConfig::builder()
            .use_real_api(true)
            .api_key(crate::config::PLACEHOLDER_API_KEY)
            .simulated_delay(Duration::ZERO)
            .build();
        let adapter = FixedAdapter::ok(LION_REPLY);
        let orchestrator = with_adapter(config, adapter.clone());
        orchestrator.run("AAAA").await;
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn seeded_simulation_is_reproducible() {
        let orchestrator = AnalysisOrchestrator::new(disabled(), builtin());
        let AnalysisOutcome::Simulated { result, signal, .. } = orchestrator.run("AAAA").await else {
            panic!("expected simulated outcome");
        };

        assert_eq!(orchestrator.analyze("AAAA").await, result);
        assert!((0.75..=0.95).contains(&result.confidence));
        assert!(result.reasoning.contains(&signal.expression));
        assert!(result.personalized_story.contains(&signal.energy));
        assert!(orchestrator.catalog().find_by_name(&result.suggested_character).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_delay_is_applied() {
        let config = AnalyzerConfig::builder().seed(1).build();
        let orchestrator = AnalysisOrchestrator::new(config, builtin());

        let started = tokio::time::Instant::now();
        orchestrator.run("AAAA").await;
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn empty_catalog_returns_demo_default() {
        let orchestrator = AnalysisOrchestrator::new(disabled(), Arc::new(CharacterCatalog::empty()));
        let outcome = orchestrator.run("AAAA").await;
        assert_eq!(outcome, AnalysisOutcome::DemoDefault(demo_default()));
        assert_eq!(outcome.result().confidence, 0.85);
    }

    #[tokio::test]
    async fn empty_catalog_real_reply_falls_to_demo_default() {
        let orchestrator = AnalysisOrchestrator::builder(enabled())
            .catalog(Arc::new(CharacterCatalog::empty()))
            .adapter(FixedAdapter::ok(LION_REPLY))
            .build();
        assert!(matches!(orchestrator.run("AAAA").await, AnalysisOutcome::DemoDefault(_)));
    }

    // ── Upload envelope ──

    fn tiny_jpeg() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([200, 100, 50]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, image::ImageFormat::Jpeg)
            .unwrap();
        cursor.into_inner()
    }

    #[tokio::test]
    async fn upload_builds_envelope() {
        let orchestrator = with_adapter(enabled(), FixedAdapter::ok(LION_REPLY));
        let response = orchestrator
            .analyze_upload(&ImageUpload::new(tiny_jpeg(), "image/jpeg"))
            .await
            .unwrap();

        assert_eq!(response.character.id, "noble-lion");
        assert_eq!(response.story, "A leader.");
        assert_eq!(response.confidence, 0.93);
        assert_eq!(response.reasoning, "Strong gaze");
    }

    #[tokio::test]
    async fn invalid_upload_is_rejected_without_analysis() {
        let adapter = FixedAdapter::ok(LION_REPLY);
        let orchestrator = with_adapter(enabled(), adapter.clone());

        let err = orchestrator
            .analyze_upload(&ImageUpload::new(Vec::new(), "image/jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Validation(ValidationError::Empty)));

        let err = orchestrator
            .analyze_upload(&ImageUpload::new(b"GIF89a".to_vec(), "image/gif"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Validation(ValidationError::UnsupportedFormat(_))));
        assert_eq!(adapter.calls(), 0);
    }

    #[test]
    fn respond_synthesizes_character_for_empty_catalog() {
        let orchestrator = AnalysisOrchestrator::new(disabled(), Arc::new(CharacterCatalog::empty()));
        let response = orchestrator.respond(demo_default());
        assert_eq!(response.character.id, "wise-owl");
        assert_eq!(response.character.name, "Wise Owl");
        assert_eq!(response.character.traits.len(), 4);
    }

    #[derive(Clone)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn respond_uses_first_entry_for_unknown_name() {
        let orchestrator = AnalysisOrchestrator::new(disabled(), builtin());
        let mut result = demo_default();
        result.suggested_character = "Sneaky Cat".to_string();

        let logs = CapturedLogs(Arc::new(std::sync::Mutex::new(Vec::new())));
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let response = tracing::subscriber::with_default(subscriber, || orchestrator.respond(result));

        assert_eq!(response.character.id, "wise-owl");
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "{}", output);
        assert!(output.contains("Sneaky Cat"), "{}", output);
        assert!(output.contains("substitute=Wise Owl"), "{}", output);
    }

    #[test]
    fn respond_resolves_known_name_case_insensitively() {
        let orchestrator = AnalysisOrchestrator::new(disabled(), builtin());
        let mut result = demo_default();
        result.suggested_character = "curious FOX".to_string();
        assert_eq!(orchestrator.respond(result).character.id, "curious-fox");
    }
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Key value shipped in sample configs. Treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "your-api-key-here";

pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Configuration for the analysis pipeline.
///
/// Use [`AnalyzerConfig::builder()`] for explicit construction or
/// [`AnalyzerConfig::from_env()`] to read the process environment. The value
/// is handed to the orchestrator at construction; nothing reads global state
/// afterwards.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Whether the real model API may be called at all.
    pub use_real_api: bool,

    /// API credential. Empty or [`PLACEHOLDER_API_KEY`] disables the real path.
    pub api_key: String,

    /// Model identifier sent with each request.
    pub model: String,

    /// Maximum tokens the model may generate.
    pub max_tokens: u32,

    /// API root, without the `/v1/messages` suffix.
    pub base_url: String,

    /// Upper bound on a single outbound call, connect included.
    pub timeout: Duration,

    /// Artificial latency on the simulated path.
    pub simulated_delay: Duration,

    /// Fixed RNG seed for reproducible simulated analyses.
    pub seed: Option<u64>,

    /// Optional prompt template file overriding the built-in prompt.
    pub prompt_path: Option<PathBuf>,

    /// Maximum cached real-call results (0 disables the cache).
    pub cache_capacity: usize,

    /// Lifetime of a cached result.
    pub cache_ttl: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            use_real_api: false,
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            simulated_delay: Duration::from_secs(2),
            seed: None,
            prompt_path: None,
            cache_capacity: 1000,
            cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl AnalyzerConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::default()
    }

    /// Read configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `CLAUDE_USE_REAL_API` | `false` |
    /// | `ANTHROPIC_API_KEY` / `CLAUDE_API_KEY` | empty |
    /// | `ANTHROPIC_MODEL` | [`DEFAULT_MODEL`] |
    /// | `ANTHROPIC_MAX_TOKENS` | [`DEFAULT_MAX_TOKENS`] |
    /// | `ANTHROPIC_BASE_URL` | [`DEFAULT_BASE_URL`] |
    /// | `ANALYZER_TIMEOUT_SECS` | `30` |
    /// | `ANALYZER_PROMPT_PATH` | none |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let api_key = lookup("ANTHROPIC_API_KEY")
            .or_else(|| lookup("CLAUDE_API_KEY"))
            .unwrap_or_default();

        Self {
            use_real_api: parse_or(&lookup, "CLAUDE_USE_REAL_API", defaults.use_real_api),
            api_key,
            model: lookup("ANTHROPIC_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.model),
            max_tokens: parse_or(&lookup, "ANTHROPIC_MAX_TOKENS", defaults.max_tokens),
            base_url: lookup("ANTHROPIC_BASE_URL")
                .filter(|u| !u.trim().is_empty())
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(parse_nonzero_or(
                &lookup,
                "ANALYZER_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
            prompt_path: lookup("ANALYZER_PROMPT_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            ..defaults
        }
    }

    /// True when the real API is requested and a usable credential exists.
    pub fn real_api_enabled(&self) -> bool {
        let key = self.api_key.trim();
        self.use_real_api && !key.is_empty() && key != PLACEHOLDER_API_KEY
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, ?default, "Ignoring unparseable config value");
                default
            }
        },
        None => default,
    }
}

/// Like [`parse_or`], but zero is rejected as well.
fn parse_nonzero_or<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default) {
        0 => {
            tracing::warn!(key, value = 0, default, "Ignoring zero config value");
            default
        }
        value => value,
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn use_real_api(mut self, enabled: bool) -> Self {
        self.config.use_real_api = enabled;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = tokens;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn simulated_delay(mut self, delay: Duration) -> Self {
        self.config.simulated_delay = delay;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.prompt_path = Some(path.into());
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Build the final [`AnalyzerConfig`].
    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}

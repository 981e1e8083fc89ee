//! The three pipeline stages and their shared plumbing.
//!
//! - [`formatter`] — raw journal sections → curated Markdown, cache-aware,
//!   bounded concurrency.
//! - [`auditor`] — original vs. curated → sentinel-checked difference report.
//! - [`advisor`] — curated history → ranked five-category action plan.
//!
//! Stages share a [`PipelineConfig`] and the [`chat_with_retry`] wrapper that
//! retries transient API failures with backoff. Each stage is a single
//! stateless request/response exchange; the stages only compose sequentially
//! because each consumes the previous one's output.

pub mod advisor;
pub mod auditor;
pub mod formatter;

pub use advisor::{ActionPlan, EvidenceTier, PlanCategory, Recommendation, advise};
pub use auditor::{AuditOutcome, Discrepancy, audit, parse_audit_output, render_report};
pub use formatter::{CuratedJournal, curate_journal, format_section};

use crate::api::retry::{ErrorClass, RetryConfig, classify_error};
use crate::api::usage::UsageTotals;
use crate::{ChatCompletion, ChatRequest, OpenRouterClient, SECTION_MAX_TOKENS};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Configuration shared by all pipeline stages.
///
/// Construct with [`PipelineConfig::new`] (or [`from_env`](Self::from_env) to
/// honor the `MODEL_ID` / `MAX_WORKERS` environment variables) and chain
/// `with_*` builder methods for overrides.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model identifier (e.g. `"anthropic/claude-sonnet-4"`).
    pub model: String,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Sampling temperature. Curation and auditing want determinism, so the
    /// default is 0.0.
    pub temperature: f32,
    /// Maximum concurrent section formatting calls.
    pub max_workers: usize,
    /// Retry configuration for transient API failures.
    pub retry: RetryConfig,
    /// Directory for the per-section cache files.
    pub data_dir: PathBuf,
}

impl PipelineConfig {
    /// Create a config with the given model and all other fields at their
    /// defaults.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Create a config from the environment: `MODEL_ID` for the model (falls
    /// back to [`DEFAULT_MODEL`](crate::DEFAULT_MODEL)) and `MAX_WORKERS` for
    /// the concurrency bound.
    pub fn from_env() -> Self {
        let mut config = match std::env::var("MODEL_ID") {
            Ok(model) if !model.is_empty() => Self::new(model),
            _ => Self::default(),
        };
        if let Ok(workers) = std::env::var("MAX_WORKERS") {
            match workers.parse::<usize>() {
                Ok(n) if n > 0 => config.max_workers = n,
                _ => warn!("ignoring invalid MAX_WORKERS value '{workers}'"),
            }
        }
        config
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the concurrent formatting bound. Clamped to at least 1.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Enable automatic retries for transient API failures (429, 5xx,
    /// network errors). Pass `0` to fail immediately.
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry = RetryConfig::with_retries(max_retries);
        self
    }

    /// Set the cache data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: crate::DEFAULT_MODEL.to_string(),
            max_tokens: SECTION_MAX_TOKENS,
            temperature: 0.0,
            max_workers: 4,
            retry: RetryConfig::default(),
            data_dir: PathBuf::from("output"),
        }
    }
}

/// Send a chat request, retrying transient failures per the retry config.
///
/// Permanent failures (400/401-class, unparseable responses) and exhausted
/// retries surface as `Err` immediately. Records token usage for every
/// successful call.
pub async fn chat_with_retry(
    client: &OpenRouterClient,
    body: &ChatRequest,
    retry: &RetryConfig,
    totals: &mut UsageTotals,
) -> Result<ChatCompletion, String> {
    let mut attempt = 0u32;
    loop {
        match client.chat(body).await {
            Ok(completion) => {
                totals.record(completion.usage.as_ref());
                return Ok(completion);
            }
            Err(e)
                if attempt < retry.max_retries
                    && classify_error(&e) == ErrorClass::Transient =>
            {
                let delay = retry.backoff_delay(attempt);
                debug!(
                    "transient API error (attempt {}/{}), retrying in {:?}: {e}",
                    attempt + 1,
                    retry.max_retries,
                    delay,
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Build the standard (system, user) request every stage sends.
pub(crate) fn stage_request(config: &PipelineConfig, system: &str, user: String) -> ChatRequest {
    ChatRequest {
        model: Some(config.model.clone()),
        messages: vec![crate::Message::system(system), crate::Message::user(user)],
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        ..Default::default()
    }
}

//! Vision-model interaction: send one page image, get SVG text back.
//!
//! Two layers live here:
//!
//! * [`VectorizationService`] — a single call to the external service. The
//!   production implementation, [`LlmVectorizer`], goes through an
//!   `edgequake-llm` provider so any vision-capable backend works (OpenRouter,
//!   OpenAI, Anthropic, Gemini, …).
//! * [`VectorizationClient`] — wraps a service with the retry policy and
//!   turns exhausted retries into a [`PageError`] instead of an `Err` that
//!   could unwind the pipeline.
//!
//! ## Retry Strategy
//!
//! Transport errors, empty completions and malformed replies are all retried
//! with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`). With the
//! 2 s default and three attempts the waits are 2 s then 4 s.

use crate::config::BatchConfig;
use crate::error::{BatchError, PageError, VectorizeError};
use crate::pipeline::encode;
use crate::prompts::VECTORIZE_PROMPT;
use crate::retry::{retry_with_backoff, RetryState};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LLMResponse, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One call to the page-vectorization service.
#[async_trait]
pub trait VectorizationService: Send + Sync {
    /// Return the service's raw answer for the page image at `raster`.
    async fn vectorize(&self, raster: &Path) -> Result<String, VectorizeError>;
}

/// Vectorization through a vision LLM.
pub struct LlmVectorizer {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    options: CompletionOptions,
}

impl LlmVectorizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &BatchConfig) -> Self {
        Self {
            provider,
            prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| VECTORIZE_PROMPT.to_string()),
            options: build_options(config),
        }
    }
}

#[async_trait]
impl VectorizationService for LlmVectorizer {
    /// ## Message Layout
    ///
    /// 1. **System message** — the vectorization prompt
    /// 2. **User message** — the page PNG as a base64 image attachment
    async fn vectorize(&self, raster: &Path) -> Result<String, VectorizeError> {
        let image = encode::encode_page_file(raster)
            .await
            .map_err(|e| VectorizeError::Transport(format!("reading {}: {}", raster.display(), e)))?;

        let messages = vec![
            ChatMessage::system(&self.prompt),
            ChatMessage::user_with_images("", vec![image]),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| VectorizeError::Transport(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            raster.display(),
            response.prompt_tokens,
            response.completion_tokens
        );
        completion_text(response)
    }
}

/// Accept a reply only when it is a text completion.
///
/// A reply cut short by the token limit is kept: the sanitizer handles a
/// missing closing tag.
fn completion_text(response: LLMResponse) -> Result<String, VectorizeError> {
    if !response.tool_calls.is_empty() {
        return Err(VectorizeError::Malformed(format!(
            "{} tool call(s) instead of text",
            response.tool_calls.len()
        )));
    }
    if response.finish_reason.as_deref() == Some("content_filter") {
        return Err(VectorizeError::Malformed("blocked by content filter".into()));
    }
    Ok(response.content)
}

/// Build `CompletionOptions` from the batch config.
fn build_options(config: &BatchConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Result of vectorizing one page, successful or not.
#[derive(Debug, Clone)]
pub struct VectorizeOutcome {
    pub result: Result<String, PageError>,
    pub retry: RetryState,
}

/// Type-erased backoff, for holders that should not be generic over it.
pub type BoxedBackoff = Box<dyn Fn(u32) -> Duration + Send + Sync>;

/// A [`VectorizationService`] plus the retry policy.
pub struct VectorizationClient<B = BoxedBackoff> {
    service: Arc<dyn VectorizationService>,
    max_attempts: u32,
    backoff: B,
    attempt_timeout: Option<Duration>,
}

impl<B> VectorizationClient<B>
where
    B: Fn(u32) -> Duration + Send + Sync,
{
    pub fn new(service: Arc<dyn VectorizationService>, max_attempts: u32, backoff: B) -> Self {
        Self {
            service,
            max_attempts,
            backoff,
            attempt_timeout: None,
        }
    }

    /// Bound each attempt by a wall-clock timeout; a timed-out attempt counts as failed.
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Vectorize one page.
    ///
    /// Never returns `Err`: exhausting the attempt budget produces an outcome
    /// whose `result` is [`PageError::VectorizeFailed`].
    pub async fn vectorize_page(&self, doc: &str, page_num: usize, raster: &Path) -> VectorizeOutcome {
        let max_attempts = self.max_attempts;
        let (result, retry) = retry_with_backoff(max_attempts, &self.backoff, |attempt| async move {
            debug!("{doc} page {page_num}: vectorize attempt {attempt}/{max_attempts}");
            let res = self.attempt(raster).await;
            if let Err(ref e) = res {
                warn!(
                    "{doc} page {page_num}: attempt {attempt}/{max_attempts} failed — {e}"
                );
            }
            res
        })
        .await;

        let result = result.map_err(|e| PageError::VectorizeFailed {
            page: page_num,
            attempts: retry.attempts,
            detail: e.to_string(),
        });
        VectorizeOutcome { result, retry }
    }

    async fn attempt(&self, raster: &Path) -> Result<String, VectorizeError> {
        let call = self.service.vectorize(raster);
        let text = match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| VectorizeError::Timeout {
                    secs: limit.as_secs(),
                })??,
            None => call.await?,
        };
        if text.trim().is_empty() {
            return Err(VectorizeError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Resolve the vision provider once at startup, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **OpenRouter** when `OPENROUTER_API_KEY` is present, since the default
///    model id is an OpenRouter route.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &BatchConfig) -> Result<Arc<dyn LLMProvider>, BatchError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, &config.model);
    }

    if std::env::var("OPENROUTER_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_vision_provider("openrouter", &config.model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| BatchError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set OPENROUTER_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_vision_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, BatchError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        BatchError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times with the given error, then returns `body`.
    struct Flaky {
        failures: u32,
        error: VectorizeError,
        body: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl VectorizationService for Flaky {
        async fn vectorize(&self, _raster: &Path) -> Result<String, VectorizeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(self.body.to_string())
            }
        }
    }

    fn flaky(failures: u32, body: &'static str) -> Arc<Flaky> {
        Arc::new(Flaky {
            failures,
            error: VectorizeError::Transport("HTTP 503".into()),
            body,
            calls: AtomicU32::new(0),
        })
    }

    fn no_delay(_: u32) -> Duration {
        Duration::ZERO
    }

    #[test]
    fn build_options_defaults() {
        let config = BatchConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(16384));
    }

    #[tokio::test]
    async fn success_after_transient_failures() {
        let svc = flaky(2, "<svg/>");
        let client = VectorizationClient::new(svc.clone(), 3, no_delay);
        let out = client.vectorize_page("doc", 3, Path::new("p.png")).await;
        assert_eq!(out.result.unwrap(), "<svg/>");
        assert_eq!(out.retry.attempts, 3);
        assert_eq!(svc.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_attempts_become_page_error() {
        let svc = flaky(10, "<svg/>");
        let client = VectorizationClient::new(svc.clone(), 3, no_delay);
        let out = client.vectorize_page("doc", 2, Path::new("p.png")).await;
        match out.result {
            Err(PageError::VectorizeFailed { page, attempts, detail }) => {
                assert_eq!(page, 2);
                assert_eq!(attempts, 3);
                assert!(detail.contains("503"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(svc.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_body_is_retried() {
        let svc = flaky(0, "   \n");
        let client = VectorizationClient::new(svc.clone(), 2, no_delay);
        let out = client.vectorize_page("doc", 1, Path::new("p.png")).await;
        assert!(out.result.is_err());
        assert_eq!(out.retry.attempts, 2);
        assert_eq!(
            out.retry.last_error.as_deref(),
            Some("service returned an empty response")
        );
    }

    struct Slow;

    #[async_trait]
    impl VectorizationService for Slow {
        async fn vectorize(&self, _raster: &Path) -> Result<String, VectorizeError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("<svg/>".into())
        }
    }

    #[tokio::test]
    async fn attempt_timeout_counts_as_failure() {
        let client = VectorizationClient::new(Arc::new(Slow), 2, no_delay)
            .with_attempt_timeout(Some(Duration::from_millis(10)));
        let out = client.vectorize_page("doc", 1, Path::new("p.png")).await;
        assert!(out.result.is_err());
        assert_eq!(out.retry.attempts, 2);
    }

    #[test]
    fn non_text_replies_are_malformed() {
        let filtered = LLMResponse::new("", "m").with_finish_reason("content_filter");
        assert!(matches!(completion_text(filtered), Err(VectorizeError::Malformed(_))));

        let tool = edgequake_llm::ToolCall {
            id: "call_1".into(),
            call_type: "function".into(),
            function: edgequake_llm::FunctionCall {
                name: "draw".into(),
                arguments: "{}".into(),
            },
        };
        let tooled = LLMResponse::new("", "m").with_tool_calls(vec![tool]);
        assert_eq!(
            completion_text(tooled),
            Err(VectorizeError::Malformed("1 tool call(s) instead of text".into()))
        );
    }

    #[test]
    fn truncated_reply_is_still_text() {
        let cut = LLMResponse::new("<svg><rect", "m").with_finish_reason("length");
        assert_eq!(completion_text(cut).unwrap(), "<svg><rect");
        let done = LLMResponse::new("<svg/>", "m").with_finish_reason("stop");
        assert_eq!(completion_text(done).unwrap(), "<svg/>");
    }
}

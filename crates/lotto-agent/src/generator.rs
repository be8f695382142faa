use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use lotto_core::config::AiConfig;
use lotto_core::{format, LotteryFormat};
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::prompt;
use crate::provider::{ChatRequest, LlmProvider, ProviderError};
use crate::validate::{extract_marked, validate, ValidationError};

/// Upper bound on combinations per batch request.
pub const MAX_BATCH: usize = 10;

/// Retry and sampling knobs for [`NumberGenerator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    /// Attempt `n` (0-based) waits `n * backoff_unit` before sending.
    pub backoff_unit: Duration,
    pub temperature: f32,
    pub batch_temperature: f32,
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::from(&AiConfig::default())
    }
}

impl From<&AiConfig> for GeneratorConfig {
    fn from(cfg: &AiConfig) -> Self {
        Self {
            max_retries: cfg.max_retries.max(1),
            attempt_timeout: Duration::from_secs(cfg.timeout_secs),
            backoff_unit: Duration::from_secs(1),
            temperature: cfg.temperature,
            batch_temperature: cfg.batch_temperature,
            max_tokens: 512,
        }
    }
}

/// Produces validated number combinations through a text-generation backend.
///
/// Stateless apart from its configuration; nothing is persisted here.
pub struct NumberGenerator {
    provider: Arc<dyn LlmProvider>,
    config: GeneratorConfig,
}

impl NumberGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GeneratorConfig) -> Self {
        Self { provider, config }
    }

    /// Generate one combination for the lottery `code` using `model`.
    pub async fn generate(&self, code: &str, model: &str) -> Result<String, GenerationError> {
        let format = lookup(code)?;
        let mut last_error: Option<ProviderError> = None;
        let mut last_rejection: Option<ValidationError> = None;
        let attempts = self.config.max_retries.max(1);

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.backoff_unit * attempt).await;
            }

            let req = self.request(format, model, prompt::single_prompt(format), self.config.temperature);
            match self.send(&req).await {
                Ok(text) => match first_valid(format, &text) {
                    Ok(combination) => {
                        debug!(lottery = %code, attempt, %combination, "combination generated");
                        return Ok(combination);
                    }
                    Err(e) => {
                        warn!(lottery = %code, attempt, reason = %e, "discarding invalid generation");
                        last_rejection = Some(e);
                    }
                },
                Err(e) => {
                    warn!(
                        lottery = %code,
                        provider = %self.provider.name(),
                        attempt,
                        err = %e,
                        "generation request failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(GenerationError::GenerationFailed {
            attempts,
            last_error,
            last_rejection,
        })
    }

    /// Generate up to `count` distinct combinations.
    ///
    /// One batch request is tried first; any shortfall is topped up with
    /// single-combination calls. If a top-up call fails, whatever was
    /// collected so far is returned, or the error when nothing was.
    pub async fn generate_batch(
        &self,
        code: &str,
        model: &str,
        count: usize,
    ) -> Result<Vec<String>, GenerationError> {
        if !(1..=MAX_BATCH).contains(&count) {
            return Err(GenerationError::InvalidBatchSize {
                count,
                max: MAX_BATCH,
            });
        }
        let format = lookup(code)?;

        let mut combinations: Vec<String> = Vec::with_capacity(count);
        let mut seen: HashSet<String> = HashSet::new();

        let req = self.request(
            format,
            model,
            prompt::batch_prompt(format, count),
            self.config.batch_temperature,
        );
        match self.send(&req).await {
            Ok(text) => {
                for candidate in extract_marked(&text) {
                    if combinations.len() == count {
                        break;
                    }
                    match validate(format, candidate) {
                        Ok(c) if seen.insert(c.clone()) => combinations.push(c),
                        Ok(c) => debug!(lottery = %code, combination = %c, "duplicate in batch"),
                        Err(e) => debug!(lottery = %code, reason = %e, "invalid combination in batch"),
                    }
                }
            }
            Err(e) => warn!(lottery = %code, err = %e, "batch request failed, topping up singly"),
        }
        info!(lottery = %code, requested = count, accepted = combinations.len(), "batch response processed");

        // Bounded so a backend stuck on one answer cannot loop forever.
        let mut budget = count * self.config.max_retries.max(1) as usize;
        while combinations.len() < count && budget > 0 {
            budget -= 1;
            match self.generate(code, model).await {
                Ok(c) => {
                    if seen.insert(c.clone()) {
                        combinations.push(c);
                    }
                }
                Err(e) if combinations.is_empty() => return Err(e),
                Err(e) => {
                    warn!(lottery = %code, err = %e, collected = combinations.len(), "top-up failed, returning partial batch");
                    break;
                }
            }
        }

        if combinations.is_empty() {
            return Err(GenerationError::GenerationFailed {
                attempts: self.config.max_retries.max(1),
                last_error: None,
                last_rejection: None,
            });
        }
        Ok(combinations)
    }

    fn request(&self, format: &LotteryFormat, model: &str, user: String, temperature: f32) -> ChatRequest {
        let mut req = ChatRequest::single_turn(model, prompt::system_prompt(format), user);
        req.max_tokens = self.config.max_tokens;
        req.temperature = Some(temperature);
        req
    }

    async fn send(&self, req: &ChatRequest) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.config.attempt_timeout, self.provider.send(req)).await {
            Ok(resp) => resp.map(|r| r.content),
            Err(_) => Err(ProviderError::Timeout(self.config.attempt_timeout.as_secs())),
        }
    }
}

fn lookup(code: &str) -> Result<&'static LotteryFormat, GenerationError> {
    format::lookup(code).ok_or_else(|| GenerationError::UnsupportedFormat {
        code: code.to_string(),
    })
}

/// The first marked span must validate; extra spans are ignored.
fn first_valid(format: &LotteryFormat, text: &str) -> Result<String, ValidationError> {
    let marked = extract_marked(text);
    let candidate = marked.first().ok_or(ValidationError::MissingMarker)?;
    validate(format, candidate)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::provider::ChatResponse;

    struct AlwaysFail;

    #[async_trait]
    impl LlmProvider for AlwaysFail {
        fn name(&self) -> &str {
            "always-fail"
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            Err(ProviderError::Unavailable("intentional failure".to_string()))
        }
    }

    /// Replies with scripted texts in order, repeating the last one.
    struct Scripted {
        replies: Vec<&'static str>,
        calls: AtomicUsize,
        temperatures: Mutex<Vec<Option<f32>>>,
    }

    impl Scripted {
        fn new(replies: Vec<&'static str>) -> Self {
            Self {
                replies,
                calls: AtomicUsize::new(0),
                temperatures: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.temperatures.lock().unwrap().push(req.temperature);
            let text = self.replies[n.min(self.replies.len() - 1)];
            Ok(ChatResponse {
                content: text.to_string(),
                model: req.model.clone(),
                tokens_in: 1,
                tokens_out: 1,
                stop_reason: "stop".to_string(),
            })
        }
    }

    struct Hangs;

    #[async_trait]
    impl LlmProvider for Hangs {
        fn name(&self) -> &str {
            "hangs"
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(ProviderError::Unavailable("unreachable".to_string()))
        }
    }

    fn fast_config(max_retries: u32) -> GeneratorConfig {
        GeneratorConfig {
            max_retries,
            attempt_timeout: Duration::from_secs(5),
            backoff_unit: Duration::ZERO,
            ..GeneratorConfig::default()
        }
    }

    fn generator(provider: Arc<dyn LlmProvider>, max_retries: u32) -> NumberGenerator {
        NumberGenerator::new(provider, fast_config(max_retries))
    }

    #[tokio::test]
    async fn retries_past_invalid_output() {
        let provider = Arc::new(Scripted::new(vec![
            "sure! 01,02,03,04,05+01,02",
            "<NUMBER>01,02,03,04,40+01,02</NUMBER>",
            "<NUMBER>03,05,18,27,34+08,11</NUMBER>",
        ]));
        let gen = generator(provider.clone(), 3);

        let combination = gen.generate("tc_dlt", "gpt-test").await.unwrap();
        assert_eq!(combination, "03,05,18,27,34+08,11");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts_and_last_error() {
        let gen = generator(Arc::new(AlwaysFail), 3);
        match gen.generate("fc_ssq", "gpt-test").await {
            Err(GenerationError::GenerationFailed {
                attempts,
                last_error: Some(ProviderError::Unavailable(_)),
                last_rejection: None,
            }) => assert_eq!(attempts, 3),
            other => panic!("expected GenerationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhaustion_on_invalid_output_keeps_last_rejection() {
        let provider = Arc::new(Scripted::new(vec![
            "no marker at all",
            "<NUMBER>05,03,18,27,34+08,11</NUMBER>",
        ]));
        let gen = generator(provider.clone(), 2);
        match gen.generate("tc_dlt", "gpt-test").await {
            Err(GenerationError::GenerationFailed {
                attempts: 2,
                last_error: None,
                last_rejection: Some(ValidationError::Order { group }),
            }) => assert_eq!(group, crate::validate::Group::Main),
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_format_is_rejected_without_calls() {
        let provider = Arc::new(Scripted::new(vec!["<NUMBER>01+01</NUMBER>"]));
        let gen = generator(provider.clone(), 3);
        assert!(matches!(
            gen.generate("pick3", "gpt-test").await,
            Err(GenerationError::UnsupportedFormat { .. })
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_is_bounded_by_timeout() {
        let gen = generator(Arc::new(Hangs), 2);
        match gen.generate("fc_ssq", "gpt-test").await {
            Err(GenerationError::GenerationFailed {
                attempts: 2,
                last_error: Some(ProviderError::Timeout(5)),
                ..
            }) => {}
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_dedupes_and_tops_up() {
        let provider = Arc::new(Scripted::new(vec![
            "<NUMBER>03,05,18,27,34+08,11</NUMBER>\n\
             <NUMBER>03,05,18,27,34+08,11</NUMBER>\n\
             <NUMBER>01,02,03,04,99+01,02</NUMBER>",
            "<NUMBER>03,05,18,27,34+08,11</NUMBER>",
            "<NUMBER>01,09,12,20,33+02,07</NUMBER>",
        ]));
        let gen = generator(provider.clone(), 3);

        let batch = gen.generate_batch("tc_dlt", "gpt-test", 2).await.unwrap();
        assert_eq!(batch, vec!["03,05,18,27,34+08,11", "01,09,12,20,33+02,07"]);
        assert_eq!(provider.calls(), 3);

        let temps = provider.temperatures.lock().unwrap();
        assert_eq!(temps[0], Some(0.9));
        assert_eq!(temps[1], Some(0.7));
    }

    #[tokio::test]
    async fn batch_returns_partial_on_top_up_failure() {
        let provider = Arc::new(Scripted::new(vec![
            "<NUMBER>03,05,18,27,34+08,11</NUMBER>",
            "no numbers today",
        ]));
        let gen = generator(provider, 2);

        let batch = gen.generate_batch("tc_dlt", "gpt-test", 3).await.unwrap();
        assert_eq!(batch, vec!["03,05,18,27,34+08,11"]);
    }

    #[tokio::test]
    async fn batch_propagates_error_when_empty() {
        let gen = generator(Arc::new(AlwaysFail), 2);
        assert!(matches!(
            gen.generate_batch("fc_ssq", "gpt-test", 2).await,
            Err(GenerationError::GenerationFailed { .. })
        ));
        assert!(matches!(
            gen.generate_batch("fc_ssq", "gpt-test", 11).await,
            Err(GenerationError::InvalidBatchSize { count: 11, .. })
        ));
    }
}

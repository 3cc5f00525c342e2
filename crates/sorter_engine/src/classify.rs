use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;
use sorter_core::{CategorySet, ClassificationResult, MAX_TAGS};
use sorter_logging::{sorter_debug, sorter_trace, sorter_warn};

use crate::parse::{parse_reply, ParseBranch};
use crate::provider::ActiveProvider;
use crate::selector::ProviderSelector;
use crate::types::{map_reqwest_error, ClassifyError, FailureKind};

#[derive(Debug, Clone)]
pub struct ClassifySettings {
    /// Hard ceiling on attempts per item, including the first.
    pub max_attempts: u32,
    /// Backoff before retry `n` is `backoff_step * n`, clamped to `[backoff_floor, backoff_cap]`.
    pub backoff_step: Duration,
    pub backoff_floor: Duration,
    pub backoff_cap: Duration,
    pub request_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ClassifySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
            backoff_floor: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            temperature: 0.1,
            max_tokens: 200,
        }
    }
}

impl ClassifySettings {
    /// Wait before the attempt that follows failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let wanted = self.backoff_step.saturating_mul(attempt);
        let cap = self.backoff_cap.max(self.backoff_floor);
        wanted.clamp(self.backoff_floor, cap)
    }
}

/// Everything known about one classification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub result: ClassificationResult,
    pub attempts: u32,
    pub provider: Option<String>,
    /// Parsing strategy that produced the result; `None` if no reply arrived.
    pub branch: Option<ParseBranch>,
    /// Why the result degraded to `Other/[]`, if it did.
    pub error: Option<ClassifyError>,
}

impl Classification {
    fn degraded(error: ClassifyError, attempts: u32, provider: Option<String>) -> Self {
        Self {
            result: ClassificationResult::other(),
            attempts,
            provider,
            branch: None,
            error: Some(error),
        }
    }
}

/// Seam between the pipeline and the oracle.
///
/// Implementations never fail outward: every failure becomes `Other/[]` with
/// the reason in [`Classification::error`].
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, title: &str, content: &str) -> Classification;
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Classifier backed by the selector's active chat-completion provider.
#[derive(Debug, Clone)]
pub struct ClassificationClient {
    selector: Arc<ProviderSelector>,
    categories: CategorySet,
    settings: ClassifySettings,
}

impl ClassificationClient {
    pub fn new(
        selector: Arc<ProviderSelector>,
        categories: CategorySet,
        settings: ClassifySettings,
    ) -> Self {
        Self {
            selector,
            categories,
            settings,
        }
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    fn system_prompt(&self) -> String {
        format!(
            "Classify the document into exactly one of these categories: {}. \
             Also give up to {MAX_TAGS} short keyword tags. \
             Reply with a single JSON object and nothing else: \
             {{\"category\": \"<one category>\", \"tags\": [\"<tag>\", ...]}}",
            self.categories.names().join(", ")
        )
    }

    fn request_body(&self, provider: &ActiveProvider, title: &str, content: &str) -> serde_json::Value {
        let user = if content.trim().is_empty() {
            format!("Title: {title}")
        } else {
            format!("Title: {title}\n\nContent:\n{content}")
        };
        json!({
            "model": provider.model(),
            "messages": [
                {"role": "system", "content": self.system_prompt()},
                {"role": "user", "content": user},
            ],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        })
    }

    async fn attempt(
        &self,
        provider: &ActiveProvider,
        body: &serde_json::Value,
        attempt: u32,
    ) -> Result<String, ClassifyError> {
        let started = Instant::now();
        let request_bytes = body.to_string().len();
        let response = provider
            .client()
            .post(provider.endpoint().clone())
            .timeout(self.settings.request_timeout)
            .json(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                let err = map_reqwest_error(err);
                sorter_debug!(
                    "classify attempt={} provider={} request_bytes={} error={} elapsed_ms={}",
                    attempt,
                    provider.id(),
                    request_bytes,
                    err,
                    started.elapsed().as_millis()
                );
                return Err(err);
            }
        };

        let status = response.status();
        sorter_debug!(
            "classify attempt={} provider={} request_bytes={} status={} elapsed_ms={}",
            attempt,
            provider.id(),
            request_bytes,
            status.as_u16(),
            started.elapsed().as_millis()
        );
        if !status.is_success() {
            return Err(ClassifyError::new(
                FailureKind::from_status(status.as_u16()),
                status.to_string(),
            ));
        }

        let text = response.text().await.map_err(map_reqwest_error)?;
        let completion: Completion = serde_json::from_str(&text)
            .map_err(|err| ClassifyError::new(FailureKind::MalformedResponse, err.to_string()))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ClassifyError::new(FailureKind::MalformedResponse, "no choices"))
    }
}

#[async_trait::async_trait]
impl Classifier for ClassificationClient {
    async fn classify(&self, title: &str, content: &str) -> Classification {
        // Retries stay on this provider even if an operator switches meanwhile.
        let Some(provider) = self.selector.active() else {
            return Classification::degraded(
                ClassifyError::new(FailureKind::NoActiveProvider, "no provider selected"),
                0,
                None,
            );
        };
        let provider_id = Some(provider.id().to_string());
        let body = self.request_body(&provider, title, content);
        let max_attempts = self.settings.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.attempt(&provider, &body, attempt).await {
                Ok(reply) => {
                    sorter_trace!("classify reply_chars={}", reply.chars().count());
                    let parsed = parse_reply(&reply, &self.categories);
                    let error = (parsed.branch == ParseBranch::Unmatched).then(|| {
                        ClassifyError::new(FailureKind::Unparseable, truncate_for_log(&reply))
                    });
                    return Classification {
                        result: parsed.result,
                        attempts: attempt,
                        provider: provider_id,
                        branch: Some(parsed.branch),
                        error,
                    };
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let wait = self.settings.backoff(attempt);
                    sorter_warn!(
                        "classify attempt {}/{} for {:?} failed ({}); retrying in {:?}",
                        attempt,
                        max_attempts,
                        title,
                        err,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    sorter_warn!(
                        "classify {:?} gave up after {} attempt(s): {}",
                        title,
                        attempt,
                        err
                    );
                    return Classification::degraded(err, attempt, provider_id);
                }
            }
        }
    }
}

fn truncate_for_log(text: &str) -> String {
    const LIMIT: usize = 120;
    match text.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_clamped() {
        let settings = ClassifySettings::default();
        assert_eq!(settings.backoff(1), Duration::from_secs(2));
        assert_eq!(settings.backoff(2), Duration::from_secs(4));
        assert_eq!(settings.backoff(9), Duration::from_secs(10));

        let floor_heavy = ClassifySettings {
            backoff_step: Duration::from_millis(1),
            backoff_floor: Duration::from_millis(50),
            backoff_cap: Duration::from_millis(10),
            ..ClassifySettings::default()
        };
        assert_eq!(floor_heavy.backoff(3), Duration::from_millis(50));
    }
}

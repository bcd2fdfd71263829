//! Generative-model access with timeout and retry

use crate::agents::{OkrAnalystAgent, ResearchAgent};
use crate::{Error, Result};
use async_trait::async_trait;
use llm_toolkit::Agent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Opaque text-in, text-out model call
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Which agent persona a generator speaks through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    Analyst,
    Researcher,
}

/// [`TextGenerator`] backed by llm-toolkit agents
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentGenerator {
    persona: Persona,
}

impl AgentGenerator {
    pub fn new(persona: Persona) -> Self {
        Self { persona }
    }
}

#[async_trait]
impl TextGenerator for AgentGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = prompt.to_string();
        let response = match self.persona {
            Persona::Analyst => OkrAnalystAgent::default().execute(payload.into()).await?,
            Persona::Researcher => ResearchAgent::default().execute(payload.into()).await?,
        };

        if response.trim().is_empty() {
            return Err(Error::ExternalCall("model returned an empty response".to_string()));
        }
        Ok(response)
    }
}

/// Timeout and retry settings for one external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay before the second attempt; doubles after each further failure
    pub base_delay: Duration,
    /// Deadline for a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(10);
        self.base_delay.saturating_mul(1 << exp)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(self.timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        what, attempt, attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Shared handle every stage uses to reach the model
#[derive(Clone)]
pub struct ModelClient {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl ModelClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_policy(generator, RetryPolicy::default())
    }

    pub fn with_policy(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One logical model call, retried per policy
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Model call ({} chars)", prompt.len());
        self.policy
            .run("model call", || self.generator.generate(prompt))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        error: fn() -> Error,
    }

    #[async_trait]
    impl TextGenerator for Flaky {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)())
            } else {
                Ok(format!("ok after {}", n))
            }
        }
    }

    struct Hangs;

    #[async_trait]
    impl TextGenerator for Hangs {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let flaky = Arc::new(Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
            error: || Error::ExternalCall("503".to_string()),
        });
        let client = ModelClient::with_policy(flaky.clone(), fast_policy());

        let text = client.complete("hello").await.unwrap();
        assert_eq!(text, "ok after 2");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let flaky = Arc::new(Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
            error: || Error::ExternalCall("503".to_string()),
        });
        let client = ModelClient::with_policy(flaky.clone(), fast_policy());

        assert!(client.complete("hello").await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let flaky = Arc::new(Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
            error: || Error::MalformedOutput("bad".to_string()),
        });
        let client = ModelClient::with_policy(flaky.clone(), fast_policy());

        assert!(client.complete("hello").await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_calls_time_out() {
        let client = ModelClient::with_policy(Arc::new(Hangs), fast_policy());

        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}

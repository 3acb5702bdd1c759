// src/assistant.rs
//! AI assistant client. Each call is stateless; the chat handlers persist the
//! conversation. Rate-limited calls are retried with bounded exponential
//! backoff, every other failure is returned immediately.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;

use crate::config::AssistantConfig;
use crate::models::ChatResponse;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Assistant is not configured")]
    Disabled,

    #[error("Assistant rate limit persisted after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Assistant returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed assistant response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssistantRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_id: Option<String>,
}

#[async_trait]
pub trait AssistantClient: Send + Sync {
    async fn invoke(&self, request: &AssistantRequest) -> Result<ChatResponse, AssistantError>;
}

// ==================== BACKOFF ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// `base * 2^attempt`, capped at `max_delay`. `attempt` counts from 0.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Outcome of one attempt as seen by [`retry_on_rate_limit`].
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    RateLimited { retry_after: Option<Duration> },
}

/// Runs `op` until it completes, fails, or stays rate limited for
/// `max_retries + 1` attempts. A server-provided `Retry-After` replaces the
/// computed delay but is still capped by the policy.
pub async fn retry_on_rate_limit<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, AssistantError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, AssistantError>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::RateLimited { retry_after } => {
                if attempt >= policy.max_retries {
                    log::warn!("🤖 Assistant still rate limited after {} attempts, giving up", attempt + 1);
                    return Err(AssistantError::RateLimited { attempts: attempt + 1 });
                }
                let delay = retry_after
                    .map(|d| d.min(policy.max_delay))
                    .unwrap_or_else(|| policy.delay_for(attempt));
                log::warn!("🤖 Assistant rate limited, retrying in {:?} (attempt {})", delay, attempt + 1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

// ==================== HTTP CLIENT ====================

pub struct HttpAssistant {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl HttpAssistant {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration, policy: RetryPolicy) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("scholarhub/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url: url.into(), api_key, policy })
    }

    async fn attempt(&self, request: &AssistantRequest) -> Result<Attempt<ChatResponse>, AssistantError> {
        let mut builder = self.client.post(&self.url).json(request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Ok(Attempt::RateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Status { status: status.as_u16(), body });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Malformed(e.to_string()))?;
        Ok(Attempt::Done(reply))
    }
}

#[async_trait]
impl AssistantClient for HttpAssistant {
    async fn invoke(&self, request: &AssistantRequest) -> Result<ChatResponse, AssistantError> {
        let span = tracing::info_span!(
            "assistant_invoke",
            user_id = request.user_id.as_deref().unwrap_or("-"),
            scholarship_id = request.scholarship_id.as_deref().unwrap_or("-"),
        );
        retry_on_rate_limit(self.policy, |_| self.attempt(request))
            .instrument(span)
            .await
    }
}

/// Used when no assistant URL is configured.
pub struct DisabledAssistant;

#[async_trait]
impl AssistantClient for DisabledAssistant {
    async fn invoke(&self, _request: &AssistantRequest) -> Result<ChatResponse, AssistantError> {
        Err(AssistantError::Disabled)
    }
}

pub fn build_assistant(config: &AssistantConfig) -> Result<Arc<dyn AssistantClient>, AssistantError> {
    match config.url {
        Some(ref url) => Ok(Arc::new(HttpAssistant::new(
            url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
            RetryPolicy::from_config(config),
        )?)),
        None => Ok(Arc::new(DisabledAssistant)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(16_000),
        };
        let delays: Vec<u64> = (0..7).map(|a| policy.delay_for(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16_000, 16_000, 16_000]);
        assert_eq!(policy.delay_for(40), Duration::from_millis(16_000));
    }

    #[actix_rt::test]
    async fn test_succeeds_after_rate_limits() {
        let calls = AtomicU32::new(0);
        let result = retry_on_rate_limit(quick_policy(3), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Ok(Attempt::RateLimited { retry_after: None })
                } else {
                    Ok(Attempt::Done("ok"))
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[actix_rt::test]
    async fn test_gives_up_after_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_rate_limit(quick_policy(2), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Attempt::RateLimited { retry_after: Some(Duration::from_secs(60)) }) }
        })
        .await;
        assert!(matches!(result, Err(AssistantError::RateLimited { attempts: 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[actix_rt::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_rate_limit(quick_policy(5), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AssistantError::Status { status: 500, body: "boom".into() }) }
        })
        .await;
        assert!(matches!(result, Err(AssistantError::Status { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[actix_rt::test]
    async fn test_disabled_assistant() {
        let assistant = build_assistant(&AssistantConfig::default()).unwrap();
        let result = assistant.invoke(&AssistantRequest::default()).await;
        assert!(matches!(result, Err(AssistantError::Disabled)));
    }
}

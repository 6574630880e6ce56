use super::errors::AuthError;
use super::identity_client::IdentityClientError;
use super::types::AcquisitionResult;
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Extra attempts after the first one when nothing else is configured.
pub const DEFAULT_MAX_RETRY: u32 = 1;

/// Source of the delay between retries.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Retryable failure that was still pending when the budget ran out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryableFailure {
    TemporarilyUnavailable { retry_after: Duration },
    ClaimsChallenge { claims: String },
}

/// Result of [`RetryPolicy::run`].
#[derive(Debug)]
pub enum RetryOutcome {
    /// An attempt returned a result. It may still carry an empty token.
    Acquired(AcquisitionResult),
    /// Every attempt hit a retryable failure.
    Exhausted {
        attempts: u32,
        last_failure: RetryableFailure,
    },
}

impl RetryOutcome {
    /// The acquired result, `None` when the budget was exhausted.
    pub fn into_result(self) -> Option<AcquisitionResult> {
        match self {
            RetryOutcome::Acquired(result) => Some(result),
            RetryOutcome::Exhausted { .. } => None,
        }
    }

    /// Surfaces exhaustion as the error the caller should see.
    ///
    /// A transient outage becomes [`AuthError::TemporarilyUnavailable`]; an
    /// unresolved claims challenge becomes [`AuthError::ChallengeRequired`]
    /// carrying the claims so the caller can step up.
    pub fn into_auth_result(self, flow: &str) -> Result<AcquisitionResult, AuthError> {
        match self {
            RetryOutcome::Acquired(result) => Ok(result),
            RetryOutcome::Exhausted {
                attempts,
                last_failure: RetryableFailure::TemporarilyUnavailable { retry_after },
            } => Err(AuthError::TemporarilyUnavailable {
                attempts,
                retry_after: Some(retry_after),
                message: format!("{flow} flow exhausted its retry budget"),
            }),
            RetryOutcome::Exhausted {
                attempts,
                last_failure: RetryableFailure::ClaimsChallenge { claims },
            } => Err(AuthError::ChallengeRequired {
                message: format!(
                    "{flow} flow still received a claims challenge after {attempts} attempt(s)"
                ),
                claims: Some(claims),
            }),
        }
    }
}

/// Bounded retry loop around one flow-specific acquisition.
///
/// Transient outages are retried after the server's `Retry-After` delay and
/// claims challenges are retried with `claims=<challenge>` added to the next
/// request. Everything else ends the loop. State lives on the stack of a
/// single [`run`](RetryPolicy::run) call, so one policy can serve concurrent
/// requests.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retry: u32,
    backoff: Arc<dyn Backoff>,
}

impl RetryPolicy {
    pub fn new(max_retry: u32) -> Self {
        Self {
            max_retry,
            backoff: Arc::new(TokioBackoff),
        }
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Same backoff source, different budget.
    pub fn with_max_retry(&self, max_retry: u32) -> Self {
        Self {
            max_retry,
            backoff: Arc::clone(&self.backoff),
        }
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    /// Runs `attempt` at most `max_retry + 1` times.
    ///
    /// `attempt` receives the extra query parameters for that attempt
    /// (`Some("claims=...")` after a claims challenge).
    ///
    /// # Errors
    ///
    /// - [`AuthError::TemporarilyUnavailable`] right away when a transient
    ///   failure has no `Retry-After` signal; the policy does not guess a delay.
    /// - [`AuthError::Cancelled`] when the exchange was cancelled.
    /// - [`AuthError::GeneralException`] for any other failure, with no retry.
    pub async fn run<F, Fut>(
        &self,
        flow: &'static str,
        scopes: &[String],
        mut attempt: F,
    ) -> Result<RetryOutcome, AuthError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<AcquisitionResult, IdentityClientError>>,
    {
        let mut extra_query_parameters: Option<String> = None;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let can_retry = attempts <= self.max_retry;

            match attempt(extra_query_parameters.clone()).await {
                Ok(result) => return Ok(RetryOutcome::Acquired(result)),
                Err(IdentityClientError::TemporarilyUnavailable { retry_after }) => {
                    let Some(retry_after) = retry_after else {
                        log::error!("{flow} flow: identity provider unavailable without Retry-After");
                        return Err(AuthError::TemporarilyUnavailable {
                            attempts,
                            retry_after: None,
                            message: "identity provider sent no Retry-After signal".to_string(),
                        });
                    };
                    let delay = retry_after.delay_from(Utc::now());

                    if !can_retry {
                        return Ok(RetryOutcome::Exhausted {
                            attempts,
                            last_failure: RetryableFailure::TemporarilyUnavailable {
                                retry_after: delay,
                            },
                        });
                    }

                    log::warn!(
                        "{flow} flow attempt {attempts} hit a temporarily unavailable identity provider, retrying in {delay:?}..."
                    );
                    self.backoff.wait(delay).await;
                }
                Err(IdentityClientError::ClaimsRequired { claims }) => {
                    if !can_retry {
                        return Ok(RetryOutcome::Exhausted {
                            attempts,
                            last_failure: RetryableFailure::ClaimsChallenge { claims },
                        });
                    }

                    log::warn!(
                        "{flow} flow attempt {attempts} received a claims challenge, retrying with claims"
                    );
                    extra_query_parameters = Some(format!("claims={claims}"));
                }
                Err(IdentityClientError::Cancelled) => {
                    return Err(AuthError::Cancelled { flow });
                }
                Err(e) => {
                    log::error!("{flow} flow attempt {attempts} failed: {e}");
                    return Err(AuthError::from_client(flow, scopes, e));
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRY)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retry", &self.max_retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity_client::RetryAfter;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingBackoff {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Backoff for RecordingBackoff {
        async fn wait(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    fn policy(max_retry: u32) -> (RetryPolicy, Arc<RecordingBackoff>) {
        let backoff = Arc::new(RecordingBackoff::default());
        let policy = RetryPolicy::new(max_retry).with_backoff(backoff.clone());
        (policy, backoff)
    }

    fn token(value: &str) -> AcquisitionResult {
        AcquisitionResult::new(value, Utc::now() + chrono::Duration::hours(1), None)
    }

    fn unavailable(seconds: u64) -> IdentityClientError {
        IdentityClientError::TemporarilyUnavailable {
            retry_after: Some(RetryAfter::Delta(Duration::from_secs(seconds))),
        }
    }

    fn scopes() -> Vec<String> {
        vec!["User.Read".to_string()]
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let (policy, backoff) = policy(1);
        let calls = AtomicU32::new(0);

        let outcome = policy
            .run("device_code", &scopes(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(token("first")) }
            })
            .await
            .unwrap();

        assert_eq!(outcome.into_result().unwrap().access_token(), "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(backoff.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_then_success_waits_once() {
        let (policy, backoff) = policy(1);
        let calls = AtomicU32::new(0);

        let outcome = policy
            .run("interactive", &scopes(), |_| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(unavailable(7))
                    } else {
                        Ok(token("second"))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome.into_result().unwrap().access_token(), "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*backoff.delays.lock().unwrap(), vec![Duration::from_secs(7)]);
    }

    #[tokio::test]
    async fn test_identical_failures_exhaust_budget() {
        let (policy, backoff) = policy(1);
        let calls = AtomicU32::new(0);

        let outcome = policy
            .run("interactive", &scopes(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable(2)) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(backoff.delays.lock().unwrap().len(), 1);
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_failure,
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(
                    last_failure,
                    RetryableFailure::TemporarilyUnavailable {
                        retry_after: Duration::from_secs(2)
                    }
                );
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_budget_runs_once() {
        let (policy, backoff) = policy(0);
        let calls = AtomicU32::new(0);

        let outcome = policy
            .run("interactive", &scopes(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable(2)) }
            })
            .await
            .unwrap();

        assert!(outcome.into_result().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(backoff.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claims_challenge_injected_into_next_attempt() {
        let (policy, backoff) = policy(1);
        let seen = Mutex::new(Vec::new());

        let outcome = policy
            .run("on_behalf_of", &scopes(), |extra| {
                let first = seen.lock().unwrap().is_empty();
                seen.lock().unwrap().push(extra);
                async move {
                    if first {
                        Err(IdentityClientError::ClaimsRequired {
                            claims: "foo".to_string(),
                        })
                    } else {
                        Ok(token("stepped-up"))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome.into_result().unwrap().access_token(), "stepped-up");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("claims=foo".to_string())]
        );
        assert!(backoff.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_retry_after_fails_fast() {
        let (policy, backoff) = policy(3);
        let calls = AtomicU32::new(0);

        let error = policy
            .run("interactive", &scopes(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(IdentityClientError::TemporarilyUnavailable { retry_after: None })
                }
            })
            .await
            .unwrap_err();

        assert_eq!(error.code(), "temporarily_unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(backoff.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unclassified_error_is_terminal() {
        let (policy, _) = policy(5);
        let calls = AtomicU32::new(0);

        let error = policy
            .run("username_password", &scopes(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(IdentityClientError::Service {
                        code: "invalid_grant".to_string(),
                        message: "AADSTS50126".to_string(),
                    })
                }
            })
            .await
            .unwrap_err();

        assert_eq!(error.code(), "generalException");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exhausted_claims_surface_as_challenge() {
        let outcome = RetryOutcome::Exhausted {
            attempts: 2,
            last_failure: RetryableFailure::ClaimsChallenge {
                claims: "mfa".to_string(),
            },
        };

        match outcome.into_auth_result("interactive") {
            Err(AuthError::ChallengeRequired { claims, .. }) => {
                assert_eq!(claims.as_deref(), Some("mfa"));
            }
            other => panic!("expected challenge, got {other:?}"),
        }
    }
}

//! Async resource waiter
//!
//! Fixed-interval polling until a remote resource leaves its pending state.
//! The provider exposes no push notification, so callers block on this.

use crate::error::{CloudError, Result};
use crate::provider::{LifecycleState, PeeringStatus};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::sleep;
use vpcflow_core::WaitPolicy;

/// State tag of a waited-for resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Pending,
    Available,
    Failed,
    TimedOut,
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceState::Pending => write!(f, "pending"),
            ResourceState::Available => write!(f, "available"),
            ResourceState::Failed => write!(f, "failed"),
            ResourceState::TimedOut => write!(f, "timed-out"),
        }
    }
}

/// Classification of a single poll result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
    Failed(String),
}

impl From<&LifecycleState> for Readiness {
    fn from(state: &LifecycleState) -> Self {
        match state {
            LifecycleState::Available => Readiness::Ready,
            LifecycleState::Pending => Readiness::NotReady,
            LifecycleState::Failed(reason) => Readiness::Failed(reason.clone()),
        }
    }
}

/// Readiness predicate for lifecycle-reporting resources
pub fn lifecycle_ready(state: &LifecycleState) -> Readiness {
    state.into()
}

/// Readiness predicate for a peering request about to be accepted
///
/// Ready once the accepter side can see the request.
pub fn peering_acceptable(status: &PeeringStatus) -> Readiness {
    match status {
        PeeringStatus::PendingAcceptance | PeeringStatus::Active => Readiness::Ready,
        PeeringStatus::NotVisible | PeeringStatus::Initiating | PeeringStatus::Provisioning => {
            Readiness::NotReady
        }
        PeeringStatus::Failed(reason) => Readiness::Failed(reason.clone()),
    }
}

/// Outcome of a wait; exists only for the duration of the wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncResource {
    /// Resource kind (e.g. "nat-gateway")
    pub resource: String,
    pub id: String,
    pub state: ResourceState,
    /// Number of polls performed
    pub attempts: u32,
    /// Failure reason reported by the provider
    pub detail: Option<String>,
}

impl AsyncResource {
    pub fn is_available(&self) -> bool {
        self.state == ResourceState::Available
    }

    /// Turn a failed or timed-out outcome into an error
    pub fn into_available(self) -> Result<AsyncResource> {
        match self.state {
            ResourceState::Available => Ok(self),
            ResourceState::Failed => Err(CloudError::ResourceFailed {
                resource: self.resource,
                id: self.id,
                reason: self.detail.unwrap_or_else(|| "unknown".to_string()),
            }),
            ResourceState::TimedOut | ResourceState::Pending => Err(CloudError::WaitTimeout {
                resource: self.resource,
                id: self.id,
                attempts: self.attempts,
            }),
        }
    }
}

/// Poll until `classify` reports ready or failed, or the attempt budget runs out
///
/// Returns as soon as a poll is classified ready or failed; never sleeps after
/// the last attempt. A poll that errors aborts the wait with that error.
pub async fn wait_for<T, F, Fut, C>(
    resource: &str,
    resource_id: &str,
    policy: &WaitPolicy,
    mut poll: F,
    classify: C,
) -> Result<AsyncResource>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    C: Fn(&T) -> Readiness,
{
    let outcome = |state, attempts, detail| AsyncResource {
        resource: resource.to_string(),
        id: resource_id.to_string(),
        state,
        attempts,
        detail,
    };

    for attempt in 0..policy.max_attempts {
        let observed = poll().await?;

        match classify(&observed) {
            Readiness::Ready => {
                tracing::debug!(resource, id = resource_id, attempt = attempt + 1, "available");
                return Ok(outcome(ResourceState::Available, attempt + 1, None));
            }
            Readiness::Failed(reason) => {
                tracing::warn!(resource, id = resource_id, %reason, "entered failed state");
                return Ok(outcome(ResourceState::Failed, attempt + 1, Some(reason)));
            }
            Readiness::NotReady => {
                tracing::debug!(
                    resource,
                    id = resource_id,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    "still pending"
                );
            }
        }

        // 最後の試行でなければ待機
        if attempt + 1 < policy.max_attempts {
            sleep(policy.interval()).await;
        }
    }

    Ok(outcome(ResourceState::TimedOut, policy.max_attempts, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> WaitPolicy {
        WaitPolicy {
            interval_ms: 0,
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_available_on_nth_poll() {
        let polls = AtomicU32::new(0);

        let outcome = wait_for(
            "transit-gateway",
            "tgw-1",
            &policy(10),
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(if n >= 3 {
                        LifecycleState::Available
                    } else {
                        LifecycleState::Pending
                    })
                }
            },
            lifecycle_ready,
        )
        .await
        .unwrap();

        assert_eq!(outcome.state, ResourceState::Available);
        assert_eq!(outcome.attempts, 3);
        // 準備完了後はポーリングしない
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_available_on_last_attempt() {
        let polls = AtomicU32::new(0);

        let outcome = wait_for(
            "nat-gateway",
            "nat-1",
            &policy(4),
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(if n == 4 {
                        LifecycleState::Available
                    } else {
                        LifecycleState::Pending
                    })
                }
            },
            lifecycle_ready,
        )
        .await
        .unwrap();

        assert!(outcome.is_available());
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test]
    async fn test_timed_out() {
        let polls = AtomicU32::new(0);

        let outcome = wait_for(
            "nat-gateway",
            "nat-1",
            &policy(5),
            || {
                polls.fetch_add(1, Ordering::SeqCst);
                async { Ok(LifecycleState::Pending) }
            },
            lifecycle_ready,
        )
        .await
        .unwrap();

        assert_eq!(outcome.state, ResourceState::TimedOut);
        assert_eq!(polls.load(Ordering::SeqCst), 5);

        let err = outcome.into_available().unwrap_err();
        assert!(matches!(err, CloudError::WaitTimeout { attempts: 5, .. }));
    }

    #[tokio::test]
    async fn test_failed_stops_polling() {
        let polls = AtomicU32::new(0);

        let outcome = wait_for(
            "transit-attachment",
            "tgw-attach-1",
            &policy(10),
            || {
                polls.fetch_add(1, Ordering::SeqCst);
                async { Ok(LifecycleState::Failed("rejected".to_string())) }
            },
            lifecycle_ready,
        )
        .await
        .unwrap();

        assert_eq!(outcome.state, ResourceState::Failed);
        assert_eq!(polls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            outcome.into_available(),
            Err(CloudError::ResourceFailed { reason, .. }) if reason == "rejected"
        ));
    }

    #[tokio::test]
    async fn test_poll_error_propagates() {
        let result = wait_for(
            "nat-gateway",
            "nat-1",
            &policy(3),
            || async {
                Err::<LifecycleState, _>(CloudError::rejected(
                    "DescribeNatGateways",
                    "UnauthorizedOperation",
                    "denied",
                ))
            },
            lifecycle_ready,
        )
        .await;

        assert!(matches!(result, Err(CloudError::Rejected { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_polls_only() {
        let started = tokio::time::Instant::now();

        let outcome = wait_for(
            "transit-gateway",
            "tgw-1",
            &WaitPolicy::from_secs(10, 3),
            || async { Ok(LifecycleState::Pending) },
            lifecycle_ready,
        )
        .await
        .unwrap();

        assert_eq!(outcome.state, ResourceState::TimedOut);
        // 3回の試行で待機は2回
        assert_eq!(started.elapsed(), std::time::Duration::from_secs(20));
    }

    #[test]
    fn test_peering_predicate() {
        assert_eq!(peering_acceptable(&PeeringStatus::NotVisible), Readiness::NotReady);
        assert_eq!(
            peering_acceptable(&PeeringStatus::PendingAcceptance),
            Readiness::Ready
        );
        assert!(matches!(
            peering_acceptable(&PeeringStatus::Failed("expired".to_string())),
            Readiness::Failed(_)
        ));
    }
}

//! Progress tracking and completion polling for asynchronous operations
//!
//! The Cloud Manager service has no notification channel: completion is
//! observed by polling. Two flavors exist:
//!
//! - task polling: a mutating call returned a task id, and
//!   `GET /occm/api/audit/activeTask/{id}` reports `0` (pending), `1` (success)
//!   or `-1` (failure);
//! - property polling: no task id is returned, and the working environment's
//!   `status.status` is watched until it leaves `UPDATING`.
//!
//! Both are [`poll_until`] with a different fetch function and decision
//! function, so the budget, interval and timeout logic exists once.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::client::OccmClient;
use crate::error::{CoreError, Result};
use crate::resolver::working_environment_properties;
use crate::transport::segment;
use crate::types::{TaskStatus, TaskStatusResponse, WorkingEnvironmentProperties};

/// Snapshot fields needed to watch an update
pub const STATUS_FIELDS: &[&str] = &["status", "ontapClusterProperties"];

/// Progress events emitted during polling
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Polling has started
    Started { subject: String },
    /// One status check came back pending
    Polling {
        subject: String,
        status: String,
        attempt: u32,
        elapsed: Duration,
    },
    /// Terminal success
    Completed { subject: String },
    /// Terminal failure or timeout
    Failed { subject: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive a spinner.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Retry budget and interval for completion polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Status checks allowed after the first one
    pub retries: u32,
    /// Sleep between status checks
    pub interval: Duration,
    /// Optional wall-clock limit
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    pub fn new(retries: u32, interval: Duration) -> Self {
        Self {
            retries,
            interval,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Multiply the budget (and deadline) by `factor`; used for HA topologies
    pub fn scaled(self, factor: u32) -> Self {
        Self {
            retries: self.retries.saturating_mul(factor),
            interval: self.interval,
            deadline: self
                .deadline
                .map(|d| d.checked_mul(factor).unwrap_or(Duration::MAX)),
        }
    }

    /// Total time spent sleeping before a timeout is declared
    pub fn timeout_window(&self) -> Duration {
        self.interval
            .checked_mul(self.retries)
            .unwrap_or(Duration::MAX)
    }
}

/// Decision taken on one fetched status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// Terminal success with a value
    Done(T),
    /// Not finished; the string is the status to report
    Pending(String),
}

/// What is being waited for, used in progress events and error messages
#[derive(Debug, Clone, Copy)]
pub struct PollSubject<'a> {
    /// The thing being acted on, e.g. "CVO"
    pub action: &'a str,
    /// The verb, e.g. "update"
    pub task: &'a str,
}

impl PollSubject<'_> {
    fn describe(&self) -> String {
        format!("{} {}", self.task, self.action)
    }
}

/// Poll until `decide` returns [`PollOutcome::Done`], an error, or the budget runs out
///
/// Each iteration calls `fetch` once. A pending result with no budget left
/// (or past the deadline) yields [`CoreError::Timeout`], so a status that never
/// changes is queried exactly `policy.retries + 1` times. Errors from `fetch`
/// and `decide` end polling immediately.
pub async fn poll_until<S, T, F, Fut, D>(
    policy: &PollPolicy,
    subject: PollSubject<'_>,
    on_progress: Option<&ProgressCallback>,
    mut fetch: F,
    mut decide: D,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    D: FnMut(S) -> Result<PollOutcome<T>>,
{
    let start = Instant::now();
    let label = subject.describe();
    let mut remaining = policy.retries;
    let mut attempt = 0u32;

    emit(
        on_progress,
        ProgressEvent::Started {
            subject: label.clone(),
        },
    );

    loop {
        attempt += 1;
        let outcome = fetch().await.and_then(&mut decide);

        match outcome {
            Ok(PollOutcome::Done(value)) => {
                emit(on_progress, ProgressEvent::Completed { subject: label });
                return Ok(value);
            }
            Ok(PollOutcome::Pending(status)) => {
                let elapsed = start.elapsed();
                emit(
                    on_progress,
                    ProgressEvent::Polling {
                        subject: label.clone(),
                        status: status.clone(),
                        attempt,
                        elapsed,
                    },
                );

                let past_deadline = policy
                    .deadline
                    .is_some_and(|deadline| elapsed.saturating_add(policy.interval) > deadline);
                if remaining == 0 || past_deadline {
                    debug!("Taking too long to {}", label);
                    let err = CoreError::Timeout {
                        action: subject.action.to_string(),
                        task: subject.task.to_string(),
                        attempts: attempt,
                    };
                    emit(
                        on_progress,
                        ProgressEvent::Failed {
                            subject: label,
                            error: err.to_string(),
                        },
                    );
                    return Err(err);
                }

                debug!(
                    "{}: status {} ({} checks left), sleeping {:?}",
                    label, status, remaining, policy.interval
                );
                tokio::time::sleep(policy.interval).await;
                remaining -= 1;
            }
            Err(err) => {
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        subject: label,
                        error: err.to_string(),
                    },
                );
                return Err(err);
            }
        }
    }
}

/// Helper to emit progress events
fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

/// One status query for a task handle
pub async fn check_task_status(client: &OccmClient, task_id: &str) -> Result<TaskStatusResponse> {
    let path = format!("/occm/api/audit/activeTask/{}", segment(task_id));
    client.get_json(&path, "checkTaskStatus").await
}

/// Poll a task handle until it succeeds, fails, or the budget runs out
///
/// `action` and `task` name what was submitted (e.g. "CVO", "create") and
/// appear in failure and timeout messages.
pub async fn wait_for_task(
    client: &OccmClient,
    task_id: &str,
    action: &str,
    task: &str,
    policy: &PollPolicy,
    on_progress: Option<&ProgressCallback>,
) -> Result<()> {
    debug!("Waiting on task {} ({} {})", task_id, task, action);
    poll_until(
        policy,
        PollSubject { action, task },
        on_progress,
        || check_task_status(client, task_id),
        |response: TaskStatusResponse| match response.task_status()? {
            TaskStatus::Success => Ok(PollOutcome::Done(())),
            TaskStatus::Failure => Err(CoreError::RemoteFailure {
                action: action.to_string(),
                task: task.to_string(),
                reason: response.error.unwrap_or_default(),
            }),
            TaskStatus::Pending => Ok(PollOutcome::Pending(TaskStatus::Pending.to_string())),
        },
    )
    .await?;
    info!("Task {} finished: {} {}", task_id, task, action);
    Ok(())
}

/// Poll the properties snapshot until `status.status` leaves `UPDATING`
pub async fn wait_for_update(
    client: &OccmClient,
    api_root: &str,
    id: &str,
    policy: &PollPolicy,
    on_progress: Option<&ProgressCallback>,
) -> Result<WorkingEnvironmentProperties> {
    poll_until(
        policy,
        PollSubject {
            action: "CVO",
            task: "update",
        },
        on_progress,
        || working_environment_properties(client, api_root, id, STATUS_FIELDS),
        |props: WorkingEnvironmentProperties| {
            if props.is_updating() {
                Ok(PollOutcome::Pending(props.status_name().to_string()))
            } else {
                Ok(PollOutcome::Done(props))
            }
        },
    )
    .await
}

/// Poll the properties snapshot until an image upgrade has landed
///
/// Done once the status has left `UPDATING` and a version is reported. The
/// reported version must be contained in `target_version`; anything else is a
/// hard failure, not a reason to keep polling. Returns the reported version.
pub async fn wait_for_image_upgrade(
    client: &OccmClient,
    api_root: &str,
    id: &str,
    target_version: &str,
    policy: &PollPolicy,
    on_progress: Option<&ProgressCallback>,
) -> Result<String> {
    poll_until(
        policy,
        PollSubject {
            action: "ONTAP image",
            task: "upgrade",
        },
        on_progress,
        || working_environment_properties(client, api_root, id, STATUS_FIELDS),
        |props: WorkingEnvironmentProperties| {
            let version = props.ontap_version();
            if props.is_updating() || version.is_empty() {
                return Ok(PollOutcome::Pending(format!(
                    "{} ({})",
                    props.status_name(),
                    target_version
                )));
            }
            if target_version.contains(version) {
                Ok(PollOutcome::Done(version.to_string()))
            } else {
                Err(CoreError::RemoteFailure {
                    action: "ONTAP image".to_string(),
                    task: "upgrade".to_string(),
                    reason: format!(
                        "current version {} does not match target {}",
                        version, target_version
                    ),
                })
            }
        },
    )
    .await
}

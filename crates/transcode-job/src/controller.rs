//! Worker Pod lifecycle
//!
//! Drives a single Pod through a state machine:
//! NotCreated → Created → Succeeded/Failed/Cancelled → Deleted
//!
//! Creation failure is fatal and leaves nothing to clean up. Once the Pod
//! exists, a spawned poll task races the cancellation token; whichever
//! finishes first decides the outcome, and the Pod is then deleted exactly
//! once regardless of how the wait ended.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::JobClient;
use crate::compiler::TranscodeJobSpec;
use crate::error::Error;
use crate::types::{JobHandle, Phase};

/// Bound on the create call
pub const CREATE_TIMEOUT: Duration = Duration::from_secs(60);
/// Bound on each phase fetch
pub const POLL_TIMEOUT: Duration = Duration::from_secs(60);
/// Delay between phase fetches
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Bound on the delete call; covers graceful termination of the worker
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(300);

/// Exit status for a run interrupted by a signal
pub const CANCELLED_EXIT_CODE: u8 = 130;

/// Timing for a lifecycle run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Bound on the create call
    pub create_timeout: Duration,
    /// Bound on each phase fetch
    pub poll_timeout: Duration,
    /// Delay between phase fetches
    pub poll_interval: Duration,
    /// Bound on the delete call
    pub delete_timeout: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            create_timeout: CREATE_TIMEOUT,
            poll_timeout: POLL_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            delete_timeout: DELETE_TIMEOUT,
        }
    }
}

/// How the wait for a created Pod ended
#[derive(Debug)]
pub enum Outcome {
    /// The Pod reached Succeeded
    Succeeded,
    /// The Pod reached Failed, or its phase could not be fetched
    Failed(Error),
    /// Cancellation was requested before the Pod finished
    Cancelled,
}

impl Outcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Succeeded => 0,
            Outcome::Failed(_) => 1,
            Outcome::Cancelled => CANCELLED_EXIT_CODE,
        }
    }
}

/// Run a worker Pod to completion and delete it
///
/// Returns `Err` only for fatal conditions: the Pod could not be created, or
/// it could not be deleted afterward. Everything else is an [`Outcome`].
pub async fn run(
    client: Arc<dyn JobClient>,
    spec: &TranscodeJobSpec,
    settings: LifecycleSettings,
    cancel: CancellationToken,
) -> Result<Outcome, Error> {
    let handle = bounded("create", settings.create_timeout, client.create(spec))
        .await
        .map_err(Error::submission)?;
    info!(job = %handle.name, namespace = %handle.namespace, "waiting for pod to complete");

    let outcome = race(Arc::clone(&client), &handle, settings, &cancel).await;
    match &outcome {
        Outcome::Succeeded => info!(job = %handle.name, "pod completed successfully"),
        Outcome::Failed(e) => error!(job = %handle.name, error = %e, "error waiting for pod to complete"),
        Outcome::Cancelled => info!(job = %handle.name, "exit requested"),
    }

    cleanup(client.as_ref(), &handle, settings.delete_timeout).await?;
    Ok(outcome)
}

/// Race the poll task against cancellation
async fn race(
    client: Arc<dyn JobClient>,
    handle: &JobHandle,
    settings: LifecycleSettings,
    cancel: &CancellationToken,
) -> Outcome {
    let poll_cancel = cancel.child_token();
    let mut poll = tokio::spawn(wait_for_completion(
        client,
        handle.clone(),
        settings,
        poll_cancel.clone(),
    ));

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            poll_cancel.cancel();
            poll.abort();
            Outcome::Cancelled
        }
        joined = &mut poll => match joined {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(Error::poll(
                &handle.name,
                Error::internal(format!("poll task ended abnormally: {e}")),
            )),
        },
    }
}

/// Poll the Pod phase until it is terminal, a fetch fails, or `cancel` fires
///
/// Pending and Running keep polling. Unknown is logged and keeps polling. A
/// fetch failure is terminal and not retried. Cancellation interrupts both
/// the delay and an in-flight fetch.
pub async fn wait_for_completion(
    client: Arc<dyn JobClient>,
    handle: JobHandle,
    settings: LifecycleSettings,
    cancel: CancellationToken,
) -> Outcome {
    let mut ticker = tokio::time::interval(settings.poll_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Cancelled,
            _ = ticker.tick() => {}
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Cancelled,
            fetched = bounded("get", settings.poll_timeout, client.phase(&handle)) => fetched,
        };

        match fetched {
            Ok(phase @ (Phase::Pending | Phase::Running)) => {
                debug!(job = %handle.name, ?phase, "pod not finished yet");
            }
            Ok(Phase::Unknown) => {
                warn!(job = %handle.name, "pod is in an unknown state");
            }
            Ok(Phase::Failed) => return Outcome::Failed(Error::job_failed(&handle.name)),
            Ok(Phase::Succeeded) => return Outcome::Succeeded,
            Err(e) => return Outcome::Failed(Error::poll(&handle.name, e)),
        }
    }
}

/// Delete the Pod; failure means a leaked resource and is fatal
async fn cleanup(
    client: &dyn JobClient,
    handle: &JobHandle,
    timeout: Duration,
) -> Result<(), Error> {
    info!(job = %handle.name, "cleaning up pod");
    match bounded("delete", timeout, client.delete(handle)).await {
        Ok(()) => {
            info!(job = %handle.name, "pod deleted");
            Ok(())
        }
        Err(e) => {
            error!(
                job = %handle.name,
                namespace = %handle.namespace,
                error = %e,
                "failed to delete pod; it must be removed manually"
            );
            Err(Error::cleanup(&handle.name, e))
        }
    }
}

/// Bound a cluster call with a timeout
async fn bounded<T, F>(operation: &'static str, after: Duration, call: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(after, call)
        .await
        .map_err(|_| Error::Timeout { operation, after })?
}

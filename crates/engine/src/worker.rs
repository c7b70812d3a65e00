// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Latent worker state machine
//!
//! Owns the worker's lifecycle state and the two coalesced operation slots.
//! Provisioning calls run on tasks of their own, so a caller that gives up
//! waiting never abandons an operation half way: the task still applies the
//! outcome to the state and releases every waiter.
//!
//! All state, both operation slots and the idle timer live behind one mutex
//! per worker. It is never held across an await; the only suspension points
//! are the provisioner (and connector) calls inside the operation tasks.

use crate::coalesce::Coalescer;
use crate::error::WorkerError;
use crate::idle::{AlwaysStop, IdlePolicy, IdleTimer, MinUptime};
use lw_adapters::{Connector, Provisioner};
use lw_core::{
    resolve, BuildContext, Compatibility, HealthStatus, Kind, WorkerConfig, WorkerEvent,
    WorkerState, WorkerStatus,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

type Outcome = Result<(), WorkerError>;

/// What a lifecycle request does after inspecting the state
enum Next {
    Done(Outcome),
    /// The awaited operation's outcome is the request's outcome
    Wait(oneshot::Receiver<Outcome>),
    /// Wait for the operation, then inspect the state again
    Retry(oneshot::Receiver<Outcome>),
}

/// Work left after a start whose session attach did not succeed
enum AttachCleanup {
    FastStop(String),
    Detach(String),
}

#[derive(Default)]
struct Inner {
    state: WorkerState,
    /// Kind being started or running. Cleared on entering STOPPED.
    kind: Option<Kind>,
    session: Option<String>,
    builds: usize,
    crashed: bool,
    /// Unhealthy report received while an operation was in flight
    pending_crash: Option<String>,
    started_at: Option<Instant>,
    last_health: Option<HealthStatus>,
    start_op: Coalescer<Outcome>,
    stop_op: Coalescer<Outcome>,
    idle: IdleTimer,
}

struct Shared<P, C> {
    config: WorkerConfig,
    provisioner: P,
    connector: C,
    policy: Box<dyn IdlePolicy>,
    inner: Mutex<Inner>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<WorkerEvent>>>,
}

/// A build worker whose backing resource exists only on demand
pub struct LatentWorker<P, C> {
    shared: Arc<Shared<P, C>>,
}

impl<P, C> Clone for LatentWorker<P, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

fn describe(kind: Option<&Kind>) -> String {
    kind.map_or_else(|| "any".to_string(), Kind::to_string)
}

fn received(rx: Result<Outcome, oneshot::error::RecvError>) -> Outcome {
    rx.unwrap_or(Err(WorkerError::Abandoned))
}

impl<P: Provisioner, C: Connector> LatentWorker<P, C> {
    /// Create a stopped worker. A configured `min_uptime` selects the
    /// keepalive idle policy.
    pub fn new(config: WorkerConfig, provisioner: P, connector: C) -> Self {
        match config.min_uptime {
            Some(min) => Self::with_policy(config, provisioner, connector, MinUptime(min)),
            None => Self::with_policy(config, provisioner, connector, AlwaysStop),
        }
    }

    pub fn with_policy(
        config: WorkerConfig,
        provisioner: P,
        connector: C,
        policy: impl IdlePolicy,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                provisioner,
                connector,
                policy: Box::new(policy),
                inner: Mutex::new(Inner::default()),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> WorkerState {
        self.lock().state
    }

    /// Kind being started or running
    pub fn current_kind(&self) -> Option<Kind> {
        self.lock().kind.clone()
    }

    pub fn status(&self) -> WorkerStatus {
        let inner = self.lock();
        WorkerStatus {
            name: self.name().to_string(),
            state: inner.state,
            kind: inner.kind.clone(),
            builds: inner.builds,
            crashed: inner.crashed,
            last_health: inner.last_health.clone(),
            idle_timer_armed: inner.idle.is_armed(),
        }
    }

    /// Started with its session attached
    pub fn is_running(&self) -> bool {
        let inner = self.lock();
        inner.state == WorkerState::Started && !inner.start_op.is_pending()
    }

    /// Receive every event published by this worker from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<WorkerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    fn publish(&self, event: WorkerEvent) {
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn report_anomaly(&self, error: &WorkerError) {
        tracing::warn!(worker = self.name(), error = %error, "lifecycle anomaly");
        self.publish(WorkerEvent::Anomaly {
            worker: self.name().to_string(),
            error: error.to_string(),
        });
    }

    fn transition(&self, inner: &mut Inner, to: WorkerState) {
        let from = inner.state;
        debug_assert!(
            from.can_transition_to(to),
            "undefined lifecycle edge {} -> {}",
            from,
            to
        );
        if !from.can_transition_to(to) {
            tracing::error!(worker = self.name(), %from, %to, "undefined lifecycle edge");
        }

        inner.state = to;
        match to {
            WorkerState::Started => inner.started_at = Some(Instant::now()),
            WorkerState::Stopped => {
                inner.kind = None;
                inner.started_at = None;
                inner.idle.cancel();
                if inner.builds > 0 {
                    tracing::warn!(
                        worker = self.name(),
                        builds = inner.builds,
                        "dropping builds bound to a stopped worker"
                    );
                    inner.builds = 0;
                }
            }
            WorkerState::Starting | WorkerState::Stopping => {}
        }

        tracing::info!(
            worker = self.name(),
            %from,
            %to,
            kind = %describe(inner.kind.as_ref()),
            "state changed"
        );
        self.publish(WorkerEvent::StateChanged {
            worker: self.name().to_string(),
            from,
            to,
            kind: inner.kind.clone(),
        });
    }

    /// Render the worker's kind expression for a build
    pub fn render_kind(&self, build: &BuildContext) -> Result<Option<Kind>, WorkerError> {
        Ok(self.shared.config.kind.render(build)?)
    }

    /// Make the worker ready for `build`, rendering its kind first
    pub async fn substantiate(&self, build: &BuildContext) -> Result<(), WorkerError> {
        let requested = self.render_kind(build)?;
        self.substantiate_kind(requested).await
    }

    /// Make the worker ready with the requested kind.
    ///
    /// Resolves immediately when already started with that kind, joins an
    /// in-flight start, or drives a stop/start cycle on a kind mismatch.
    pub async fn substantiate_kind(&self, requested: Option<Kind>) -> Result<(), WorkerError> {
        loop {
            let next = {
                let mut inner = self.lock();
                let compat = resolve(inner.state, inner.kind.as_ref(), requested.as_ref());
                tracing::debug!(
                    worker = self.name(),
                    state = %inner.state,
                    requested = %describe(requested.as_ref()),
                    ?compat,
                    "substantiate"
                );

                match compat {
                    Compatibility::ProceedStart => {
                        Next::Wait(self.begin_start(&mut inner, requested.clone()))
                    }
                    // A start still attaching its session has not finished yet
                    Compatibility::Reuse => match inner.start_op.follow() {
                        Some(rx) => Next::Wait(rx),
                        None => Next::Done(Ok(())),
                    },
                    Compatibility::RequiresRestart => match inner.start_op.follow() {
                        Some(rx) => Next::Retry(rx),
                        None => {
                            tracing::info!(
                                worker = self.name(),
                                current = %describe(inner.kind.as_ref()),
                                requested = %describe(requested.as_ref()),
                                "kind mismatch, restarting"
                            );
                            Next::Retry(self.begin_stop(&mut inner, false))
                        }
                    },
                    Compatibility::AwaitStopped => match inner.stop_op.follow() {
                        Some(rx) => Next::Retry(rx),
                        None => Next::Done(Err(WorkerError::Abandoned)),
                    },
                }
            };

            match next {
                Next::Done(outcome) => return outcome,
                Next::Wait(rx) => return received(rx.await),
                Next::Retry(rx) => {
                    if rx.await.is_err() {
                        return Err(WorkerError::Abandoned);
                    }
                }
            }
        }
    }

    /// Tear the resource down gracefully
    pub async fn insubstantiate(&self) -> Result<(), WorkerError> {
        self.stop_cycle(false).await
    }

    /// Tear the resource down, skipping graceful drain
    pub async fn insubstantiate_fast(&self) -> Result<(), WorkerError> {
        self.stop_cycle(true).await
    }

    async fn stop_cycle(&self, fast: bool) -> Result<(), WorkerError> {
        loop {
            let next = {
                let mut inner = self.lock();
                match inner.state {
                    WorkerState::Stopped => Next::Done(Ok(())),
                    // A stop only begins once the start has resolved
                    WorkerState::Starting => match inner.start_op.follow() {
                        Some(rx) => Next::Retry(rx),
                        None => Next::Done(Err(WorkerError::Abandoned)),
                    },
                    WorkerState::Started => match inner.start_op.follow() {
                        Some(rx) => Next::Retry(rx),
                        None => Next::Wait(self.begin_stop(&mut inner, fast)),
                    },
                    WorkerState::Stopping => match inner.stop_op.follow() {
                        Some(rx) => Next::Wait(rx),
                        None => Next::Done(Err(WorkerError::Abandoned)),
                    },
                }
            };

            match next {
                Next::Done(outcome) => return outcome,
                Next::Wait(rx) => return received(rx.await),
                Next::Retry(rx) => {
                    if rx.await.is_err() {
                        return Err(WorkerError::Abandoned);
                    }
                }
            }
        }
    }

    /// Whether a build could run here without restarting a live resource
    pub async fn is_compatible_with_build(&self, build: &BuildContext) -> Result<bool, WorkerError> {
        let requested = self.render_kind(build)?;
        let inner = self.lock();
        Ok(match inner.state {
            WorkerState::Stopped => true,
            _ => inner.kind == requested,
        })
    }

    /// Bind a build to the worker, rendering its kind first
    pub fn bind_build(&self, build: &BuildContext) -> Result<(), WorkerError> {
        let requested = self.render_kind(build)?;
        self.bind_kind(requested.as_ref())
    }

    /// Bind a build needing `requested`. Cancels a pending idle teardown.
    pub fn bind_kind(&self, requested: Option<&Kind>) -> Result<(), WorkerError> {
        let mut inner = self.lock();
        if inner.state != WorkerState::Started || inner.start_op.is_pending() {
            return Err(WorkerError::NotStarted { state: inner.state });
        }

        match resolve(inner.state, inner.kind.as_ref(), requested) {
            Compatibility::Reuse => {
                inner.builds += 1;
                if inner.idle.cancel() {
                    tracing::debug!(worker = self.name(), "idle timer cancelled");
                }
                self.publish(WorkerEvent::BuildBound {
                    worker: self.name().to_string(),
                    running: inner.builds,
                });
                Ok(())
            }
            _ => Err(WorkerError::IncompatibleKindPendingRestart {
                requested: describe(requested),
                current: describe(inner.kind.as_ref()),
            }),
        }
    }

    /// A bound build finished. The last one out arms the idle timer.
    pub fn unbind_build(&self) {
        let mut inner = self.lock();
        if inner.builds == 0 {
            tracing::warn!(worker = self.name(), "unbind with no builds bound");
            return;
        }

        inner.builds -= 1;
        self.publish(WorkerEvent::BuildUnbound {
            worker: self.name().to_string(),
            running: inner.builds,
        });

        if inner.builds == 0 && inner.state == WorkerState::Started {
            self.arm_idle(&mut inner, None);
        }
    }

    /// Probe the resource. An unhealthy report while started forces the
    /// worker to STOPPED without a provisioning stop.
    pub async fn check_health(&self) -> HealthStatus {
        let status = self.shared.provisioner.check_health(self.name()).await;
        let reason = match &status {
            HealthStatus::Healthy => None,
            HealthStatus::Unhealthy { reason } => Some(reason.clone()),
        };

        let session = {
            let mut inner = self.lock();
            inner.last_health = Some(status.clone());
            match reason {
                Some(reason) => self.absorb_crash(&mut inner, reason),
                None => None,
            }
        };

        if let Some(session) = session {
            if let Err(e) = self.shared.connector.detach(self.name(), &session).await {
                tracing::warn!(worker = self.name(), error = %e, "detach after crash failed");
            }
        }

        status
    }

    /// Returns the session to detach, if the crash stopped the worker
    fn absorb_crash(&self, inner: &mut Inner, reason: String) -> Option<String> {
        match inner.state {
            WorkerState::Stopped => None,
            WorkerState::Started if !inner.start_op.is_pending() => {
                self.report_anomaly(&WorkerError::HealthCheckFailed(reason));
                inner.crashed = true;
                let session = inner.session.take();
                self.transition(inner, WorkerState::Stopped);
                session
            }
            // Resolved by the in-flight operation: a failed start, or a
            // successful stop
            WorkerState::Starting | WorkerState::Started | WorkerState::Stopping => {
                self.report_anomaly(&WorkerError::HealthCheckFailed(reason.clone()));
                inner.pending_crash = Some(reason);
                None
            }
        }
    }

    fn begin_start(&self, inner: &mut Inner, kind: Option<Kind>) -> oneshot::Receiver<Outcome> {
        inner.kind = kind.clone();
        inner.crashed = false;
        inner.pending_crash = None;
        self.transition(inner, WorkerState::Starting);
        let rx = inner.start_op.join();

        let worker = self.clone();
        tokio::spawn(async move { worker.run_start(kind).await });
        rx
    }

    fn fail_start(&self, inner: &mut Inner, error: WorkerError) {
        tracing::warn!(worker = self.name(), error = %error, "start failed");
        if matches!(error, WorkerError::HealthCheckFailed(_)) {
            inner.crashed = true;
        }
        self.transition(inner, WorkerState::Stopped);
        inner.start_op.resolve(Err(error));
    }

    async fn run_start(self, kind: Option<Kind>) {
        let result = self.shared.provisioner.start(self.name(), kind.as_ref()).await;
        {
            let mut inner = self.lock();
            if let Some(reason) = inner.pending_crash.take() {
                self.fail_start(&mut inner, WorkerError::HealthCheckFailed(reason));
                return;
            }
            if let Err(e) = result {
                self.fail_start(&mut inner, WorkerError::ProvisionStartFailed(e.to_string()));
                return;
            }
            self.transition(&mut inner, WorkerState::Started);
        }

        // Start waiters stay blocked until the session is attached
        let timeout = self.shared.config.connect_timeout;
        let attached =
            match tokio::time::timeout(timeout, self.shared.connector.attach(self.name())).await {
                Ok(Ok(session)) => Ok(session),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!(
                    "no session within {}s",
                    timeout.as_secs_f64()
                )),
            };

        let cleanup = {
            let mut inner = self.lock();
            match (attached, inner.pending_crash.take()) {
                (Ok(session), None) => {
                    inner.session = Some(session);
                    inner.start_op.resolve(Ok(()));
                    return;
                }
                (attached, Some(reason)) => {
                    // The resource died while the session was attaching
                    inner.crashed = true;
                    self.transition(&mut inner, WorkerState::Stopped);
                    inner
                        .start_op
                        .resolve(Err(WorkerError::HealthCheckFailed(reason)));
                    match attached {
                        Ok(session) => AttachCleanup::Detach(session),
                        Err(_) => return,
                    }
                }
                (Err(reason), None) => {
                    tracing::warn!(worker = self.name(), %reason, "session did not attach");
                    self.transition(&mut inner, WorkerState::Stopping);
                    drop(inner.stop_op.join());
                    AttachCleanup::FastStop(reason)
                }
            }
        };

        match cleanup {
            AttachCleanup::FastStop(reason) => self.abort_start(reason).await,
            AttachCleanup::Detach(session) => {
                if let Err(e) = self.shared.connector.detach(self.name(), &session).await {
                    tracing::warn!(worker = self.name(), error = %e, "detach after crash failed");
                }
            }
        }
    }

    /// Fast-stop a resource whose session never attached, then fail the start
    async fn abort_start(&self, reason: String) {
        let result = self.shared.provisioner.stop(self.name(), true).await;

        let mut inner = self.lock();
        let crashed = inner.pending_crash.take();
        self.transition(&mut inner, WorkerState::Stopped);

        let stop_outcome = match (result, crashed) {
            (Err(e), None) => {
                let error = WorkerError::ProvisionStopFailed(e.to_string());
                self.report_anomaly(&error);
                Err(error)
            }
            _ => Ok(()),
        };
        inner.stop_op.resolve(stop_outcome);
        inner
            .start_op
            .resolve(Err(WorkerError::ProvisionStartFailed(format!(
                "session did not attach: {}",
                reason
            ))));
    }

    fn begin_stop(&self, inner: &mut Inner, fast: bool) -> oneshot::Receiver<Outcome> {
        self.transition(inner, WorkerState::Stopping);
        inner.idle.cancel();
        inner.pending_crash = None;
        let session = inner.session.take();
        let rx = inner.stop_op.join();

        let worker = self.clone();
        tokio::spawn(async move { worker.run_stop(session, fast).await });
        rx
    }

    async fn run_stop(self, session: Option<String>, fast: bool) {
        // Resource is going down: the session goes first
        if let Some(session) = session {
            if let Err(e) = self.shared.connector.detach(self.name(), &session).await {
                tracing::warn!(worker = self.name(), error = %e, "detach failed");
            }
        }

        let result = self.shared.provisioner.stop(self.name(), fast).await;

        let mut inner = self.lock();
        let crashed = inner.pending_crash.take();
        // Reached even when the stop failed, so later starts never deadlock
        self.transition(&mut inner, WorkerState::Stopped);

        let outcome = match (result, crashed) {
            (Err(e), None) => {
                let error = WorkerError::ProvisionStopFailed(e.to_string());
                self.report_anomaly(&error);
                Err(error)
            }
            _ => Ok(()),
        };
        inner.stop_op.resolve(outcome);
    }

    /// Arm the idle timer for `after`, or for the configured timeout
    fn arm_idle(&self, inner: &mut Inner, after: Option<Duration>) {
        let Some(after) = after.or(self.shared.config.build_wait_timeout.duration()) else {
            return;
        };

        let weak = Arc::downgrade(&self.shared);
        let token = inner.idle.arm(after, move |token| async move {
            if let Some(shared) = weak.upgrade() {
                LatentWorker { shared }.idle_expired(token);
            }
        });
        tracing::debug!(
            worker = self.name(),
            after_ms = after.as_millis() as u64,
            token,
            "idle timer armed"
        );
    }

    fn idle_expired(&self, token: u64) {
        let mut inner = self.lock();
        if !inner.idle.take_if_current(token) {
            return;
        }
        if inner.state != WorkerState::Started || inner.builds > 0 || inner.start_op.is_pending() {
            return;
        }

        let uptime = inner
            .started_at
            .map(|at| at.elapsed())
            .unwrap_or_default();
        if let Some(delay) = self.shared.policy.defer(uptime) {
            tracing::debug!(
                worker = self.name(),
                delay_ms = delay.as_millis() as u64,
                "idle teardown deferred by policy"
            );
            self.arm_idle(&mut inner, Some(delay));
            return;
        }

        tracing::info!(worker = self.name(), "idle timeout expired, insubstantiating");
        // Nobody waits on an idle teardown; the stop task completes it
        drop(self.begin_stop(&mut inner, false));
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;

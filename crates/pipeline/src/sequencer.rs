//! Queue sequencer: drains each lane one job at a time.
//!
//! Every lane runs its own task with an explicit state machine:
//!
//! ```text
//! Idle ──▶ Submitting ──ok──▶ Awaiting ──terminal──▶ Advancing ──▶ Submitting | Idle
//!               └────────err────────────────────────────▲
//! ```
//!
//! An item leaves the [`QueueStore`] when its submission returns, success
//! or failure. Submission failures, poll errors, timeouts and cancellations
//! are reported and the lane moves on; only a clear or stop-all halts it.
//!
//! With [`LaneMode::Shared`] both lanes contend for one submission slot, so
//! the render backend never sees two of our jobs at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use texgen_core::generation::{Artifacts, PreviewSet};
use texgen_core::job_events;
use texgen_core::notification::Notification;
use texgen_core::policy::{LaneMode, QueuePolicy};
use texgen_core::queue::{Lane, QueueItem, QueueItemId};
use texgen_core::types::DbId;
use texgen_events::{EventBus, Notifier, PlatformEvent};
use tokio::sync::{watch, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::poller::{CompletionPoller, PollEvent};
use crate::presets::PresetRegistry;
use crate::records::{JobRecords, CANCELLED_MESSAGE, INTERRUPTED_MESSAGE};
use crate::session::SessionState;
use crate::store::QueueStore;
use crate::submitter::{JobSubmitter, SubmissionError};

/// Number of history rows kept per user after a completion.
const HISTORY_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// Lane state
// ---------------------------------------------------------------------------

/// Observable state of one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LaneState {
    Idle,
    Submitting {
        item_id: QueueItemId,
        owner: DbId,
    },
    Awaiting {
        item_id: QueueItemId,
        job_id: DbId,
        owner: DbId,
    },
    Advancing,
}

/// Per-lane view returned by [`Sequencer::status`].
#[derive(Debug, Clone, Serialize)]
pub struct LaneStatus {
    pub lane: Lane,
    pub state: LaneState,
    pub armed: bool,
    pub items: Vec<QueueItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    /// Items waiting across both lanes.
    pub count: usize,
    pub lane_mode: LaneMode,
    pub lanes: Vec<LaneStatus>,
}

/// Result of [`Sequencer::stop_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct StopSummary {
    pub cleared_items: usize,
    pub failed_jobs: u64,
}

/// Why the Awaiting job's poller was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HaltReason {
    /// User cancel or lane clear: the lane task marks and interrupts.
    Cancel,
    /// Stop-all. `swept` is set when the job was already Awaiting, so
    /// `stop_all` marks its row itself.
    Stop { swept: bool },
}

struct LaneControl {
    lane: Lane,
    state: watch::Sender<LaneState>,
    wake: Notify,
    armed: AtomicBool,
    /// Halts the running drain; child of the shutdown token.
    drain: Mutex<Option<CancellationToken>>,
    /// Stops polling of the Awaiting job; child of the drain token.
    job: Mutex<Option<CancellationToken>>,
    reason: Mutex<HaltReason>,
    /// Original job id of the upgrade between submission and its terminal.
    upgrading: Mutex<Option<DbId>>,
}

impl LaneControl {
    fn new(lane: Lane) -> Self {
        let (state, _) = watch::channel(LaneState::Idle);
        Self {
            lane,
            state,
            wake: Notify::new(),
            armed: AtomicBool::new(lane.auto_starts()),
            drain: Mutex::new(None),
            job: Mutex::new(None),
            reason: Mutex::new(HaltReason::Cancel),
            upgrading: Mutex::new(None),
        }
    }

    fn set(&self, state: LaneState) {
        tracing::debug!(lane = %self.lane, state = ?state, "Lane state");
        self.state.send_replace(state);
    }

    fn state(&self) -> LaneState {
        self.state.borrow().clone()
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    fn set_job(&self, token: Option<CancellationToken>) {
        *self.job.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn set_drain(&self, token: Option<CancellationToken>) {
        *self.drain.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn set_upgrading(&self, original: Option<DbId>) {
        *self.upgrading.lock().unwrap_or_else(|e| e.into_inner()) = original;
    }

    fn upgrading(&self) -> Option<DbId> {
        *self.upgrading.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reason(&self) -> HaltReason {
        *self.reason.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_reason(&self, reason: HaltReason) {
        *self.reason.lock().unwrap_or_else(|e| e.into_inner()) = reason;
    }

    /// Cancel the Awaiting job, if any.
    fn cancel_job(&self, reason: HaltReason) -> bool {
        match self.job.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(token) => {
                self.set_reason(reason);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Halt the running drain, if any. A job submitted after this ends
    /// with `reason`.
    fn halt(&self, reason: HaltReason) {
        self.set_reason(reason);
        if let Some(token) = self.drain.lock().unwrap_or_else(|e| e.into_inner()).take() {
            token.cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

pub struct Sequencer {
    store: Arc<QueueStore>,
    session: Arc<SessionState>,
    presets: Arc<PresetRegistry>,
    submitter: Arc<dyn JobSubmitter>,
    records: Arc<dyn JobRecords>,
    notifier: Arc<Notifier>,
    policy: QueuePolicy,
    /// Present in [`LaneMode::Shared`].
    slot: Option<Semaphore>,
    continuous: LaneControl,
    batch: LaneControl,
}

impl Sequencer {
    pub fn new(
        policy: QueuePolicy,
        submitter: Arc<dyn JobSubmitter>,
        records: Arc<dyn JobRecords>,
        notifier: Arc<Notifier>,
    ) -> Self {
        let slot = match policy.lane_mode {
            LaneMode::Shared => Some(Semaphore::new(1)),
            LaneMode::Independent => None,
        };
        Self {
            store: Arc::new(QueueStore::new()),
            session: Arc::new(SessionState::new()),
            presets: Arc::new(PresetRegistry::default()),
            submitter,
            records,
            notifier,
            policy,
            slot,
            continuous: LaneControl::new(Lane::Continuous),
            batch: LaneControl::new(Lane::Batch),
        }
    }

    pub fn with_presets(mut self, presets: Arc<PresetRegistry>) -> Self {
        self.presets = presets;
        self
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn presets(&self) -> &Arc<PresetRegistry> {
        &self.presets
    }

    pub fn submitter(&self) -> &Arc<dyn JobSubmitter> {
        &self.submitter
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    pub fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    /// Spawn one task per lane. Tasks exit when `shutdown` fires.
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        Lane::ALL
            .into_iter()
            .map(|lane| {
                let this = Arc::clone(self);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { this.run_lane(lane, shutdown).await })
            })
            .collect()
    }

    // ---- queue operations ----

    /// Add an item to its lane. Continuous items start draining at once.
    pub fn enqueue(&self, item: QueueItem) -> QueueItem {
        let mut item = item;
        item.id = self.store.enqueue(item.clone());
        if let Some(original) = item.kind.upgrade_of() {
            self.session.begin_upgrade(original);
        }
        tracing::info!(
            item_id = %item.id,
            lane = %item.lane,
            owner = %item.owner,
            queued = self.store.lane_len(item.lane),
            "Item enqueued",
        );
        // An armed batch lane picks up late arrivals too.
        self.control(item.lane).wake.notify_one();
        item
    }

    /// Remove a pending item by id or upgrade back-reference.
    pub fn dequeue(&self, id: uuid::Uuid) -> Option<QueueItem> {
        let removed = self.store.dequeue(id)?;
        if let Some(original) = removed.kind.upgrade_of() {
            self.session.abort_upgrade(original);
        }
        tracing::info!(item_id = %removed.id, lane = %removed.lane, "Item dequeued");
        Some(removed)
    }

    /// Arm a lane so it drains what it holds.
    pub fn start_lane(&self, lane: Lane) {
        tracing::info!(lane = %lane, "Lane started");
        self.control(lane).arm();
    }

    /// Cancel the Awaiting job of `lane`. Returns the job id if one was
    /// cancelled.
    pub fn cancel_current(&self, lane: Lane, actor: DbId) -> Option<DbId> {
        let control = self.control(lane);
        let LaneState::Awaiting { job_id, .. } = control.state() else {
            return None;
        };
        if !control.cancel_job(HaltReason::Cancel) {
            return None;
        }
        tracing::info!(lane = %lane, job_id = %job_id, actor = %actor, "Cancel requested");
        Some(job_id)
    }

    /// Empty a lane and stop its drain. Returns the number of items removed.
    pub fn clear_lane(&self, lane: Lane, actor: DbId) -> usize {
        let removed = self.halt_lane(lane, HaltReason::Cancel);
        tracing::info!(lane = %lane, removed, actor = %actor, "Lane cleared");

        self.bus().publish(
            PlatformEvent::new(job_events::QUEUE_CLEARED)
                .with_lane(lane)
                .with_actor(actor)
                .with_payload(serde_json::json!({ "removed": removed })),
        );
        self.notifier.notify(
            Notification::warning(format!("Cleared {lane} queue ({removed} removed)"))
                .with_lane(lane),
        );
        removed
    }

    /// Halt everything: clear both lanes, fail every `processing` row, drop
    /// the backend's pending jobs and interrupt the running one.
    ///
    /// Halted lane tasks leave the rows to this call, so each one ends with
    /// [`INTERRUPTED_MESSAGE`].
    pub async fn stop_all(&self, actor: DbId) -> StopSummary {
        let cleared_items: usize = Lane::ALL
            .into_iter()
            .map(|lane| {
                let swept = matches!(self.lane_state(lane), LaneState::Awaiting { .. });
                self.halt_lane(lane, HaltReason::Stop { swept })
            })
            .sum();

        let failed_jobs = match self.records.fail_all_processing(INTERRUPTED_MESSAGE).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "Failed to mark processing jobs as failed");
                0
            }
        };
        if let Err(e) = self.submitter.clear_queued().await {
            tracing::warn!(error = %e, "Failed to clear render backend queue");
        }
        if let Err(e) = self.submitter.interrupt().await {
            tracing::warn!(error = %e, "Failed to interrupt render backend");
        }

        tracing::warn!(cleared_items, failed_jobs, actor = %actor, "All processing stopped");
        for lane in Lane::ALL {
            self.bus().publish(
                PlatformEvent::new(job_events::QUEUE_CLEARED)
                    .with_lane(lane)
                    .with_actor(actor),
            );
        }
        self.notifier.notify(Notification::warning(format!(
            "All generations stopped ({failed_jobs} interrupted, {cleared_items} removed from queue)"
        )));
        StopSummary {
            cleared_items,
            failed_jobs,
        }
    }

    // ---- inspection ----

    /// Whether an upgrade of `original` is queued or in flight.
    pub fn upgrade_pending(&self, original: DbId) -> bool {
        self.store.find(original).is_some()
            || Lane::ALL
                .into_iter()
                .any(|lane| self.control(lane).upgrading() == Some(original))
    }

    pub fn lane_state(&self, lane: Lane) -> LaneState {
        self.control(lane).state()
    }

    pub fn subscribe_state(&self, lane: Lane) -> watch::Receiver<LaneState> {
        self.control(lane).state.subscribe()
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            count: self.store.count(),
            lane_mode: self.policy.lane_mode,
            lanes: Lane::ALL
                .into_iter()
                .map(|lane| {
                    let control = self.control(lane);
                    LaneStatus {
                        lane,
                        state: control.state(),
                        armed: control.is_armed(),
                        items: self.store.snapshot(lane),
                    }
                })
                .collect(),
        }
    }

    // ---- lane loop ----

    /// Drive one lane until `shutdown` fires.
    pub async fn run_lane(&self, lane: Lane, shutdown: CancellationToken) {
        let control = self.control(lane);
        tracing::info!(lane = %lane, "Sequencer lane started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            if control.is_armed() && self.store.lane_len(lane) > 0 {
                self.drain(control, &shutdown).await;
                if !lane.auto_starts() {
                    control.armed.store(false, Ordering::SeqCst);
                }
                continue;
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = control.wake.notified() => {}
            }
        }
        tracing::info!(lane = %lane, "Sequencer lane shutting down");
    }

    /// Process the lane head by head until it is empty or halted.
    async fn drain(&self, control: &LaneControl, shutdown: &CancellationToken) {
        let lane = control.lane;
        let halt = shutdown.child_token();
        control.set_drain(Some(halt.clone()));
        let mut processed = 0usize;

        loop {
            if halt.is_cancelled() || self.store.lane_len(lane) == 0 {
                break;
            }

            let permit = match &self.slot {
                Some(slot) => tokio::select! {
                    _ = halt.cancelled() => break,
                    permit = slot.acquire() => match permit {
                        Ok(p) => Some(p),
                        Err(_) => break,
                    },
                },
                None => None,
            };

            // The head may have been dequeued while waiting for the slot.
            let Some(item) = self.store.peek_first(lane) else {
                break;
            };

            control.set_upgrading(item.kind.upgrade_of());
            control.set(LaneState::Submitting {
                item_id: item.id,
                owner: item.owner,
            });
            let preset = self.presets.active();
            let result = self.submitter.submit(&item, &preset).await;
            self.store.remove_item(item.id);
            processed += 1;

            let delay = match result {
                Ok(job_id) => {
                    self.on_submitted(&item, job_id);
                    self.await_job(control, &item, job_id, &halt, shutdown).await;
                    self.policy.inter_item_delay
                }
                Err(e) => {
                    self.on_submission_failed(&item, e).await;
                    self.policy.failure_delay
                }
            };
            drop(permit);

            control.set_upgrading(None);
            control.set(LaneState::Advancing);
            if halt.is_cancelled() || self.store.lane_len(lane) == 0 {
                break;
            }
            tokio::select! {
                _ = halt.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        control.set_drain(None);
        control.set(LaneState::Idle);

        if processed > 0 && !halt.is_cancelled() && self.is_fully_drained() {
            self.on_drained(processed);
        }
    }

    /// Poll the submitted job until it ends, surfacing previews on the way.
    async fn await_job(
        &self,
        control: &LaneControl,
        item: &QueueItem,
        job_id: DbId,
        halt: &CancellationToken,
        shutdown: &CancellationToken,
    ) {
        let cancel = halt.child_token();
        control.set_job(Some(cancel.clone()));
        control.set(LaneState::Awaiting {
            item_id: item.id,
            job_id,
            owner: item.owner,
        });

        let mut poller = CompletionPoller::new(
            Arc::clone(&self.records),
            job_id,
            self.policy.poll_interval,
            self.policy.job_timeout,
            cancel,
        );

        loop {
            let event = poller.next_event().await;
            if let Some(PollEvent::Preview(previews)) = event {
                self.on_preview(item, job_id, previews);
                continue;
            }

            control.set_job(None);
            match event {
                Some(PollEvent::Completed(artifacts)) => {
                    self.on_completed(item, job_id, artifacts).await
                }
                Some(PollEvent::Failed(message)) => self.on_failed(item, job_id, &message),
                Some(PollEvent::Vanished) => self.on_vanished(item, job_id),
                Some(PollEvent::Timeout { elapsed }) => {
                    self.on_timeout(item, job_id, elapsed).await
                }
                Some(PollEvent::Preview(_)) => {}
                None if shutdown.is_cancelled() => {
                    tracing::info!(job_id = %job_id, "Shutdown while awaiting job, record left processing");
                }
                None => match control.reason() {
                    HaltReason::Cancel => self.on_cancelled(item, job_id).await,
                    HaltReason::Stop { swept } => self.on_stopped(item, job_id, swept).await,
                },
            }
            return;
        }
    }

    // ---- transition side effects ----

    fn on_submitted(&self, item: &QueueItem, job_id: DbId) {
        self.bus().publish(
            self.job_event(job_events::JOB_SUBMITTED, item, job_id)
                .with_payload(serde_json::json!({ "item_id": item.id })),
        );
        self.notify(item, Some(job_id), Notification::info("Generation started"));
    }

    async fn on_submission_failed(&self, item: &QueueItem, err: SubmissionError) {
        tracing::error!(
            item_id = %item.id,
            lane = %item.lane,
            job_id = ?err.job_id,
            error = %err.message,
            "Submission failed",
        );
        if let Some(job_id) = err.job_id {
            let message = format!("ComfyUI submission failed: {}", err.message);
            if let Err(e) = self.records.mark_failed(job_id, &message).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
            }
        }
        if let Some(original) = item.kind.upgrade_of() {
            self.session.abort_upgrade(original);
        }

        let mut event = PlatformEvent::new(job_events::JOB_SUBMISSION_FAILED)
            .with_lane(item.lane)
            .with_owner(item.owner)
            .with_payload(serde_json::json!({ "item_id": item.id, "error": err.message }));
        if let Some(job_id) = err.job_id {
            event = event.with_job(job_id);
        }
        self.bus().publish(event);
        self.notify(
            item,
            err.job_id,
            Notification::error(format!("Failed to start generation: {}", err.message)),
        );
    }

    fn on_preview(&self, item: &QueueItem, job_id: DbId, previews: PreviewSet) {
        self.session.apply_preview(job_id, previews.clone());
        self.bus().publish(
            self.job_event(job_events::JOB_PREVIEW, item, job_id)
                .with_payload(serde_json::json!({ "previews": previews })),
        );
        self.notify(item, Some(job_id), Notification::info("Preview ready"));
    }

    async fn on_completed(&self, item: &QueueItem, job_id: DbId, artifacts: Artifacts) {
        let applied = self.session.apply_completion(
            job_id,
            &artifacts,
            item.effective_high_quality(),
            item.kind.upgrade_of(),
        );
        if !applied {
            tracing::debug!(job_id = %job_id, "Completion already applied");
            return;
        }
        tracing::info!(job_id = %job_id, lane = %item.lane, "Job completed");

        match self.records.history(item.owner, HISTORY_LIMIT).await {
            Ok(history) => self.session.set_history(item.owner, &history),
            Err(e) => tracing::warn!(owner = %item.owner, error = %e, "Failed to refresh history"),
        }

        self.bus().publish(
            self.job_event(job_events::JOB_COMPLETED, item, job_id)
                .with_payload(serde_json::json!({ "artifacts": artifacts })),
        );
        let message = if item.kind.upgrade_of().is_some() {
            "High-quality textures applied"
        } else {
            "Textures generated and applied"
        };
        self.notify(item, Some(job_id), Notification::success(message));
    }

    fn on_failed(&self, item: &QueueItem, job_id: DbId, message: &str) {
        tracing::warn!(job_id = %job_id, lane = %item.lane, error = %message, "Job failed");
        if let Some(original) = item.kind.upgrade_of() {
            self.session.abort_upgrade(original);
        }
        self.bus().publish(
            self.job_event(job_events::JOB_FAILED, item, job_id)
                .with_payload(serde_json::json!({ "error": message })),
        );
        self.notify(
            item,
            Some(job_id),
            Notification::error(format!("Generation failed: {message}")),
        );
    }

    fn on_vanished(&self, item: &QueueItem, job_id: DbId) {
        tracing::info!(job_id = %job_id, "Job record vanished, treating as cancelled");
        if let Some(original) = item.kind.upgrade_of() {
            self.session.abort_upgrade(original);
        }
        self.bus().publish(
            self.job_event(job_events::JOB_CANCELLED, item, job_id)
                .with_payload(serde_json::json!({ "reason": "vanished" })),
        );
        self.notify(item, Some(job_id), Notification::info("Generation was removed"));
    }

    async fn on_timeout(&self, item: &QueueItem, job_id: DbId, elapsed: std::time::Duration) {
        let minutes = elapsed.as_secs() / 60;
        tracing::warn!(job_id = %job_id, lane = %item.lane, minutes, "Job timed out");
        let message = format!("Timed out after {minutes} minutes");
        if let Err(e) = self.records.mark_failed(job_id, &message).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to mark timed out job");
        }
        // The next submission must not overlap the hung one.
        if let Err(e) = self.submitter.interrupt().await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to interrupt render backend");
        }
        if let Some(original) = item.kind.upgrade_of() {
            self.session.abort_upgrade(original);
        }
        self.bus().publish(
            self.job_event(job_events::JOB_TIMED_OUT, item, job_id)
                .with_payload(serde_json::json!({ "elapsed_secs": elapsed.as_secs() })),
        );
        self.notify(
            item,
            Some(job_id),
            Notification::error(format!("Generation timed out after {minutes} minutes")),
        );
    }

    async fn on_cancelled(&self, item: &QueueItem, job_id: DbId) {
        tracing::info!(job_id = %job_id, lane = %item.lane, "Job cancelled");
        if let Err(e) = self.records.mark_failed(job_id, CANCELLED_MESSAGE).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to mark cancelled job");
        }
        if let Err(e) = self.submitter.interrupt().await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to interrupt render backend");
        }
        if let Some(original) = item.kind.upgrade_of() {
            self.session.abort_upgrade(original);
        }
        self.bus().publish(
            self.job_event(job_events::JOB_CANCELLED, item, job_id)
                .with_payload(serde_json::json!({ "reason": "cancelled" })),
        );
        self.notify(item, Some(job_id), Notification::info("Generation cancelled"));
    }

    /// Stop-all reached the Awaiting job. `stop_all` interrupts the backend
    /// and sends the notification.
    async fn on_stopped(&self, item: &QueueItem, job_id: DbId, swept: bool) {
        tracing::info!(job_id = %job_id, lane = %item.lane, "Job stopped");
        // Still submitting when the rows were swept.
        if !swept {
            if let Err(e) = self.records.mark_failed(job_id, INTERRUPTED_MESSAGE).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark stopped job");
            }
        }
        if let Some(original) = item.kind.upgrade_of() {
            self.session.abort_upgrade(original);
        }
        self.bus().publish(
            self.job_event(job_events::JOB_CANCELLED, item, job_id)
                .with_payload(serde_json::json!({ "reason": "stopped" })),
        );
    }

    fn on_drained(&self, processed: usize) {
        tracing::info!(processed, "Queue drained");
        self.bus().publish(
            PlatformEvent::new(job_events::QUEUE_DRAINED)
                .with_payload(serde_json::json!({ "processed": processed })),
        );
        self.notifier.notify(Notification::success(format!(
            "Queue completed! Processed {processed} generations."
        )));
    }

    // ---- private helpers ----

    fn control(&self, lane: Lane) -> &LaneControl {
        match lane {
            Lane::Continuous => &self.continuous,
            Lane::Batch => &self.batch,
        }
    }

    fn bus(&self) -> &EventBus {
        self.notifier.bus()
    }

    /// Empty a lane, cancel its current job and halt its drain.
    fn halt_lane(&self, lane: Lane, reason: HaltReason) -> usize {
        let control = self.control(lane);
        let removed = self.store.clear_lane(lane);
        if !lane.auto_starts() {
            control.armed.store(false, Ordering::SeqCst);
        }
        control.cancel_job(reason);
        control.halt(reason);
        removed
    }

    /// No items queued and no lane busy.
    fn is_fully_drained(&self) -> bool {
        self.store.count() == 0
            && Lane::ALL
                .into_iter()
                .all(|lane| self.control(lane).state() == LaneState::Idle)
    }

    fn job_event(&self, event_type: &str, item: &QueueItem, job_id: DbId) -> PlatformEvent {
        PlatformEvent::new(event_type)
            .with_job(job_id)
            .with_lane(item.lane)
            .with_owner(item.owner)
    }

    fn notify(&self, item: &QueueItem, job_id: Option<DbId>, notification: Notification) {
        let mut n = notification.for_user(item.owner).with_lane(item.lane);
        if let Some(job_id) = job_id {
            n = n.with_job(job_id);
        }
        self.notifier.notify(n);
    }
}

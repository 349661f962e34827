//! Debounced background saving.
//!
//! The scheduler runs as a background tokio task fed through a channel. It
//! waits for a quiet period after the last change, then performs exactly one
//! `update_composition` call with the latest snapshot. Saves are awaited
//! inside the task loop, so two saves for a composition can never overlap:
//! changes that arrive while a save is in flight queue up and start a fresh
//! debounce once it completes.
//!
//! ```text
//! Disabled --load--> Idle --change--> Pending --quiet period--> Saving --> Idle
//!     ^                                  |  ^                                |
//!     +-------------unload---------------+  +----change (queued)-------------+
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::composition::{CompositionId, CompositionPayload};
use crate::persistence::{PersistenceClient, PersistenceError};

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(5000);

/// Undrained reports kept at most, oldest dropped first
const MAX_REPORTS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutosaveState {
    /// No persisted composition is loaded
    Disabled,
    Idle,
    /// A save is scheduled for the end of the quiet period
    Pending,
    Saving,
}

/// Outcome of one background save
#[derive(Debug)]
pub struct AutosaveReport {
    pub id: CompositionId,
    pub result: Result<(), PersistenceError>,
}

/// Latest undrained report per composition
#[derive(Debug, Default)]
struct ReportLog {
    reports: Mutex<VecDeque<AutosaveReport>>,
}

impl ReportLog {
    fn push(&self, report: AutosaveReport) {
        let mut reports = self.reports.lock();
        reports.retain(|existing| existing.id != report.id);
        if reports.len() == MAX_REPORTS {
            reports.pop_front();
        }
        reports.push_back(report);
    }

    fn pop(&self) -> Option<AutosaveReport> {
        self.reports.lock().pop_front()
    }
}

enum AutosaveEvent {
    Load(CompositionId),
    Unload,
    Changed {
        id: CompositionId,
        payload: CompositionPayload,
    },
    SaveNow {
        id: CompositionId,
        payload: CompositionPayload,
        reply: oneshot::Sender<Result<(), PersistenceError>>,
    },
}

/// Front end of the scheduler task. Dropping it stops the task and cancels
/// any pending save.
#[derive(Debug)]
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<AutosaveEvent>,
    state: watch::Receiver<AutosaveState>,
    reports: Arc<ReportLog>,
    running: bool,
}

impl std::fmt::Debug for AutosaveEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutosaveEvent::Load(id) => write!(f, "Load({id})"),
            AutosaveEvent::Unload => f.write_str("Unload"),
            AutosaveEvent::Changed { id, .. } => write!(f, "Changed({id})"),
            AutosaveEvent::SaveNow { id, .. } => write!(f, "SaveNow({id})"),
        }
    }
}

impl AutosaveHandle {
    /// Start the scheduler. Outside a tokio runtime no task is spawned and
    /// the handle stays `Disabled`, which keeps synchronous callers usable.
    pub fn spawn(client: Arc<dyn PersistenceClient>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(AutosaveState::Disabled);
        let reports = Arc::new(ReportLog::default());

        let running = tokio::runtime::Handle::try_current().is_ok();
        if running {
            let scheduler = Scheduler {
                client,
                delay,
                loaded: None,
                pending: None,
                state: state_tx,
                reports: reports.clone(),
            };
            tokio::spawn(scheduler.run(rx));
        } else {
            log::debug!("no tokio runtime, autosave disabled");
        }

        Self {
            tx,
            state: state_rx,
            reports,
            running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> AutosaveState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<AutosaveState> {
        self.state.clone()
    }

    /// Enable autosave for `id`, cancelling anything pending for another id
    pub fn load(&self, id: CompositionId) {
        self.send(AutosaveEvent::Load(id));
    }

    /// Disable autosave and cancel any pending save
    pub fn unload(&self) {
        self.send(AutosaveEvent::Unload);
    }

    /// Record a change; (re)arms the debounce timer when `id` is loaded
    pub fn notify(&self, id: &CompositionId, payload: CompositionPayload) {
        self.send(AutosaveEvent::Changed {
            id: id.clone(),
            payload,
        });
    }

    /// Save immediately through the scheduler, serialized with background
    /// saves. Supersedes any pending debounce for the same id.
    pub async fn save_now(
        &self,
        id: &CompositionId,
        payload: CompositionPayload,
    ) -> Result<(), PersistenceError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(AutosaveEvent::SaveNow {
                id: id.clone(),
                payload,
                reply,
            })
            .map_err(|_| PersistenceError::Unavailable("autosave scheduler is not running".into()))?;
        response
            .await
            .map_err(|_| PersistenceError::Unavailable("autosave scheduler stopped".into()))?
    }

    /// Next finished background save, if any. Only the most recent report
    /// per composition is kept until drained.
    pub fn try_next_report(&mut self) -> Option<AutosaveReport> {
        self.reports.pop()
    }

    fn send(&self, event: AutosaveEvent) {
        if self.running && self.tx.send(event).is_err() {
            log::warn!("autosave scheduler has stopped");
        }
    }
}

struct Scheduler {
    client: Arc<dyn PersistenceClient>,
    delay: Duration,
    loaded: Option<CompositionId>,
    pending: Option<CompositionPayload>,
    state: watch::Sender<AutosaveState>,
    reports: Arc<ReportLog>,
}

impl Scheduler {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<AutosaveEvent>) {
        let mut deadline: Option<Instant> = None;
        loop {
            let event = match deadline {
                Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        deadline = None;
                        self.flush().await;
                        continue;
                    }
                },
                None => rx.recv().await,
            };
            let Some(event) = event else {
                if self.pending.is_some() {
                    log::debug!("autosave handle dropped, pending save cancelled");
                }
                break;
            };
            deadline = self.handle_event(event, deadline).await;
        }
    }

    async fn handle_event(&mut self, event: AutosaveEvent, deadline: Option<Instant>) -> Option<Instant> {
        log::trace!("autosave event {event:?}");
        match event {
            AutosaveEvent::Load(id) => {
                if self.loaded.as_ref() == Some(&id) {
                    return deadline;
                }
                let previous = self.loaded.replace(id);
                if self.pending.take().is_some() {
                    log::debug!("cancelled pending autosave for {previous:?}");
                }
                self.set_state(AutosaveState::Idle);
                None
            }
            AutosaveEvent::Unload => {
                self.loaded = None;
                self.pending = None;
                self.set_state(AutosaveState::Disabled);
                None
            }
            AutosaveEvent::Changed { id, payload } => {
                if self.loaded.as_ref() != Some(&id) {
                    log::debug!("ignoring change for {id}, not the loaded composition");
                    return deadline;
                }
                self.pending = Some(payload);
                self.set_state(AutosaveState::Pending);
                Some(Instant::now() + self.delay)
            }
            AutosaveEvent::SaveNow { id, payload, reply } => {
                let is_loaded = self.loaded.as_ref() == Some(&id);
                let resume = if is_loaded {
                    self.pending = None;
                    None
                } else {
                    deadline
                };
                self.set_state(AutosaveState::Saving);
                let result = self.client.update_composition(&id, &payload).await;
                if reply.send(result).is_err() {
                    log::debug!("manual save of {id} finished after caller went away");
                }
                self.settle(resume.is_some());
                resume
            }
        }
    }

    async fn flush(&mut self) {
        let (Some(id), Some(payload)) = (self.loaded.clone(), self.pending.take()) else {
            self.settle(false);
            return;
        };

        self.set_state(AutosaveState::Saving);
        let result = self.client.update_composition(&id, &payload).await;
        match &result {
            Ok(()) => log::info!("autosaved composition {id}"),
            Err(err) => log::warn!("autosave of composition {id} failed: {err}"),
        }
        self.reports.push(AutosaveReport { id, result });
        self.settle(false);
    }

    fn settle(&self, still_pending: bool) {
        let state = match (&self.loaded, still_pending) {
            (None, _) => AutosaveState::Disabled,
            (Some(_), true) => AutosaveState::Pending,
            (Some(_), false) => AutosaveState::Idle,
        };
        self.set_state(state);
    }

    fn set_state(&self, state: AutosaveState) {
        self.state.send_replace(state);
    }
}

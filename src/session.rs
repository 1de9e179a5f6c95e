//! The workbench session.
//!
//! Owns the editable form, the navigation history, the latest response,
//! and the persistence handle. Every observer sees the same immutable
//! `SessionState` value through a watch channel; mutations replace the
//! whole value.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::dispatch::{
    Dispatcher, HeaderEntry, Method, RequestForm, ResponseRecord, Transport,
};
use crate::error::AppError;
use crate::history::{FormHistory, FormSnapshot};
use crate::store::{PrefsStore, SavedForm};

/// Immutable view of everything a surface can display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub form: RequestForm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseRecord>,
    pub in_flight: bool,
    pub back_available: bool,
    pub forward_available: bool,
}

/// The view-model equivalent. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Workbench {
    shared: Arc<Shared>,
}

struct Shared {
    dispatcher: Dispatcher,
    store: PrefsStore,
    inner: Mutex<Inner>,
    tx: watch::Sender<SessionState>,
}

struct Inner {
    form: RequestForm,
    response: Option<ResponseRecord>,
    history: FormHistory,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl Workbench {
    pub fn new(transport: Arc<dyn Transport>, store: PrefsStore) -> Self {
        let inner = Inner {
            form: RequestForm::default(),
            response: None,
            history: FormHistory::new(),
            task: None,
            generation: 0,
        };
        let (tx, _) = watch::channel(inner.snapshot());
        Self {
            shared: Arc::new(Shared {
                dispatcher: Dispatcher::new(transport),
                store,
                inner: Mutex::new(inner),
                tx,
            }),
        }
    }

    /// Loads the saved form and seeds history with it, so the first back
    /// step of a restored session lands on the blank default. A wholly
    /// blank saved form seeds nothing.
    pub fn load(&self) -> Result<SessionState, AppError> {
        let saved = self.shared.store.load_form()?;
        let headers = self.shared.store.load_headers()?;

        let mut inner = self.shared.lock_inner();
        inner.form = RequestForm {
            url: saved.url,
            body: saved.body,
            headers: headers
                .into_iter()
                .map(|(name, value)| HeaderEntry::new(name, value.unwrap_or_default()))
                .collect(),
            trust_all: saved.trust_all,
        };
        let snapshot = FormSnapshot::capture(&inner.form);
        inner.history.record_if_changed(snapshot);
        Ok(self.shared.publish(inner))
    }

    /// Current state, straight from the session's own bookkeeping.
    pub fn state(&self) -> SessionState {
        self.shared.lock_inner().snapshot()
    }

    /// Watch-style subscription; the receiver always yields the latest
    /// published state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.tx.subscribe()
    }

    /// Replaces the editable form without dispatching. Typing does not
    /// touch history; only dispatch records snapshots.
    pub fn update_form(&self, form: RequestForm) -> SessionState {
        let mut inner = self.shared.lock_inner();
        inner.form = form;
        self.shared.publish(inner)
    }

    /// Records history, persists the form, and starts the request on the
    /// runtime, returning immediately. A dispatch issued while another is
    /// in flight aborts the older task; a stale result is discarded even
    /// if the abort lands after it finished.
    pub fn dispatch(&self, method: Method, form: RequestForm) -> SessionState {
        let mut inner = self.shared.lock_inner();
        inner.form = form.clone();

        let snapshot = FormSnapshot::capture(&form);
        inner.history.record_if_changed(snapshot);

        if let Err(err) = self.shared.persist(&form) {
            tracing::warn!(error = %err, "Could not persist the form before dispatch");
        }

        if let Some(task) = inner.task.take() {
            task.abort();
            tracing::debug!("Aborted superseded request");
        }
        inner.generation += 1;
        let generation = inner.generation;

        let shared = Arc::clone(&self.shared);
        inner.task = Some(tokio::spawn(async move {
            let record = shared.dispatcher.dispatch(method, &form).await;
            shared.finish(generation, record);
        }));

        self.shared.publish(inner)
    }

    /// Applies back navigation to the form. A gated surface never calls
    /// this with nothing stacked; if one does anyway, the state comes back
    /// unchanged.
    pub fn go_back(&self) -> SessionState {
        let mut inner = self.shared.lock_inner();
        if inner.history.can_go_back() {
            let current = FormSnapshot::capture(&inner.form);
            let restored = inner.history.go_back(current);
            inner.form = restored.restore();
        }
        self.shared.publish(inner)
    }

    /// Mirror of `go_back`.
    pub fn go_forward(&self) -> SessionState {
        let mut inner = self.shared.lock_inner();
        if inner.history.can_go_forward() {
            let current = FormSnapshot::capture(&inner.form);
            let restored = inner.history.go_forward(current);
            inner.form = restored.restore();
        }
        self.shared.publish(inner)
    }

    /// Persists the current form immediately. Dispatch saves as a side
    /// effect; this is the explicit hook for a surface about to close.
    pub fn save(&self) -> Result<SessionState, AppError> {
        let (form, state) = {
            let inner = self.shared.lock_inner();
            (inner.form.clone(), inner.snapshot())
        };
        self.shared.persist(&form)?;
        Ok(state)
    }
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Publishes the locked state and returns the published value. The
    /// send happens while the lock is still held, so the channel sees
    /// states in the same order the session produced them.
    fn publish(&self, inner: MutexGuard<'_, Inner>) -> SessionState {
        let state = inner.snapshot();
        self.tx.send_replace(state.clone());
        drop(inner);
        state
    }

    /// Called by a finished dispatch task. A stale generation means a
    /// newer dispatch superseded this one while it ran; its result is
    /// dropped.
    fn finish(&self, generation: u64, record: ResponseRecord) {
        let mut inner = self.lock_inner();
        if inner.generation != generation {
            tracing::debug!("Discarding response from a superseded request");
            return;
        }
        inner.response = Some(record);
        inner.task = None;
        self.publish(inner);
    }

    fn persist(&self, form: &RequestForm) -> Result<(), AppError> {
        self.store.save_form(&SavedForm {
            url: form.url.clone(),
            body: form.body.clone(),
            trust_all: form.trust_all,
        })?;
        self.store.replace_headers(&form.headers)?;
        Ok(())
    }
}

impl Inner {
    fn snapshot(&self) -> SessionState {
        SessionState {
            form: self.form.clone(),
            response: self.response.clone(),
            in_flight: self.task.is_some(),
            back_available: self.history.can_go_back(),
            forward_available: self.history.can_go_forward(),
        }
    }
}

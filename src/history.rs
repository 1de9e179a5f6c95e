//! Back/forward navigation over form snapshots.
//!
//! Works like browser history: editing and dispatching push onto the back
//! stack, navigation moves snapshots between the two stacks. Snapshots are
//! plain values; two stacks and structural equality are the whole design.

use crate::dispatch::{HeaderEntry, RequestForm};

/// Immutable capture of the editable form at one point in time.
///
/// Only the first header row is captured; the navigation feature predates
/// the multi-row header form and deliberately keeps its narrow view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    pub url: String,
    pub body: String,
    pub header_name: String,
    pub header_value: String,
    pub trust_all: bool,
}

impl FormSnapshot {
    pub fn capture(form: &RequestForm) -> Self {
        let first = form.headers.first();
        Self {
            url: form.url.clone(),
            body: form.body.clone(),
            header_name: first.map(|row| row.name.clone()).unwrap_or_default(),
            header_value: first.map(|row| row.value.clone()).unwrap_or_default(),
            trust_all: form.trust_all,
        }
    }

    /// Rebuilds an editable form from this snapshot. A round trip keeps at
    /// most one header row, because that is all a snapshot holds.
    pub fn restore(&self) -> RequestForm {
        let headers = if self.header_name.is_empty() && self.header_value.is_empty() {
            Vec::new()
        } else {
            vec![HeaderEntry::new(
                self.header_name.clone(),
                self.header_value.clone(),
            )]
        };
        RequestForm {
            url: self.url.clone(),
            body: self.body.clone(),
            headers,
            trust_all: self.trust_all,
        }
    }
}

/// The two navigation stacks. Owned and injected by the session; nothing
/// here is global.
#[derive(Debug, Default)]
pub struct FormHistory {
    back: Vec<FormSnapshot>,
    forward: Vec<FormSnapshot>,
}

impl FormHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Pushes `current` for later back navigation and invalidates the
    /// forward stack, unless `current` matches the top of the back stack,
    /// or the stacks are untouched and `current` is still the blank
    /// default.
    pub fn record_if_changed(&mut self, current: FormSnapshot) {
        if self.back.last() == Some(&current) {
            return;
        }
        if self.back.is_empty() && current == FormSnapshot::default() {
            return;
        }
        self.back.push(current);
        self.forward.clear();
    }

    /// Steps back, returning the snapshot to display. `current` moves to
    /// the forward stack; back entries equal to `current` are discarded so
    /// a step always lands on something different, or on the blank default
    /// once the stack runs out.
    pub fn go_back(&mut self, current: FormSnapshot) -> FormSnapshot {
        Self::step(&mut self.back, &mut self.forward, current)
    }

    /// Mirror of `go_back` with the stack roles swapped.
    pub fn go_forward(&mut self, current: FormSnapshot) -> FormSnapshot {
        Self::step(&mut self.forward, &mut self.back, current)
    }

    fn step(
        from: &mut Vec<FormSnapshot>,
        to: &mut Vec<FormSnapshot>,
        current: FormSnapshot,
    ) -> FormSnapshot {
        to.push(current.clone());
        while let Some(candidate) = from.pop() {
            if candidate != current {
                return candidate;
            }
        }
        FormSnapshot::default()
    }
}

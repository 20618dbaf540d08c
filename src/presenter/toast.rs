use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: String,
    pub message: Option<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
struct Visible {
    toast: Toast,
    deadline: Instant,
}

/// Bounded notification queue where only one toast is on screen.
///
/// Pushing beyond capacity drops the oldest pending toast. Showing the next
/// toast replaces whatever is visible.
#[derive(Debug)]
pub struct ToastQueue {
    pending: VecDeque<Toast>,
    visible: Option<Visible>,
    capacity: usize,
    default_duration: Duration,
    next_id: u64,
}

impl Default for ToastQueue {
    fn default() -> Self {
        let settings = &config::config().notifications;
        Self::new(settings.toast_capacity, Duration::from_millis(settings.toast_duration_ms))
    }
}

impl ToastQueue {
    pub fn new(capacity: usize, default_duration: Duration) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity.max(1)),
            visible: None,
            capacity: capacity.max(1),
            default_duration,
            next_id: 1,
        }
    }

    /// Queues a toast and returns its id.
    pub fn push(&mut self, kind: ToastKind, title: impl Into<String>, message: Option<String>) -> u64 {
        let duration = self.default_duration;
        self.push_with_duration(kind, title, message, duration)
    }

    pub fn push_with_duration(
        &mut self,
        kind: ToastKind,
        title: impl Into<String>,
        message: Option<String>,
        duration: Duration,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(Toast { id, kind, title: title.into(), message, duration });
        id
    }

    pub fn success(&mut self, title: impl Into<String>) -> u64 {
        self.push(ToastKind::Success, title, None)
    }

    pub fn error(&mut self, title: impl Into<String>, message: Option<String>) -> u64 {
        self.push(ToastKind::Error, title, message)
    }

    pub fn info(&mut self, title: impl Into<String>) -> u64 {
        self.push(ToastKind::Info, title, None)
    }

    pub fn warning(&mut self, title: impl Into<String>) -> u64 {
        self.push(ToastKind::Warning, title, None)
    }

    /// Displays the next pending toast, evicting the visible one.
    pub fn advance(&mut self, now: Instant) -> Option<&Toast> {
        let next = self.pending.pop_front()?;
        let deadline = now + next.duration;
        self.visible = Some(Visible { toast: next, deadline });
        self.visible.as_ref().map(|v| &v.toast)
    }

    pub fn visible(&self) -> Option<&Toast> {
        self.visible.as_ref().map(|v| &v.toast)
    }

    /// Hides the visible toast once its deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Option<Toast> {
        let expired = self.visible.as_ref().map_or(false, |v| now >= v.deadline);
        if !expired {
            return None;
        }
        self.visible.take().map(|v| v.toast)
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let matches = self.visible.as_ref().map_or(false, |v| v.toast.id == id);
        if matches {
            self.visible = None;
        }
        matches
    }

    /// Displays every pending toast in order, returning each as it is evicted
    /// by the next. Used by non-interactive outputs.
    pub fn drain(&mut self, now: Instant) -> Vec<Toast> {
        let mut shown = Vec::with_capacity(self.pending.len());
        while let Some(toast) = self.advance(now) {
            shown.push(toast.clone());
        }
        self.visible = None;
        shown
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

//! Process-wide session accounting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Best-effort cap on concurrently running sessions.
pub const MAX_SESSIONS: usize = 64;

#[derive(Debug, Default)]
pub struct SessionCount {
    current: AtomicUsize,
    total: AtomicUsize,
    errors: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSnapshot {
    pub current: usize,
    pub total: usize,
    pub errors: usize,
}

impl SessionCount {
    /// Admit a new session unless the cap is reached. The returned guard
    /// decrements the in-flight count exactly once when dropped.
    pub fn try_admit(self: &Arc<Self>) -> Option<SessionGuard> {
        if self.current.load(Ordering::Relaxed) >= MAX_SESSIONS {
            return None;
        }
        self.current.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
        Some(SessionGuard { counts: Arc::clone(self) })
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { current: self.current(), total: self.total(), errors: self.errors() }
    }
}

/// RAII admission token for one session.
#[derive(Debug)]
pub struct SessionGuard {
    counts: Arc<SessionCount>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.counts
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1))
            .ok();
    }
}

// Session-scoped visit deduplication
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rolling window within which repeat visits from one origin count as the
/// same session.
pub const SESSION_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Deduplicates repeated visits from the same origin so rapid polling does
/// not inflate visit counters. Purge, lookup, and touch happen under a
/// single lock acquisition.
pub struct SessionTracker {
    window: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl SessionTracker {
    pub fn new(window: Duration) -> Self {
        Self { window, last_seen: Mutex::new(HashMap::new()) }
    }

    /// True when this origin has not been seen within the window. Seen or
    /// not, the origin's last-seen time is refreshed.
    pub fn is_new_session(&self, origin: &str) -> bool {
        self.is_new_session_at(origin, Instant::now())
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions_at(Instant::now())
    }

    fn is_new_session_at(&self, origin: &str, now: Instant) -> bool {
        let mut last_seen = self.last_seen.lock().expect("session lock poisoned");
        last_seen.retain(|_, seen| now.duration_since(*seen) <= self.window);
        match last_seen.get_mut(origin) {
            Some(seen) => {
                *seen = now;
                false
            }
            None => {
                last_seen.insert(origin.to_string(), now);
                true
            }
        }
    }

    fn active_sessions_at(&self, now: Instant) -> usize {
        let last_seen = self.last_seen.lock().expect("session lock poisoned");
        last_seen.values().filter(|seen| now.duration_since(**seen) <= self.window).count()
    }
}

use std::time::{Duration, Instant};

pub const MAX_EVENTS_PER_WINDOW: u32 = 60;
pub const WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window event counter owned by a single connection.
#[derive(Debug, Clone)]
pub struct EventRateLimit {
    max_events: u32,
    window: Duration,
    count: u32,
    reset_at: Option<Instant>,
}

impl Default for EventRateLimit {
    fn default() -> Self {
        Self::new(MAX_EVENTS_PER_WINDOW, WINDOW)
    }
}

impl EventRateLimit {
    pub fn new(max_events: u32, window: Duration) -> Self {
        Self {
            max_events,
            window,
            count: 0,
            reset_at: None,
        }
    }

    /// Count one event at `now`; `false` once the window's budget is spent.
    pub fn check(&mut self, now: Instant) -> bool {
        match self.reset_at {
            Some(reset_at) if reset_at >= now => {}
            _ => {
                self.count = 0;
                self.reset_at = Some(now + self.window);
            }
        }
        self.count = self.count.saturating_add(1);
        self.count <= self.max_events
    }
}

//! # Debounce Timer
//!
//! An explicit, cancellable one-shot timer for use inside `tokio::select!`.
//!
//! ```text
//!   edit   edit  edit                       fire
//!    │      │     │                           │
//!    ▼      ▼     ▼                           ▼
//!  ──●──────●─────●───────── window ──────────◆──────►  time
//!    start  start start (each restarts)
//! ```
//!
//! While unarmed, [`DebounceTimer::expired`] never completes, so a select
//! branch guarded by [`DebounceTimer::is_armed`] simply stays idle.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct DebounceTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(window: Duration) -> Self {
        DebounceTimer {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arms the timer for a full window from now, replacing any deadline.
    pub fn start(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Completes once the deadline passes, then disarms the timer.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

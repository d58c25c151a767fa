// src/client/easing.rs
// =============================================================================
// Request pacing ("easing").
//
// Two knobs keep the walker polite towards the server:
// - max_wait: every request first sleeps a random time in [0, max_wait)
// - min_interval: request starts are spaced at least this far apart, no
//   matter how many workers are fetching at the same time
//
// The second knob is a shared gate: each caller reserves the next free slot
// under a lock and then sleeps until its slot outside the lock. With both
// knobs at zero the gate never sleeps.
// =============================================================================

use rand::Rng;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct Easing {
    max_wait: Duration,
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Easing {
    pub fn new(max_wait: Duration, min_interval: Duration) -> Self {
        Self {
            max_wait,
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.max_wait.is_zero() || !self.min_interval.is_zero()
    }

    // Waits until this caller may start its request
    pub async fn pause(&self) {
        if !self.is_enabled() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot
        };

        let deadline = slot + jitter(self.max_wait);
        if deadline > Instant::now() {
            tokio::time::sleep_until(deadline).await;
        }
    }
}

// Uniform random delay in [0, max_wait)
fn jitter(max_wait: Duration) -> Duration {
    if max_wait.is_zero() {
        return Duration::ZERO;
    }
    rand::thread_rng().gen_range(Duration::ZERO..max_wait)
}

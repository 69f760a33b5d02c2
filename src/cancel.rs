//! Cooperative cancellation for superseded work.
//!
//! A task of a replaceable kind (the selected card's image load, the current
//! prefetch list) carries a [`CancelToken`]. Starting a newer task of the
//! same kind cancels the old token without waiting for the old task; the old
//! task notices at its next suspension point and stops with
//! [`DeckBuddyError::Interrupted`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{DeckBuddyError, Result};

#[derive(Debug, Default)]
struct TokenState {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<TokenState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake anything sleeping on this token.
    pub fn cancel(&self) {
        let mut cancelled = self.state.cancelled.lock();
        *cancelled = true;
        self.state.signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.cancelled.lock()
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DeckBuddyError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, returning early with `Interrupted` if the token
    /// is cancelled before it elapses.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.state.cancelled.lock();
        while !*cancelled {
            if self
                .state
                .signal
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                break;
            }
        }
        if *cancelled {
            Err(DeckBuddyError::Interrupted)
        } else {
            Ok(())
        }
    }
}

//! Background warming of the image cache.
//!
//! One worker thread drains a replaceable queue of cards, fetching each
//! card's front and then back image through the [`ImageCache`]. When the
//! queue is empty the worker parks. Installing a new list cancels whatever
//! fetch delay is in progress, drops the rest of the old list, and restarts
//! from the head of the new one. Images already warmed stay cached.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, trace};
use parking_lot::{Condvar, Mutex};

use super::ImageCache;
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::models::Card;

struct QueueState {
    cards: VecDeque<Arc<Card>>,
    /// Cancelled when the list is replaced.
    token: CancelToken,
    /// Bumped on every replacement.
    generation: u64,
    working: bool,
    shutdown: bool,
}

struct Shared {
    cache: Arc<ImageCache>,
    queue: Mutex<QueueState>,
    wake: Condvar,
    idle: Condvar,
}

pub struct Prefetcher {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Prefetcher {
    /// Start the prefetch worker for `cache`.
    pub fn spawn(cache: Arc<ImageCache>) -> Result<Self> {
        let shared = Arc::new(Shared {
            cache,
            queue: Mutex::new(QueueState {
                cards: VecDeque::new(),
                token: CancelToken::new(),
                generation: 0,
                working: false,
                shutdown: false,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("Image Prefetcher".into())
            .spawn(move || run(worker_shared))?;
        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Replace the queue with `cards` and restart draining from its head.
    pub fn set_prefetch_list<I>(&self, cards: I)
    where
        I: IntoIterator<Item = Arc<Card>>,
    {
        let mut state = self.shared.queue.lock();
        state.token.cancel();
        state.token = CancelToken::new();
        state.cards = cards.into_iter().collect();
        state.generation += 1;
        debug!("Prefetch list replaced with {} cards.", state.cards.len());
        self.shared.wake.notify_all();
    }

    /// Cards still waiting to be warmed.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().cards.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.shared.queue.lock();
        !state.working && state.cards.is_empty()
    }

    /// Block until the queue is drained or `timeout` passes. Returns whether
    /// the prefetcher is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.queue.lock();
        while state.working || !state.cards.is_empty() {
            if self
                .shared
                .idle
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }
        !state.working && state.cards.is_empty()
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.queue.lock();
            state.shutdown = true;
            state.token.cancel();
            self.shared.wake.notify_all();
        }
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: Arc<Shared>) {
    // Fetches left for the current list; no point warming more images than
    // the cache can hold.
    let mut generation = 0u64;
    let mut budget = shared.cache.capacity();

    loop {
        let (card, token) = {
            let mut state = shared.queue.lock();
            state.working = false;
            loop {
                if state.shutdown {
                    shared.idle.notify_all();
                    return;
                }
                if state.generation != generation {
                    generation = state.generation;
                    budget = shared.cache.capacity();
                    info!("Prefetching cards.");
                }
                if budget == 0 && !state.cards.is_empty() {
                    debug!("Prefetch pool exhausted, dropping {} cards.", state.cards.len());
                    state.cards.clear();
                }
                if let Some(card) = state.cards.pop_front() {
                    state.working = true;
                    break (card, state.token.clone());
                }
                info!("Prefetching complete.");
                shared.idle.notify_all();
                shared.wake.wait(&mut state);
            }
        };

        trace!("Prefetching card {}.", card.name);
        for url in [&card.front_image, &card.back_image].into_iter().flatten() {
            match shared.cache.get(url.as_str(), &token) {
                Ok(_) => budget = budget.saturating_sub(1),
                Err(e) if e.is_interrupted() => {
                    debug!("Prefetch list updated, restarting prefetch process.");
                    break;
                }
                Err(e) => debug!("Prefetch of '{}' failed: {}", url, e),
            }
        }
    }
}

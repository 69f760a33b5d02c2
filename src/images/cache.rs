//! Bounded cache of decoded remote card images.
//!
//! Entries are kept two ways. A FIFO of strong references holds at most
//! `capacity` images and drops the oldest insertion first. Every image is
//! also indexed by a [`Weak`] reference, so an image evicted from the FIFO is
//! still served while anything else (the card on screen, a deck sheet being
//! written) keeps it alive, and is reclaimed as soon as nothing does.
//!
//! Misses go to the [`ImageSource`] one at a time, never closer together
//! than the configured request delay.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use image::RgbImage;
use log::{debug, info, warn};
use parking_lot::Mutex;

use super::{ImageSource, Raster};
use crate::cancel::CancelToken;
use crate::error::Result;

#[derive(Default)]
struct Entries {
    strong: VecDeque<(String, Raster)>,
    weak: HashMap<String, Weak<RgbImage>>,
}

impl Entries {
    fn lookup(&mut self, url: &str) -> Option<Raster> {
        let image = self.weak.get(url).and_then(Weak::upgrade);
        if image.is_none() {
            self.weak.remove(url);
        }
        image
    }

    fn insert(&mut self, url: &str, image: &Raster, capacity: usize) {
        if !self.strong.iter().any(|(u, _)| u == url) {
            self.strong.push_back((url.to_string(), Arc::clone(image)));
        }
        while self.strong.len() > capacity {
            if let Some((evicted, _)) = self.strong.pop_front() {
                debug!("Evicted '{}' from the image cache.", evicted);
            }
        }
        self.weak.insert(url.to_string(), Arc::downgrade(image));
        self.weak.retain(|_, w| w.strong_count() > 0);
    }
}

pub struct ImageCache {
    source: Arc<dyn ImageSource>,
    capacity: usize,
    min_request_delay: Duration,
    entries: Mutex<Entries>,
    /// Serializes misses; holds the time the last request was issued.
    fetch_gate: Mutex<Option<Instant>>,
}

impl ImageCache {
    pub fn new(source: Arc<dyn ImageSource>, capacity: usize, min_request_delay: Duration) -> Self {
        Self {
            source,
            capacity,
            min_request_delay,
            entries: Mutex::new(Entries::default()),
            fetch_gate: Mutex::new(None),
        }
    }

    /// Return the image for `url`, fetching it on a miss.
    ///
    /// A hit returns immediately. A miss waits out the remainder of the
    /// request delay measured from the last request any caller issued, then
    /// fetches. `Ok(None)` means the fetch or decode failed; failures are not
    /// remembered, so a later call retries. The only error is
    /// `Interrupted`, when `cancel` fires before the fetch is issued.
    pub fn get(&self, url: &str, cancel: &CancelToken) -> Result<Option<Raster>> {
        if let Some(image) = self.entries.lock().lookup(url) {
            debug!("Loaded image from cache '{}'.", url);
            return Ok(Some(image));
        }
        cancel.check()?;

        let mut last_request = self.fetch_gate.lock();

        // Someone else may have fetched it while we queued for the gate.
        if let Some(image) = self.entries.lock().lookup(url) {
            debug!("Loaded image from cache '{}'.", url);
            return Ok(Some(image));
        }
        // Superseded while queued for the gate.
        cancel.check()?;

        if let Some(last) = *last_request {
            let next_allowed = last + self.min_request_delay;
            let now = Instant::now();
            if now < next_allowed {
                let delay = next_allowed - now;
                debug!("Delaying request for '{}' by {:?}.", url, delay);
                cancel.sleep(delay)?;
            }
        }

        *last_request = Some(Instant::now());
        match self.source.fetch(url) {
            Ok(image) => {
                info!("Loaded image from remote '{}'.", url);
                let image: Raster = Arc::new(image);
                self.entries.lock().insert(url, &image, self.capacity);
                Ok(Some(image))
            }
            Err(e) => {
                warn!("Unable to load image '{}': {}", url, e);
                Ok(None)
            }
        }
    }

    /// Cached image for `url`, without fetching.
    pub fn peek(&self, url: &str) -> Option<Raster> {
        self.entries.lock().lookup(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.peek(url).is_some()
    }

    /// Number of images held by the capped FIFO.
    pub fn len(&self) -> usize {
        self.entries.lock().strong.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.strong.clear();
        entries.weak.clear();
    }
}

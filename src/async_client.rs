//! Async wrapper around [`DeckBuddy`] for use in async runtimes (Tokio, etc.).
//!
//! Building the handle and waiting for queued work block the calling thread,
//! so both run on the blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free.
//!
//! # Example
//!
//! ```no_run
//! use mtg_deck_buddy::AsyncDeckBuddy;
//!
//! #[tokio::main]
//! async fn main() {
//!     let buddy = AsyncDeckBuddy::builder().build().await.unwrap();
//!
//!     let cards = buddy.load_catalog().await.unwrap();
//!     println!("{} cards loaded", cards);
//!
//!     // Run any sync method via closure
//!     let deck_size = buddy.run(|b| Ok(b.store().deck_size())).await.unwrap();
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{DeckBuddyError, Result};
use crate::{DeckBuddy, DeckBuddyBuilder};

// ---------------------------------------------------------------------------
// AsyncDeckBuddyBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncDeckBuddy`] instance.
///
/// Wraps a [`DeckBuddyBuilder`]; use [`configure()`](Self::configure) to reach
/// its setters.
#[derive(Default)]
pub struct AsyncDeckBuddyBuilder {
    inner: DeckBuddyBuilder,
}

impl AsyncDeckBuddyBuilder {
    /// Set a custom data directory.
    pub fn data_dir<P: AsRef<Path>>(self, path: P) -> Self {
        self.configure(|b| b.data_dir(path))
    }

    /// Apply any [`DeckBuddyBuilder`] setting.
    pub fn configure<F>(self, f: F) -> Self
    where
        F: FnOnce(DeckBuddyBuilder) -> DeckBuddyBuilder,
    {
        Self { inner: f(self.inner) }
    }

    /// Build the async handle.
    ///
    /// Initialization runs on the blocking thread pool so it won't block
    /// the async event loop.
    pub async fn build(self) -> Result<AsyncDeckBuddy> {
        let buddy = tokio::task::spawn_blocking(move || self.inner.build())
            .await
            .map_err(join_error)??;
        Ok(AsyncDeckBuddy {
            inner: Some(Arc::new(buddy)),
        })
    }
}

// ---------------------------------------------------------------------------
// AsyncDeckBuddy
// ---------------------------------------------------------------------------

/// Async wrapper around [`DeckBuddy`].
///
/// [`DeckBuddy`] is already thread-safe; this type only moves the calls that
/// wait onto the blocking thread pool.
pub struct AsyncDeckBuddy {
    // Only `None` while being dropped.
    inner: Option<Arc<DeckBuddy>>,
}

impl AsyncDeckBuddy {
    /// Create a new builder for configuring the async handle.
    pub fn builder() -> AsyncDeckBuddyBuilder {
        AsyncDeckBuddyBuilder::default()
    }

    fn handle(&self) -> Result<Arc<DeckBuddy>> {
        self.inner
            .clone()
            .ok_or_else(|| DeckBuddyError::InvalidArgument("handle already closed".into()))
    }

    /// Run a sync operation on the blocking thread pool.
    ///
    /// The closure receives a `&DeckBuddy` reference and should return a
    /// `Result<T>`.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&DeckBuddy) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let buddy = self.handle()?;
        tokio::task::spawn_blocking(move || f(&buddy))
            .await
            .map_err(join_error)?
    }

    /// Load the configured dataset and wait for it. Returns the number of
    /// cards in the catalog.
    pub async fn load_catalog(&self) -> Result<usize> {
        self.run(|b| {
            b.load_catalog();
            b.wait_idle();
            if b.is_ready() {
                Ok(b.store().card_count())
            } else {
                Err(DeckBuddyError::NotFound(format!(
                    "card catalog at {}",
                    b.dataset_path().display()
                )))
            }
        })
        .await
    }

    /// Wait until every queued action has run.
    pub async fn wait_idle(&self) -> Result<()> {
        self.run(|b| {
            b.wait_idle();
            Ok(())
        })
        .await
    }

    /// Write the deck list and wait for it.
    pub async fn export_deck<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path: PathBuf = path.as_ref().to_path_buf();
        self.run(move |b| {
            b.export_deck(&path);
            b.wait_idle();
            Ok(())
        })
        .await
    }

    /// Write the deck image pages and wait for them.
    pub async fn export_deck_image<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path: PathBuf = path.as_ref().to_path_buf();
        self.run(move |b| {
            b.export_deck_image(&path);
            b.wait_idle();
            Ok(())
        })
        .await
    }

    /// Borrow the sync handle for calls that never block.
    pub fn blocking(&self) -> Option<&DeckBuddy> {
        self.inner.as_deref()
    }

    /// Shut the workers down on the blocking thread pool.
    pub async fn close(mut self) -> Result<()> {
        if let Some(buddy) = self.inner.take() {
            tokio::task::spawn_blocking(move || drop(buddy))
                .await
                .map_err(join_error)?;
        }
        Ok(())
    }
}

impl Drop for AsyncDeckBuddy {
    fn drop(&mut self) {
        // Joining the workers and dropping the HTTP client must not happen on
        // a runtime thread.
        if let Some(buddy) = self.inner.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn_blocking(move || drop(buddy));
                }
                Err(_) => drop(buddy),
            }
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> DeckBuddyError {
    DeckBuddyError::InvalidArgument(format!("Task join error: {e}"))
}

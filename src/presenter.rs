//! Callbacks into the presentation layer.
//!
//! The core reports state transitions through [`Presenter`] and never depends
//! on how they are shown. Every method has a no-op default so a front end
//! only implements what it displays. Callbacks may arrive from the mutation
//! worker thread, so implementations must hand work to their own UI thread
//! instead of blocking.

use std::sync::Arc;

use crate::filter::CardFilter;
use crate::images::Raster;
use crate::models::{Card, CardId};

pub trait Presenter: Send + Sync {
    /// The catalog finished loading and card rows can be shown.
    fn catalog_ready(&self, _card_count: usize) {}

    /// A card was selected. Images are `None` while they are still loading
    /// or when they could not be fetched.
    fn card_selected(&self, _card: &Arc<Card>, _front: Option<&Raster>, _back: Option<&Raster>) {}

    /// A bulk mutation is about to run; editing controls should be disabled.
    fn begin_edit(&self) {}

    /// The bulk mutation finished; re-enable editing and refresh every row.
    fn end_edit(&self) {}

    fn busy_changed(&self, _busy: bool) {}

    fn deck_size_changed(&self, _deck_size: usize) {}

    fn cards_changed(&self, _ids: &[CardId]) {}

    fn row_filter_changed(&self, _filter: &CardFilter) {}

    /// A message the user should see (empty deck, no list files found, ...).
    fn notice(&self, _message: &str) {}
}

/// Presenter that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}

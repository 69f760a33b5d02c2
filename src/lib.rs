//! Card collection and deck builder core.
//!
//! Tracks owned copies of Magic: The Gathering cards, assembles a deck from
//! that collection and exports the deck as a plain-text list or as printable
//! tiled image sheets. Card images are fetched lazily from the network,
//! cached in memory and warmed in the background for cards in the deck.
//!
//! The front end talks to a single [`DeckBuddy`] handle and receives state
//! changes through the [`Presenter`] trait.
//!
//! # Quick start
//!
//! ```no_run
//! use mtg_deck_buddy::DeckBuddy;
//!
//! let buddy = DeckBuddy::builder().data_dir("/opt/deck-buddy").build().unwrap();
//!
//! // Load the catalog on the worker and wait for it
//! buddy.load_catalog();
//! buddy.wait_idle();
//!
//! // Import a collection folder and build a deck from a list
//! buddy.import_collection("lists/collection").unwrap();
//! buddy.import_deck("lists/burn.dec");
//! buddy.export_deck_image("out/burn.png");
//! buddy.wait_idle();
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod decklist;
pub mod error;
pub mod filter;
pub mod images;
pub mod logging;
pub mod models;
pub mod presenter;
pub mod serializer;
pub mod store;

#[cfg(feature = "async")]
pub use async_client::AsyncDeckBuddy;
pub use cancel::CancelToken;
pub use config::GridLayout;
pub use error::{DeckBuddyError, Result};
pub use filter::{CardFilter, CardPredicate, ViewToggles};
pub use images::{DeckImageWriter, ImageCache, ImageSource, LocalImages, Prefetcher, Raster};
pub use presenter::{NullPresenter, Presenter};
pub use serializer::MutationSerializer;
pub use store::{CardStore, ExportOutcome, LoadOutcome};

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use parking_lot::Mutex;

use crate::images::HttpImageSource;
use crate::models::{Card, CardId};

const NO_LIST_FILES: &str = "No .dec files found in the chosen folder.";
const EMPTY_DECK: &str = "Your deck is currently empty.";
const NOT_READY: &str = "The card database is not loaded.";

// ---------------------------------------------------------------------------
// DeckBuddyBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`DeckBuddy`] instance.
///
/// Use [`DeckBuddy::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](DeckBuddyBuilder::build) to start the
/// workers.
pub struct DeckBuddyBuilder {
    data_dir: Option<PathBuf>,
    dataset_path: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    request_delay: Duration,
    cache_capacity: usize,
    timeout: Duration,
    layout: GridLayout,
    image_source: Option<Arc<dyn ImageSource>>,
    presenter: Option<Arc<dyn Presenter>>,
}

impl Default for DeckBuddyBuilder {
    fn default() -> Self {
        Self {
            data_dir: None,
            dataset_path: None,
            assets_dir: None,
            request_delay: config::MIN_REQUEST_DELAY,
            cache_capacity: config::MAX_CACHED_IMAGES,
            timeout: config::HTTP_TIMEOUT,
            layout: GridLayout::default(),
            image_source: None,
            presenter: None,
        }
    }
}

impl DeckBuddyBuilder {
    /// Set the data directory holding the dataset and bundled assets.
    ///
    /// If not set, the platform data directory is used
    /// (e.g. `~/.local/share/mtg-deck-buddy` on Linux).
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the card dataset file. Defaults to `<data_dir>/carddb.json`.
    pub fn dataset_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dataset_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the bundled assets directory. Defaults to the data directory.
    pub fn assets_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.assets_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Minimum delay between two remote image requests. Defaults to 100 ms.
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Number of images the cache holds strongly. Defaults to 60.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// HTTP timeout for image downloads. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn layout(mut self, layout: GridLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the HTTP image source, e.g. with an offline one.
    pub fn image_source(mut self, source: Arc<dyn ImageSource>) -> Self {
        self.image_source = Some(source);
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Build the handle: load the bundled assets and start the mutation and
    /// prefetch workers.
    ///
    /// Fails with [`DeckBuddyError::MissingAsset`] when the default card back
    /// is not present in the assets directory. The catalog is not read here;
    /// call [`DeckBuddy::load_catalog`].
    pub fn build(self) -> Result<DeckBuddy> {
        let data_dir = self.data_dir.unwrap_or_else(config::default_data_dir);
        let dataset_path = self
            .dataset_path
            .unwrap_or_else(|| data_dir.join(config::DATASET_FILE));
        let assets_dir = self.assets_dir.unwrap_or_else(|| data_dir.clone());

        let local = LocalImages::open(&assets_dir)?;
        let source = match self.image_source {
            Some(source) => source,
            None => Arc::new(HttpImageSource::new(self.timeout)?),
        };
        let presenter = self.presenter.unwrap_or_else(|| Arc::new(NullPresenter));

        let cache = Arc::new(ImageCache::new(source, self.cache_capacity, self.request_delay));
        let prefetcher = Arc::new(Prefetcher::spawn(Arc::clone(&cache))?);
        let store = Arc::new(CardStore::new(Arc::clone(&presenter), Arc::clone(&prefetcher)));
        let serializer = MutationSerializer::spawn(Arc::clone(&presenter))?;

        Ok(DeckBuddy {
            data_dir,
            dataset_path,
            layout: self.layout,
            store,
            cache,
            local: Arc::new(local),
            prefetcher,
            serializer,
            presenter,
            selection: Mutex::new(None),
            filter: Mutex::new(CardFilter::default()),
            shutdown: CancelToken::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// DeckBuddy
// ---------------------------------------------------------------------------

struct Selection {
    id: CardId,
    token: CancelToken,
}

/// The main entry point: one card store, one image cache, one prefetcher
/// and one mutation worker.
///
/// Methods that mutate more than one card, read files or write exports are
/// queued on the mutation worker and return immediately; their results reach
/// the [`Presenter`]. Use [`wait_idle()`](Self::wait_idle) to block until
/// queued work has finished.
///
/// Created via [`DeckBuddy::builder()`].
pub struct DeckBuddy {
    data_dir: PathBuf,
    dataset_path: PathBuf,
    layout: GridLayout,
    store: Arc<CardStore>,
    cache: Arc<ImageCache>,
    local: Arc<LocalImages>,
    prefetcher: Arc<Prefetcher>,
    serializer: MutationSerializer,
    presenter: Arc<dyn Presenter>,
    selection: Mutex<Option<Selection>>,
    filter: Mutex<CardFilter>,
    shutdown: CancelToken,
}

impl DeckBuddy {
    /// Create a new builder for configuring the handle.
    pub fn builder() -> DeckBuddyBuilder {
        DeckBuddyBuilder::default()
    }

    // -- Catalog -----------------------------------------------------------

    /// Queue loading of the configured dataset file.
    pub fn load_catalog(&self) {
        let path = self.dataset_path.clone();
        self.load_with(move || catalog::open_dataset(&path));
    }

    /// Queue loading of the catalog from `reader`.
    pub fn load_catalog_from<R>(&self, reader: R)
    where
        R: Read + Send + 'static,
    {
        self.load_with(move || Ok(reader));
    }

    fn load_with<R, F>(&self, open: F)
    where
        R: Read,
        F: FnOnce() -> Result<R> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let presenter = Arc::clone(&self.presenter);
        self.serializer.submit(move || {
            presenter.busy_changed(true);
            if let Err(e) = open().and_then(|reader| store.load(reader)) {
                error!("Unable to load card database: {}", e);
                presenter.notice(&format!("Unable to load card database: {}", e));
            }
            presenter.busy_changed(false);
        });
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    // -- Selection ---------------------------------------------------------

    /// Select a card and load its images in the background.
    ///
    /// The presenter is told about the selection at once, without images, and
    /// again once the images have loaded. Selecting another card abandons the
    /// previous image load. Selecting the current card again does nothing.
    pub fn select_card(&self, id: CardId) -> Result<()> {
        let card = self.ready_card(id)?;
        let token = {
            let mut selection = self.selection.lock();
            if selection.as_ref().is_some_and(|s| s.id == id) {
                return Ok(());
            }
            if let Some(previous) = selection.take() {
                previous.token.cancel();
            }
            let token = CancelToken::new();
            *selection = Some(Selection {
                id,
                token: token.clone(),
            });
            token
        };

        self.presenter.card_selected(&card, None, None);

        let cache = Arc::clone(&self.cache);
        let presenter = Arc::clone(&self.presenter);
        thread::Builder::new()
            .name("Card Image Loader".into())
            .spawn(move || load_selected_images(&card, &cache, presenter.as_ref(), &token))?;
        Ok(())
    }

    /// The currently selected card, if any.
    pub fn selected_card(&self) -> Option<CardId> {
        self.selection.lock().as_ref().map(|s| s.id)
    }

    // -- Bulk mutations ------------------------------------------------------

    /// Queue an import of a list file, or of every `.dec` file in a
    /// directory, into the collection.
    ///
    /// A directory without list files is reported to the presenter and
    /// queues nothing.
    pub fn import_collection<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let files = decklist::list_sources(path.as_ref())?;
        if files.is_empty() {
            info!("No list files found in {}.", path.as_ref().display());
            self.presenter.notice(NO_LIST_FILES);
            return Ok(());
        }
        self.queue_edit("collection import", move |store, _| store.import_collection(&files));
        Ok(())
    }

    /// Queue adding the cards of a list file to the deck.
    pub fn import_deck<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref().to_path_buf();
        self.queue_edit("deck import", move |store, _| store.import_deck(&path));
    }

    /// Queue replacing the ban list with the cards of a list file.
    pub fn import_bans<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref().to_path_buf();
        self.queue_edit("ban import", move |store, _| store.import_bans(&path));
    }

    pub fn clear_deck(&self) {
        self.queue_edit("clear deck", |store, _| store.clear_deck());
    }

    pub fn clear_collection(&self) {
        self.queue_edit("clear collection", |store, _| store.clear_collection());
    }

    /// Queue setting every card's owned count to 99.
    pub fn fill_collection(&self) {
        self.queue_edit("fill collection", |store, _| store.fill_collection());
    }

    /// Queue `action` as an edit on the worker.
    ///
    /// Skipped with a notice when no catalog has loaded by the time it runs,
    /// so a failed load never leaves the worker waiting on the store.
    fn queue_edit<F>(&self, what: &'static str, action: F)
    where
        F: FnOnce(&CardStore, &dyn Presenter) + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let presenter = Arc::clone(&self.presenter);
        self.serializer.submit_edit(move || {
            if !store.is_ready() {
                warn!("Skipping {}: card database is not loaded.", what);
                presenter.notice(NOT_READY);
                return;
            }
            action(&store, presenter.as_ref());
        });
    }

    // -- Exports -------------------------------------------------------------

    /// Queue writing the deck as a list file.
    pub fn export_deck<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref().to_path_buf();
        self.queue_edit("deck export", move |store, presenter| {
            presenter.busy_changed(true);
            match store.export_deck(&path) {
                Ok(ExportOutcome::Written(_)) => {}
                Ok(ExportOutcome::EmptyDeck) => presenter.notice(EMPTY_DECK),
                Err(e) => {
                    error!("Unable to save deck to {}: {}", path.display(), e);
                    presenter.notice(&format!("Unable to save deck: {}", e));
                }
            }
            presenter.busy_changed(false);
        });
    }

    /// Queue writing the deck as grid image pages next to `path`.
    ///
    /// Front pages are named `<stem>_<n>.png`, back pages
    /// `<stem>_back_<n>.png`.
    pub fn export_deck_image<P: AsRef<Path>>(&self, path: P) {
        let template = path.as_ref().to_path_buf();
        let cache = Arc::clone(&self.cache);
        let local = Arc::clone(&self.local);
        let layout = self.layout;
        let cancel = self.shutdown.clone();
        self.queue_edit("deck image export", move |store, presenter| {
            let deck = store.deck();
            let total: usize = deck.iter().map(|e| e.copies as usize).sum();
            if total == 0 {
                info!("Attempted to save an image of an empty deck.");
                presenter.notice(EMPTY_DECK);
                return;
            }
            presenter.busy_changed(true);
            let writer = DeckImageWriter::new(&cache, &local, layout);
            match writer.write(&deck, total, &template, &cancel) {
                Ok(files) => info!("Deck image saved as {} files.", files.len()),
                Err(e) if e.is_interrupted() => info!("Deck image export interrupted."),
                Err(e) => {
                    error!("Unable to write deck image: {}", e);
                    presenter.notice(&format!("Unable to write deck image: {}", e));
                }
            }
            presenter.busy_changed(false);
        });
    }

    // -- Single-card edits ---------------------------------------------------

    pub fn add_owned(&self, id: CardId, delta: i64) -> Result<()> {
        self.store.add_owned(id, delta)
    }

    pub fn set_owned(&self, id: CardId, count: u32) -> Result<()> {
        self.store.set_owned(id, count)
    }

    pub fn add_to_deck(&self, id: CardId, delta: i64) -> Result<()> {
        self.store.add_to_deck(id, delta)
    }

    pub fn set_in_deck(&self, id: CardId, count: u32) -> Result<()> {
        self.store.set_in_deck(id, count)
    }

    pub fn set_banned(&self, id: CardId, banned: bool) -> Result<()> {
        self.store.set_banned(id, banned)
    }

    // -- Filtering -----------------------------------------------------------

    /// Replace the row filter and tell the presenter.
    pub fn set_filter(&self, filter: CardFilter) {
        *self.filter.lock() = filter.clone();
        self.presenter.row_filter_changed(&filter);
    }

    pub fn filter(&self) -> CardFilter {
        self.filter.lock().clone()
    }

    /// Ids of the cards the current filter shows; empty until the catalog
    /// is loaded.
    pub fn visible_cards(&self) -> Vec<CardId> {
        if !self.store.is_ready() {
            return Vec::new();
        }
        let filter = self.filter();
        self.store
            .catalog()
            .iter()
            .filter(|card| {
                self.store
                    .counts(card.id)
                    .is_some_and(|counts| filter.matches(card, &counts))
            })
            .map(|card| card.id)
            .collect()
    }

    // -- Images --------------------------------------------------------------

    /// Replace the prefetch list with `cards`.
    pub fn prefetch<I>(&self, cards: I)
    where
        I: IntoIterator<Item = Arc<Card>>,
    {
        self.prefetcher.set_prefetch_list(cards);
    }

    // -- Accessors -----------------------------------------------------------

    /// Block until every queued action has run.
    pub fn wait_idle(&self) {
        self.serializer.wait_idle();
    }

    pub fn store(&self) -> &CardStore {
        &self.store
    }

    pub fn image_cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn local_images(&self) -> &LocalImages {
        &self.local
    }

    pub fn prefetcher(&self) -> &Prefetcher {
        &self.prefetcher
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    fn ready_card(&self, id: CardId) -> Result<Arc<Card>> {
        if !self.store.is_ready() {
            return Err(DeckBuddyError::InvalidArgument(
                "card catalog is not loaded yet".into(),
            ));
        }
        self.store
            .card(id)
            .ok_or_else(|| DeckBuddyError::NotFound(format!("card id {}", id)))
    }
}

fn load_selected_images(card: &Arc<Card>, cache: &ImageCache, presenter: &dyn Presenter, token: &CancelToken) {
    presenter.busy_changed(true);
    let images = (|| -> Result<(Option<Raster>, Option<Raster>)> {
        let front = match card.face_image() {
            Some(url) => cache.get(url.as_str(), token)?,
            None => None,
        };
        let back = match &card.back_image {
            Some(url) => cache.get(url.as_str(), token)?,
            None => None,
        };
        Ok((front, back))
    })();
    match images {
        Ok((front, back)) => {
            if !token.is_cancelled() {
                presenter.card_selected(card, front.as_ref(), back.as_ref());
            }
        }
        Err(e) if e.is_interrupted() => info!("Image load for {} superseded.", card.name),
        Err(e) => error!("Unable to load images for {}: {}", card.name, e),
    }
    presenter.busy_changed(false);
}

impl Drop for DeckBuddy {
    fn drop(&mut self) {
        if let Some(selection) = self.selection.lock().take() {
            selection.token.cancel();
        }
        self.shutdown.cancel();
        self.serializer.shutdown();
        self.prefetcher.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for DeckBuddy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeckBuddy(data_dir={}, cards={}, deck_size={}, cached_images={})",
            self.data_dir.display(),
            self.store.card_count(),
            self.store.deck_size(),
            self.cache.len()
        )
    }
}

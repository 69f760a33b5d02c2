//! Shared test fixtures for the deck buddy integration tests.
//!
//! Provides a small sample catalog, an in-memory [`ImageSource`] that counts
//! fetches, a [`Presenter`] that records every callback, and helpers that
//! wire these into a loaded [`CardStore`] or a full [`DeckBuddy`].

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use mtg_deck_buddy::filter::CardFilter;
use mtg_deck_buddy::models::{Card, CardId};
use mtg_deck_buddy::{
    CardStore, DeckBuddy, DeckBuddyError, GridLayout, ImageCache, ImageSource, Prefetcher,
    Presenter, Raster, Result,
};
use tempfile::TempDir;

pub const CELL_WIDTH: u32 = 4;
pub const CELL_HEIGHT: u32 = 6;
pub const PLACEHOLDER_COLOR: [u8; 3] = [128, 128, 128];

/// A 3 x 2 grid of 4 x 6 pixel cells: five deck slots per page.
pub fn tiny_layout() -> GridLayout {
    GridLayout {
        columns: 3,
        rows: 2,
        cell_width: CELL_WIDTH,
        cell_height: CELL_HEIGHT,
    }
}

pub fn image_url(name: &str) -> String {
    format!("https://img.example.test/{}.jpg", name)
}

// ---------------------------------------------------------------------------
// Sample catalog
// ---------------------------------------------------------------------------

/// Ten cards, in id order: Forest, Island, Lightning Bolt, Grizzly Bears,
/// Delver of Secrets (double faced), Sol Ring, Goblin (token), Tarmogoyf,
/// Serra Angel, Fire // Ice (split).
pub fn sample_catalog() -> serde_json::Value {
    serde_json::json!([
        {
            "name": "Forest",
            "type_line": "Basic Land — Forest",
            "cmc": 0.0,
            "color_identity": ["G"],
            "keywords": [],
            "oracle_text": "({T}: Add {G}.)",
            "image_uris": { "border_crop": image_url("forest") }
        },
        {
            "name": "Island",
            "type_line": "Basic Land — Island",
            "cmc": 0.0,
            "color_identity": ["U"],
            "keywords": [],
            "oracle_text": "({T}: Add {U}.)",
            "image_uris": { "border_crop": image_url("island") }
        },
        {
            "name": "Lightning Bolt",
            "type_line": "Instant",
            "cmc": 1.0,
            "color_identity": ["R"],
            "keywords": [],
            "oracle_text": "Lightning Bolt deals 3 damage to any target.",
            "image_uris": { "border_crop": image_url("bolt") }
        },
        {
            "name": "Grizzly Bears",
            "type_line": "Creature — Bear",
            "cmc": 2.0,
            "color_identity": ["G"],
            "keywords": [],
            "power": "2",
            "toughness": "2",
            "image_uris": { "border_crop": image_url("bears") }
        },
        {
            "name": "Delver of Secrets // Insectile Aberration",
            "type_line": "Creature — Human Wizard // Creature — Human Insect",
            "cmc": 1.0,
            "color_identity": ["U"],
            "keywords": ["Transform", "Flying"],
            "card_faces": [
                {
                    "power": "1",
                    "toughness": "1",
                    "image_uris": { "border_crop": image_url("delver") }
                },
                {
                    "power": "3",
                    "toughness": "2",
                    "image_uris": { "border_crop": image_url("aberration") }
                }
            ]
        },
        {
            "name": "Sol Ring",
            "type_line": "Artifact",
            "cmc": 1.0,
            "color_identity": [],
            "keywords": [],
            "oracle_text": "{T}: Add {C}{C}.",
            "image_uris": { "border_crop": image_url("solring") }
        },
        {
            "name": "Goblin",
            "type_line": "Token Creature — Goblin",
            "cmc": 0.0,
            "color_identity": ["R"],
            "keywords": [],
            "power": "1",
            "toughness": "1",
            "image_uris": { "border_crop": image_url("goblin") }
        },
        {
            "name": "Tarmogoyf",
            "type_line": "Creature — Lhurgoyf",
            "cmc": 2.0,
            "color_identity": ["G"],
            "keywords": [],
            "power": "*",
            "toughness": "1+*",
            "image_uris": { "border_crop": image_url("goyf") }
        },
        {
            "name": "Serra Angel",
            "type_line": "Creature — Angel",
            "cmc": 5.0,
            "color_identity": ["W"],
            "keywords": ["Flying", "Vigilance"],
            "oracle_text": "Flying, vigilance",
            "power": "4",
            "toughness": "4",
            "image_uris": { "border_crop": image_url("serra") }
        },
        {
            "name": "Fire // Ice",
            "type_line": "Instant // Instant",
            "cmc": 4.0,
            "color_identity": ["R", "U"],
            "keywords": [],
            "image_uris": { "border_crop": image_url("fireice") },
            "card_faces": [
                { "power": null, "toughness": null },
                { "power": null, "toughness": null }
            ]
        }
    ])
}

pub fn sample_catalog_bytes() -> Vec<u8> {
    serde_json::to_vec(&sample_catalog()).unwrap()
}

/// Write the bundled default card back into `assets_dir`.
pub fn write_assets(assets_dir: &Path) {
    let path = assets_dir.join(mtg_deck_buddy::config::DEFAULT_CARD_BACK);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(CELL_WIDTH, CELL_HEIGHT, Rgb(PLACEHOLDER_COLOR))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
}

// ---------------------------------------------------------------------------
// MockImageSource
// ---------------------------------------------------------------------------

/// Serves solid-color images and counts how often each URL was fetched.
pub struct MockImageSource {
    width: u32,
    height: u32,
    colors: Mutex<HashMap<String, [u8; 3]>>,
    failing: Mutex<HashSet<String>>,
    fetches: Mutex<Vec<String>>,
}

impl MockImageSource {
    pub fn new() -> Self {
        Self::with_size(CELL_WIDTH, CELL_HEIGHT)
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            colors: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn set_color(&self, url: &str, color: [u8; 3]) {
        self.colors.lock().unwrap().insert(url.to_string(), color);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn recover(&self, url: &str) {
        self.failing.lock().unwrap().remove(url);
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

impl ImageSource for MockImageSource {
    fn fetch(&self, url: &str) -> Result<RgbImage> {
        self.fetches.lock().unwrap().push(url.to_string());
        if self.failing.lock().unwrap().contains(url) {
            return Err(DeckBuddyError::NotFound(url.to_string()));
        }
        let color = self
            .colors
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or([10, 200, 30]);
        Ok(RgbImage::from_pixel(self.width, self.height, Rgb(color)))
    }
}

// ---------------------------------------------------------------------------
// RecordingPresenter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CatalogReady(usize),
    CardSelected {
        id: CardId,
        front: bool,
        back: bool,
    },
    BeginEdit,
    EndEdit,
    Busy(bool),
    DeckSize(usize),
    CardsChanged(Vec<CardId>),
    FilterChanged,
    Notice(String),
}

#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<Event>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Notice(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_deck_size(&self) -> Option<usize> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::DeckSize(size) => Some(size),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Presenter for RecordingPresenter {
    fn catalog_ready(&self, card_count: usize) {
        self.push(Event::CatalogReady(card_count));
    }

    fn card_selected(&self, card: &Arc<Card>, front: Option<&Raster>, back: Option<&Raster>) {
        self.push(Event::CardSelected {
            id: card.id,
            front: front.is_some(),
            back: back.is_some(),
        });
    }

    fn begin_edit(&self) {
        self.push(Event::BeginEdit);
    }

    fn end_edit(&self) {
        self.push(Event::EndEdit);
    }

    fn busy_changed(&self, busy: bool) {
        self.push(Event::Busy(busy));
    }

    fn deck_size_changed(&self, deck_size: usize) {
        self.push(Event::DeckSize(deck_size));
    }

    fn cards_changed(&self, ids: &[CardId]) {
        self.push(Event::CardsChanged(ids.to_vec()));
    }

    fn row_filter_changed(&self, _filter: &CardFilter) {
        self.push(Event::FilterChanged);
    }

    fn notice(&self, message: &str) {
        self.push(Event::Notice(message.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// A loaded card store with its own cache and prefetcher.
pub struct StoreFixture {
    pub store: Arc<CardStore>,
    pub cache: Arc<ImageCache>,
    pub prefetcher: Arc<Prefetcher>,
    pub source: Arc<MockImageSource>,
    pub presenter: Arc<RecordingPresenter>,
}

impl StoreFixture {
    pub fn id(&self, name: &str) -> CardId {
        self.store.card_by_name(name).unwrap().id
    }

    /// Sum of `in_deck` over the whole catalog, computed the slow way.
    pub fn scanned_deck_size(&self) -> usize {
        (0..self.store.card_count())
            .map(|id| self.store.in_deck(id) as usize)
            .sum()
    }
}

pub fn setup_store() -> StoreFixture {
    let fixture = setup_empty_store();
    fixture.store.load(sample_catalog_bytes().as_slice()).unwrap();
    fixture.presenter.clear();
    fixture
}

pub fn setup_empty_store() -> StoreFixture {
    let source = Arc::new(MockImageSource::new());
    let presenter = Arc::new(RecordingPresenter::default());
    let cache = Arc::new(ImageCache::new(source.clone(), 60, Duration::ZERO));
    let prefetcher = Arc::new(Prefetcher::spawn(cache.clone()).unwrap());
    let store = Arc::new(CardStore::new(presenter.clone(), prefetcher.clone()));
    StoreFixture {
        store,
        cache,
        prefetcher,
        source,
        presenter,
    }
}

/// A full handle over a temporary data directory holding the sample dataset
/// and assets. The catalog is not loaded yet.
pub struct BuddyFixture {
    pub buddy: DeckBuddy,
    pub source: Arc<MockImageSource>,
    pub presenter: Arc<RecordingPresenter>,
    pub dir: TempDir,
}

impl BuddyFixture {
    pub fn id(&self, name: &str) -> CardId {
        self.buddy.store().card_by_name(name).unwrap().id
    }
}

pub fn setup_buddy() -> BuddyFixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(mtg_deck_buddy::config::DATASET_FILE),
        sample_catalog_bytes(),
    )
    .unwrap();
    write_assets(dir.path());

    let source = Arc::new(MockImageSource::new());
    let presenter = Arc::new(RecordingPresenter::default());
    let buddy = DeckBuddy::builder()
        .data_dir(dir.path())
        .request_delay(Duration::ZERO)
        .layout(tiny_layout())
        .image_source(source.clone())
        .presenter(presenter.clone())
        .build()
        .unwrap();

    BuddyFixture {
        buddy,
        source,
        presenter,
        dir,
    }
}

/// Like [`setup_buddy`], with the catalog loaded.
pub fn setup_loaded_buddy() -> BuddyFixture {
    let fixture = setup_buddy();
    fixture.buddy.load_catalog();
    fixture.buddy.wait_idle();
    assert!(fixture.buddy.is_ready());
    fixture
}

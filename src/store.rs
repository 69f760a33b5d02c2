//! The single source of truth for cards and their counters.
//!
//! A [`CardStore`] starts empty and becomes ready exactly once, when
//! [`CardStore::load`] publishes a catalog. Every read blocks until then.
//! The store exclusively owns each card's `owned`, `in_deck` and `banned`
//! counters, the set of cards in the deck and the running deck size; the
//! latter two are maintained per mutation, never by rescanning.
//!
//! Mutations come in two kinds. Single-card edits (`add_owned`,
//! `set_in_deck`, ...) run on the caller's thread under the store lock and
//! report back immediately. Bulk actions (imports, clears, fill, export) are
//! plain synchronous methods meant to be submitted to the
//! [`MutationSerializer`](crate::serializer::MutationSerializer), which runs
//! them one at a time.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::catalog::{read_catalog, Catalog};
use crate::config::FILL_COUNT;
use crate::decklist;
use crate::error::{DeckBuddyError, Result};
use crate::images::Prefetcher;
use crate::models::{Card, CardCounts, CardId, DeckEntry};
use crate::presenter::Presenter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// The store was already ready; nothing was read.
    AlreadyLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(usize),
    /// The deck is empty; nothing was written.
    EmptyDeck,
}

#[derive(Debug, Default)]
struct DeckState {
    counts: Vec<CardCounts>,
    deck: BTreeSet<CardId>,
}

impl DeckState {
    /// Apply `edit` to the card's counters, clamp `in_deck` into
    /// `[0, deck_max]` and keep deck membership in step. Returns the change
    /// in copies of the card in the deck.
    fn update(&mut self, card: &Card, edit: impl FnOnce(&mut CardCounts)) -> i64 {
        let counts = &mut self.counts[card.id];
        let before = counts.in_deck;
        edit(counts);
        counts.in_deck = counts.in_deck.min(counts.deck_max(card.is_basic_land));
        if counts.in_deck > 0 {
            self.deck.insert(card.id);
        } else {
            self.deck.remove(&card.id);
        }
        i64::from(counts.in_deck) - i64::from(before)
    }
}

fn offset(value: u32, delta: i64) -> u32 {
    (i64::from(value) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

pub struct CardStore {
    catalog: OnceCell<Catalog>,
    state: Mutex<DeckState>,
    deck_size: AtomicUsize,
    presenter: Arc<dyn Presenter>,
    prefetcher: Arc<Prefetcher>,
}

impl CardStore {
    pub fn new(presenter: Arc<dyn Presenter>, prefetcher: Arc<Prefetcher>) -> Self {
        Self {
            catalog: OnceCell::new(),
            state: Mutex::new(DeckState::default()),
            deck_size: AtomicUsize::new(0),
            presenter,
            prefetcher,
        }
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Load the catalog from a JSON array of card records and make the store
    /// ready. Only the first successful load counts; later calls log a
    /// warning and change nothing.
    pub fn load<R: Read>(&self, reader: R) -> Result<LoadOutcome> {
        if self.catalog.get().is_some() {
            warn!("Card catalog loaded more than once; ignoring.");
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        info!("Loading cards.");
        let catalog = read_catalog(reader)?;
        let count = catalog.len();
        {
            let mut state = self.state.lock();
            if self.catalog.set(catalog).is_err() {
                warn!("Card catalog loaded more than once; ignoring.");
                return Ok(LoadOutcome::AlreadyLoaded);
            }
            state.counts = vec![CardCounts::default(); count];
            state.deck.clear();
            self.deck_size.store(0, Ordering::SeqCst);
        }

        info!("Card store ready with {} cards.", count);
        self.presenter.catalog_ready(count);
        Ok(LoadOutcome::Loaded(count))
    }

    pub fn is_ready(&self) -> bool {
        self.catalog.get().is_some()
    }

    /// The catalog, blocking until the store is ready.
    pub fn catalog(&self) -> &Catalog {
        self.catalog.wait()
    }

    // -- Reads -------------------------------------------------------------

    /// Number of cards in the catalog; 0 until the store is ready.
    pub fn card_count(&self) -> usize {
        self.catalog.get().map_or(0, Catalog::len)
    }

    pub fn card(&self, id: CardId) -> Option<Arc<Card>> {
        self.catalog().get(id).cloned()
    }

    pub fn card_by_name(&self, name: &str) -> Option<Arc<Card>> {
        self.catalog().by_name(name).cloned()
    }

    pub fn counts(&self, id: CardId) -> Option<CardCounts> {
        self.catalog();
        self.state.lock().counts.get(id).copied()
    }

    pub fn owned(&self, id: CardId) -> u32 {
        self.counts(id).map_or(0, |c| c.owned)
    }

    pub fn in_deck(&self, id: CardId) -> u32 {
        self.counts(id).map_or(0, |c| c.in_deck)
    }

    pub fn is_banned(&self, id: CardId) -> bool {
        self.counts(id).is_some_and(|c| c.banned)
    }

    pub fn deck_max(&self, id: CardId) -> u32 {
        match (self.card(id), self.counts(id)) {
            (Some(card), Some(counts)) => counts.deck_max(card.is_basic_land),
            _ => 0,
        }
    }

    /// Total copies in the deck.
    pub fn deck_size(&self) -> usize {
        self.deck_size.load(Ordering::SeqCst)
    }

    /// Snapshot of the deck in card id order.
    pub fn deck(&self) -> Vec<DeckEntry> {
        let catalog = self.catalog();
        let state = self.state.lock();
        state
            .deck
            .iter()
            .filter_map(|id| {
                Some(DeckEntry {
                    card: Arc::clone(catalog.get(*id)?),
                    copies: state.counts[*id].in_deck,
                })
            })
            .collect()
    }

    // -- Single-card mutations -----------------------------------------------

    pub fn add_owned(&self, id: CardId, delta: i64) -> Result<()> {
        self.edit_card(id, |c| c.owned = offset(c.owned, delta))
    }

    pub fn set_owned(&self, id: CardId, count: u32) -> Result<()> {
        self.edit_card(id, |c| c.owned = count)
    }

    pub fn add_to_deck(&self, id: CardId, delta: i64) -> Result<()> {
        self.edit_card(id, |c| c.in_deck = offset(c.in_deck, delta))
    }

    pub fn set_in_deck(&self, id: CardId, count: u32) -> Result<()> {
        self.edit_card(id, |c| c.in_deck = count)
    }

    pub fn set_banned(&self, id: CardId, banned: bool) -> Result<()> {
        self.edit_card(id, |c| c.banned = banned)
    }

    fn edit_card(&self, id: CardId, edit: impl FnOnce(&mut CardCounts)) -> Result<()> {
        let card = self
            .card(id)
            .ok_or_else(|| DeckBuddyError::NotFound(format!("card id {}", id)))?;
        let delta = self.update_card(&card, edit);
        self.presenter.cards_changed(&[id]);
        if delta != 0 {
            self.presenter.deck_size_changed(self.deck_size());
            self.refresh_prefetch();
        }
        Ok(())
    }

    /// Update one card and the deck size without notifying anyone.
    fn update_card(&self, card: &Card, edit: impl FnOnce(&mut CardCounts)) -> i64 {
        let mut state = self.state.lock();
        let delta = state.update(card, edit);
        if delta > 0 {
            self.deck_size.fetch_add(delta as usize, Ordering::SeqCst);
        } else if delta < 0 {
            self.deck_size.fetch_sub(delta.unsigned_abs() as usize, Ordering::SeqCst);
        }
        delta
    }

    fn refresh_prefetch(&self) {
        let cards: Vec<Arc<Card>> = self.deck().into_iter().map(|entry| entry.card).collect();
        self.prefetcher.set_prefetch_list(cards);
    }

    fn finish_bulk(&self) {
        self.presenter.deck_size_changed(self.deck_size());
        self.refresh_prefetch();
    }

    // -- Bulk actions ----------------------------------------------------------

    pub fn clear_deck(&self) {
        info!("Clearing deck.");
        for card in self.catalog().iter() {
            self.update_card(card, |c| c.in_deck = 0);
        }
        self.finish_bulk();
    }

    pub fn clear_collection(&self) {
        info!("Clearing collection.");
        for card in self.catalog().iter() {
            self.update_card(card, |c| c.owned = 0);
        }
        self.finish_bulk();
    }

    /// Own [`FILL_COUNT`] copies of every card.
    pub fn fill_collection(&self) {
        info!("Filling collection.");
        for card in self.catalog().iter() {
            self.update_card(card, |c| c.owned = FILL_COUNT);
        }
        self.finish_bulk();
    }

    /// Add every listed card to the collection.
    pub fn import_collection(&self, files: &[PathBuf]) {
        for file in files {
            self.apply_list_file(file, |card, count| {
                self.update_card(card, |c| c.owned = offset(c.owned, count));
            });
        }
        self.finish_bulk();
    }

    /// Add every listed card to the deck, limited by what the collection allows.
    pub fn import_deck(&self, file: &Path) {
        self.apply_list_file(file, |card, count| {
            self.update_card(card, |c| c.in_deck = offset(c.in_deck, count));
        });
        self.finish_bulk();
    }

    /// Replace the ban list with the cards listed in `file`. Banned cards
    /// leave the deck.
    pub fn import_bans(&self, file: &Path) {
        for card in self.catalog().iter() {
            self.update_card(card, |c| c.banned = false);
        }
        self.apply_list_file(file, |card, _| {
            self.update_card(card, |c| {
                c.banned = true;
                c.in_deck = 0;
            });
        });
        self.finish_bulk();
    }

    /// Write the deck as a list file.
    pub fn export_deck(&self, file: &Path) -> Result<ExportOutcome> {
        let deck = self.deck();
        let total: usize = deck.iter().map(|e| e.copies as usize).sum();
        if total == 0 {
            info!("Attempted to save an empty deck.");
            return Ok(ExportOutcome::EmptyDeck);
        }
        let out = BufWriter::new(File::create(file)?);
        decklist::write_deck_list(out, &deck, total)?;
        info!("Saved deck of {} cards to {}.", total, file.display());
        Ok(ExportOutcome::Written(total))
    }

    fn apply_list_file(&self, file: &Path, mut action: impl FnMut(&Card, i64)) {
        let catalog = self.catalog();
        let result = decklist::read_list_file(file, |count, name| match catalog.by_name(name) {
            Some(card) => action(card, count),
            None => error!("Unable to find card named {} in database!", name),
        });
        if let Err(e) = result {
            error!("Error while reading file {}: {}", file.display(), e);
        }
    }
}

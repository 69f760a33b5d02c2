use std::sync::Arc;

use super::Card;

/// One card of the deck and how many copies of it are in the deck.
#[derive(Debug, Clone)]
pub struct DeckEntry {
    pub card: Arc<Card>,
    pub copies: u32,
}

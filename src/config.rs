use std::path::PathBuf;
use std::time::Duration;

pub const DATASET_FILE: &str = "carddb.json";
pub const DEFAULT_CARD_BACK: &str = "images/defaultcardback.jpg";

/// Extension of collection/deck list files picked up from a directory.
pub const LIST_EXTENSION: &str = "dec";

/// Minimum spacing between two remote image requests, across all callers.
pub const MIN_REQUEST_DELAY: Duration = Duration::from_millis(100);
pub const MAX_CACHED_IMAGES: usize = 60;
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = concat!("mtg-deck-buddy/", env!("CARGO_PKG_VERSION"));

/// Copies of a non-basic card allowed in a deck.
pub const MAX_COPIES: u32 = 4;
/// Copies given to every card by "fill collection".
pub const FILL_COUNT: u32 = 99;

pub const CARDS_X: u32 = 10;
pub const CARDS_Y: u32 = 7;
pub const CARD_SIZE_X: u32 = 480;
pub const CARD_SIZE_Y: u32 = 680;

/// Prefetch and store chatter stays at `warn`; image loading and deck image
/// output are reported at `info`.
pub const DEFAULT_LOG_SPEC: &str = "info, mtg_deck_buddy::images::prefetch=warn, \
     mtg_deck_buddy::store=warn, mtg_deck_buddy::catalog=warn";

/// Cell grid of an exported deck sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: CARDS_X,
            rows: CARDS_Y,
            cell_width: CARD_SIZE_X,
            cell_height: CARD_SIZE_Y,
        }
    }
}

impl GridLayout {
    pub fn page_width(&self) -> u32 {
        self.columns * self.cell_width
    }

    pub fn page_height(&self) -> u32 {
        self.rows * self.cell_height
    }

    pub fn cells(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    /// Cells available to deck cards; the bottom-right cell always holds the
    /// default card back.
    pub fn deck_slots(&self) -> usize {
        self.cells().saturating_sub(1)
    }
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("mtg-deck-buddy")
    } else {
        PathBuf::from(".mtg-deck-buddy")
    }
}

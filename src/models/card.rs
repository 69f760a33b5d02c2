use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::MAX_COPIES;

/// Stable index of a card in the catalog.
pub type CardId = usize;

const NOT_AVAILABLE: &str = "N/A";
const FACE_SEPARATOR: &str = " // ";
// Mana values closer than this to a whole number are shown without decimals.
const MANA_DELTA: f64 = 0.001;

// ---------------------------------------------------------------------------
// CardColor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CardColor {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
}

impl CardColor {
    pub const ALL: [CardColor; 6] = [
        CardColor::White,
        CardColor::Blue,
        CardColor::Black,
        CardColor::Red,
        CardColor::Green,
        CardColor::Colorless,
    ];

    /// Map a Scryfall color symbol (`W`, `U`, `B`, `R`, `G`) to a color.
    /// Anything unrecognised is colorless.
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "W" => CardColor::White,
            "U" => CardColor::Blue,
            "B" => CardColor::Black,
            "R" => CardColor::Red,
            "G" => CardColor::Green,
            _ => CardColor::Colorless,
        }
    }

    pub fn symbol(self) -> Option<&'static str> {
        match self {
            CardColor::White => Some("W"),
            CardColor::Blue => Some("U"),
            CardColor::Black => Some("B"),
            CardColor::Red => Some("R"),
            CardColor::Green => Some("G"),
            CardColor::Colorless => None,
        }
    }
}

impl fmt::Display for CardColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardColor::White => "white",
            CardColor::Blue => "blue",
            CardColor::Black => "black",
            CardColor::Red => "red",
            CardColor::Green => "green",
            CardColor::Colorless => "colorless",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Display + sort values
// ---------------------------------------------------------------------------

/// Mana value as shown in a card list, plus the number it sorts by.
#[derive(Debug, Clone, PartialEq)]
pub struct ManaValue {
    pub display: String,
    pub value: f64,
}

impl ManaValue {
    pub fn new(cmc: f64) -> Self {
        let display = if cmc - cmc.trunc() < MANA_DELTA {
            format!("{}", cmc.trunc() as i64)
        } else {
            format!("{}", cmc)
        };
        Self {
            display,
            value: cmc,
        }
    }
}

/// Power/loyalty or toughness as shown in a card list.
///
/// `value` is `None` when the card has no such stat at all (`N/A`), and `0`
/// for stats that exist but are not numbers (`*`, `1+*`).
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub display: String,
    pub value: Option<f32>,
}

impl Stat {
    fn single(raw: Option<&str>) -> Self {
        let display = raw.unwrap_or(NOT_AVAILABLE).to_string();
        let value = match display.parse::<f32>() {
            Ok(v) => Some(v),
            Err(_) if display != NOT_AVAILABLE => Some(0.0),
            Err(_) => None,
        };
        Self { display, value }
    }

    fn double(front: Option<&str>, back: Option<&str>) -> Self {
        let display = format!(
            "{}{}{}",
            front.unwrap_or(NOT_AVAILABLE),
            FACE_SEPARATOR,
            back.unwrap_or(NOT_AVAILABLE)
        );
        let absent = display == format!("{NOT_AVAILABLE}{FACE_SEPARATOR}{NOT_AVAILABLE}");
        let side = |raw: Option<&str>| match raw.map(str::parse::<f32>) {
            Some(Ok(v)) => Some(v),
            _ if !absent => Some(0.0),
            _ => None,
        };
        let value = max_stat(side(front), side(back));
        Self { display, value }
    }

    /// Ordering used for sorting a card list; absent stats sort first.
    pub fn sort_cmp(&self, other: &Stat) -> Ordering {
        match (self.value, other.value) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.total_cmp(&b),
        }
    }
}

fn max_stat(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

// ---------------------------------------------------------------------------
// CardRecord -- one entry of the bundled dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ImageUris {
    pub border_crop: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardFace {
    pub power: Option<String>,
    pub loyalty: Option<String>,
    pub toughness: Option<String>,
    pub image_uris: Option<ImageUris>,
}

impl CardFace {
    fn power_or_loyalty(&self) -> Option<&str> {
        self.power.as_deref().or(self.loyalty.as_deref())
    }
}

/// Scryfall-shaped card record as stored in the dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct CardRecord {
    pub name: String,
    pub type_line: String,
    pub cmc: f64,
    pub color_identity: Vec<String>,
    pub keywords: Vec<String>,
    pub oracle_text: Option<String>,
    pub power: Option<String>,
    pub loyalty: Option<String>,
    pub toughness: Option<String>,
    pub image_uris: Option<ImageUris>,
    pub card_faces: Option<Vec<CardFace>>,
}

/// Why a record could not become a [`Card`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// The record is structurally wrong; the dataset cannot be trusted.
    #[error("malformed record: {0}")]
    Malformed(String),
    /// Only the image location is bad; the card alone is dropped.
    #[error("invalid image URL '{0}'")]
    InvalidImageUrl(String),
}

fn parse_image_url(uris: Option<&ImageUris>) -> Result<Option<Url>, RecordError> {
    match uris {
        None => Ok(None),
        Some(uris) => Url::parse(&uris.border_crop)
            .map(Some)
            .map_err(|_| RecordError::InvalidImageUrl(uris.border_crop.clone())),
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// Immutable catalog entry. Ownership and deck counters live in the
/// [`CardStore`](crate::store::CardStore), never on the card itself.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub type_line: String,
    pub mana: ManaValue,
    pub power: Stat,
    pub toughness: Stat,
    /// Lower-cased oracle text.
    pub oracle_text: String,
    pub color_identity: BTreeSet<CardColor>,
    /// Lower-cased keywords.
    pub keywords: BTreeSet<String>,
    pub front_image: Option<Url>,
    pub back_image: Option<Url>,
    /// False for tokens, art cards and similar non-deck printings.
    pub is_playable: bool,
    pub is_basic_land: bool,
}

impl Card {
    pub fn from_record(record: CardRecord, id: CardId) -> Result<Card, RecordError> {
        let mut color_identity: BTreeSet<CardColor> = record
            .color_identity
            .iter()
            .map(|c| CardColor::from_symbol(c))
            .collect();
        if color_identity.is_empty() {
            color_identity.insert(CardColor::Colorless);
        }

        let keywords = record.keywords.iter().map(|k| k.to_lowercase()).collect();
        let oracle_text = record
            .oracle_text
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .trim()
            .to_string();

        let (power, toughness, front_image, back_image) = match &record.card_faces {
            None => (
                Stat::single(record.power.as_deref().or(record.loyalty.as_deref())),
                Stat::single(record.toughness.as_deref()),
                parse_image_url(record.image_uris.as_ref())?,
                None,
            ),
            Some(faces) => {
                let (front, back) = match faces.as_slice() {
                    [front, back, ..] => (front, back),
                    _ => {
                        return Err(RecordError::Malformed(format!(
                            "'{}' lists {} card face(s), expected at least 2",
                            record.name,
                            faces.len()
                        )))
                    }
                };
                // Split and adventure cards keep one image on the record itself.
                let front_image = match front.image_uris.as_ref() {
                    Some(uris) => parse_image_url(Some(uris))?,
                    None => parse_image_url(record.image_uris.as_ref())?,
                };
                (
                    Stat::double(front.power_or_loyalty(), back.power_or_loyalty()),
                    Stat::double(front.toughness.as_deref(), back.toughness.as_deref()),
                    front_image,
                    parse_image_url(back.image_uris.as_ref())?,
                )
            }
        };

        let is_playable = !record.type_line.contains("Card") && !record.type_line.contains("Token");
        let is_basic_land = record.type_line.contains("Basic Land");

        Ok(Card {
            id,
            name: record.name,
            mana: ManaValue::new(record.cmc),
            type_line: record.type_line,
            power,
            toughness,
            oracle_text,
            color_identity,
            keywords,
            front_image,
            back_image,
            is_playable,
            is_basic_land,
        })
    }

    /// Image used on the front sheet: the front face, or the back face for
    /// cards that only carry one there.
    pub fn face_image(&self) -> Option<&Url> {
        self.front_image.as_ref().or(self.back_image.as_ref())
    }
}

// ---------------------------------------------------------------------------
// CardCounts -- mutable per-card state owned by the store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardCounts {
    pub owned: u32,
    pub in_deck: u32,
    pub banned: bool,
}

impl CardCounts {
    /// Most copies of the card the deck may hold. Basic lands are not
    /// limited by the collection.
    pub fn deck_max(&self, is_basic_land: bool) -> u32 {
        if self.banned {
            0
        } else if is_basic_land {
            u32::MAX
        } else {
            self.owned.min(MAX_COPIES)
        }
    }
}

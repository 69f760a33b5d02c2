//! Streaming decoder for the bundled card dataset.
//!
//! The dataset is one JSON array of Scryfall card records. Records are
//! decoded and converted one at a time through a `serde` sequence visitor, so
//! the raw array is never held in memory. A structurally invalid record
//! aborts the whole load; a record whose only problem is a bad image URL is
//! logged and left out.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use log::{debug, error, info, warn};
use serde::de::{self, Deserializer, SeqAccess, Visitor};

use crate::error::{DeckBuddyError, Result};
use crate::models::{Card, CardId, CardRecord, RecordError};

/// Immutable card catalog. A card's id is its index here.
#[derive(Debug, Default)]
pub struct Catalog {
    cards: Vec<Arc<Card>>,
    by_name: HashMap<String, CardId>,
}

impl Catalog {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            cards: Vec::with_capacity(capacity),
            by_name: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: CardId) -> Option<&Arc<Card>> {
        self.cards.get(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Card>> {
        self.by_name.get(name).and_then(|id| self.cards.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Card>> {
        self.cards.iter()
    }
}

/// Decode a catalog from a JSON array of card records.
pub fn read_catalog<R: Read>(reader: R) -> Result<Catalog> {
    let mut index = 0usize;
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));
    let catalog = (&mut de)
        .deserialize_seq(CatalogVisitor { index: &mut index })
        .map_err(|e| DeckBuddyError::Load {
            index,
            reason: e.to_string(),
        })?;
    de.end().map_err(|e| DeckBuddyError::Load {
        index,
        reason: e.to_string(),
    })?;
    info!("Loaded {} cards.", catalog.len());
    Ok(catalog)
}

/// Open a dataset file for streaming, decompressing `.gz` files on the fly.
pub fn open_dataset(path: &Path) -> Result<Box<dyn Read + Send>> {
    let file = File::open(path).map_err(|e| {
        error!("Unable to open card dataset {}: {}", path.display(), e);
        DeckBuddyError::Io(e)
    })?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

struct CatalogVisitor<'a> {
    index: &'a mut usize,
}

impl<'de> Visitor<'de> for CatalogVisitor<'_> {
    type Value = Catalog;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of card records")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Catalog, A::Error> {
        let mut catalog = Catalog::with_capacity(seq.size_hint().unwrap_or(0));

        while let Some(record) = seq.next_element::<CardRecord>()? {
            let record_index = *self.index;

            if catalog.by_name.contains_key(&record.name) {
                warn!("Duplicate card '{}' in record #{}, skipping.", record.name, record_index);
                *self.index += 1;
                continue;
            }

            match Card::from_record(record, catalog.cards.len()) {
                Ok(card) => {
                    debug!("Loaded card {}", card.name);
                    catalog.by_name.insert(card.name.clone(), card.id);
                    catalog.cards.push(Arc::new(card));
                }
                Err(RecordError::InvalidImageUrl(url)) => {
                    error!("Scryfall reported an invalid URL in card #{}: {}", record_index, url);
                }
                Err(e @ RecordError::Malformed(_)) => {
                    return Err(de::Error::custom(e));
                }
            }
            *self.index += 1;
        }

        Ok(catalog)
    }
}

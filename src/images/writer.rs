//! Deck sheet export.
//!
//! A deck is written as fixed-grid PNG pages: every copy of every card gets
//! one cell, filled row-major. The bottom-right cell of each page is always
//! the default card back. Pages for the fronts are written first, then the
//! same enumeration again for the backs, so a front and its back sit in the
//! same cell of matching pages.
//!
//! Pages are never assembled in memory. Each output pixel row is stitched
//! together from the matching row of the card images currently active in
//! that cell row and streamed to the encoder; the active images are only
//! swapped when a new cell row starts.

use std::fs;
use std::io::Write;
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use log::{debug, info};
use reqwest::Url;

use super::{ImageCache, LocalImages, Raster};
use crate::cancel::CancelToken;
use crate::config::GridLayout;
use crate::error::{DeckBuddyError, Result};
use crate::models::{Card, DeckEntry};

const BYTES_PER_PIXEL: usize = 3;
const OUTPUT_EXTENSION: &str = "png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
}

impl Face {
    fn image_url(self, card: &Card) -> Option<&Url> {
        match self {
            Face::Front => card.face_image(),
            Face::Back => card.back_image.as_ref(),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Face::Front => "_",
            Face::Back => "_back_",
        }
    }
}

/// Path of page `page` for `face`, derived from the user's chosen file:
/// `decks/burn.png` becomes `decks/burn_0.png`, `decks/burn_back_0.png`, ...
pub fn page_path(template: &Path, face: Face, page: usize) -> PathBuf {
    let stem = template
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("deck");
    let file_name = format!("{}{}{}.{}", stem, face.suffix(), page, OUTPUT_EXTENSION);
    template.with_file_name(file_name)
}

pub struct DeckImageWriter<'a> {
    cache: &'a ImageCache,
    layout: GridLayout,
    placeholder: Raster,
}

impl<'a> DeckImageWriter<'a> {
    pub fn new(cache: &'a ImageCache, local: &LocalImages, layout: GridLayout) -> Self {
        let placeholder = fit_to_cell(local.default_card_back().clone(), &layout);
        Self {
            cache,
            layout,
            placeholder,
        }
    }

    /// Write `deck` (holding `total` copies) as front pages, then back pages.
    ///
    /// Returns the written files in order. Any I/O failure or cancellation
    /// aborts the export; the page being written is discarded.
    pub fn write(
        &self,
        deck: &[DeckEntry],
        total: usize,
        template: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<PathBuf>> {
        let slots_per_page = self.layout.deck_slots();
        if slots_per_page == 0 {
            return Err(DeckBuddyError::InvalidArgument(
                "deck image grid needs at least two cells".into(),
            ));
        }
        if total == 0 {
            return Err(DeckBuddyError::InvalidArgument("deck is empty".into()));
        }

        info!("Writing new deck image with {} cards.", total);
        let pages = total.div_ceil(slots_per_page);
        let mut written = Vec::with_capacity(pages * 2);

        for face in [Face::Front, Face::Back] {
            let mut slots = deck.iter().flat_map(|entry| {
                let url = face.image_url(&entry.card).cloned();
                iter::repeat(url).take(entry.copies as usize)
            });
            for page in 0..pages {
                let path = page_path(template, face, page);
                self.write_page(&path, &mut slots, cancel)?;
                written.push(path);
            }
        }

        info!("Deck image written to {} files.", written.len());
        Ok(written)
    }

    fn write_page<I>(&self, path: &Path, slots: &mut I, cancel: &CancelToken) -> Result<()>
    where
        I: Iterator<Item = Option<Url>>,
    {
        info!("Writing to {}", path.display());
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".deck-page-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        let layout = self.layout;
        let columns = layout.columns as usize;
        let cell_height = layout.cell_height as usize;
        let cell_stride = layout.cell_width as usize * BYTES_PER_PIXEL;
        let last_cell_row = layout.rows as usize - 1;

        {
            let mut encoder = png::Encoder::new(
                tmp.as_file().try_clone()?,
                layout.page_width(),
                layout.page_height(),
            );
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_filter(png::FilterType::NoFilter);
            let mut stream = encoder.write_header()?.into_stream_writer()?;

            let mut line = vec![0u8; cell_stride * columns];
            let mut active: Vec<Option<Raster>> = vec![None; columns];

            for y in 0..layout.page_height() as usize {
                let cell_y = y % cell_height;
                if cell_y == 0 {
                    let cell_row = y / cell_height;
                    debug!("Getting image buffers for cell row {}.", cell_row);
                    for (column, cell) in active.iter_mut().enumerate() {
                        *cell = if cell_row == last_cell_row && column + 1 == columns {
                            Some(Arc::clone(&self.placeholder))
                        } else {
                            match slots.next() {
                                Some(url) => Some(self.cell_image(url.as_ref(), cancel)?),
                                None => None,
                            }
                        };
                    }
                }

                for (cell, out) in active.iter().zip(line.chunks_exact_mut(cell_stride)) {
                    match cell {
                        Some(image) => {
                            let start = cell_y * cell_stride;
                            out.copy_from_slice(&image.as_raw()[start..start + cell_stride]);
                        }
                        None => out.fill(0),
                    }
                }
                stream.write_all(&line)?;
            }
            stream.finish()?;
        }

        tmp.persist(path).map_err(|e| DeckBuddyError::Io(e.error))?;
        Ok(())
    }

    /// Image for one cell: the fetched card image, or the placeholder when
    /// the card has none or the fetch failed.
    fn cell_image(&self, url: Option<&Url>, cancel: &CancelToken) -> Result<Raster> {
        let fetched = match url {
            Some(url) => self.cache.get(url.as_str(), cancel)?,
            None => None,
        };
        Ok(match fetched {
            Some(image) => fit_to_cell(image, &self.layout),
            None => Arc::clone(&self.placeholder),
        })
    }
}

fn fit_to_cell(image: Raster, layout: &GridLayout) -> Raster {
    if image.dimensions() == (layout.cell_width, layout.cell_height) {
        image
    } else {
        Arc::new(imageops::resize(
            &*image,
            layout.cell_width,
            layout.cell_height,
            FilterType::Triangle,
        ))
    }
}

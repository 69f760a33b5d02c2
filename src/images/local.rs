use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use log::error;

use super::Raster;
use crate::config;
use crate::error::{DeckBuddyError, Result};

/// Images shipped with the program, read from the assets directory.
///
/// These never touch the network or the rate limiter. A missing asset is a
/// broken install, reported as [`DeckBuddyError::MissingAsset`].
pub struct LocalImages {
    assets_dir: PathBuf,
    default_card_back: Raster,
}

impl LocalImages {
    /// Open the assets directory and load the default card back.
    pub fn open<P: AsRef<Path>>(assets_dir: P) -> Result<Self> {
        let assets_dir = assets_dir.as_ref().to_path_buf();
        let default_card_back = load_asset(&assets_dir, config::DEFAULT_CARD_BACK)?;
        Ok(Self {
            assets_dir,
            default_card_back,
        })
    }

    /// Load a bundled image by its path relative to the assets directory.
    pub fn load(&self, relative: &str) -> Result<Raster> {
        load_asset(&self.assets_dir, relative)
    }

    /// Placeholder for cards without an image, and the marker in the last
    /// cell of every deck sheet.
    pub fn default_card_back(&self) -> &Raster {
        &self.default_card_back
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }
}

fn load_asset(assets_dir: &Path, relative: &str) -> Result<Raster> {
    let path = assets_dir.join(relative);
    if !path.is_file() {
        error!("Bundled image missing: {}", path.display());
        return Err(DeckBuddyError::MissingAsset(path));
    }
    let image = ImageReader::open(&path)?.with_guessed_format()?.decode()?;
    Ok(Arc::new(image.into_rgb8()))
}

//! Card images: remote fetching, the bounded image cache, the background
//! prefetcher, bundled assets, and the deck sheet writer.

pub mod cache;
pub mod local;
pub mod prefetch;
pub mod source;
pub mod writer;

use std::sync::Arc;

/// A decoded 8-bit RGB card image, shared between the cache and its users.
pub type Raster = Arc<image::RgbImage>;

pub use cache::ImageCache;
pub use local::LocalImages;
pub use prefetch::Prefetcher;
pub use source::{HttpImageSource, ImageSource};
pub use writer::{DeckImageWriter, Face};

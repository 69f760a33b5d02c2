use std::time::Duration;

use image::RgbImage;
use reqwest::blocking::Client;

use crate::config;
use crate::error::Result;

/// Where remote card images come from.
///
/// Implementations fetch and decode one image per call. They do no caching or
/// throttling; [`ImageCache`](super::ImageCache) handles both.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<RgbImage>;
}

/// Fetches images over HTTP with a blocking `reqwest` client.
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config::USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<RgbImage> {
        let resp = self.client.get(url).send()?.error_for_status()?;
        let bytes = resp.bytes()?;
        Ok(image::load_from_memory(&bytes)?.into_rgb8())
    }
}

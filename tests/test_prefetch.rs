//! Background cache warming.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockImageSource;
use mtg_deck_buddy::catalog::{read_catalog, Catalog};
use mtg_deck_buddy::models::Card;
use mtg_deck_buddy::{ImageCache, Prefetcher};

const WAIT: Duration = Duration::from_secs(10);

fn setup(capacity: usize, delay: Duration) -> (Prefetcher, Arc<ImageCache>, Arc<MockImageSource>, Catalog) {
    let source = Arc::new(MockImageSource::new());
    let cache = Arc::new(ImageCache::new(source.clone(), capacity, delay));
    let prefetcher = Prefetcher::spawn(Arc::clone(&cache)).unwrap();
    let catalog = read_catalog(common::sample_catalog_bytes().as_slice()).unwrap();
    (prefetcher, cache, source, catalog)
}

fn cards(catalog: &Catalog, names: &[&str]) -> Vec<Arc<Card>> {
    names
        .iter()
        .map(|name| Arc::clone(catalog.by_name(name).unwrap()))
        .collect()
}

#[test]
fn new_prefetcher_is_idle() {
    let (prefetcher, _cache, source, _catalog) = setup(10, Duration::ZERO);
    assert!(prefetcher.wait_idle(WAIT));
    assert!(prefetcher.is_idle());
    assert_eq!(prefetcher.pending(), 0);
    assert_eq!(source.total_fetches(), 0);
}

#[test]
fn warms_front_then_back_images() {
    let (prefetcher, cache, source, catalog) = setup(10, Duration::ZERO);
    prefetcher.set_prefetch_list(cards(
        &catalog,
        &["Lightning Bolt", "Delver of Secrets // Insectile Aberration"],
    ));

    assert!(prefetcher.wait_idle(WAIT));
    assert_eq!(
        source.fetched(),
        vec![
            common::image_url("bolt"),
            common::image_url("delver"),
            common::image_url("aberration"),
        ]
    );
    assert!(cache.contains(&common::image_url("aberration")));
}

#[test]
fn already_cached_images_are_not_refetched() {
    let (prefetcher, _cache, source, catalog) = setup(10, Duration::ZERO);
    prefetcher.set_prefetch_list(cards(&catalog, &["Forest"]));
    assert!(prefetcher.wait_idle(WAIT));
    prefetcher.set_prefetch_list(cards(&catalog, &["Forest", "Island"]));
    assert!(prefetcher.wait_idle(WAIT));

    assert_eq!(source.fetch_count(&common::image_url("forest")), 1);
    assert_eq!(source.fetch_count(&common::image_url("island")), 1);
}

#[test]
fn failed_fetch_does_not_stop_draining() {
    let (prefetcher, cache, source, catalog) = setup(10, Duration::ZERO);
    source.fail(&common::image_url("bolt"));
    prefetcher.set_prefetch_list(cards(&catalog, &["Lightning Bolt", "Serra Angel"]));

    assert!(prefetcher.wait_idle(WAIT));
    assert!(!cache.contains(&common::image_url("bolt")));
    assert!(cache.contains(&common::image_url("serra")));
}

#[test]
fn replacing_the_list_abandons_the_old_one() {
    // Long enough that the old list cannot finish while we replace it.
    let (prefetcher, cache, source, catalog) = setup(10, Duration::from_secs(3));
    prefetcher.set_prefetch_list(cards(
        &catalog,
        &["Forest", "Island", "Lightning Bolt", "Grizzly Bears"],
    ));
    std::thread::sleep(Duration::from_millis(100));

    prefetcher.set_prefetch_list(cards(&catalog, &["Serra Angel"]));
    assert!(prefetcher.wait_idle(WAIT));

    assert!(cache.contains(&common::image_url("serra")));
    assert_eq!(source.fetch_count(&common::image_url("bolt")), 0);
    assert_eq!(source.fetch_count(&common::image_url("bears")), 0);
}

#[test]
fn stops_after_a_cache_worth_of_fetches() {
    let (prefetcher, _cache, source, catalog) = setup(2, Duration::ZERO);
    prefetcher.set_prefetch_list(cards(
        &catalog,
        &["Forest", "Island", "Lightning Bolt", "Grizzly Bears"],
    ));

    assert!(prefetcher.wait_idle(WAIT));
    assert_eq!(source.total_fetches(), 2);
    assert_eq!(prefetcher.pending(), 0);
}

#[test]
fn shutdown_stops_worker() {
    let (prefetcher, _cache, _source, catalog) = setup(10, Duration::from_secs(3));
    prefetcher.set_prefetch_list(cards(&catalog, &["Forest", "Island"]));
    prefetcher.shutdown();
    // A second shutdown is harmless.
    prefetcher.shutdown();
}

//! Async handle on a Tokio runtime.

#![cfg(feature = "async")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use mtg_deck_buddy::AsyncDeckBuddy;

async fn build(dir: &tempfile::TempDir) -> AsyncDeckBuddy {
    let source = Arc::new(common::MockImageSource::new());
    AsyncDeckBuddy::builder()
        .data_dir(dir.path())
        .configure(move |b| {
            b.request_delay(Duration::ZERO)
                .layout(common::tiny_layout())
                .image_source(source)
        })
        .build()
        .await
        .unwrap()
}

fn prepare_data_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("carddb.json"), common::sample_catalog_bytes()).unwrap();
    common::write_assets(dir.path());
    dir
}

#[tokio::test(flavor = "multi_thread")]
async fn load_and_export_asynchronously() {
    let dir = prepare_data_dir();
    let buddy = build(&dir).await;

    assert_eq!(buddy.load_catalog().await.unwrap(), 10);

    let bolt = buddy
        .run(|b| {
            let id = b.store().card_by_name("Lightning Bolt").unwrap().id;
            b.set_owned(id, 4)?;
            b.set_in_deck(id, 4)?;
            Ok(id)
        })
        .await
        .unwrap();
    assert_eq!(buddy.blocking().unwrap().store().in_deck(bolt), 4);

    let list = dir.path().join("bolts.dec");
    buddy.export_deck(&list).await.unwrap();
    buddy.export_deck_image(dir.path().join("bolts.png")).await.unwrap();

    assert!(list.is_file());
    assert!(dir.path().join("bolts_0.png").is_file());
    assert!(dir.path().join("bolts_back_0.png").is_file());

    buddy.close().await.unwrap();
}

#[tokio::test]
async fn missing_dataset_fails_to_load() {
    let dir = prepare_data_dir();
    std::fs::remove_file(dir.path().join("carddb.json")).unwrap();
    let buddy = build(&dir).await;

    assert!(buddy.load_catalog().await.is_err());
    buddy.wait_idle().await.unwrap();
    // Dropped on the runtime without blocking it.
    drop(buddy);
}

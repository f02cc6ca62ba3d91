//! Fetch-and-commit behaviour against an in-memory poster source.

mod support;

use std::sync::Arc;
use std::time::Duration;

use posterkeep_core::{
    LOCK_DIR_NAME, LockOptions, PosterPipeline, SyncOutcome, digest_bytes,
};
use reqwest::StatusCode;
use support::{Reply, ScriptedSource, listing, poster_url};

fn pipeline(source: &Arc<ScriptedSource>) -> PosterPipeline {
    PosterPipeline::new(
        source.clone(),
        LockOptions {
            timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(5),
        },
    )
}

#[tokio::test]
async fn same_poster_is_stored_once_and_new_content_gets_next_slot() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new(Reply::Body(b"AAA".to_vec())));
    let pipeline = pipeline(&source);

    let first = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
    assert_eq!(
        first,
        SyncOutcome::Saved {
            path: dir.path().join("poster.jpg"),
            digest: digest_bytes(b"AAA"),
        }
    );

    let second = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
    assert_eq!(
        second,
        SyncOutcome::Duplicate {
            existing: "poster.jpg".to_string(),
            digest: digest_bytes(b"AAA"),
        }
    );
    assert_eq!(listing(dir.path()), vec!["poster.jpg"]);

    source.set(Reply::Body(b"BBB".to_vec()));
    let third = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
    assert!(third.wrote_file());

    assert_eq!(listing(dir.path()), vec!["poster-1.jpg", "poster.jpg"]);
    assert_eq!(std::fs::read(dir.path().join("poster.jpg")).unwrap(), b"AAA");
    assert_eq!(
        std::fs::read(dir.path().join("poster-1.jpg")).unwrap(),
        b"BBB"
    );
}

#[tokio::test]
async fn distinct_contents_fill_a_contiguous_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new(Reply::Body(Vec::new())));
    let pipeline = pipeline(&source);

    let payloads: Vec<Vec<u8>> = (0..5u8)
        .map(|i| format!("poster-bytes-{i}").into_bytes())
        .collect();
    for payload in &payloads {
        source.set(Reply::Body(payload.clone()));
        let outcome = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
        assert!(outcome.wrote_file(), "{outcome:?}");
    }
    // A second pass over the same set writes nothing.
    for payload in &payloads {
        source.set(Reply::Body(payload.clone()));
        let outcome = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Duplicate { .. }));
    }

    assert_eq!(
        listing(dir.path()),
        vec![
            "poster-1.jpg",
            "poster-2.jpg",
            "poster-3.jpg",
            "poster-4.jpg",
            "poster.jpg"
        ]
    );
    let mut stored: Vec<Vec<u8>> = listing(dir.path())
        .iter()
        .map(|name| std::fs::read(dir.path().join(name)).unwrap())
        .collect();
    stored.sort();
    let mut expected = payloads.clone();
    expected.sort();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn missing_directory_is_created() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("Movies").join("Heat (1995)");
    let source = Arc::new(ScriptedSource::new(Reply::Body(b"AAA".to_vec())));

    let outcome = pipeline(&source).sync(&poster_url(), &dir).await.unwrap();

    assert!(outcome.wrote_file());
    assert_eq!(listing(&dir), vec!["poster.jpg"]);
}

#[tokio::test]
async fn empty_body_is_ordinary_content() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new(Reply::Body(Vec::new())));
    let pipeline = pipeline(&source);

    let first = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
    assert_eq!(
        first,
        SyncOutcome::Saved {
            path: dir.path().join("poster.jpg"),
            digest: digest_bytes(b""),
        }
    );
    assert_eq!(
        std::fs::metadata(dir.path().join("poster.jpg")).unwrap().len(),
        0
    );

    let second = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
    assert!(matches!(second, SyncOutcome::Duplicate { .. }));
}

#[tokio::test]
async fn unavailable_poster_leaves_no_file_and_no_lock() {
    let dir = tempfile::tempdir().unwrap();
    let source =
        Arc::new(ScriptedSource::new(Reply::Status(StatusCode::NOT_FOUND)));

    let outcome = pipeline(&source).sync(&poster_url(), dir.path()).await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Unavailable {
            status: StatusCode::NOT_FOUND
        }
    );
    assert!(listing(dir.path()).is_empty());
}

#[tokio::test]
async fn broken_stream_removes_partial_file_and_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("poster.jpg"), b"old").unwrap();
    let source = Arc::new(ScriptedSource::new(Reply::BrokenAfter(
        b"half a poster".to_vec(),
    )));
    let pipeline = pipeline(&source);

    let err = pipeline.sync(&poster_url(), dir.path()).await.unwrap_err();
    assert!(err.to_string().contains("connection reset"), "{err}");
    assert_eq!(listing(dir.path()), vec!["poster.jpg"]);

    // The directory is immediately usable again.
    source.set(Reply::Body(b"new".to_vec()));
    let outcome = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
    assert!(outcome.wrote_file());
    assert_eq!(listing(dir.path()), vec!["poster-1.jpg", "poster.jpg"]);
}

#[tokio::test]
async fn held_lock_means_no_write_and_unchanged_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(LOCK_DIR_NAME)).unwrap();
    let source = Arc::new(ScriptedSource::new(Reply::Body(b"AAA".to_vec())));
    let pipeline = PosterPipeline::new(
        source.clone(),
        LockOptions {
            timeout: Duration::from_millis(200),
            retry_delay: Duration::from_millis(20),
        },
    );

    let outcome = pipeline.sync(&poster_url(), dir.path()).await.unwrap();

    assert_eq!(outcome, SyncOutcome::LockUnavailable);
    assert_eq!(source.opened(), 0);
    assert_eq!(listing(dir.path()), vec![LOCK_DIR_NAME]);
}

#[cfg(unix)]
#[tokio::test]
async fn published_posters_are_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new(Reply::Body(b"AAA".to_vec())));
    pipeline(&source).sync(&poster_url(), dir.path()).await.unwrap();

    let mode = std::fs::metadata(dir.path().join("poster.jpg"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o644);
}

#[cfg(unix)]
#[tokio::test]
async fn dangling_poster_link_does_not_block_sync() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("poster.jpg"), b"AAA").unwrap();
    std::os::unix::fs::symlink(
        dir.path().join("gone.jpg"),
        dir.path().join("poster-7.jpg"),
    )
    .unwrap();
    let source = Arc::new(ScriptedSource::new(Reply::Body(b"AAA".to_vec())));
    let pipeline = pipeline(&source);

    let outcome = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Duplicate {
            existing: "poster.jpg".to_string(),
            digest: digest_bytes(b"AAA"),
        }
    );

    source.set(Reply::Body(b"BBB".to_vec()));
    let outcome = pipeline.sync(&poster_url(), dir.path()).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Saved {
            path: dir.path().join("poster-1.jpg"),
            digest: digest_bytes(b"BBB"),
        }
    );
    assert_eq!(
        listing(dir.path()),
        vec!["poster-1.jpg", "poster-7.jpg", "poster.jpg"]
    );
}

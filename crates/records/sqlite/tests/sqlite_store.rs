use upd_records::testing::{run_store_conformance_tests, test_record};
use upd_records::{RecordError, RecordStore};
use upd_records_sqlite::{SqliteConfig, SqliteRecordStore};

async fn open(dir: &tempfile::TempDir) -> SqliteRecordStore {
    SqliteRecordStore::open(SqliteConfig::new(dir.path().join("records.db")))
        .await
        .expect("store should open")
}

#[tokio::test]
async fn conformance() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;
    run_store_conformance_tests(&store)
        .await
        .expect("conformance tests should pass");
}

#[tokio::test]
async fn records_and_recency_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let store = open(&dir).await;
    store.bind_medium("fs").await.unwrap();
    for id in ["one", "two", "three"] {
        store.put(&test_record(id)).await.unwrap();
    }
    store.delete("two").await.unwrap();
    store.close().await;
    drop(store);

    let store = open(&dir).await;
    store.bind_medium("fs").await.unwrap();
    assert!(store.get("one").await.unwrap().is_some());
    assert!(store.get("two").await.unwrap().is_none());
    let recent: Vec<String> = store
        .list_recent()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(recent, vec!["three".to_owned(), "one".to_owned()]);
}

#[tokio::test]
async fn medium_mismatch_after_reopen_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let store = open(&dir).await;
    store.bind_medium("fs").await.unwrap();
    store.close().await;
    drop(store);

    let store = open(&dir).await;
    let err = store.bind_medium("s3").await.unwrap_err();
    assert!(matches!(err, RecordError::MediumMismatch { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn garbage_file_is_reported_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    std::fs::write(&path, vec![0x42_u8; 8192]).unwrap();

    let err = SqliteRecordStore::open(SqliteConfig::new(&path))
        .await
        .expect_err("garbage must not open");
    assert!(matches!(err, RecordError::Corrupt(_)), "got {err}");
    assert!(err.is_fatal());
}

#[tokio::test]
async fn open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state").join("records.db");
    let store = SqliteRecordStore::open(SqliteConfig::new(&path)).await.unwrap();
    assert!(path.exists());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_writers_from_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let store = std::sync::Arc::new(open(&dir).await);

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = std::sync::Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.put(&test_record(&format!("task-{i}"))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 16);
    assert_eq!(store.list_recent().await.unwrap().len(), 16);
}

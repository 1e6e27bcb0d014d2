//! Conformance suite shared by every [`RecordStore`] implementation.

use chrono::{TimeDelta, Utc};
use upd_core::{BackendInfo, Record, StorageKind};

use crate::error::RecordError;
use crate::store::{RECENT_LIMIT, RecordStore};

/// Build a never-expiring record with the given identifier.
pub fn test_record(id: &str) -> Record {
    Record {
        id: id.to_owned(),
        original: format!("{id}.bin"),
        tags: Vec::new(),
        ttl: String::new(),
        expires_at: None,
        delete_token: format!("{id}-token"),
        created_at: Utc::now(),
        backend: BackendInfo::new(StorageKind::Fs, "/tmp/upd-test"),
    }
}

/// Run the full record store conformance test suite.
///
/// Call this from your backend's test module with a fresh, empty store.
///
/// # Errors
///
/// Returns an error if any store operation fails unexpectedly. Assertion
/// failures panic.
pub async fn run_store_conformance_tests(store: &dyn RecordStore) -> Result<(), RecordError> {
    test_get_missing(store).await?;
    test_put_and_get(store).await?;
    test_put_rejects_duplicate(store).await?;
    test_delete(store).await?;
    test_recent_is_bounded_and_ordered(store).await?;
    test_delete_removes_from_recent(store).await?;
    test_scan_all(store).await?;
    test_scan_expired(store).await?;
    test_concurrent_puts(store).await?;
    test_medium_binding(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn RecordStore) -> Result<(), RecordError> {
    assert!(store.get("missing").await?.is_none(), "get on missing id");
    assert!(!store.contains("missing").await?);
    Ok(())
}

async fn test_put_and_get(store: &dyn RecordStore) -> Result<(), RecordError> {
    let mut record = test_record("put-get");
    record.tags = vec!["a".into(), "b".into()];
    record.ttl = "1h".into();
    record.expires_at = Some(record.created_at + TimeDelta::hours(1));
    store.put(&record).await?;

    let fetched = store.get("put-get").await?.expect("record should exist");
    assert_eq!(fetched.id, record.id);
    assert_eq!(fetched.tags, record.tags);
    assert_eq!(fetched.ttl, record.ttl);
    assert_eq!(fetched.delete_token, record.delete_token);
    assert_eq!(fetched.backend, record.backend);
    assert_eq!(
        fetched.expires_at.map(|t| t.timestamp_micros()),
        record.expires_at.map(|t| t.timestamp_micros())
    );
    assert!(store.contains("put-get").await?);
    store.delete("put-get").await?;
    Ok(())
}

async fn test_put_rejects_duplicate(store: &dyn RecordStore) -> Result<(), RecordError> {
    let first = test_record("dup");
    store.put(&first).await?;

    let mut second = test_record("dup");
    second.delete_token = "other".into();
    let err = store.put(&second).await.expect_err("duplicate put must fail");
    assert!(
        matches!(err, RecordError::AlreadyExists(ref id) if id == "dup"),
        "unexpected error: {err}"
    );

    let kept = store.get("dup").await?.expect("original should remain");
    assert_eq!(kept.delete_token, "dup-token", "original must not be overwritten");
    let recent: Vec<String> = store.list_recent().await?.into_iter().map(|r| r.id).collect();
    assert_eq!(
        recent.iter().filter(|id| *id == "dup").count(),
        1,
        "rejected put must not touch the recency index"
    );
    store.delete("dup").await?;
    Ok(())
}

async fn test_delete(store: &dyn RecordStore) -> Result<(), RecordError> {
    store.put(&test_record("to-delete")).await?;
    assert!(store.delete("to-delete").await?, "delete should report existing");
    assert!(store.get("to-delete").await?.is_none(), "get after delete");
    assert!(
        !store.delete("to-delete").await?,
        "second delete should be a no-op"
    );
    Ok(())
}

async fn test_recent_is_bounded_and_ordered(store: &dyn RecordStore) -> Result<(), RecordError> {
    let ids: Vec<String> = (0..RECENT_LIMIT + 5).map(|i| format!("recent-{i:02}")).collect();
    for id in &ids {
        store.put(&test_record(id)).await?;
    }

    let recent: Vec<String> = store.list_recent().await?.into_iter().map(|r| r.id).collect();
    let expected: Vec<String> = ids.iter().rev().take(RECENT_LIMIT).cloned().collect();
    assert_eq!(recent, expected, "recent must hold the last {RECENT_LIMIT}, newest first");

    for id in &ids {
        store.delete(id).await?;
    }
    assert!(store.list_recent().await?.is_empty());
    Ok(())
}

async fn test_delete_removes_from_recent(store: &dyn RecordStore) -> Result<(), RecordError> {
    for id in ["r-a", "r-b", "r-c"] {
        store.put(&test_record(id)).await?;
    }
    store.delete("r-b").await?;

    let recent: Vec<String> = store.list_recent().await?.into_iter().map(|r| r.id).collect();
    assert_eq!(recent, vec!["r-c".to_owned(), "r-a".to_owned()]);

    store.delete("r-a").await?;
    store.delete("r-c").await?;
    Ok(())
}

async fn test_scan_all(store: &dyn RecordStore) -> Result<(), RecordError> {
    for id in ["scan-1", "scan-2", "scan-3"] {
        store.put(&test_record(id)).await?;
    }
    let mut ids: Vec<String> = store.scan_all().await?.into_iter().map(|r| r.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["scan-1", "scan-2", "scan-3"]);
    assert_eq!(store.count().await?, 3);

    for id in ["scan-1", "scan-2", "scan-3"] {
        store.delete(id).await?;
    }
    assert!(store.scan_all().await?.is_empty());
    Ok(())
}

async fn test_scan_expired(store: &dyn RecordStore) -> Result<(), RecordError> {
    let now = Utc::now();

    let mut past = test_record("exp-past");
    past.ttl = "1s".into();
    past.created_at = now - TimeDelta::seconds(10);
    past.expires_at = Some(now - TimeDelta::seconds(9));

    let mut future = test_record("exp-future");
    future.ttl = "1h".into();
    future.expires_at = Some(now + TimeDelta::hours(1));

    let forever = test_record("exp-never");

    for record in [&past, &future, &forever] {
        store.put(record).await?;
    }

    let expired: Vec<String> = store
        .scan_expired(now)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(expired, vec!["exp-past".to_owned()]);

    for id in ["exp-past", "exp-future", "exp-never"] {
        store.delete(id).await?;
    }
    Ok(())
}

async fn test_concurrent_puts(store: &dyn RecordStore) -> Result<(), RecordError> {
    let records: Vec<Record> = (0..32).map(|i| test_record(&format!("conc-{i}"))).collect();
    let results = futures::future::join_all(records.iter().map(|r| store.put(r))).await;
    for result in results {
        result?;
    }

    assert_eq!(store.count().await?, records.len());
    let recent = store.list_recent().await?;
    assert_eq!(recent.len(), RECENT_LIMIT);
    for record in &recent {
        assert!(store.contains(&record.id).await?, "recent must only list live records");
    }

    let deletes = futures::future::join_all(records.iter().map(|r| store.delete(&r.id))).await;
    for result in deletes {
        assert!(result?, "each record is deleted exactly once");
    }
    assert!(store.list_recent().await?.is_empty());
    Ok(())
}

async fn test_medium_binding(store: &dyn RecordStore) -> Result<(), RecordError> {
    assert!(store.medium().await?.is_none(), "fresh store is unbound");
    store.bind_medium("fs").await?;
    store.bind_medium("fs").await?;
    assert_eq!(store.medium().await?.as_deref(), Some("fs"));

    let err = store
        .bind_medium("s3")
        .await
        .expect_err("binding another medium must fail");
    assert!(
        matches!(err, RecordError::MediumMismatch { ref stored, ref configured }
            if stored == "fs" && configured == "s3"),
        "unexpected error: {err}"
    );
    assert!(err.is_fatal());
    assert_eq!(store.medium().await?.as_deref(), Some("fs"));
    Ok(())
}

use std::sync::Arc;

use upd_blob::MemoryBlobBackend;
use upd_client::{Error, SendOptions, UpdClient};
use upd_engine::EngineBuilder;
use upd_records_memory::MemoryRecordStore;
use upd_server::api::AppState;
use upd_server::auth::SharedSecret;

const SECRET: &str = "hunter2";

/// Serve a fresh in-memory upd instance on a loopback port and return its
/// base URL.
async fn spawn_server(prefix: &str) -> String {
    let engine = EngineBuilder::new()
        .blobs(Arc::new(MemoryBlobBackend::default()))
        .records(Arc::new(MemoryRecordStore::new()))
        .build()
        .unwrap();
    let mut state = AppState::new(Arc::new(engine));
    state.secret = SharedSecret::new(SECRET);
    state.route_prefix = prefix.to_owned();
    let app = upd_server::api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}{prefix}")
}

fn client(base: &str) -> UpdClient {
    UpdClient::builder(base).secret_key(SECRET).build().unwrap()
}

#[tokio::test]
async fn send_fetch_delete() {
    let base = spawn_server("").await;
    let client = client(&base);
    assert!(client.health().await.unwrap());

    let sent = client
        .send(
            "hello.txt",
            b"hello".to_vec(),
            &SendOptions::new().ttl("1h").tags(["greeting"]),
        )
        .await
        .unwrap();
    assert!(sent.expiration_time.is_some());

    let fetched = client.fetch(&sent.name).await.unwrap();
    assert_eq!(fetched.data, "hello");
    assert_eq!(fetched.original.as_deref(), Some("hello.txt"));
    assert_eq!(
        fetched.content_type.as_deref(),
        Some("text/plain; charset=utf-8")
    );

    client.delete(&sent.name, &sent.delete_key).await.unwrap();
    let err = client.fetch(&sent.name).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn list_and_search() {
    let base = spawn_server("/upd").await;
    let client = client(&base);

    let a = client
        .send("a.txt", b"a".to_vec(), &SendOptions::new().tags(["x"]))
        .await
        .unwrap();
    let b = client
        .send("b.txt", b"b".to_vec(), &SendOptions::new())
        .await
        .unwrap();

    let recent = client.list().await.unwrap();
    let names: Vec<&str> = recent.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![b.name.as_str(), a.name.as_str()]);

    let hits = client.search_tags(&["x".to_owned()]).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, a.name);
    assert_eq!(hits[0].original, "a.txt");
}

#[tokio::test]
async fn wrong_delete_key_is_forbidden() {
    let base = spawn_server("").await;
    let client = client(&base);
    let sent = client
        .send("keep.txt", b"keep".to_vec(), &SendOptions::new())
        .await
        .unwrap();

    let err = client.delete(&sent.name, "wrong").await.unwrap_err();
    assert!(err.is_forbidden(), "{err:?}");
    assert_eq!(client.fetch(&sent.name).await.unwrap().data, "keep");
}

#[tokio::test]
async fn invalid_ttl_carries_the_server_message() {
    let base = spawn_server("").await;
    let err = client(&base)
        .send("a.txt", b"a".to_vec(), &SendOptions::new().ttl("tomorrow"))
        .await
        .unwrap_err();
    match err {
        Error::Http { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("tomorrow"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn auth_check_reports_both_outcomes() {
    let base = spawn_server("").await;
    assert!(client(&base).auth_check().await.unwrap().is_ok());

    let anonymous = UpdClient::new(&base).unwrap();
    assert!(!anonymous.auth_check().await.unwrap().is_ok());
    let err = anonymous
        .send("a.txt", b"a".to_vec(), &SendOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = UpdClient::new(format!("http://{addr}"))
        .unwrap()
        .list()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Connection(_)), "{err:?}");
}

use super::*;

#[test]
fn empty_document_uses_defaults() {
    let config = UpdConfig::from_toml("").unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9000);
    assert!(config.server.secret_key.is_empty());
    assert_eq!(config.storage.backend, "fs");
    assert_eq!(config.storage.fs.output_dir, "files");
    assert_eq!(config.records.backend, "sqlite");
    assert_eq!(config.records.path, "upd.db");
    assert!(config.background.enabled);
    assert_eq!(config.background.sweep_interval_seconds, 60);
    assert!(!config.telemetry.enabled);
    assert!(!config.tls.enabled);
}

#[test]
fn full_document() {
    let config = UpdConfig::from_toml(
        r#"
        [server]
        host = "0.0.0.0"
        port = 8443
        route = "upd/"
        secret_key = "hunter2"
        max_upload_bytes = 1024

        [storage]
        backend = "s3"

        [storage.s3]
        region = "eu-west-1"
        bucket = "files"
        access_key = "AKIA"
        access_secret = "shh"
        endpoint_url = "http://localhost:9000"
        prefix = "upd"

        [records]
        backend = "memory"

        [background]
        sweep_interval_seconds = 5

        [tls]
        enabled = true
        cert_path = "/etc/upd/cert.pem"
        key_path = "/etc/upd/key.pem"
        min_version = "1.3"
        "#,
    )
    .unwrap();

    assert_eq!(config.server.port, 8443);
    assert_eq!(config.server.route_prefix(), "/upd");
    assert_eq!(config.server.max_upload_bytes, 1024);
    assert_eq!(config.storage.s3.bucket, "files");
    assert_eq!(config.storage.s3.prefix.as_deref(), Some("upd"));
    assert_eq!(config.records.backend, "memory");
    assert_eq!(config.background.sweep_interval_seconds, 5);
    assert_eq!(config.tls.min_version, "1.3");
}

#[test]
fn route_prefix_is_normalized() {
    let mut server = ServerConfig::default();
    assert_eq!(server.route_prefix(), "");
    server.route = "/".into();
    assert_eq!(server.route_prefix(), "");
    server.route = "/files".into();
    assert_eq!(server.route_prefix(), "/files");
    server.route = "a/b/".into();
    assert_eq!(server.route_prefix(), "/a/b");
}

#[test]
fn secrets_are_redacted_from_debug() {
    let config = UpdConfig::from_toml(
        r#"
        [server]
        secret_key = "hunter2"

        [storage]
        backend = "s3"

        [storage.s3]
        bucket = "b"
        access_key = "AKIA"
        access_secret = "very-secret"
        "#,
    )
    .unwrap();
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("very-secret"));
    assert!(rendered.contains("[REDACTED]"));
}

#[test]
fn unknown_backends_are_rejected() {
    let err = UpdConfig::from_toml("[storage]\nbackend = \"ftp\"").unwrap_err();
    assert!(err.to_string().contains("ftp"));

    let err = UpdConfig::from_toml("[records]\nbackend = \"json\"").unwrap_err();
    assert!(err.to_string().contains("json"));
}

#[test]
fn s3_requires_bucket() {
    assert!(UpdConfig::from_toml("[storage]\nbackend = \"s3\"").is_err());
}

#[test]
fn half_configured_credentials_are_rejected() {
    let err = UpdConfig::from_toml(
        "[storage]\nbackend = \"s3\"\n[storage.s3]\nbucket = \"b\"\naccess_key = \"k\"",
    )
    .unwrap_err();
    assert!(err.to_string().contains("access_secret"));
}

#[test]
fn tls_requires_key_material() {
    assert!(UpdConfig::from_toml("[tls]\nenabled = true").is_err());
}

#[test]
fn zero_sweep_interval_is_rejected() {
    assert!(UpdConfig::from_toml("[background]\nsweep_interval_seconds = 0").is_err());
    assert!(
        UpdConfig::from_toml("[background]\nenabled = false\nsweep_interval_seconds = 0").is_ok()
    );
}

#[test]
fn missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (config, existed) = UpdConfig::load(&dir.path().join("upd.toml")).unwrap();
    assert!(!existed);
    assert_eq!(config.storage.backend, "fs");
}

#[test]
fn load_reads_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upd.toml");
    std::fs::write(&path, "[server]\nport = 1234\n").unwrap();
    let (config, existed) = UpdConfig::load(&path).unwrap();
    assert!(existed);
    assert_eq!(config.server.port, 1234);
}

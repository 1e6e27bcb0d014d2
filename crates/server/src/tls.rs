//! HTTPS termination with `rustls`.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, info};

use crate::config::TlsConfig;
use crate::error::ServerError;

fn read_error(path: &Path, e: &std::io::Error) -> ServerError {
    ServerError::Tls(format!("failed to read {}: {e}", path.display()))
}

/// Load a PEM certificate chain.
pub fn load_certs(path: impl AsRef<Path>) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| read_error(path, &e))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| read_error(path, &e))?;
    if certs.is_empty() {
        return Err(ServerError::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

/// Load the first PKCS#8, PKCS#1 or SEC1 private key from a PEM file.
pub fn load_private_key(path: impl AsRef<Path>) -> Result<PrivateKeyDer<'static>, ServerError> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| read_error(path, &e))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| read_error(path, &e))?
        .ok_or_else(|| ServerError::Tls(format!("no private key found in {}", path.display())))
}

/// Build the `rustls` server configuration described by `config`.
pub fn build_server_config(config: &TlsConfig) -> Result<Arc<rustls::ServerConfig>, ServerError> {
    let (Some(cert_path), Some(key_path)) = (&config.cert_path, &config.key_path) else {
        return Err(ServerError::Config(
            "tls.cert_path and tls.key_path are required when TLS is enabled".into(),
        ));
    };
    let versions: &[&'static rustls::SupportedProtocolVersion] = match config.min_version.trim() {
        "1.2" => &[&rustls::version::TLS12, &rustls::version::TLS13],
        "1.3" => &[&rustls::version::TLS13],
        other => {
            return Err(ServerError::Config(format!(
                "unsupported tls.min_version {other:?}, expected \"1.2\" or \"1.3\""
            )));
        }
    };

    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut server_config = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(versions)
        .map_err(|e| ServerError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Tls(e.to_string()))?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(Arc::new(server_config))
}

/// Accept TLS connections on `listener` and serve `app` until `shutdown`
/// resolves.
///
/// In-flight connections are not awaited; each one finishes on its own task.
pub async fn serve_tls(
    listener: TcpListener,
    tls_config: Arc<rustls::ServerConfig>,
    app: Router,
    shutdown: impl Future<Output = ()>,
) -> Result<(), ServerError> {
    let acceptor = TlsAcceptor::from(tls_config);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (tcp_stream, remote_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        debug!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                let acceptor = acceptor.clone();
                let app = app.clone();
                tokio::spawn(async move {
                    let tls_stream = match acceptor.accept(tcp_stream).await {
                        Ok(s) => s,
                        Err(e) => {
                            debug!(remote = %remote_addr, error = %e, "TLS handshake failed");
                            return;
                        }
                    };
                    let io = hyper_util::rt::TokioIo::new(tls_stream);
                    let service = hyper::service::service_fn(
                        move |request: hyper::Request<hyper::body::Incoming>| {
                            app.clone().oneshot(request)
                        },
                    );
                    if let Err(e) = hyper_util::server::conn::auto::Builder::new(
                        hyper_util::rt::TokioExecutor::new(),
                    )
                    .serve_connection(io, service)
                    .await
                    {
                        debug!(remote = %remote_addr, error = %e, "connection error");
                    }
                });
            }
            () = &mut shutdown => {
                info!("TLS listener shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_reported() {
        let err = load_certs("/nonexistent/cert.pem").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cert.pem"));
    }

    #[test]
    fn empty_pem_has_no_certificates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pem");
        std::fs::write(&path, "").unwrap();
        assert!(
            load_certs(&path)
                .unwrap_err()
                .to_string()
                .contains("no certificates")
        );
        assert!(
            load_private_key(&path)
                .unwrap_err()
                .to_string()
                .contains("no private key")
        );
    }

    #[test]
    fn rejects_unknown_min_version() {
        let config = TlsConfig {
            enabled: true,
            cert_path: Some("/c".into()),
            key_path: Some("/k".into()),
            min_version: "1.1".into(),
        };
        assert!(matches!(
            build_server_config(&config),
            Err(ServerError::Config(_))
        ));
    }
}

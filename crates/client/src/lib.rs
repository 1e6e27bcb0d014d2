//! upd HTTP Client
//!
//! A native Rust client for the upd file-hosting service's REST API.
//!
//! # Quick Start
//!
//! ```no_run
//! use upd_client::{SendOptions, UpdClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), upd_client::Error> {
//!     let client = UpdClient::builder("http://localhost:9000")
//!         .secret_key("hunter2")
//!         .build()?;
//!
//!     let sent = client
//!         .send("notes.txt", b"hello".to_vec(), &SendOptions::new().ttl("1h"))
//!         .await?;
//!     println!("{}", client.file_url(&sent.name));
//!
//!     client.delete(&sent.name, &sent.delete_key).await?;
//!     Ok(())
//! }
//! ```

mod error;

pub use error::Error;

pub use upd_core::{AuthStatus, RecentEntry, SearchEntry, SearchTagsResponse, SendResponse};

use std::time::Duration;

use bytes::Bytes;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::multipart::{Form, Part};
use reqwest::{Certificate, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the shared secret.
const SECRET_KEY_HEADER: &str = "X-upd-key";

/// Header carrying the uploader-supplied filename on downloads.
const ORIGINAL_FILENAME_HEADER: &str = "X-Upd-Orig-Filename";

/// HTTP client for an upd server.
#[derive(Debug, Clone)]
pub struct UpdClient {
    client: Client,
    base_url: String,
    secret_key: Option<String>,
}

/// Builder for configuring an [`UpdClient`].
#[derive(Debug)]
pub struct UpdClientBuilder {
    base_url: String,
    timeout: Duration,
    secret_key: Option<String>,
    ca_bundle: Option<Vec<u8>>,
    accept_invalid_certs: bool,
    client: Option<Client>,
}

impl UpdClientBuilder {
    /// Create a new builder with the given base URL, including any route
    /// prefix the server is mounted under.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            secret_key: None,
            ca_bundle: None,
            accept_invalid_certs: false,
            client: None,
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `secret` in the `X-upd-key` header on every request.
    #[must_use]
    pub fn secret_key(mut self, secret: impl Into<String>) -> Self {
        self.secret_key = Some(secret.into());
        self
    }

    /// Trust the PEM certificates in `pem` in addition to the system roots.
    #[must_use]
    pub fn ca_bundle(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_bundle = Some(pem.into());
        self
    }

    /// Skip server certificate verification entirely.
    #[must_use]
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Use a custom reqwest Client. Timeout and TLS settings are then ignored.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<UpdClient, Error> {
        let client = match self.client {
            Some(c) => c,
            None => {
                let mut builder = Client::builder()
                    .timeout(self.timeout)
                    .danger_accept_invalid_certs(self.accept_invalid_certs);
                if let Some(pem) = &self.ca_bundle {
                    let certs = Certificate::from_pem_bundle(pem)
                        .map_err(|e| Error::Configuration(format!("invalid CA bundle: {e}")))?;
                    if certs.is_empty() {
                        return Err(Error::Configuration(
                            "CA bundle contains no certificates".into(),
                        ));
                    }
                    for cert in certs {
                        builder = builder.add_root_certificate(cert);
                    }
                }
                builder
                    .build()
                    .map_err(|e| Error::Configuration(e.to_string()))?
            }
        };

        Ok(UpdClient {
            client,
            base_url: self.base_url,
            secret_key: self.secret_key.filter(|k| !k.is_empty()),
        })
    }
}

/// Optional upload parameters.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Lifetime such as `"30m"`; `None` keeps the file forever.
    pub ttl: Option<String>,
    pub tags: Vec<String>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A downloaded file.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub data: Bytes,
    /// The filename given at upload time.
    pub original: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl UpdClient {
    /// Create a new client with default configuration.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        UpdClientBuilder::new(base_url).build()
    }

    /// Create a builder for advanced configuration.
    pub fn builder(base_url: impl Into<String>) -> UpdClientBuilder {
        UpdClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public download URL of a file.
    pub fn file_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, segment(id))
    }

    /// URL that deletes a file when opened.
    pub fn delete_url(&self, id: &str, delete_key: &str) -> String {
        format!("{}/{}", self.file_url(id), segment(delete_key))
    }

    fn add_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.secret_key {
            Some(key) => req.header(SECRET_KEY_HEADER, key),
            None => req,
        }
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Response, Error> {
        self.add_auth(req)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Check if the server is healthy.
    pub async fn health(&self) -> Result<bool, Error> {
        let url = format!("{}/health", self.base_url);
        let response = self.execute(self.client.get(&url)).await?;
        Ok(response.status().is_success())
    }

    /// Check whether the configured secret key is accepted.
    ///
    /// A rejected key is reported as `Ok` with an
    /// `invalid_credentials` status rather than as an error.
    pub async fn auth_check(&self) -> Result<AuthStatus, Error> {
        let url = format!("{}/1.0/auth_check", self.base_url);
        let response = self.execute(self.client.get(&url)).await?;
        if response.status() == StatusCode::FORBIDDEN {
            return Ok(AuthStatus::invalid_credentials());
        }
        json(response).await
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Upload `data` under the original filename `name`.
    pub async fn send(
        &self,
        name: &str,
        data: impl Into<Bytes>,
        options: &SendOptions,
    ) -> Result<SendResponse, Error> {
        let data: Bytes = data.into();
        debug!(name, size = data.len(), "uploading file");

        let part = Part::stream(data).file_name(name.to_owned());
        let mut form = Form::new().part("data", part).text("name", name.to_owned());
        if let Some(ttl) = &options.ttl {
            form = form.text("ttl", ttl.clone());
        }
        if !options.tags.is_empty() {
            form = form.text("tags", options.tags.join(","));
        }

        let url = format!("{}/1.0/send", self.base_url);
        let response = self.execute(self.client.post(&url).multipart(form)).await?;
        json(response).await
    }

    /// Download a file.
    pub async fn fetch(&self, id: &str) -> Result<Fetched, Error> {
        self.fetch_inner(id, None).await
    }

    /// Download an image resized to `width` x `height`. Files that are not
    /// PNG or JPEG come back unchanged.
    pub async fn fetch_resized(&self, id: &str, width: u32, height: u32) -> Result<Fetched, Error> {
        self.fetch_inner(id, Some((width, height))).await
    }

    async fn fetch_inner(&self, id: &str, size: Option<(u32, u32)>) -> Result<Fetched, Error> {
        let mut req = self.client.get(self.file_url(id));
        if let Some((w, h)) = size {
            req = req.query(&[("w", w), ("h", h)]);
        }
        let response = checked(self.execute(req).await?).await?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned)
        };
        let original = header(ORIGINAL_FILENAME_HEADER);
        let content_type = header("content-type");
        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Fetched {
            data,
            original,
            content_type,
        })
    }

    /// Delete a file with the key returned by [`send`](Self::send).
    pub async fn delete(&self, id: &str, delete_key: &str) -> Result<(), Error> {
        let response = self
            .execute(self.client.delete(self.delete_url(id, delete_key)))
            .await?;
        checked(response).await?;
        Ok(())
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// The most recently uploaded files, newest first.
    pub async fn list(&self) -> Result<Vec<RecentEntry>, Error> {
        let url = format!("{}/1.0/list", self.base_url);
        let response = self.execute(self.client.get(&url)).await?;
        json(response).await
    }

    /// Files carrying any of `tags`.
    pub async fn search_tags(&self, tags: &[String]) -> Result<Vec<SearchEntry>, Error> {
        let url = format!("{}/1.0/search_tags", self.base_url);
        let response = self
            .execute(self.client.get(&url).query(&[("tags", tags.join(","))]))
            .await?;
        let found: SearchTagsResponse = json(response).await?;
        Ok(found.results)
    }
}

fn segment(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Turn a non-success response into [`Error::Http`], preferring the
/// server's `{"error": ...}` message.
async fn checked(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .ok()
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_owned()))
        .unwrap_or_else(|| status.to_string());
    Err(Error::Http {
        status: status.as_u16(),
        message,
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    checked(response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| Error::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = UpdClient::new("http://localhost:9000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[test]
    fn urls_include_the_prefix() {
        let client = UpdClient::new("https://files.example.com/upd").unwrap();
        assert_eq!(client.file_url("abcd1234"), "https://files.example.com/upd/abcd1234");
        assert_eq!(
            client.delete_url("abcd1234", "k3y"),
            "https://files.example.com/upd/abcd1234/k3y"
        );
    }

    #[test]
    fn path_segments_are_encoded() {
        let client = UpdClient::new("http://h").unwrap();
        assert_eq!(client.file_url("a/b"), "http://h/a%2Fb");
    }

    #[test]
    fn builder_sets_secret_key() {
        let client = UpdClientBuilder::new("http://h")
            .secret_key("hunter2")
            .build()
            .unwrap();
        assert_eq!(client.secret_key.as_deref(), Some("hunter2"));
    }

    #[test]
    fn empty_secret_key_is_not_sent() {
        let client = UpdClientBuilder::new("http://h")
            .secret_key("")
            .build()
            .unwrap();
        assert!(client.secret_key.is_none());
    }

    #[test]
    fn garbage_ca_bundle_is_rejected() {
        let err = UpdClientBuilder::new("https://h")
            .ca_bundle(b"not a certificate".to_vec())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn send_options_builder() {
        let options = SendOptions::new().ttl("1h").tags(["a", "b"]);
        assert_eq!(options.ttl.as_deref(), Some("1h"));
        assert_eq!(options.tags, vec!["a".to_owned(), "b".to_owned()]);
    }
}

mod error;

pub use error::{HttpError, Result};

use std::time::Duration;

use futures::{StreamExt, stream::BoxStream};
use reqwest::{Client, StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

/// Timeouts and identity shared by every request the client makes.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Upper bound for a whole JSON request, body included.
    pub request_timeout: Duration,
    /// Per-read bound while streaming an artifact. Streams have no total bound.
    pub download_read_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            download_read_timeout: Duration::from_secs(30),
            user_agent: "RavenClient-Updater".to_string(),
        }
    }
}

/// A decoded JSON body together with the status it arrived with.
#[derive(Debug, Clone)]
pub struct JsonReply<T> {
    pub status: u16,
    pub body: T,
}

impl<T> JsonReply<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A streamed response body.
pub struct ByteStream {
    /// Length announced by the server, if any.
    pub content_length: Option<u64>,
    pub chunks: BoxStream<'static, Result<Vec<u8>>>,
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// GET-only client for the license and release services.
///
/// JSON calls are bounded by connect, read and total timeouts; artifact
/// streams are bounded by connect and per-read timeouts so a stalled server
/// can never hang a caller indefinitely.
#[derive(Debug, Clone)]
pub struct HttpJsonClient {
    json: Client,
    download: Client,
    request_timeout: Duration,
}

impl HttpJsonClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let json = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(HttpError::Client)?;

        let download = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.download_read_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(HttpError::Client)?;

        Ok(Self {
            json,
            download,
            request_timeout: config.request_timeout,
        })
    }

    /// GET `url` and decode the body as JSON whatever the status code.
    ///
    /// Services that describe failures in the body (the license service does)
    /// should use this and inspect the decoded value.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<JsonReply<T>> {
        let (status, body) = self.fetch_text(&url).await?;
        let body = decode(&url, &body)?;
        Ok(JsonReply {
            status: status.as_u16(),
            body,
        })
    }

    /// GET `url`, treating 404 as "nothing there" and any other non-success
    /// status as an error.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json_if_found<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        let (status, body) = self.fetch_text(&url).await?;

        if status == StatusCode::NOT_FOUND {
            debug!("{} returned 404", url);
            return Ok(None);
        }
        if !status.is_success() {
            warn!("{} returned HTTP {}", url, status);
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        decode(&url, &body).map(Some)
    }

    /// Open a streamed GET. Non-success statuses are errors.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn open_stream(&self, url: Url) -> Result<ByteStream> {
        let response = self
            .download
            .get(url.clone())
            .send()
            .await
            .map_err(|source| HttpError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length().filter(|len| *len > 0);
        debug!(?content_length, "opened artifact stream");

        let stream_url = url.to_string();
        let chunks = response
            .bytes_stream()
            .map(move |chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|source| HttpError::Transport {
                        url: stream_url.clone(),
                        source,
                    })
            })
            .boxed();

        Ok(ByteStream {
            content_length,
            chunks,
        })
    }

    async fn fetch_text(&self, url: &Url) -> Result<(StatusCode, String)> {
        let transport = |source| HttpError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .json
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        Ok((status, body))
    }
}

/// Join `path` onto a service base URL, keeping any path the base already has.
///
/// `join_endpoint("http://host/license", "validate")` is
/// `http://host/license/validate`.
pub fn join_endpoint(base: &str, path: &str) -> Result<Url> {
    let invalid = |source| HttpError::InvalidUrl {
        url: base.to_string(),
        source,
    };

    let mut base_url = Url::parse(base).map_err(invalid)?;
    if !base_url.path().ends_with('/') {
        let with_slash = format!("{}/", base_url.path());
        base_url.set_path(&with_slash);
    }
    base_url.join(path).map_err(invalid)
}

fn decode<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| HttpError::Malformed {
        url: url.to_string(),
        source,
    })
}

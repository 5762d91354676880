use async_trait::async_trait;
use raven_http::{ByteStream, HttpError, HttpJsonClient, join_endpoint};
use url::Url;

use crate::GitHubRelease;

/// Where releases are published and artifacts downloaded from.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// The latest published release, or `None` when there is none yet.
    async fn latest_release(&self) -> Result<Option<GitHubRelease>, HttpError>;

    async fn open_artifact(&self, url: &str) -> Result<ByteStream, HttpError>;
}

/// GitHub-style release API at `<repository>/releases/latest`.
#[derive(Debug, Clone)]
pub struct HttpReleaseSource {
    client: HttpJsonClient,
    latest_url: Url,
}

impl HttpReleaseSource {
    pub fn new(client: HttpJsonClient, repository: &str) -> Result<Self, HttpError> {
        Ok(Self {
            client,
            latest_url: join_endpoint(repository, "releases/latest")?,
        })
    }

    pub fn latest_url(&self) -> &Url {
        &self.latest_url
    }
}

#[async_trait]
impl ReleaseSource for HttpReleaseSource {
    async fn latest_release(&self) -> Result<Option<GitHubRelease>, HttpError> {
        self.client
            .get_json_if_found::<GitHubRelease>(self.latest_url.clone())
            .await
    }

    async fn open_artifact(&self, url: &str) -> Result<ByteStream, HttpError> {
        let url = Url::parse(url).map_err(|source| HttpError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        self.client.open_stream(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_url_extends_the_repository_path() {
        let client = HttpJsonClient::new(&Default::default()).unwrap();
        let source =
            HttpReleaseSource::new(client, "https://api.github.com/repos/RavenYSC/RavensGoonCorner")
                .unwrap();
        assert_eq!(
            source.latest_url().as_str(),
            "https://api.github.com/repos/RavenYSC/RavensGoonCorner/releases/latest"
        );
    }
}

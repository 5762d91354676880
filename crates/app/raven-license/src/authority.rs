use async_trait::async_trait;
use raven_http::{HttpError, HttpJsonClient, join_endpoint};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRequest {
    pub key: String,
    pub username: String,
    pub hwid: String,
}

/// Body of a validation reply. The service answers with this shape for both
/// accepted and rejected keys, whatever the HTTP status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub discord_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ValidationResponse {
    pub fn accepted(username: impl Into<String>, discord_id: impl Into<String>) -> Self {
        Self {
            valid: true,
            username: Some(username.into()),
            discord_id: Some(discord_id.into()),
            error: None,
        }
    }

    pub fn rejected(error: Option<&str>) -> Self {
        Self {
            valid: false,
            error: error.map(str::to_owned),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait LicenseAuthority: Send + Sync {
    async fn validate(&self, request: &ValidationRequest) -> Result<ValidationResponse, HttpError>;
}

/// License service reached over HTTP at `<endpoint>/validate`.
#[derive(Debug, Clone)]
pub struct HttpLicenseAuthority {
    client: HttpJsonClient,
    validate_url: Url,
}

impl HttpLicenseAuthority {
    pub fn new(client: HttpJsonClient, endpoint: &str) -> Result<Self, HttpError> {
        Ok(Self {
            client,
            validate_url: join_endpoint(endpoint, "validate")?,
        })
    }

    fn request_url(&self, request: &ValidationRequest) -> Url {
        let mut url = self.validate_url.clone();
        url.query_pairs_mut()
            .append_pair("key", &request.key)
            .append_pair("username", &request.username)
            .append_pair("hwid", &request.hwid);
        url
    }
}

#[async_trait]
impl LicenseAuthority for HttpLicenseAuthority {
    async fn validate(&self, request: &ValidationRequest) -> Result<ValidationResponse, HttpError> {
        let reply = self
            .client
            .get_json::<ValidationResponse>(self.request_url(request))
            .await?;
        debug!(
            status = reply.status,
            valid = reply.body.valid,
            "license service replied"
        );
        Ok(reply.body)
    }
}

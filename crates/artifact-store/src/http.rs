//! Path-style HTTP object gateway backend

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{validate_key, ArtifactStore, ScratchFile, StoreError};

const APIKEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens this close to expiry are refreshed before use
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// How requests to the gateway are authorized
enum Credentials {
    Anonymous,
    /// Key sent as-is as the bearer token
    Static(String),
    /// Key exchanged for a short-lived access token at `auth_endpoint`
    TokenExchange { auth_endpoint: String, api_key: String },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Object store reached over HTTP at `{endpoint}/{bucket}/{key}`
pub struct HttpArtifactStore {
    client: Client,
    endpoint: String,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl HttpArtifactStore {
    /// Create a client for the gateway at `endpoint`
    ///
    /// A non-empty `api_key` is sent directly as the bearer token unless a
    /// token service is configured with [`Self::with_auth_endpoint`].
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        let credentials = match api_key.filter(|k| !k.is_empty()) {
            Some(key) => Credentials::Static(key),
            None => Credentials::Anonymous,
        };

        info!("Using HTTP artifact store at {}", endpoint);
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Exchange the API key for access tokens at `auth_endpoint`
    ///
    /// Has no effect without an API key.
    pub fn with_auth_endpoint(mut self, auth_endpoint: &str) -> Self {
        if let Credentials::Static(api_key) = self.credentials {
            debug!("Exchanging API key for tokens at {}", auth_endpoint);
            self.credentials = Credentials::TokenExchange {
                auth_endpoint: auth_endpoint.to_string(),
                api_key,
            };
        }
        self
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<String, StoreError> {
        validate_key(bucket)?;
        validate_key(key)?;
        Ok(format!("{}/{}/{}", self.endpoint, bucket, key))
    }

    /// Fetch a fresh access token from the token service
    async fn request_token(&self, auth_endpoint: &str, api_key: &str) -> Result<AccessToken, StoreError> {
        let response = self
            .client
            .post(auth_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", APIKEY_GRANT), ("apikey", api_key)])
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!("Token service returned {}", status);
            return Err(StoreError::Auth(format!("token service returned {status}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Auth(format!("malformed token response: {e}")))?;
        debug!("Obtained access token valid for {}s", token.expires_in);

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    /// Bearer token for the next request, refreshing an expiring one
    async fn bearer(&self) -> Result<Option<String>, StoreError> {
        let (auth_endpoint, api_key) = match &self.credentials {
            Credentials::Anonymous => return Ok(None),
            Credentials::Static(key) => return Ok(Some(key.clone())),
            Credentials::TokenExchange { auth_endpoint, api_key } => (auth_endpoint, api_key),
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(Some(token.value.clone()));
            }
        }

        let token = self.request_token(auth_endpoint, api_key).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(Some(value))
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        Ok(match self.bearer().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    fn check_status(status: StatusCode, bucket: &str, key: &str) -> Result<(), StoreError> {
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            error!("Artifact store returned {} for {}/{}", status, bucket, key);
            return Err(StoreError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn download(&self, bucket: &str, key: &str) -> Result<ScratchFile, StoreError> {
        let url = self.object_url(bucket, key)?;
        debug!("GET {}", url);

        let response = self
            .authorize(self.client.get(&url))
            .await?
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        Self::check_status(response.status(), bucket, key)?;

        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let scratch = ScratchFile::reserve(key);
        tokio::fs::write(scratch.path(), &body).await?;
        debug!("Fetched {}/{} ({} bytes)", bucket, key, body.len());
        Ok(scratch)
    }

    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let url = self.object_url(bucket, key)?;
        let size = bytes.len();
        debug!("PUT {} ({} bytes)", url, size);

        let response = self
            .authorize(self.client.put(&url))
            .await?
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        Self::check_status(response.status(), bucket, key)?;

        info!("Stored {}/{} ({} bytes)", bucket, key, size);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

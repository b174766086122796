//! HTTP client for the Helix endpoints.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::batch::{MAX_BATCH_SIZE, parse_remaining_quota};
use crate::error::HelixError;
use crate::models::{AppToken, FollowTotal, Page, StreamRecord, StreamsPage, UserRecord};

pub const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_AUTH_BASE: &str = "https://id.twitch.tv";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response header carrying the number of requests left in the current window.
pub const RATELIMIT_REMAINING_HEADER: &str = "ratelimit-remaining";

const STREAMS_ENDPOINT: &str = "/streams";
const USERS_ENDPOINT: &str = "/users";
const USER_FOLLOWS_ENDPOINT: &str = "/users/follows";
const TOKEN_ENDPOINT: &str = "/oauth2/token";

const DEFAULT_USER_AGENT: &str = concat!("helix-client/", env!("CARGO_PKG_VERSION"));

/// Operations the statistics poller needs from the platform.
///
/// Implemented by [`HelixClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait HelixApi: Send + Sync {
    /// Exchange the client id and secret for an app access token.
    async fn request_app_token(&self) -> Result<AppToken, HelixError>;

    /// Live streams for up to [`MAX_BATCH_SIZE`] logins, plus the remaining quota.
    async fn fetch_streams(&self, token: &str, logins: &[String])
    -> Result<StreamsPage, HelixError>;

    /// User records for up to [`MAX_BATCH_SIZE`] logins.
    async fn fetch_users(&self, token: &str, logins: &[String])
    -> Result<Vec<UserRecord>, HelixError>;

    /// Total follower count of a single user id.
    async fn fetch_follower_count(&self, token: &str, user_id: &str) -> Result<u64, HelixError>;
}

pub(crate) fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate may have installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Builder for [`HelixClient`].
#[derive(Debug, Clone)]
pub struct HelixClientBuilder {
    client_id: String,
    client_secret: String,
    api_base: String,
    auth_base: String,
    timeout: Duration,
    user_agent: String,
    http: Option<Client>,
}

impl HelixClientBuilder {
    /// Override the API base URL (defaults to [`DEFAULT_API_BASE`]).
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Override the auth base URL (defaults to [`DEFAULT_AUTH_BASE`]).
    pub fn auth_base(mut self, base: impl Into<String>) -> Self {
        self.auth_base = base.into();
        self
    }

    /// Per-request deadline. Zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a preconfigured `reqwest::Client`; timeout and user agent are then ignored.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(self) -> Result<HelixClient, HelixError> {
        let api_base = normalize_base(&self.api_base)?;
        let auth_base = normalize_base(&self.auth_base)?;

        let http = match self.http {
            Some(client) => client,
            None => {
                install_rustls_provider();
                let mut builder = Client::builder().user_agent(self.user_agent);
                if self.timeout > Duration::ZERO {
                    builder = builder.timeout(self.timeout);
                }
                builder.build()?
            }
        };

        Ok(HelixClient {
            http,
            client_id: self.client_id,
            client_secret: self.client_secret,
            api_base,
            auth_base,
        })
    }
}

fn normalize_base(base: &str) -> Result<String, HelixError> {
    let parsed = Url::parse(base)?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Authenticated client for the Helix API.
#[derive(Debug, Clone)]
pub struct HelixClient {
    http: Client,
    client_id: String,
    client_secret: String,
    api_base: String,
    auth_base: String,
}

impl HelixClient {
    pub fn builder(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> HelixClientBuilder {
        HelixClientBuilder {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http: None,
        }
    }

    fn ensure_batch(ids: &[String]) -> Result<(), HelixError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(HelixError::BatchTooLarge {
                len: ids.len(),
                max: MAX_BATCH_SIZE,
            });
        }
        Ok(())
    }

    async fn get(
        &self,
        token: &str,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, HelixError> {
        let url = format!("{}{}", self.api_base, endpoint);
        trace!(url = %url, params = query.len(), "Helix request");

        let response = self
            .http
            .get(&url)
            .header("Client-ID", &self.client_id)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, HelixError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(HelixError::Unauthorized(body));
    }
    Err(HelixError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HelixError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl HelixApi for HelixClient {
    async fn request_app_token(&self) -> Result<AppToken, HelixError> {
        let url = format!("{}{}", self.auth_base, TOKEN_ENDPOINT);
        debug!(url = %url, "Requesting app access token");

        let response = self
            .http
            .post(&url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        decode(check_status(response).await?).await
    }

    async fn fetch_streams(
        &self,
        token: &str,
        logins: &[String],
    ) -> Result<StreamsPage, HelixError> {
        Self::ensure_batch(logins)?;
        if logins.is_empty() {
            return Ok(StreamsPage::default());
        }

        let first = MAX_BATCH_SIZE.to_string();
        let mut query: Vec<(&str, &str)> = logins
            .iter()
            .map(|login| ("user_login", login.as_str()))
            .collect();
        query.push(("first", first.as_str()));

        let response = self.get(token, STREAMS_ENDPOINT, &query).await?;
        let remaining_quota = parse_remaining_quota(response.headers());
        let page: Page<StreamRecord> = decode(response).await?;

        debug!(
            requested = logins.len(),
            live = page.data.len(),
            remaining_quota,
            "Fetched streams"
        );

        Ok(StreamsPage {
            streams: page.data,
            remaining_quota,
        })
    }

    async fn fetch_users(
        &self,
        token: &str,
        logins: &[String],
    ) -> Result<Vec<UserRecord>, HelixError> {
        Self::ensure_batch(logins)?;
        if logins.is_empty() {
            return Ok(Vec::new());
        }

        let query: Vec<(&str, &str)> = logins
            .iter()
            .map(|login| ("login", login.as_str()))
            .collect();

        let response = self.get(token, USERS_ENDPOINT, &query).await?;
        let page: Page<UserRecord> = decode(response).await?;
        debug!(requested = logins.len(), found = page.data.len(), "Fetched users");
        Ok(page.data)
    }

    async fn fetch_follower_count(&self, token: &str, user_id: &str) -> Result<u64, HelixError> {
        let response = self
            .get(
                token,
                USER_FOLLOWS_ENDPOINT,
                &[("to_id", user_id), ("first", "1")],
            )
            .await?;
        let follows: FollowTotal = decode(response).await?;
        Ok(follows.total)
    }
}

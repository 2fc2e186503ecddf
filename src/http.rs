// HTTP layer for the DriveHub API
// Attaches the bearer token, recovers from expired access tokens with a
// single refresh-and-retry, and retries connectivity failures with linear
// backoff

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::models::{RefreshTokenRequest, TokenPair};
use crate::navigator::Navigator;
use crate::store::{SessionStore, StoreKey};

/// Body of an outgoing request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Description of one API call.
///
/// A fresh transport request is built from it for every attempt, so the
/// Authorization header always reflects the token currently in storage.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).context("Failed to serialize request body")?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn with_form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }
}

/// Whether a request already went through the 401 recovery path.
///
/// Exactly one refresh-and-retry is allowed per request; carrying the marker
/// through the dispatch loop makes that bound structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthAttempt {
    First,
    Retried,
}

/// HTTP client for the DriveHub API with session recovery.
pub struct ApiClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    config: ClientConfig,

    /// Persisted session fields (tokens, cached profile)
    store: Arc<dyn SessionStore>,

    /// Redirect sink for forced logouts
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            store,
            navigator,
        })
    }

    /// Execute a request, transparently recovering from an expired access
    /// token.
    ///
    /// Handling per response:
    /// - 2xx: returned as-is
    /// - 401: one token refresh, then the original request is re-issued;
    ///   a missing refresh token or a failed refresh ends the session
    /// - 403 and 429: logged and propagated, the session stays intact
    /// - other statuses: propagated with the server's detail message
    ///
    /// Connectivity failures (including the request timeout) are retried
    /// before any of the above applies.
    pub async fn send(&self, request: ApiRequest) -> Result<Response> {
        let mut auth_attempt = AuthAttempt::First;

        loop {
            let response = self.dispatch(&request).await?;

            if response.status().as_u16() != 401 {
                return self.check_status(response).await;
            }

            let original = self.error_from_response(response).await;

            if auth_attempt == AuthAttempt::Retried {
                tracing::warn!(path = %request.path, "Request failed again after token refresh");
                return Err(original);
            }
            auth_attempt = AuthAttempt::Retried;

            let refresh_token = match self.store.get(StoreKey::RefreshToken) {
                Ok(token) => token,
                Err(err) => {
                    tracing::error!("Failed to read refresh token: {:?}", err);
                    None
                }
            };

            let Some(refresh_token) = refresh_token else {
                tracing::warn!(path = %request.path, "Received 401 with no refresh token, ending session");
                self.expire_session();
                return Err(original);
            };

            match self.refresh_access_token(&refresh_token).await {
                Ok(()) => {
                    tracing::debug!(path = %request.path, "Token refreshed, retrying request");
                    continue;
                }
                Err(refresh_err) => {
                    tracing::warn!(error = %refresh_err, "Token refresh failed, ending session");
                    self.expire_session();
                    return Err(refresh_err);
                }
            }
        }
    }

    /// Execute a request and deserialize the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        let value = response
            .json()
            .await
            .context("Failed to parse API response")?;
        Ok(value)
    }

    /// Execute a request with network retries but no status handling.
    ///
    /// The token refresh call itself goes through here so that a 401 from
    /// `/auth/refresh` can never re-enter the recovery path.
    async fn dispatch(&self, request: &ApiRequest) -> Result<Response> {
        let max_retries = self.config.network_retries;
        let mut attempt: u32 = 0;

        loop {
            let req = self.build_request(request);

            if self.config.environment.is_development() {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    attempt = attempt + 1,
                    "Sending API request"
                );
            }

            match req.send().await {
                Ok(response) => {
                    if self.config.environment.is_development() {
                        tracing::debug!(
                            status = %response.status(),
                            path = %request.path,
                            "Received API response"
                        );
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let error_kind = categorize_error(&e);

                    if attempt < max_retries {
                        let delay = self.retry_delay(attempt);
                        tracing::warn!(
                            "Request to {} failed ({}), retrying after {}ms (attempt {}/{})",
                            request.path,
                            error_kind,
                            delay,
                            attempt + 1,
                            max_retries
                        );

                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(
                        error_kind = error_kind,
                        error = %e,
                        path = %request.path,
                        total_attempts = attempt + 1,
                        "Request failed after all retries"
                    );
                    return Err(ApiError::Network(format!("{} (kind: {})", e, error_kind)));
                }
            }
        }
    }

    /// Build the transport request, reading the access token currently in
    /// storage.
    fn build_request(&self, request: &ApiRequest) -> RequestBuilder {
        let url = join_url(&self.config.base_url, &request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if let Some(token) = self.access_token() {
            builder = builder.bearer_auth(token);
        }

        match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
        }
    }

    /// Pass 2xx responses through, convert everything else into an error.
    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error = self.error_from_response(response).await;
        match &error {
            ApiError::Forbidden(detail) => {
                tracing::warn!(detail = %detail, "Request not permitted");
            }
            ApiError::RateLimited(detail) => {
                tracing::warn!(detail = %detail, "Request rate limited");
            }
            _ => {
                tracing::warn!(status = status.as_u16(), "Request failed");
            }
        }
        Err(error)
    }

    async fn error_from_response(&self, response: Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if self.config.environment.is_development() {
            tracing::debug!(status = status, body = %body, "API error response");
        }
        ApiError::from_response(status, &body)
    }

    /// Exchange the refresh token for a new access token and persist it
    /// (along with a rotated refresh token when the server sends one).
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<()> {
        tracing::debug!("Refreshing access token");

        let request = ApiRequest::post("/auth/refresh").with_json(&RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        })?;

        let response = self.dispatch(&request).await?;
        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let pair: TokenPair = response
            .json()
            .await
            .context("Failed to parse token refresh response")?;

        self.store.set(StoreKey::AccessToken, &pair.access_token)?;
        if let Some(rotated) = &pair.refresh_token {
            self.store.set(StoreKey::RefreshToken, rotated)?;
        }

        tracing::debug!("Access token refreshed");
        Ok(())
    }

    /// Ends the session: wipes the persisted fields and forces the login
    /// route, unless the application is already there.
    fn expire_session(&self) {
        if let Err(err) = self.store.clear() {
            tracing::error!("Failed to clear session storage: {:?}", err);
        }
        if self.navigator.current_route() != self.config.login_route {
            self.navigator.navigate(&self.config.login_route);
        }
    }

    fn access_token(&self) -> Option<String> {
        match self.store.get(StoreKey::AccessToken) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!("Failed to read access token: {:?}", err);
                None
            }
        }
    }

    /// Linear backoff: the delay grows with each attempt.
    fn retry_delay(&self, attempt: u32) -> u64 {
        self.config.retry_delay_ms * (attempt as u64 + 1)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Categorize a transport error for logging
fn categorize_error(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connection_failed"
    } else if error.is_request() {
        "request_error"
    } else if error.is_body() {
        "body_error"
    } else if error.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

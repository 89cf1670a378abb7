//! Session Controller
//!
//! One `Session` per logged-in identity. The access token is held in memory
//! only and never persisted; the refresh token is an HTTP-only cookie owned
//! by `reqwest`'s cookie store and is never readable from here.

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::ClientError;

/// Success envelope for token-bearing responses.
#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<TokenData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    access_token: String,
}

/// Error envelope.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Authenticated session against one Opsboard server.
pub struct Session {
    http: reqwest::Client,
    base_url: String,
    /// In-memory access token. `None` until login or a successful refresh.
    access_token: RwLock<Option<String>>,
    /// Serializes refresh attempts. Concurrent 401s queue here; whoever
    /// arrives second re-reads the token instead of refreshing again.
    refresh_lock: Mutex<()>,
}

impl Session {
    /// Create a session for a server base URL (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Current access token, if one is held.
    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    /// Replace the held access token.
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Login with email and password, storing the returned access token.
    /// The refresh cookie is captured by the cookie store from Set-Cookie.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let token = Self::token_from_response(response).await?;
        self.set_access_token(Some(token)).await;
        Ok(())
    }

    /// Logout: clear the refresh cookie server-side and drop the token.
    ///
    /// The token is dropped even when the request fails; a logout that
    /// cannot reach the server still ends the local session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.http.post(self.url("/api/auth/logout")).send().await;
        self.set_access_token(None).await;
        result?;
        Ok(())
    }

    /// Attempt a silent refresh. Returns whether a new access token was
    /// obtained; never panics and never surfaces transport errors.
    pub async fn refresh_session(&self) -> bool {
        let _guard = self.refresh_lock.lock().await;
        self.do_refresh().await
    }

    /// Refresh while already holding the refresh lock.
    async fn do_refresh(&self) -> bool {
        let response = match self.http.post(self.url("/api/auth/refresh")).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Refresh transport failure");
                return false;
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "Refresh rejected");
            return false;
        }

        match response.json::<Envelope>().await {
            Ok(Envelope {
                data: Some(TokenData { access_token }),
            }) => {
                self.set_access_token(Some(access_token)).await;
                true
            }
            Ok(Envelope { data: None }) => {
                debug!("Refresh response missing token");
                false
            }
            Err(e) => {
                debug!(error = %e, "Refresh response unparseable");
                false
            }
        }
    }

    /// Send an authenticated request.
    ///
    /// On a 401 the session refreshes once and retries once; if the refresh
    /// fails the original 401 response is returned untouched. A 401 on the
    /// retry is likewise returned as-is, so one call never loops.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ClientError> {
        let sent_with = self.access_token().await;
        let response = self.send(method.clone(), path, body, sent_with.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let refreshed = {
            let _guard = self.refresh_lock.lock().await;
            // Another caller may have refreshed while we waited for the
            // lock; a changed token means the session is already renewed.
            if self.access_token().await != sent_with {
                true
            } else {
                self.do_refresh().await
            }
        };

        if !refreshed {
            return Ok(response);
        }

        let token = self.access_token().await;
        self.send(method, path, body, token.as_deref()).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Extract `data.accessToken` from a token-bearing response, converting
    /// error envelopes into [`ClientError::Api`].
    async fn token_from_response(response: Response) -> Result<String, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Envelope>()
            .await?
            .data
            .map(|d| d.access_token)
            .ok_or(ClientError::UnexpectedResponse)
    }
}

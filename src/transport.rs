// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Authenticating HTTP transport.
//!
//! AD CS web enrollment is normally protected by Windows integrated
//! authentication. The [`Transport`] sends HTTP Basic credentials on every
//! request and, in [`AuthMode::ChallengeResponse`], answers a `401` that
//! advertises the responder's scheme with the usual two-leg handshake:
//!
//! ```text
//! C: GET /certsrv/           Authorization: Basic ...
//! S: 401                     WWW-Authenticate: NTLM
//! C: GET /certsrv/           Authorization: NTLM <negotiate>
//! S: 401                     WWW-Authenticate: NTLM <challenge>
//! C: GET /certsrv/           Authorization: NTLM <authenticate>
//! S: 200
//! ```
//!
//! The handshake messages themselves come from a [`ChallengeResponder`]
//! supplied by the application.

use base64::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::config::{AuthMode, CertsrvConfig, HttpAuth};
use crate::error::{CertsrvError, Result};
use crate::tls::build_http_client;
use crate::types::content_types;

/// Produces the messages of a connection-oriented challenge-response
/// authentication scheme such as NTLM.
///
/// Tokens are raw bytes; the transport takes care of base64 and headers.
pub trait ChallengeResponder: Send + Sync {
    /// Scheme name as it appears in `WWW-Authenticate`, e.g. `"NTLM"`.
    fn scheme(&self) -> &str;

    /// First message of the handshake.
    fn negotiate(&self, credentials: &HttpAuth) -> Result<Vec<u8>>;

    /// Answer to the server challenge.
    fn authenticate(&self, credentials: &HttpAuth, challenge: &[u8]) -> Result<Vec<u8>>;
}

/// HTTP transport bound to a certsrv base URL.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    auth: AuthMode,
    base_url: Url,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("auth", &self.auth)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Transport {
    /// Build a transport from the client configuration.
    pub fn new(config: &CertsrvConfig) -> Result<Self> {
        if matches!(config.auth, AuthMode::Anonymous) {
            tracing::warn!("Not using an authenticated transport for {}", config.server_url);
        }

        let http = build_http_client(config)?;

        Ok(Self {
            http,
            auth: config.auth.clone(),
            base_url: config.server_url.clone(),
        })
    }

    /// Send a GET request.
    pub async fn get(&self, url: Url) -> Result<reqwest::Response> {
        tracing::debug!("GET {}", url);
        let request = self.http.request(Method::GET, url).build()?;
        self.send(request).await
    }

    /// Send a form-encoded POST request.
    pub async fn post_form(&self, url: Url, form: String) -> Result<reqwest::Response> {
        tracing::debug!("POST {}", url);
        let request = self
            .http
            .request(Method::POST, url)
            .header(CONTENT_TYPE, content_types::FORM_URLENCODED)
            .body(form)
            .build()?;
        self.send(request).await
    }

    /// Check that the base URL is reachable with the configured
    /// credentials.
    ///
    /// Fails on connection errors and on `401`. Other statuses are logged
    /// and accepted, since some front-ends do not serve the base page.
    pub async fn verify(&self) -> Result<()> {
        let user = self
            .auth
            .credentials()
            .map(|c| c.username.as_str())
            .unwrap_or("<anonymous>");
        tracing::info!("Authentication check for user {} at {}", user, self.base_url);

        let response = self.get(self.base_url.clone()).await.map_err(|e| {
            tracing::error!("certsrv server error: {}", e);
            e
        })?;

        if response.status().is_success() {
            tracing::info!("Authentication check successful ({})", response.status());
        } else {
            tracing::warn!("Authentication check returned {}", response.status());
        }
        Ok(())
    }

    /// Execute a request with the configured authentication.
    ///
    /// A final `401` becomes [`CertsrvError::AuthenticationRequired`].
    async fn send(&self, mut request: reqwest::Request) -> Result<reqwest::Response> {
        if let Some(credentials) = self.auth.credentials() {
            set_authorization(request.headers_mut(), &basic_header(credentials))?;
        }

        let response = match &self.auth {
            AuthMode::ChallengeResponse {
                credentials,
                responder,
            } => {
                let replay = request.try_clone();
                let response = self.http.execute(request).await?;

                match replay {
                    Some(replay)
                        if response.status() == StatusCode::UNAUTHORIZED
                            && !challenges(response.headers(), responder.scheme()).is_empty() =>
                    {
                        drain(response).await;
                        self.handshake(replay, credentials, responder.as_ref())
                            .await?
                    }
                    _ => response,
                }
            }
            _ => self.http.execute(request).await?,
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(CertsrvError::authentication_required(www_authenticate(
                response.headers(),
            )));
        }

        Ok(response)
    }

    async fn handshake(
        &self,
        mut request: reqwest::Request,
        credentials: &HttpAuth,
        responder: &dyn ChallengeResponder,
    ) -> Result<reqwest::Response> {
        let scheme = responder.scheme();
        let mut authenticate_request = request
            .try_clone()
            .ok_or_else(|| CertsrvError::authentication("request body cannot be replayed"))?;

        let negotiate = responder.negotiate(credentials)?;
        set_authorization(
            request.headers_mut(),
            &format!("{} {}", scheme, BASE64_STANDARD.encode(negotiate)),
        )?;

        let response = self.http.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let token = challenges(response.headers(), scheme)
            .into_iter()
            .find(|t| !t.is_empty())
            .ok_or_else(|| {
                CertsrvError::authentication(format!("server sent no {} challenge", scheme))
            })?;
        let challenge = BASE64_STANDARD.decode(token.as_bytes())?;
        drain(response).await;

        let answer = responder.authenticate(credentials, &challenge)?;
        set_authorization(
            authenticate_request.headers_mut(),
            &format!("{} {}", scheme, BASE64_STANDARD.encode(answer)),
        )?;

        Ok(self.http.execute(authenticate_request).await?)
    }
}

/// Build the `Authorization` value for HTTP Basic.
fn basic_header(auth: &HttpAuth) -> String {
    let credentials = BASE64_STANDARD.encode(format!("{}:{}", auth.username, auth.password));
    format!("Basic {}", credentials)
}

fn set_authorization(headers: &mut HeaderMap, value: &str) -> Result<()> {
    let mut value = HeaderValue::try_from(value)
        .map_err(|e| CertsrvError::authentication(format!("invalid authorization header: {}", e)))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

/// Parameters of every `WWW-Authenticate` entry for `scheme`.
///
/// A bare `NTLM` offer yields an empty string, `NTLM abc=` yields `abc=`.
fn challenges(headers: &HeaderMap, scheme: &str) -> Vec<String> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter_map(|entry| {
            let (name, param) = entry.split_once(' ').unwrap_or((entry, ""));
            name.eq_ignore_ascii_case(scheme)
                .then(|| param.trim().to_string())
        })
        .collect()
}

fn www_authenticate(headers: &HeaderMap) -> String {
    headers
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Read and discard a body so the connection can be reused for the next
/// leg of the handshake.
async fn drain(response: reqwest::Response) {
    if let Err(e) = response.bytes().await {
        tracing::debug!("Discarding response body failed: {}", e);
    }
}

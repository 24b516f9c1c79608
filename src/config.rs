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

//! Configuration types for the certsrv client.
//!
//! This module provides configuration structures for setting up a certsrv
//! client, including server URL, authentication mode, and TLS settings.

use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::transport::ChallengeResponder;

/// Configuration for a certsrv client.
#[derive(Clone)]
pub struct CertsrvConfig {
    /// Certsrv base URL (e.g., "https://ca.example.com/certsrv").
    pub server_url: Url,

    /// How requests are authenticated.
    pub auth: AuthMode,

    /// Trust anchor configuration for server certificate verification.
    pub trust_anchors: TrustAnchors,

    /// Request timeout duration.
    pub timeout: Duration,

    /// Issue an authenticated GET against the base URL when the client is
    /// created and fail creation if it does not succeed.
    pub verify_on_connect: bool,

    /// Client identification sent as `User-Agent`.
    pub user_agent: String,

    /// Additional HTTP headers to include in requests.
    pub additional_headers: Vec<(String, String)>,
}

impl std::fmt::Debug for CertsrvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertsrvConfig")
            .field("server_url", &self.server_url)
            .field("auth", &self.auth)
            .field("trust_anchors", &self.trust_anchors)
            .field("timeout", &self.timeout)
            .field("verify_on_connect", &self.verify_on_connect)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl CertsrvConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CertsrvConfigBuilder {
        CertsrvConfigBuilder::new()
    }

    /// Build the URL of a certsrv resource.
    ///
    /// Resources are resolved below the base URL path, so
    /// `https://ca/certsrv` + `certfnsh.asp` gives
    /// `https://ca/certsrv/certfnsh.asp`.
    pub fn build_url(&self, resource: &str) -> Url {
        let mut url = self.server_url.clone();

        let base = self.server_url.path().trim_end_matches('/');
        url.set_path(&format!("{}/{}", base, resource));
        url.set_query(None);
        url
    }
}

/// Builder for [`CertsrvConfig`].
#[derive(Default)]
pub struct CertsrvConfigBuilder {
    server_url: Option<Url>,
    auth: Option<AuthMode>,
    trust_anchors: Option<TrustAnchors>,
    timeout: Option<Duration>,
    verify_on_connect: bool,
    user_agent: Option<String>,
    additional_headers: Vec<(String, String)>,
}

impl CertsrvConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the certsrv base URL.
    pub fn server_url(mut self, url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        self.server_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Set the certsrv base URL from a pre-parsed URL.
    pub fn server_url_parsed(mut self, url: Url) -> Self {
        self.server_url = Some(url);
        self
    }

    /// Set the authentication mode.
    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Use HTTP Basic authentication.
    pub fn http_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(AuthMode::Basic(HttpAuth::new(username, password)));
        self
    }

    /// Use HTTP Basic plus a challenge-response handshake (e.g. NTLM).
    pub fn challenge_response(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        responder: Arc<dyn ChallengeResponder>,
    ) -> Self {
        self.auth = Some(AuthMode::ChallengeResponse {
            credentials: HttpAuth::new(username, password),
            responder,
        });
        self
    }

    /// Use the built-in web PKI roots for server verification.
    pub fn trust_webpki_roots(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::WebPki);
        self
    }

    /// Use explicit CA certificates (PEM) for server verification.
    pub fn trust_explicit(mut self, ca_certs: Vec<Vec<u8>>) -> Self {
        self.trust_anchors = Some(TrustAnchors::Explicit(ca_certs));
        self
    }

    /// Accept any server certificate (insecure, for testing only).
    pub fn trust_any_insecure(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::InsecureAcceptAny);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Verify connectivity and credentials when the client is created.
    pub fn verify_on_connect(mut self, verify: bool) -> Self {
        self.verify_on_connect = verify;
        self
    }

    /// Override the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Add an additional HTTP header to all requests.
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the server URL is not set.
    pub fn build(self) -> Result<CertsrvConfig, &'static str> {
        let server_url = self.server_url.ok_or("server_url is required")?;

        Ok(CertsrvConfig {
            server_url,
            auth: self.auth.unwrap_or(AuthMode::Anonymous),
            trust_anchors: self.trust_anchors.unwrap_or(TrustAnchors::WebPki),
            timeout: self.timeout.unwrap_or(Duration::from_secs(30)),
            verify_on_connect: self.verify_on_connect,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| crate::USER_AGENT.to_string()),
            additional_headers: self.additional_headers,
        })
    }
}

/// How requests to certsrv are authenticated.
#[derive(Clone)]
pub enum AuthMode {
    /// No credentials. Only suitable for test CAs; a warning is logged
    /// when a transport is built in this mode.
    Anonymous,

    /// HTTP Basic credentials on every request.
    Basic(HttpAuth),

    /// HTTP Basic credentials on every request, plus a challenge-response
    /// handshake when the server asks for the responder's scheme.
    ChallengeResponse {
        /// Account used for both Basic and the handshake.
        credentials: HttpAuth,
        /// Produces the handshake messages.
        responder: Arc<dyn ChallengeResponder>,
    },
}

impl AuthMode {
    /// Credentials sent as HTTP Basic, if any.
    pub fn credentials(&self) -> Option<&HttpAuth> {
        match self {
            Self::Anonymous => None,
            Self::Basic(auth) => Some(auth),
            Self::ChallengeResponse { credentials, .. } => Some(credentials),
        }
    }
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Basic(auth) => write!(f, "Basic({})", auth.username),
            Self::ChallengeResponse {
                credentials,
                responder,
            } => write!(f, "{}({})", responder.scheme(), credentials.username),
        }
    }
}

/// HTTP Basic authentication credentials.
#[derive(Clone)]
pub struct HttpAuth {
    /// Username, optionally `DOMAIN\user`.
    pub username: String,

    /// Password.
    pub password: String,
}

impl HttpAuth {
    /// Create new HTTP auth credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Trust anchor configuration for server certificate verification.
#[derive(Clone)]
pub enum TrustAnchors {
    /// Use the built-in web PKI root store.
    WebPki,

    /// Use explicit CA certificates (PEM-encoded).
    Explicit(Vec<Vec<u8>>),

    /// Accept any server certificate (insecure, for testing only).
    ///
    /// **WARNING**: This disables all server certificate verification.
    InsecureAcceptAny,
}

impl std::fmt::Debug for TrustAnchors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebPki => write!(f, "WebPki"),
            Self::Explicit(certs) => write!(f, "Explicit({} certs)", certs.len()),
            Self::InsecureAcceptAny => write!(f, "InsecureAcceptAny"),
        }
    }
}

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

//! TOML settings file for the certsrv client.
//!
//! ```toml
//! [server]
//! url = "https://ca.example.com/certsrv"
//! timeout_secs = 30
//! verify_on_connect = true
//!
//! [trust]
//! ca_bundle_path = "/etc/pki/adcs-ca.pem"
//!
//! [authentication]
//! method = "basic"
//! username = "EXAMPLE\\svc-adcs"
//! password_env = "CERTSRV_PASSWORD"
//!
//! [enrollment]
//! template = "BasicSSLWebServer"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::CertsrvConfig;
use crate::error::{CertsrvError, Result};
use crate::issuer::DEFAULT_TEMPLATE;

/// Complete settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertsrvSettings {
    /// Certsrv server settings.
    pub server: ServerSettings,

    /// TLS trust settings.
    #[serde(default)]
    pub trust: TrustSettings,

    /// Authentication settings.
    #[serde(default)]
    pub authentication: AuthenticationSettings,

    /// Enrollment settings.
    #[serde(default)]
    pub enrollment: EnrollmentSettings,
}

/// Certsrv server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    /// Certsrv base URL.
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Check credentials against the base URL on startup.
    #[serde(default)]
    pub verify_on_connect: bool,
}

fn default_timeout() -> u64 {
    30
}

/// TLS trust settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TrustSettings {
    /// PEM bundle used instead of the built-in roots.
    #[serde(default)]
    pub ca_bundle_path: Option<PathBuf>,

    /// Disable server certificate verification (testing only).
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AuthenticationSettings {
    /// Authentication method.
    #[serde(default)]
    pub method: AuthMethod,

    /// Account name, optionally `DOMAIN\user`.
    #[serde(default)]
    pub username: Option<String>,

    /// Password in clear text. Prefer `password_env`.
    #[serde(default)]
    pub password: Option<String>,

    /// Environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,
}

/// Authentication method.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Anonymous requests.
    #[default]
    None,

    /// HTTP Basic authentication.
    Basic,
}

/// Enrollment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrollmentSettings {
    /// Certificate template for new submissions.
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for EnrollmentSettings {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl CertsrvSettings {
    /// Parse settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, has unknown keys or misses
    /// required fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| CertsrvError::config(format!("Invalid TOML: {e}")))
    }

    /// Read and parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading settings from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            CertsrvError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Build a client configuration.
    ///
    /// Reads the CA bundle and resolves the password from the environment
    /// when `password_env` is set.
    pub fn into_config(self) -> Result<CertsrvConfig> {
        let mut builder = CertsrvConfig::builder()
            .server_url(&self.server.url)
            .map_err(|e| CertsrvError::config(format!("Invalid server URL: {e}")))?
            .timeout(Duration::from_secs(self.server.timeout_secs))
            .verify_on_connect(self.server.verify_on_connect);

        builder = match (&self.trust.ca_bundle_path, self.trust.insecure_skip_verify) {
            (Some(_), true) => {
                return Err(CertsrvError::config(
                    "ca_bundle_path and insecure_skip_verify are mutually exclusive",
                ))
            }
            (Some(path), false) => {
                let bundle = std::fs::read(path).map_err(|e| {
                    CertsrvError::config(format!("Failed to read {}: {e}", path.display()))
                })?;
                builder.trust_explicit(vec![bundle])
            }
            (None, true) => builder.trust_any_insecure(),
            (None, false) => builder.trust_webpki_roots(),
        };

        if self.authentication.method == AuthMethod::Basic {
            let username = self.authentication.username.clone().ok_or_else(|| {
                CertsrvError::config("authentication.username is required for basic")
            })?;
            let password = self.authentication.resolve_password()?;
            builder = builder.http_auth(username, password);
        }

        builder.build().map_err(CertsrvError::config)
    }
}

impl AuthenticationSettings {
    fn resolve_password(&self) -> Result<String> {
        match (&self.password, &self.password_env) {
            (Some(_), Some(_)) => Err(CertsrvError::config(
                "set either authentication.password or authentication.password_env",
            )),
            (Some(password), None) => Ok(password.clone()),
            (None, Some(var)) => std::env::var(var).map_err(|_| {
                CertsrvError::config(format!("environment variable {var} is not set"))
            }),
            (None, None) => Err(CertsrvError::config(
                "authentication.password or authentication.password_env is required for basic",
            )),
        }
    }
}

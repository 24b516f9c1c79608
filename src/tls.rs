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

//! TLS configuration helpers for the certsrv client.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use rustls::pki_types::CertificateDer;

use crate::config::{CertsrvConfig, TrustAnchors};
use crate::error::{CertsrvError, Result};

/// Build a reqwest Client with the appropriate TLS configuration.
///
/// Server verification stays on unless the configuration explicitly asks
/// for [`TrustAnchors::InsecureAcceptAny`].
pub fn build_http_client(config: &CertsrvConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .use_rustls_tls();

    match &config.trust_anchors {
        TrustAnchors::WebPki => {
            builder = builder.tls_built_in_root_certs(true);
        }
        TrustAnchors::Explicit(ca_certs) => {
            builder = builder.tls_built_in_root_certs(false);
            for ca_pem in ca_certs {
                // A bundle may hold several certificates; add each one
                for der in parse_pem_certificates(ca_pem)? {
                    let cert = reqwest::Certificate::from_der(der.as_ref()).map_err(|e| {
                        CertsrvError::tls(format!("Failed to parse CA certificate: {}", e))
                    })?;
                    builder = builder.add_root_certificate(cert);
                }
            }
        }
        TrustAnchors::InsecureAcceptAny => {
            tracing::warn!("TLS server certificate verification is disabled");
            builder = builder
                .tls_built_in_root_certs(false)
                .danger_accept_invalid_certs(true);
        }
    }

    builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_2);

    let mut headers = HeaderMap::new();
    let user_agent = HeaderValue::try_from(config.user_agent.as_str())
        .map_err(|e| CertsrvError::config(format!("Invalid user agent: {}", e)))?;
    headers.insert(USER_AGENT, user_agent);
    for (name, value) in &config.additional_headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            headers.insert(name, value);
        } else {
            tracing::warn!("Ignoring invalid header {}", name);
        }
    }
    builder = builder.default_headers(headers);

    builder
        .build()
        .map_err(|e| CertsrvError::tls(format!("Failed to build HTTP client: {}", e)))
}

/// Parse PEM-encoded certificates.
pub fn parse_pem_certificates(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::BufReader::new(pem_data);
    let certs: Vec<_> = rustls_pemfile::certs(&mut reader)
        .filter_map(|result| result.ok())
        .collect();

    if certs.is_empty() {
        return Err(CertsrvError::invalid_pem("No certificates found in PEM data"));
    }

    Ok(certs)
}

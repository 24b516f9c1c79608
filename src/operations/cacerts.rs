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

//! CA certificate retrieval (GET certcarc.asp, then certnew.cer / certnew.p7b).
//!
//! A CA that renewed its key has several certificates. Certsrv numbers them
//! and publishes the current count as `nRenewals` in a script block on the
//! CA information page; the newest certificate is fetched by passing that
//! number as `Renewal=`.

use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};

use crate::config::CertsrvConfig;
use crate::convert::to_canonical_pem;
use crate::error::{CertsrvError, Result};
use crate::parser::{extract_renewal, PatternSet};
use crate::transport::Transport;
use crate::types::{content_types, endpoints};

/// Which CA artifact to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaFormat {
    /// The current CA certificate alone.
    Certificate,
    /// The CA chain as a PKCS#7 container.
    Chain,
}

impl CaFormat {
    /// Certsrv resource serving this format.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Certificate => endpoints::CERTNEW_CER,
            Self::Chain => endpoints::CERTNEW_P7B,
        }
    }

    /// Content type the server must answer with.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Certificate => content_types::PKIX_CERT,
            Self::Chain => content_types::PKCS7_CERTIFICATES,
        }
    }
}

/// CA certificate or chain as served by certsrv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaChainMaterial {
    /// Format that was requested.
    pub format: CaFormat,
    /// Renewal generation the material belongs to.
    pub renewal: u32,
    /// Response body (base64 PEM envelope).
    pub raw: Vec<u8>,
}

impl CaChainMaterial {
    /// Convert to a canonical PEM certificate.
    ///
    /// For a chain this is the first certificate of the container.
    pub fn to_pem(&self) -> Result<String> {
        to_canonical_pem(&self.raw)
    }
}

/// Fetch the CA certificate or chain for the newest renewal generation.
pub async fn fetch_ca(
    transport: &Transport,
    config: &CertsrvConfig,
    patterns: &PatternSet,
    format: CaFormat,
) -> Result<CaChainMaterial> {
    let renewal = current_renewal(transport, config, patterns).await?;

    let mut url = config.build_url(format.endpoint());
    url.query_pairs_mut()
        .append_pair("ReqID", "CACert")
        .append_pair("ENC", "b64")
        .append_pair("Renewal", &renewal.to_string());

    let response = transport.get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CertsrvError::unexpected_status(
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status"),
        ));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if content_types::media_type(&content_type) != format.content_type() {
        tracing::error!("Unexpected content type {}", content_type);
        return Err(CertsrvError::invalid_content_type(
            format.content_type(),
            content_type,
        ));
    }

    let raw = response.bytes().await?.to_vec();

    Ok(CaChainMaterial {
        format,
        renewal,
        raw,
    })
}

/// Read the renewal counter from `certcarc.asp`, defaulting to 0.
async fn current_renewal(
    transport: &Transport,
    config: &CertsrvConfig,
    patterns: &PatternSet,
) -> Result<u32> {
    let response = transport.get(config.build_url(endpoints::CERTCARC)).await?;
    let status = response.status();
    if !status.is_success() {
        tracing::warn!("{} answered with status {}", endpoints::CERTCARC, status);
    }
    let page = response.text().await?;

    match extract_renewal(patterns, &page) {
        Some(renewal) => Ok(renewal),
        None => {
            tracing::warn!("Renewal not found. Using '0'.");
            Ok(0)
        }
    }
}

/// Compute the SHA-256 fingerprint of a DER certificate.
pub fn fingerprint(der: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(der);
    hasher.finalize().into()
}

/// Format a fingerprint as a colon-separated hex string.
///
/// Example output: "AB:CD:EF:01:23:45:..."
pub fn format_fingerprint(fp: &[u8; 32]) -> String {
    fp.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

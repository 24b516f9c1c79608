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

//! Certsrv client implementation.
//!
//! This module provides the main `CertsrvClient` struct for talking to the
//! AD CS web enrollment pages.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::config::CertsrvConfig;
use crate::error::{CertsrvError, Result};
use crate::operations::cacerts::{fetch_ca, CaChainMaterial, CaFormat};
use crate::operations::submit::encode_submission;
use crate::parser::{classify_response, extract_request_id, extract_submission_error, PatternSet};
use crate::transport::Transport;
use crate::types::{content_types, endpoints, CertificateResponse, Outcome, RequestId};

/// Message used when a submission page names neither an id nor an error.
const UNKNOWN_SUBMISSION_ERROR: &str = "unknown error occurred";

/// Operations a certsrv endpoint offers.
///
/// [`CertsrvClient`] is the HTTP implementation; the [`Issuer`] only
/// depends on this trait.
///
/// [`Issuer`]: crate::issuer::Issuer
#[async_trait]
pub trait Certsrv: Send + Sync {
    /// Submit a PEM CSR for the given template.
    async fn request_certificate(&self, csr_pem: &str, template: &str)
        -> Result<CertificateResponse>;

    /// Fetch the state of an earlier submission.
    async fn get_existing_certificate(&self, id: &RequestId) -> Result<CertificateResponse>;

    /// Fetch the current CA certificate.
    async fn get_ca_certificate(&self) -> Result<CaChainMaterial>;

    /// Fetch the CA chain as PKCS#7.
    async fn get_ca_certificate_chain(&self) -> Result<CaChainMaterial>;
}

/// Certsrv client for certificate enrollment.
///
/// # Example
///
/// ```no_run
/// use usg_certsrv_client::{CertsrvClient, CertsrvConfig, Outcome};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CertsrvConfig::builder()
///     .server_url("https://ca.example.com/certsrv")?
///     .http_auth("EXAMPLE\\svc-adcs", "password")
///     .verify_on_connect(true)
///     .build()?;
///
/// let client = CertsrvClient::new(config).await?;
///
/// let csr = std::fs::read_to_string("server.csr")?;
/// let response = client.request_certificate(&csr, "BasicSSLWebServer").await?;
/// match response.outcome {
///     Outcome::Ready { certificate } => println!("issued, {} bytes", certificate.len()),
///     other => println!("{}: {:?}", response.request_id, other.description()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CertsrvClient {
    config: CertsrvConfig,
    transport: Transport,
    patterns: PatternSet,
}

impl CertsrvClient {
    /// Create a new client with the default certsrv patterns.
    ///
    /// When `verify_on_connect` is set the base URL is fetched once with
    /// the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if TLS configuration fails or the self-check does.
    pub async fn new(config: CertsrvConfig) -> Result<Self> {
        Self::with_patterns(config, PatternSet::default()).await
    }

    /// Create a new client with custom response patterns.
    pub async fn with_patterns(config: CertsrvConfig, patterns: PatternSet) -> Result<Self> {
        let transport = Transport::new(&config)?;

        if config.verify_on_connect {
            transport.verify().await?;
        }

        Ok(Self {
            config,
            transport,
            patterns,
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &CertsrvConfig {
        &self.config
    }

    /// Submit a CSR to `certfnsh.asp`.
    ///
    /// An immediately issued certificate comes back as
    /// [`Outcome::Ready`] with [`RequestId::none`]. Otherwise the request id
    /// is scraped from the result page and the request is fetched once.
    pub async fn request_certificate(
        &self,
        csr_pem: &str,
        template: &str,
    ) -> Result<CertificateResponse> {
        let url = self.config.build_url(endpoints::CERTFNSH);
        let form = encode_submission(csr_pem, template);

        let response = self.transport.post_form(url, form).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CertsrvError::unexpected_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status"),
            ));
        }

        let content_type = header_content_type(&response);
        let body = response.bytes().await?;

        // Auto-approved requests return the certificate directly
        if content_types::media_type(&content_type) == content_types::PKIX_CERT {
            if body.is_empty() {
                return Err(CertsrvError::EmptyCertificate);
            }
            tracing::info!("Certificate issued on submission");
            return Ok(CertificateResponse::new(
                Outcome::Ready {
                    certificate: body.to_vec(),
                },
                RequestId::none(),
            ));
        }

        let page = String::from_utf8_lossy(&body);
        let Some(id) = extract_request_id(&self.patterns, &page) else {
            let message = extract_submission_error(&self.patterns, &page)
                .unwrap_or_else(|| UNKNOWN_SUBMISSION_ERROR.to_string());
            tracing::error!("Submission failed: {}\n{}", message, page);
            return Err(CertsrvError::submission_failed(message));
        };

        tracing::info!("Request submitted with id {}", id);
        self.get_existing_certificate(&id).await
    }

    /// Fetch `certnew.cer?ReqID=<id>&ENC=b64` and classify the answer.
    ///
    /// Safe to repeat; certsrv does not change state on this read.
    pub async fn get_existing_certificate(&self, id: &RequestId) -> Result<CertificateResponse> {
        let mut url = self.config.build_url(endpoints::CERTNEW_CER);
        url.query_pairs_mut()
            .append_pair("ReqID", id.as_str())
            .append_pair("ENC", "b64");

        let response = self.transport.get(url).await?;
        let status = response.status();
        let content_type = header_content_type(&response);
        let body = response.bytes().await?;

        let outcome = classify_response(&self.patterns, status, &content_type, &body)?;
        tracing::debug!("Request {} is {}", id, outcome.status());

        Ok(CertificateResponse::new(outcome, id.clone()))
    }

    /// Fetch the current CA certificate.
    pub async fn get_ca_certificate(&self) -> Result<CaChainMaterial> {
        tracing::info!("Fetching CA certificate from {}", self.config.server_url);
        fetch_ca(&self.transport, &self.config, &self.patterns, CaFormat::Certificate).await
    }

    /// Fetch the CA chain as a PKCS#7 container.
    pub async fn get_ca_certificate_chain(&self) -> Result<CaChainMaterial> {
        tracing::info!("Fetching CA chain from {}", self.config.server_url);
        fetch_ca(&self.transport, &self.config, &self.patterns, CaFormat::Chain).await
    }
}

#[async_trait]
impl Certsrv for CertsrvClient {
    async fn request_certificate(
        &self,
        csr_pem: &str,
        template: &str,
    ) -> Result<CertificateResponse> {
        CertsrvClient::request_certificate(self, csr_pem, template).await
    }

    async fn get_existing_certificate(&self, id: &RequestId) -> Result<CertificateResponse> {
        CertsrvClient::get_existing_certificate(self, id).await
    }

    async fn get_ca_certificate(&self) -> Result<CaChainMaterial> {
        CertsrvClient::get_ca_certificate(self).await
    }

    async fn get_ca_certificate_chain(&self) -> Result<CaChainMaterial> {
        CertsrvClient::get_ca_certificate_chain(self).await
    }
}

fn header_content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

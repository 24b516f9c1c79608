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

//! One reconciliation step for a certificate request.
//!
//! The caller stores the request's last known status and id between runs
//! and calls [`Issuer::issue`] again until the status is terminal. Nothing
//! is retried or scheduled here.

use std::sync::Arc;

use crate::client::Certsrv;
use crate::error::{CertsrvError, Result};
use crate::types::{CertificateResponse, Outcome, RequestId, ResponseStatus};

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "BasicSSLWebServer";

/// Reason recorded for an issued certificate.
pub const READY_REASON: &str = "certificate obtained successfully";

/// Persisted state of a certificate request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateRequest {
    /// PEM-encoded PKCS#10 request.
    pub csr_pem: String,
    /// Status recorded by the previous step.
    pub status: ResponseStatus,
    /// Id assigned by the CA, once known.
    pub request_id: Option<RequestId>,
}

impl CertificateRequest {
    /// A request that has not been submitted yet.
    pub fn new(csr_pem: impl Into<String>) -> Self {
        Self {
            csr_pem: csr_pem.into(),
            ..Default::default()
        }
    }

    /// Record the result of a step so the next call continues from it.
    pub fn apply(&mut self, outcome: &IssuanceOutcome) {
        self.status = outcome.status;
        self.request_id = Some(outcome.request_id.clone());
    }
}

/// Result of a step that reached the CA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceOutcome {
    /// New status of the request.
    pub status: ResponseStatus,
    /// Id the CA assigned (or [`RequestId::none`]).
    pub request_id: RequestId,
    /// Disposition text, or [`READY_REASON`].
    pub reason: String,
    /// Issued certificate for [`ResponseStatus::Ready`].
    pub certificate: Option<Vec<u8>>,
    /// CA certificate as canonical PEM.
    pub ca_pem: String,
}

/// Drives certificate requests against a certsrv endpoint.
#[derive(Clone)]
pub struct Issuer {
    certsrv: Arc<dyn Certsrv>,
    template: String,
}

impl std::fmt::Debug for Issuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Issuer")
            .field("template", &self.template)
            .finish()
    }
}

impl Issuer {
    /// Create an issuer enrolling with `template`.
    pub fn new(certsrv: Arc<dyn Certsrv>, template: impl Into<String>) -> Self {
        Self {
            certsrv,
            template: template.into(),
        }
    }

    /// Create an issuer for [`DEFAULT_TEMPLATE`].
    pub fn with_default_template(certsrv: Arc<dyn Certsrv>) -> Self {
        Self::new(certsrv, DEFAULT_TEMPLATE)
    }

    /// Certificate template sent with new submissions.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Advance `request` by one step.
    ///
    /// | status            | action                         |
    /// |-------------------|--------------------------------|
    /// | `Unknown`         | submit the CSR                 |
    /// | `Pending` with id | fetch the request by id        |
    /// | `Pending` no id   | [`CertsrvError::MissingRequestId`] |
    /// | terminal          | nothing, `Ok(None)`            |
    ///
    /// An empty stored id counts as no id.
    ///
    /// Whenever the CA answered, the CA certificate is fetched as well and
    /// returned as PEM.
    pub async fn issue(&self, request: &CertificateRequest) -> Result<Option<IssuanceOutcome>> {
        let response = match (request.status, &request.request_id) {
            (ResponseStatus::Unknown, _) => {
                tracing::info!("Submitting request for template {}", self.template);
                self.certsrv
                    .request_certificate(&request.csr_pem, &self.template)
                    .await?
            }
            (ResponseStatus::Pending, Some(id)) if !id.as_str().is_empty() => {
                tracing::info!("Checking pending request {}", id);
                self.certsrv.get_existing_certificate(id).await?
            }
            (ResponseStatus::Pending, _) => return Err(CertsrvError::MissingRequestId),
            (status, _) => {
                tracing::debug!("Request is {}, nothing to do", status);
                return Ok(None);
            }
        };

        let chain = self.certsrv.get_ca_certificate_chain().await?;
        let ca_pem = chain.to_pem()?;

        Ok(Some(into_outcome(response, ca_pem)))
    }
}

fn into_outcome(response: CertificateResponse, ca_pem: String) -> IssuanceOutcome {
    let status = response.status();
    let (reason, certificate) = match response.outcome {
        Outcome::Ready { certificate } => (READY_REASON.to_string(), Some(certificate)),
        Outcome::Pending { description }
        | Outcome::Rejected { description }
        | Outcome::Errored { description } => (description, None),
    };

    IssuanceOutcome {
        status,
        request_id: response.request_id,
        reason,
        certificate,
        ca_pem,
    }
}

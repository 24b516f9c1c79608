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

//! Certsrv message types.
//!
//! This module provides the outcome types returned by the certsrv client,
//! the content types and resource names of the web enrollment interface,
//! and the PKCS#7 container decoding seam.

mod pkcs7;

pub use pkcs7::{CmsContainerDecoder, ContainerDecoder};

use std::fmt;

/// Status of a certificate request as reported by one certsrv call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseStatus {
    /// No server answer yet. This is the caller's default before any call.
    #[default]
    Unknown,
    /// The CA took the request under submission (manual approval).
    Pending,
    /// The certificate was issued.
    Ready,
    /// The CA denied the request.
    Rejected,
    /// The CA reported some other failure.
    Errored,
}

impl ResponseStatus {
    /// Returns true for statuses that need no further server calls.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Rejected | Self::Errored)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::Pending => "Pending",
            Self::Ready => "Ready",
            Self::Rejected => "Rejected",
            Self::Errored => "Errored",
        };
        f.write_str(s)
    }
}

/// Server-derived outcome of a submit or status call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Certificate issued. Holds the raw response body (never empty).
    Ready {
        /// Certificate bytes as returned by the CA.
        certificate: Vec<u8>,
    },

    /// Request taken under submission.
    Pending {
        /// Disposition text from the CA.
        description: String,
    },

    /// Request denied.
    Rejected {
        /// Disposition text from the CA.
        description: String,
    },

    /// Any other disposition.
    Errored {
        /// Disposition text from the CA.
        description: String,
    },
}

impl Outcome {
    /// The [`ResponseStatus`] matching this outcome.
    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::Ready { .. } => ResponseStatus::Ready,
            Self::Pending { .. } => ResponseStatus::Pending,
            Self::Rejected { .. } => ResponseStatus::Rejected,
            Self::Errored { .. } => ResponseStatus::Errored,
        }
    }

    /// Returns the certificate if the request was issued.
    pub fn certificate(&self) -> Option<&[u8]> {
        match self {
            Self::Ready { certificate } => Some(certificate),
            _ => None,
        }
    }

    /// Returns the disposition text for non-issued outcomes.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Ready { .. } => None,
            Self::Pending { description }
            | Self::Rejected { description }
            | Self::Errored { description } => Some(description),
        }
    }
}

/// Identifier the CA assigned to a certificate request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    const NONE: &'static str = "none";

    /// Wrap an identifier reported by the CA.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Sentinel for auto-approved submissions where the CA returned the
    /// certificate directly and never revealed an id.
    pub fn none() -> Self {
        Self(Self::NONE.to_string())
    }

    /// Returns true if this is the [`RequestId::none`] sentinel.
    pub fn is_none(&self) -> bool {
        self.0 == Self::NONE
    }

    /// The identifier as sent in `ReqID=`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Response from a submit or status call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateResponse {
    /// What the CA said.
    pub outcome: Outcome,
    /// Request the outcome belongs to.
    pub request_id: RequestId,
}

impl CertificateResponse {
    /// Create a new response.
    pub fn new(outcome: Outcome, request_id: RequestId) -> Self {
        Self {
            outcome,
            request_id,
        }
    }

    /// Shorthand for `self.outcome.status()`.
    pub fn status(&self) -> ResponseStatus {
        self.outcome.status()
    }
}

/// Content types used by the web enrollment interface.
pub mod content_types {
    /// Single DER/base64 certificate.
    pub const PKIX_CERT: &str = "application/pkix-cert";

    /// PKCS#7 certificate chain.
    pub const PKCS7_CERTIFICATES: &str = "application/x-pkcs7-certificates";

    /// Disposition pages.
    pub const HTML: &str = "text/html";

    /// Submission form.
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

    /// Extract the media type of a Content-Type header value.
    ///
    /// Parameters are dropped and the result is lowercased, so
    /// `"text/html; charset=utf-8"` becomes `"text/html"`.
    pub fn media_type(header: &str) -> String {
        header
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }
}

/// Resource names below the certsrv base URL.
pub mod endpoints {
    /// Certificate and status retrieval (also single CA certificate).
    pub const CERTNEW_CER: &str = "certnew.cer";

    /// CA chain retrieval in PKCS#7 format.
    pub const CERTNEW_P7B: &str = "certnew.p7b";

    /// CA information page carrying the renewal counter.
    pub const CERTCARC: &str = "certcarc.asp";

    /// Request submission.
    pub const CERTFNSH: &str = "certfnsh.asp";
}

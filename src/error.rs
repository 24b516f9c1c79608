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

//! Error types for the certsrv client.
//!
//! Errors fall into three groups:
//!
//! - **Transport** errors (connection, TLS, non-success HTTP status,
//!   authentication). Callers should treat these as transient.
//! - **Protocol** errors (unexpected content types, pages that do not look
//!   like certsrv pages, undecodable PEM or PKCS#7). These usually mean the
//!   CA front-end changed and should be surfaced to an operator.
//! - Local invariant violations such as a pending request without an id.
//!
//! Pending, rejected and errored requests are *not* errors. They are
//! reported through [`Outcome`](crate::types::Outcome).

use thiserror::Error;

/// Result type alias using [`CertsrvError`].
pub type Result<T> = std::result::Result<T, CertsrvError>;

/// Errors that can occur during certsrv client operations.
#[derive(Debug, Error)]
pub enum CertsrvError {
    /// TLS configuration or connection error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// HTTP request or response error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("certsrv response status {status}: {reason}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase or response text.
        reason: String,
    },

    /// Server requires authentication (HTTP 401) and none succeeded.
    #[error("Authentication required: {challenge}")]
    AuthenticationRequired {
        /// WWW-Authenticate challenge from server.
        challenge: String,
    },

    /// The challenge-response handshake could not be completed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Response carried a content type the operation does not handle.
    #[error("Unexpected content type: {0}")]
    UnexpectedContentType(String),

    /// Response Content-Type header does not match the expected value.
    #[error("Invalid content-type: expected '{expected}', got '{actual}'")]
    InvalidContentType {
        /// Expected content-type.
        expected: String,
        /// Actual content-type received.
        actual: String,
    },

    /// HTML page did not contain the expected disposition section.
    #[error("Disposition message unknown: {0}")]
    UnparseableResponse(String),

    /// Submission page did not reveal a request id.
    #[error("Certificate submission failed: {0}")]
    SubmissionFailed(String),

    /// A certificate response carried no bytes.
    #[error("Certificate response body is empty")]
    EmptyCertificate,

    /// Invalid PEM data.
    #[error("Invalid PEM data: {0}")]
    InvalidPem(String),

    /// Failed to parse a PKCS#7 container.
    #[error("parsing PKCS7: {0}")]
    CmsParsing(String),

    /// The PKCS#7 container parsed but held no certificates.
    #[error("expected one or more certificates")]
    NoCertificates,

    /// A pending request has no stored request id.
    #[error("certsrv request id not set for pending request")]
    MissingRequestId,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl CertsrvError {
    /// Create a TLS error with the given message.
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create an unexpected status error.
    pub fn unexpected_status(status: u16, reason: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            reason: reason.into(),
        }
    }

    /// Create an authentication required error.
    pub fn authentication_required(challenge: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            challenge: challenge.into(),
        }
    }

    /// Create a challenge-response handshake error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an unexpected content type error.
    pub fn unexpected_content_type(content_type: impl Into<String>) -> Self {
        Self::UnexpectedContentType(content_type.into())
    }

    /// Create an invalid content-type error.
    pub fn invalid_content_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidContentType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an unparseable response error carrying the offending page text.
    pub fn unparseable_response(detail: impl Into<String>) -> Self {
        Self::UnparseableResponse(detail.into())
    }

    /// Create a submission failure error.
    pub fn submission_failed(msg: impl Into<String>) -> Self {
        Self::SubmissionFailed(msg.into())
    }

    /// Create an invalid PEM error.
    pub fn invalid_pem(msg: impl Into<String>) -> Self {
        Self::InvalidPem(msg.into())
    }

    /// Create a CMS parsing error with the given message.
    pub fn cms_parsing(msg: impl Into<String>) -> Self {
        Self::CmsParsing(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true for connection-level failures the caller may retry later.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Tls(_)
                | Self::UnexpectedStatus { .. }
                | Self::AuthenticationRequired { .. }
                | Self::Authentication(_)
        )
    }

    /// Returns true when the server spoke something other than the expected
    /// certsrv dialect.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedContentType(_)
                | Self::InvalidContentType { .. }
                | Self::UnparseableResponse(_)
                | Self::SubmissionFailed(_)
                | Self::EmptyCertificate
                | Self::InvalidPem(_)
                | Self::CmsParsing(_)
                | Self::NoCertificates
        )
    }
}

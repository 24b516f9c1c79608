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

//! # usg-certsrv-client
//!
//! A Rust client for the Microsoft AD CS web enrollment pages (`/certsrv`).
//!
//! Many enterprise CAs only expose the browser-oriented certsrv interface.
//! This library drives it the way a browser would: it posts a PKCS#10
//! request to `certfnsh.asp`, scrapes the request id and disposition from
//! the HTML pages and downloads issued certificates and the CA chain.
//!
//! ## Features
//!
//! - **Async-first design** using Tokio
//! - **Submit and poll** certificate requests, including manual approval
//! - **CA certificate and chain** retrieval for the newest CA renewal
//! - **PKCS#7 to PEM** conversion of CA chains
//! - **HTTP Basic auth** plus a pluggable challenge-response handshake (NTLM)
//! - **Issuance state machine** for reconcile-style callers
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use usg_certsrv_client::{CertificateRequest, CertsrvClient, CertsrvConfig, Issuer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CertsrvConfig::builder()
//!         .server_url("https://ca.example.com/certsrv")?
//!         .http_auth("EXAMPLE\\svc-adcs", "password")
//!         .build()?;
//!
//!     let client = CertsrvClient::new(config).await?;
//!     let issuer = Issuer::with_default_template(Arc::new(client));
//!
//!     let mut request = CertificateRequest::new(std::fs::read_to_string("server.csr")?);
//!     if let Some(outcome) = issuer.issue(&request).await? {
//!         println!("{} ({}): {}", outcome.status, outcome.request_id, outcome.reason);
//!         request.apply(&outcome);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Cargo Features
//!
//! - `cli` (default): Builds the `certsrv-enroll` command line tool

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod issuer;
pub mod operations;
pub mod parser;
pub mod settings;
pub mod tls;
pub mod transport;
pub mod types;

// Re-export main types at crate root for convenience
pub use client::{Certsrv, CertsrvClient};
pub use config::{AuthMode, CertsrvConfig, CertsrvConfigBuilder, HttpAuth, TrustAnchors};
pub use convert::to_canonical_pem;
pub use error::{CertsrvError, Result};
pub use issuer::{CertificateRequest, IssuanceOutcome, Issuer};
pub use operations::{CaChainMaterial, CaFormat};
pub use parser::PatternSet;
pub use settings::CertsrvSettings;
pub use transport::ChallengeResponder;
pub use types::{CertificateResponse, Outcome, RequestId, ResponseStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent string for HTTP requests.
///
/// Some IIS front-ends only serve the enrollment pages to browsers, so the
/// value starts with a browser-style product token.
pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; usg-certsrv-client/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

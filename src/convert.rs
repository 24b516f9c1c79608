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

//! Conversion of CA responses to canonical PEM certificates.
//!
//! Certsrv answers CA requests with a PEM envelope around either a plain
//! certificate or a PKCS#7 container. Downstream consumers want a single
//! `CERTIFICATE` PEM block, so the container is unwrapped and its first
//! certificate is re-encoded.

use der::Decode;
use pem::{EncodeConfig, LineEnding, Pem};
use x509_cert::Certificate;

use crate::error::{CertsrvError, Result};
use crate::types::{CmsContainerDecoder, ContainerDecoder};

/// PEM label of the output.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Convert a PEM-wrapped certificate or PKCS#7 container to a canonical
/// PEM certificate.
///
/// Only the first PEM block of the input is considered; text before it is
/// ignored.
///
/// # Errors
///
/// - [`CertsrvError::InvalidPem`] if the input holds no PEM block
/// - [`CertsrvError::CmsParsing`] if the block is neither a certificate
///   nor a PKCS#7 container
/// - [`CertsrvError::NoCertificates`] if the container is empty
pub fn to_canonical_pem(input: &[u8]) -> Result<String> {
    to_canonical_pem_with(&CmsContainerDecoder, input)
}

/// Same as [`to_canonical_pem`] with a caller-supplied container decoder.
pub fn to_canonical_pem_with(decoder: &dyn ContainerDecoder, input: &[u8]) -> Result<String> {
    let block = pem::parse(input).map_err(|e| {
        tracing::debug!("Tried to decode PEM: {}", String::from_utf8_lossy(input));
        CertsrvError::invalid_pem(format!("error decoding the pem block: {}", e))
    })?;

    let der = first_certificate(decoder, block.contents())?;

    let encoded = pem::encode_config(
        &Pem::new(CERTIFICATE_LABEL, der),
        EncodeConfig::new().set_line_ending(LineEnding::LF),
    );
    Ok(encoded)
}

/// Return the bytes unchanged if they are a certificate, else the first
/// certificate of the container they encode.
fn first_certificate(decoder: &dyn ContainerDecoder, der: &[u8]) -> Result<Vec<u8>> {
    if Certificate::from_der(der).is_ok() {
        return Ok(der.to_vec());
    }

    let mut certs = decoder.certificates(der)?;
    if certs.is_empty() {
        return Err(CertsrvError::NoCertificates);
    }
    if certs.len() > 1 {
        tracing::debug!("Container holds {} certificates, using first", certs.len());
    }

    Ok(certs.swap_remove(0))
}

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

//! PKCS#7 certificate container decoding.
//!
//! Certsrv serves CA chains (`certnew.p7b`) as a degenerate PKCS#7
//! SignedData with no signers. The decoder is kept behind
//! [`ContainerDecoder`] so another implementation can be plugged in.

use cms::content_info::ContentInfo;
use const_oid::db::rfc5911::ID_SIGNED_DATA;
use der::{Any, Decode, Encode, Reader, SliceReader, Tag, TagNumber, Tagged};
use x509_cert::Certificate;

use crate::error::{CertsrvError, Result};

/// Decodes a certificate container into the DER encodings it embeds.
pub trait ContainerDecoder: Send + Sync {
    /// Return the embedded certificates in container order.
    ///
    /// An empty vector means the container was well-formed but carried no
    /// certificates.
    fn certificates(&self, der: &[u8]) -> Result<Vec<Vec<u8>>>;
}

/// [`ContainerDecoder`] backed by the RustCrypto `cms` and `der` crates.
///
/// The `certificates` field is walked element by element rather than
/// decoded as a `SET OF`, which would re-sort it into DER order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmsContainerDecoder;

impl ContainerDecoder for CmsContainerDecoder {
    fn certificates(&self, der: &[u8]) -> Result<Vec<Vec<u8>>> {
        let content_info = ContentInfo::from_der(der)
            .map_err(|e| CertsrvError::cms_parsing(format!("Failed to parse ContentInfo: {}", e)))?;

        let signed_data = extract_signed_data(&content_info)?;
        extract_certificates(signed_data).map_err(|e| {
            CertsrvError::cms_parsing(format!("Failed to parse SignedData: {}", e))
        })
    }
}

/// Return the SignedData body carried by ContentInfo.
fn extract_signed_data(content_info: &ContentInfo) -> Result<&[u8]> {
    if content_info.content_type != ID_SIGNED_DATA {
        return Err(CertsrvError::cms_parsing(format!(
            "Expected SignedData OID, got {}",
            content_info.content_type
        )));
    }

    if content_info.content.tag() != Tag::Sequence {
        return Err(CertsrvError::cms_parsing(format!(
            "Expected SignedData SEQUENCE, got {}",
            content_info.content.tag()
        )));
    }

    Ok(content_info.content.value())
}

/// Extract DER certificates from a SignedData body in wire order.
fn extract_certificates(signed_data: &[u8]) -> der::Result<Vec<Vec<u8>>> {
    let mut reader = SliceReader::new(signed_data)?;

    // version, digestAlgorithms, encapContentInfo
    let version = Any::decode(&mut reader)?;
    version.tag().assert_eq(Tag::Integer)?;
    let digest_algorithms = Any::decode(&mut reader)?;
    digest_algorithms.tag().assert_eq(Tag::Set)?;
    let encap_content_info = Any::decode(&mut reader)?;
    encap_content_info.tag().assert_eq(Tag::Sequence)?;

    let certificates_tag = Tag::ContextSpecific {
        constructed: true,
        number: TagNumber::N0,
    };
    if reader.is_finished() || reader.peek_tag()? != certificates_tag {
        return Ok(Vec::new());
    }

    let field = Any::decode(&mut reader)?;
    let mut certs = SliceReader::new(field.value())?;
    let mut certificates = Vec::new();

    while !certs.is_finished() {
        let choice = Any::decode(&mut certs)?;
        let cert_der = choice.to_der()?;

        // Only plain X.509 certificates are of interest
        match Certificate::from_der(&cert_der) {
            Ok(_) => certificates.push(cert_der),
            Err(e) => {
                tracing::warn!("Skipping non-X.509 certificate: {}", e);
            }
        }
    }

    Ok(certificates)
}

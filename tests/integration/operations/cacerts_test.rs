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


//! Integration tests for CA certificate retrieval (certcarc.asp, certnew.cer/p7b)

use crate::integration::{
    fixtures, MockCertsrv, CONTENT_TYPE_HTML, PATH_CERTCARC, PATH_CERTNEW_CER, PATH_CERTNEW_P7B,
};
use usg_certsrv_client::operations::{fingerprint, format_fingerprint};
use usg_certsrv_client::{CaFormat, CertsrvError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_get_ca_certificate_uses_renewal() {
    let mock = MockCertsrv::start().await;
    let ca = fixtures::ca("Example Issuing CA");
    mock.mock_certcarc(&fixtures::certcarc_page(3)).await;
    mock.mock_ca_cert(3, &ca.pem).await;

    let client = mock.client().await;
    let material = client
        .get_ca_certificate()
        .await
        .expect("CA fetch should succeed");

    assert_eq!(material.format, CaFormat::Certificate);
    assert_eq!(material.renewal, 3);
    assert_eq!(material.raw, ca.pem.as_bytes());

    let pem = material.to_pem().expect("conversion");
    assert_eq!(
        pem.replace("\r\n", "\n"),
        ca.pem.replace("\r\n", "\n"),
        "a plain certificate converts to itself"
    );
}

#[tokio::test]
async fn test_get_ca_chain_converts_to_pem() {
    let mock = MockCertsrv::start().await;
    let ca = fixtures::ca("Example Root CA");
    mock.mock_certcarc(&fixtures::certcarc_page(0)).await;
    mock.mock_ca_chain(0, &fixtures::pkcs7_pem(&[ca.der.as_slice()]))
        .await;

    let client = mock.client().await;
    let material = client
        .get_ca_certificate_chain()
        .await
        .expect("CA chain fetch should succeed");

    assert_eq!(material.format, CaFormat::Chain);
    let pem = material.to_pem().expect("conversion");
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
    assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
    assert_eq!(::pem::parse(&pem).expect("pem").contents(), ca.der.as_slice());
}

#[tokio::test]
async fn test_chain_with_two_certificates_yields_one() {
    let mock = MockCertsrv::start().await;
    let root = fixtures::ca("Example Root CA");
    let issuing = fixtures::ca("Example Issuing CA");
    let chain = fixtures::pkcs7_pem(&[root.der.as_slice(), issuing.der.as_slice()]);
    mock.mock_certcarc(&fixtures::certcarc_page(1)).await;
    mock.mock_ca_chain(1, &chain).await;

    let client = mock.client().await;
    let pem = client
        .get_ca_certificate_chain()
        .await
        .expect("CA chain fetch should succeed")
        .to_pem()
        .expect("conversion");

    assert_eq!(pem.matches("-----BEGIN CERTIFICATE-----").count(), 1);
    let der = ::pem::parse(&pem).expect("pem").into_contents();
    assert_eq!(der, root.der);
}

#[test]
fn test_chain_conversion_keeps_container_order() {
    let root = fixtures::ca("Example Root CA");
    let issuing = fixtures::ca("Example Issuing CA");

    // Whichever order sorts first in DER, the other one does not
    for (first, second) in [(&root, &issuing), (&issuing, &root)] {
        let chain = fixtures::pkcs7_pem(&[first.der.as_slice(), second.der.as_slice()]);
        let pem = usg_certsrv_client::to_canonical_pem(chain.as_bytes()).expect("conversion");
        let der = ::pem::parse(&pem).expect("pem").into_contents();
        assert_eq!(der, first.der);
    }
}

#[tokio::test]
async fn test_missing_renewal_counter_defaults_to_zero() {
    let mock = MockCertsrv::start().await;
    let ca = fixtures::ca("Example Issuing CA");
    mock.mock_certcarc("<HTML><Body>no script here</Body></HTML>")
        .await;

    Mock::given(method("GET"))
        .and(path(PATH_CERTNEW_P7B))
        .and(query_param("Renewal", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            fixtures::pkcs7_pem(&[ca.der.as_slice()]),
            "application/x-pkcs7-certificates",
        ))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = mock.client().await;
    let material = client
        .get_ca_certificate_chain()
        .await
        .expect("CA chain fetch should succeed");

    assert_eq!(material.renewal, 0);
}

#[tokio::test]
async fn test_failed_renewal_page_defaults_to_zero() {
    let mock = MockCertsrv::start().await;
    let ca = fixtures::ca("Example Issuing CA");
    mock.mock_status("GET", PATH_CERTCARC, 503).await;

    Mock::given(method("GET"))
        .and(path(PATH_CERTNEW_CER))
        .and(query_param("Renewal", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ca.pem.clone(), "application/pkix-cert"))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = mock.client().await;
    let material = client
        .get_ca_certificate()
        .await
        .expect("CA certificate fetch should succeed");

    assert_eq!(material.renewal, 0);
}

#[tokio::test]
async fn test_ca_wrong_content_type() {
    let mock = MockCertsrv::start().await;
    mock.mock_certcarc(&fixtures::certcarc_page(0)).await;
    mock.mock_ca(PATH_CERTNEW_CER, 0, "<HTML>login</HTML>", CONTENT_TYPE_HTML)
        .await;

    let client = mock.client().await;
    let err = client.get_ca_certificate().await.unwrap_err();

    match err {
        CertsrvError::InvalidContentType { expected, actual } => {
            assert_eq!(expected, "application/pkix-cert");
            assert_eq!(actual, "text/html");
        }
        other => panic!("Expected InvalidContentType, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ca_server_error() {
    let mock = MockCertsrv::start().await;
    mock.mock_certcarc(&fixtures::certcarc_page(0)).await;
    mock.mock_status("GET", PATH_CERTNEW_P7B, 503).await;

    let client = mock.client().await;
    let err = client.get_ca_certificate_chain().await.unwrap_err();

    assert!(
        matches!(err, CertsrvError::UnexpectedStatus { status: 503, .. }),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_renewal_page_unreachable() {
    let mock = MockCertsrv::start().await;
    mock.mock_status("GET", PATH_CERTCARC, 401).await;

    let client = mock.client().await;
    let err = client.get_ca_certificate().await.unwrap_err();

    assert!(
        matches!(err, CertsrvError::AuthenticationRequired { .. }),
        "got {:?}",
        err
    );
}

#[test]
fn test_fingerprint_of_generated_ca() {
    let ca = fixtures::ca("Example Issuing CA");
    let fp = format_fingerprint(&fingerprint(&ca.der));
    assert_eq!(fp.len(), 95);
    assert_eq!(fp, format_fingerprint(&fingerprint(&ca.der)));
}

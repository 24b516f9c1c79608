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


//! Integration tests for network failures

use std::time::Duration;

use crate::integration::{fixtures, MockCertsrv, CONTENT_TYPE_HTML, PATH_CERTNEW_CER};
use usg_certsrv_client::{CertsrvClient, CertsrvConfig, CertsrvError, RequestId};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_request_timeout() {
    let mock = MockCertsrv::start().await;

    Mock::given(method("GET"))
        .and(path(PATH_CERTNEW_CER))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    fixtures::disposition_page("Taken Under Submission", None),
                    CONTENT_TYPE_HTML,
                )
                .set_delay(Duration::from_secs(3)),
        )
        .mount(mock.inner())
        .await;

    let config = CertsrvConfig::builder()
        .server_url(mock.url())
        .expect("Valid URL")
        .timeout(Duration::from_millis(200))
        .build()
        .expect("Valid config");
    let client = CertsrvClient::new(config).await.expect("Client creation failed");

    let err = client
        .get_existing_certificate(&RequestId::new("1"))
        .await
        .unwrap_err();

    match err {
        CertsrvError::Http(ref e) => assert!(e.is_timeout(), "got {:?}", e),
        ref other => panic!("Expected Http timeout, got {:?}", other),
    }
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_connection_refused() {
    let config = CertsrvConfig::builder()
        .server_url("http://127.0.0.1:9/certsrv")
        .expect("Valid URL")
        .timeout(Duration::from_secs(2))
        .build()
        .expect("Valid config");
    let client = CertsrvClient::new(config).await.expect("Client creation failed");

    let err = client
        .request_certificate(fixtures::CSR, "BasicSSLWebServer")
        .await
        .unwrap_err();

    assert!(matches!(err, CertsrvError::Http(_)), "got {:?}", err);
    assert!(!err.is_protocol());
}

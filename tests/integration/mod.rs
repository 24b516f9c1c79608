//! Integration test utilities and helpers
//!
//! This module provides a mock certsrv server and the fixtures the
//! integration tests share: generated certificates, PKCS#7 containers and
//! the HTML pages certsrv renders.

use std::time::Duration;

use usg_certsrv_client::{CertsrvClient, CertsrvConfig};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod errors;

/// Content types served by certsrv
pub const CONTENT_TYPE_PKIX_CERT: &str = "application/pkix-cert";
pub const CONTENT_TYPE_PKCS7: &str = "application/x-pkcs7-certificates";
pub const CONTENT_TYPE_HTML: &str = "text/html";

/// Certsrv page paths
pub const PATH_CERTFNSH: &str = "/certsrv/certfnsh.asp";
pub const PATH_CERTNEW_CER: &str = "/certsrv/certnew.cer";
pub const PATH_CERTNEW_P7B: &str = "/certsrv/certnew.p7b";
pub const PATH_CERTCARC: &str = "/certsrv/certcarc.asp";

/// Mock certsrv server builder for integration tests
pub struct MockCertsrv {
    server: MockServer,
}

impl MockCertsrv {
    /// Create a new mock certsrv server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Base URL of the mocked certsrv application
    pub fn url(&self) -> String {
        format!("{}/certsrv", self.server.uri())
    }

    /// Get a reference to the inner MockServer for custom mocking
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Anonymous client pointed at this server
    pub async fn client(&self) -> CertsrvClient {
        let config = CertsrvConfig::builder()
            .server_url(self.url())
            .expect("Valid URL")
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Valid config");
        CertsrvClient::new(config)
            .await
            .expect("Client creation failed")
    }

    /// Mock the submission page returning an HTML body
    pub async fn mock_submit_page(&self, html: &str) {
        Mock::given(method("POST"))
            .and(path(PATH_CERTFNSH))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html, CONTENT_TYPE_HTML))
            .mount(&self.server)
            .await;
    }

    /// Mock an auto-approved submission returning the certificate
    pub async fn mock_submit_issued(&self, cert_pem: &str) {
        Mock::given(method("POST"))
            .and(path(PATH_CERTFNSH))
            .respond_with(ResponseTemplate::new(200).set_body_raw(cert_pem, CONTENT_TYPE_PKIX_CERT))
            .mount(&self.server)
            .await;
    }

    /// Mock the certificate fetch for a request id
    pub async fn mock_fetch(&self, id: &str, body: &str, content_type: &str) {
        Mock::given(method("GET"))
            .and(path(PATH_CERTNEW_CER))
            .and(query_param("ReqID", id))
            .and(query_param("ENC", "b64"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
            .mount(&self.server)
            .await;
    }

    /// Mock the CA information page
    pub async fn mock_certcarc(&self, html: &str) {
        Mock::given(method("GET"))
            .and(path(PATH_CERTCARC))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html, CONTENT_TYPE_HTML))
            .mount(&self.server)
            .await;
    }

    /// Mock the CA certificate download for a renewal generation
    pub async fn mock_ca_cert(&self, renewal: u32, body: &str) {
        self.mock_ca(PATH_CERTNEW_CER, renewal, body, CONTENT_TYPE_PKIX_CERT)
            .await;
    }

    /// Mock the CA chain download for a renewal generation
    pub async fn mock_ca_chain(&self, renewal: u32, body: &str) {
        self.mock_ca(PATH_CERTNEW_P7B, renewal, body, CONTENT_TYPE_PKCS7)
            .await;
    }

    /// Mock a CA download with an arbitrary content type
    pub async fn mock_ca(&self, ca_path: &str, renewal: u32, body: &str, content_type: &str) {
        Mock::given(method("GET"))
            .and(path(ca_path))
            .and(query_param("ReqID", "CACert"))
            .and(query_param("ENC", "b64"))
            .and(query_param("Renewal", renewal.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
            .mount(&self.server)
            .await;
    }

    /// Mock a bare status code on a path
    pub async fn mock_status(&self, http_method: &str, page_path: &str, status: u16) {
        Mock::given(method(http_method))
            .and(path(page_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}

/// Test fixture helpers
pub mod fixtures {
    use const_oid::db::rfc5911::{ID_DATA, ID_SIGNED_DATA};
    use der::Encode;

    /// A generated CA certificate
    pub struct TestCa {
        pub pem: String,
        pub der: Vec<u8>,
    }

    /// Generate a self-signed CA certificate
    pub fn ca(name: &str) -> TestCa {
        let key = rcgen::KeyPair::generate().expect("key generation");
        let mut params =
            rcgen::CertificateParams::new(vec![name.to_string()]).expect("certificate params");
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let cert = params.self_signed(&key).expect("self-signed certificate");
        TestCa {
            pem: cert.pem(),
            der: cert.der().to_vec(),
        }
    }

    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = content.len();
        if len < 0x80 {
            out.push(len as u8);
        } else {
            let bytes = len.to_be_bytes();
            let skip = bytes.iter().take_while(|b| **b == 0).count();
            out.push(0x80 | (bytes.len() - skip) as u8);
            out.extend_from_slice(&bytes[skip..]);
        }
        out.extend_from_slice(content);
        out
    }

    /// DER-encoded PKCS#7 certs-only container with the certificates
    /// written in the order given, as certsrv writes them
    pub fn pkcs7_der(certs: &[&[u8]]) -> Vec<u8> {
        // version 1, no digest algorithms, id-data with no content
        let mut signed_data = vec![0x02, 0x01, 0x01, 0x31, 0x00];
        signed_data.extend(tlv(0x30, &ID_DATA.to_der().expect("oid")));
        signed_data.extend(tlv(0xA0, &certs.concat()));
        // no signers
        signed_data.extend([0x31, 0x00]);

        let mut content_info = ID_SIGNED_DATA.to_der().expect("oid");
        content_info.extend(tlv(0xA0, &tlv(0x30, &signed_data)));
        tlv(0x30, &content_info)
    }

    /// PKCS#7 container in the PEM envelope certsrv uses for `ENC=b64`
    pub fn pkcs7_pem(certs: &[&[u8]]) -> String {
        pem::encode(&pem::Pem::new("PKCS7", pkcs7_der(certs)))
    }

    /// A placeholder CSR; the mock server never parses it
    pub const CSR: &str = "-----BEGIN CERTIFICATE REQUEST-----\n\
                           MIIBAzCBqgIBADBIMQswCQYDVQQGEwJVUzEQ\n\
                           -----END CERTIFICATE REQUEST-----\n";

    /// Submission result page naming the request id the way certsrv does
    /// for pending requests
    pub fn submitted_page(id: &str) -> String {
        format!(
            "<HTML><Head><Title>Microsoft Active Directory Certificate Services</Title></Head>\r\n\
             <Body>\r\n<P ID=locPageDesc>Your certificate request has been received. \
             However, you must wait for an administrator to issue the certificate you requested.</P>\r\n\
             <P>Your Request Id is {id}.</P>\r\n</Body></HTML>"
        )
    }

    /// Submission result page with the download link
    pub fn download_page(id: &str) -> String {
        format!(
            "<HTML><Body>\r\n<A Href=\"certnew.cer?ReqID={id}&amp;Enc=b64\">Download certificate</A>\r\n\
             <script>sPKCS7Url=\"certnew.cer?ReqID={id}&\";</script>\r\n</Body></HTML>"
        )
    }

    /// Submission page for a rejected request body
    pub fn submission_error_page(message: &str) -> String {
        format!(
            "<HTML><Body>\r\n<P ID=locPageDesc>Your certificate request was denied.</P>\r\n\
             <P>The disposition message is \"{message}\".</P>\r\n</Body></HTML>"
        )
    }

    /// Disposition page as rendered by certnew.cer for a request that has
    /// no certificate
    pub fn disposition_page(message: &str, last_status: Option<&str>) -> String {
        let mut html = String::from(
            "<HTML><Body>\r\n<Table>\r\n\
             <TR><TD ID=locDispositionLabel>Disposition message:</TD>\r\n<TD>\t\t",
        );
        html.push_str(message);
        html.push_str("\r\n</TD></TR>\r\n");
        if let Some(last) = last_status {
            html.push_str("<TR><TD ID=locLastStatus>LastStatus:</TD>\r\n<TD>\t\t");
            html.push_str(last);
            html.push_str("\r\n</TD></TR>\r\n");
        }
        html.push_str("</Table></Body></HTML>");
        html
    }

    /// CA information page with the renewal counter script
    pub fn certcarc_page(renewals: u32) -> String {
        format!(
            "<HTML><Head>\r\n<Script Language=\"JavaScript\">\r\n\
             var nRenewals={renewals};\r\n\
             var sCAName=\"Example Issuing CA\";\r\n\
             </Script></Head><Body></Body></HTML>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usg_certsrv_client::to_canonical_pem;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let mock_server = MockCertsrv::start().await;
        assert!(mock_server.url().starts_with("http://"));
        assert!(mock_server.url().ends_with("/certsrv"));
    }

    #[test]
    fn test_fixture_container_converts() {
        let ca = fixtures::ca("ca.example.com");
        let pem = fixtures::pkcs7_pem(&[ca.der.as_slice()]);
        assert!(pem.starts_with("-----BEGIN PKCS7-----"));

        let out = to_canonical_pem(pem.as_bytes()).expect("conversion");
        assert_eq!(
            ::pem::parse(out).expect("pem").contents(),
            ca.der.as_slice()
        );
    }
}

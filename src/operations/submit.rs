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

//! Request submission (POST certfnsh.asp).

use url::form_urlencoded;

/// Encode the `certfnsh.asp` submission form.
///
/// The template is sent twice: as a request attribute and as the
/// `CertificateTemplate` field. Both are needed across AD CS versions.
pub fn encode_submission(csr_pem: &str, template: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("Mode", "newreq")
        .append_pair("CertRequest", csr_pem)
        .append_pair("CertAttrib", &format!("CertificateTemplate:{}", template))
        .append_pair("FriendlyType", "Saved-Request Certificate")
        .append_pair("TargetStoreFlags", "0")
        .append_pair("SaveCert", "yes")
        .append_pair("CertificateTemplate", template)
        .finish()
}

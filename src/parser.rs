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

//! Certsrv response parsing.
//!
//! The web enrollment interface has no machine-readable status format. A
//! certificate is recognised by its content type; everything else comes
//! back as an HTML page whose fate is described by free text. This module
//! turns those pages into [`Outcome`]s.
//!
//! The text patterns live in a [`PatternSet`] so that a front-end which
//! words its pages differently can be supported without touching the
//! client.
//!
//! # Example
//!
//! ```
//! use reqwest::StatusCode;
//! use usg_certsrv_client::parser::{classify_response, PatternSet};
//! use usg_certsrv_client::types::ResponseStatus;
//!
//! let page = "Disposition message:</td><td>\t\tTaken Under Submission\r\n";
//! let outcome = classify_response(
//!     &PatternSet::default(),
//!     StatusCode::OK,
//!     "text/html",
//!     page.as_bytes(),
//! )
//! .unwrap();
//! assert_eq!(outcome.status(), ResponseStatus::Pending);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;

use crate::error::{CertsrvError, Result};
use crate::types::{content_types, Outcome, RequestId};

const DISPOSITION: &str = r"Disposition message:[^\t]+\t\t([^\r\n]+)";
const LAST_STATUS: &str = r"LastStatus:[^\t]+\t\t([^\r\n]+)";
const PENDING: &str = r"Taken Under Submission";
const REJECTED: &str = r"Denied by";
const REQUEST_ID_URL: &str = r"certnew\.cer\?ReqID=([0-9]+)&";
const REQUEST_ID_PHRASE: &str = r"Your Request Id is ([0-9]+)\.";
const SUBMISSION_ERROR: &str = r#"The disposition message is "([^"]+)"#;
const RENEWAL: &str = r"var nRenewals=([0-9]+);";

static DEFAULT_PATTERNS: Lazy<PatternSet> = Lazy::new(|| PatternSet {
    disposition: Regex::new(DISPOSITION).unwrap(),
    last_status: Regex::new(LAST_STATUS).unwrap(),
    pending: Regex::new(PENDING).unwrap(),
    rejected: Regex::new(REJECTED).unwrap(),
    request_id: vec![
        Regex::new(REQUEST_ID_URL).unwrap(),
        Regex::new(REQUEST_ID_PHRASE).unwrap(),
    ],
    submission_error: Regex::new(SUBMISSION_ERROR).unwrap(),
    renewal: Regex::new(RENEWAL).unwrap(),
});

/// Text patterns used to scrape certsrv pages.
///
/// Patterns that extract a value must have one capture group.
#[derive(Debug, Clone)]
pub struct PatternSet {
    disposition: Regex,
    last_status: Regex,
    pending: Regex,
    rejected: Regex,
    request_id: Vec<Regex>,
    submission_error: Regex,
    renewal: Regex,
}

impl Default for PatternSet {
    /// Patterns matching the stock AD CS `certsrv` ASP pages.
    fn default() -> Self {
        DEFAULT_PATTERNS.clone()
    }
}

impl PatternSet {
    /// Start from the stock patterns and replace some of them.
    pub fn builder() -> PatternSetBuilder {
        PatternSetBuilder::default()
    }

    /// Extract the disposition message segment.
    ///
    /// Returns `Err(partial)` with whatever the pattern matched, or the
    /// whole page, when the segment is missing.
    fn disposition_message<'a>(&self, page: &'a str) -> std::result::Result<&'a str, &'a str> {
        match self.disposition.captures(page) {
            Some(caps) => match caps.get(1) {
                Some(m) => Ok(m.as_str()),
                None => Err(caps.get(0).map_or(page, |m| m.as_str())),
            },
            None => Err(page),
        }
    }

    fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Builder for [`PatternSet`].
///
/// Every setter takes a regular expression; [`build`](Self::build) fails
/// with a configuration error if any of them does not compile.
#[derive(Debug, Default)]
pub struct PatternSetBuilder {
    disposition: Option<String>,
    last_status: Option<String>,
    pending: Option<String>,
    rejected: Option<String>,
    request_id: Option<Vec<String>>,
    submission_error: Option<String>,
    renewal: Option<String>,
}

impl PatternSetBuilder {
    /// Pattern capturing the disposition message.
    pub fn disposition(mut self, pattern: impl Into<String>) -> Self {
        self.disposition = Some(pattern.into());
        self
    }

    /// Pattern capturing the optional last status text.
    pub fn last_status(mut self, pattern: impl Into<String>) -> Self {
        self.last_status = Some(pattern.into());
        self
    }

    /// Marker identifying a pending request.
    pub fn pending(mut self, pattern: impl Into<String>) -> Self {
        self.pending = Some(pattern.into());
        self
    }

    /// Marker identifying a denied request.
    pub fn rejected(mut self, pattern: impl Into<String>) -> Self {
        self.rejected = Some(pattern.into());
        self
    }

    /// Patterns capturing the request id, tried in order.
    pub fn request_id<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request_id = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Pattern capturing the error text of a failed submission.
    pub fn submission_error(mut self, pattern: impl Into<String>) -> Self {
        self.submission_error = Some(pattern.into());
        self
    }

    /// Pattern capturing the CA renewal counter.
    pub fn renewal(mut self, pattern: impl Into<String>) -> Self {
        self.renewal = Some(pattern.into());
        self
    }

    /// Compile the pattern set.
    pub fn build(self) -> Result<PatternSet> {
        let defaults = PatternSet::default();

        let request_id = match self.request_id {
            Some(patterns) => patterns
                .iter()
                .map(|p| compile(p))
                .collect::<Result<Vec<_>>>()?,
            None => defaults.request_id,
        };

        Ok(PatternSet {
            disposition: compile_or(self.disposition, defaults.disposition)?,
            last_status: compile_or(self.last_status, defaults.last_status)?,
            pending: compile_or(self.pending, defaults.pending)?,
            rejected: compile_or(self.rejected, defaults.rejected)?,
            request_id,
            submission_error: compile_or(self.submission_error, defaults.submission_error)?,
            renewal: compile_or(self.renewal, defaults.renewal)?,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| CertsrvError::config(format!("invalid pattern '{}': {}", pattern, e)))
}

fn compile_or(pattern: Option<String>, default: Regex) -> Result<Regex> {
    match pattern {
        Some(p) => compile(&p),
        None => Ok(default),
    }
}

/// Classify a status or fetch response.
///
/// - non-success status: [`CertsrvError::UnexpectedStatus`]
/// - `application/pkix-cert`: [`Outcome::Ready`] with the body
/// - `text/html`: disposition page, see [`classify_disposition`]
/// - anything else: [`CertsrvError::UnexpectedContentType`]
pub fn classify_response(
    patterns: &PatternSet,
    status: StatusCode,
    content_type: &str,
    body: &[u8],
) -> Result<Outcome> {
    if !status.is_success() {
        return Err(CertsrvError::unexpected_status(
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status"),
        ));
    }

    match content_types::media_type(content_type).as_str() {
        content_types::PKIX_CERT => {
            if body.is_empty() {
                return Err(CertsrvError::EmptyCertificate);
            }
            Ok(Outcome::Ready {
                certificate: body.to_vec(),
            })
        }
        content_types::HTML => classify_disposition(patterns, &String::from_utf8_lossy(body)),
        other => {
            tracing::error!("Unexpected content type {}", other);
            Err(CertsrvError::unexpected_content_type(other))
        }
    }
}

/// Classify an HTML disposition page.
///
/// The pending marker is checked before the rejected marker; a page with a
/// disposition message matching neither is [`Outcome::Errored`]. The
/// optional last status text is appended to the description.
pub fn classify_disposition(patterns: &PatternSet, page: &str) -> Result<Outcome> {
    let message = match patterns.disposition_message(page) {
        Ok(message) => message,
        Err(detail) => {
            tracing::error!("Disposition message unknown: {}", detail);
            return Err(CertsrvError::unparseable_response(detail));
        }
    };

    let mut description = message.to_string();
    match PatternSet::capture(&patterns.last_status, page) {
        Some(last) => {
            description.push(' ');
            description.push_str(last);
        }
        None => tracing::warn!("Last status unknown"),
    }

    let outcome = if patterns.pending.is_match(message) {
        Outcome::Pending { description }
    } else if patterns.rejected.is_match(message) {
        Outcome::Rejected { description }
    } else {
        Outcome::Errored { description }
    };

    Ok(outcome)
}

/// Find the request id on a submission result page.
pub fn extract_request_id(patterns: &PatternSet, page: &str) -> Option<RequestId> {
    patterns
        .request_id
        .iter()
        .find_map(|re| PatternSet::capture(re, page))
        .map(RequestId::from)
}

/// Find the error text on a submission page that carries no request id.
pub fn extract_submission_error(patterns: &PatternSet, page: &str) -> Option<String> {
    PatternSet::capture(&patterns.submission_error, page).map(str::to_string)
}

/// Find the CA renewal counter on the `certcarc.asp` page.
pub fn extract_renewal(patterns: &PatternSet, page: &str) -> Option<u32> {
    PatternSet::capture(&patterns.renewal, page).and_then(|n| n.parse().ok())
}

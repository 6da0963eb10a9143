//! Outbound header assembly.
//!
//! Order is fixed: content type, then configured headers, then the bearer
//! credential. Configured headers replace earlier ones case-insensitively but
//! never the bearer header, unless the call opts in with
//! `allow_authorization_override`.

use std::collections::BTreeMap;
use tracing::warn;

use crate::session::Step;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Ordered header list with case-insensitive replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the position of a replaced header.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.entries
    }
}

/// Build the header list for one call.
///
/// `bearer` is the stored access token for calls that need one.
pub fn build_headers(
    step: Step,
    configured: &BTreeMap<String, String>,
    bearer: Option<&str>,
    allow_authorization_override: bool,
) -> HeaderSet {
    let mut headers = HeaderSet::new();
    headers.set(CONTENT_TYPE, JSON_MEDIA_TYPE);

    let Some(token) = bearer else {
        for (name, value) in configured {
            headers.set(name.as_str(), value.as_str());
        }
        return headers;
    };

    if allow_authorization_override {
        // Configured headers go after the credential and may replace it.
        headers.set(AUTHORIZATION, format!("Bearer {}", token));
        for (name, value) in configured {
            headers.set(name.as_str(), value.as_str());
        }
        return headers;
    }

    for (name, value) in configured {
        if name.eq_ignore_ascii_case(AUTHORIZATION) {
            warn!(step = %step, "Ignoring configured Authorization header; bearer token takes precedence");
            continue;
        }
        headers.set(name.as_str(), value.as_str());
    }
    headers.set(AUTHORIZATION, format!("Bearer {}", token));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn config_headers_extend_and_override_content_type() {
        let headers = build_headers(
            Step::Authenticate,
            &configured(&[("content-type", "application/vnd.api+json"), ("X-Api-Key", "k")]),
            None,
            false,
        );
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Content-Type"), Some("application/vnd.api+json"));
        assert_eq!(headers.get("x-api-key"), Some("k"));
    }

    #[test]
    fn bearer_header_survives_configured_authorization() {
        let headers = build_headers(
            Step::SubmitProfile,
            &configured(&[("authorization", "Basic Zm9v"), ("X-Trace", "1")]),
            Some("tok"),
            false,
        );
        assert_eq!(headers.get(AUTHORIZATION), Some("Bearer tok"));
        assert_eq!(headers.get("X-Trace"), Some("1"));
        assert_eq!(headers.iter().last(), Some((AUTHORIZATION, "Bearer tok")));
    }

    #[test]
    fn opt_in_lets_configuration_replace_bearer() {
        let headers = build_headers(
            Step::Onboard,
            &configured(&[("Authorization", "Basic Zm9v")]),
            Some("tok"),
            true,
        );
        assert_eq!(headers.get(AUTHORIZATION), Some("Basic Zm9v"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn authenticate_passes_configured_authorization_through() {
        let headers = build_headers(
            Step::Authenticate,
            &configured(&[("Authorization", "Basic Zm9v")]),
            None,
            false,
        );
        assert_eq!(headers.get(AUTHORIZATION), Some("Basic Zm9v"));
    }
}

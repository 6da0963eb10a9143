//! Endpoint configuration for the three calls.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [authenticate]
//! url = "https://api.example.com/auth/login"
//! token_field = "data.access_token"   # optional
//! device_id = "kiosk-7"               # optional
//!
//! [submit_profile]
//! url = "https://api.example.com/profile"
//!
//! [onboard]
//! url = "https://api.example.com/client/onboarding"
//! method = "PUT"
//!
//! [onboard.headers]
//! X-Channel = "web"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FlowError, FlowResult};
use crate::headers::AUTHORIZATION;
use crate::session::Step;

pub const DEFAULT_METHOD: &str = "POST";

/// Files tried, in order, when no explicit path is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "tokenchain.toml",
    "config/tokenchain.toml",
    "../config/tokenchain.toml",
];

/// Settings for a single call slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallConfig {
    pub url: String,
    /// HTTP method; `POST` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Dotted path to the token in the response. Authenticate only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_field: Option<String>,
    /// Merged into the request body as `deviceId`. Authenticate only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Let configured headers replace the bearer header.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_authorization_override: bool,
}

impl CallConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn method_name(&self) -> &str {
        self.method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_METHOD)
    }

    pub fn http_method(&self) -> FlowResult<Method> {
        let name = self.method_name().to_ascii_uppercase();
        Method::from_bytes(name.as_bytes())
            .map_err(|_| FlowError::Config(format!("Invalid HTTP method '{}'", name)))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_token_field(mut self, path: impl Into<String>) -> Self {
        self.token_field = Some(path.into());
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }
}

/// Configuration for the whole chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub authenticate: CallConfig,
    pub submit_profile: CallConfig,
    pub onboard: CallConfig,
}

impl FlowConfig {
    pub fn call(&self, step: Step) -> &CallConfig {
        match step {
            Step::Authenticate => &self.authenticate,
            Step::SubmitProfile => &self.submit_profile,
            Step::Onboard => &self.onboard,
        }
    }

    fn call_mut(&mut self, step: Step) -> &mut CallConfig {
        match step {
            Step::Authenticate => &mut self.authenticate,
            Step::SubmitProfile => &mut self.submit_profile,
            Step::Onboard => &mut self.onboard,
        }
    }

    pub fn from_toml_str(content: &str) -> FlowResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> FlowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        toml::from_str(&content).map_err(|e| {
            FlowError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load from `path`, or from the first default location that exists.
    pub fn load(path: Option<&Path>) -> FlowResult<(PathBuf, Self)> {
        if let Some(path) = path {
            return Ok((path.to_path_buf(), Self::from_file(path)?));
        }
        for candidate in DEFAULT_CONFIG_PATHS {
            let candidate = PathBuf::from(candidate);
            if candidate.exists() {
                info!("Loading configuration from {}", candidate.display());
                let config = Self::from_file(&candidate)?;
                return Ok((candidate, config));
            }
        }
        Err(FlowError::Config(format!(
            "No configuration file found (tried {}). Run `tokenchain config init` to create one.",
            DEFAULT_CONFIG_PATHS.join(", ")
        )))
    }

    /// Apply `TOKENCHAIN_*` overrides. `lookup` is usually `std::env::var(..).ok()`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for step in Step::ALL {
            let key = format!("TOKENCHAIN_{}_URL", step.key().to_ascii_uppercase());
            if let Some(url) = non_blank(&key) {
                self.call_mut(step).url = url;
            }
        }
        if let Some(field) = non_blank("TOKENCHAIN_TOKEN_FIELD") {
            self.authenticate.token_field = Some(field);
        }
        if let Some(device_id) = non_blank("TOKENCHAIN_DEVICE_ID") {
            self.authenticate.device_id = Some(device_id);
        }
    }

    /// Check the configuration. Hard problems are errors; hazards are
    /// returned as warnings.
    pub fn validate(&self) -> FlowResult<Vec<String>> {
        let mut warnings = Vec::new();

        for step in Step::ALL {
            let call = self.call(step);
            let url = call.url.trim();
            if url.is_empty() {
                return Err(FlowError::Config(format!("{}: url is empty", step.key())));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(FlowError::Config(format!(
                    "{}: url '{}' must start with http:// or https://",
                    step.key(),
                    url
                )));
            }
            call.http_method()
                .map_err(|e| FlowError::Config(format!("{}: {}", step.key(), e)))?;

            for (name, value) in &call.headers {
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                    FlowError::Config(format!("{}: invalid header name '{}'", step.key(), name))
                })?;
                HeaderValue::from_str(value).map_err(|_| {
                    FlowError::Config(format!(
                        "{}: invalid value for header '{}'",
                        step.key(),
                        name
                    ))
                })?;

                if step != Step::Authenticate && name.eq_ignore_ascii_case(AUTHORIZATION) {
                    if call.allow_authorization_override {
                        warnings.push(format!(
                            "{}: configured Authorization header replaces the bearer token",
                            step.key()
                        ));
                    } else {
                        warnings.push(format!(
                            "{}: configured Authorization header is ignored (bearer token wins)",
                            step.key()
                        ));
                    }
                }
            }

            if step != Step::Authenticate {
                if call.token_field.is_some() {
                    warnings.push(format!("{}: token_field is only used by authenticate", step.key()));
                }
                if call.device_id.is_some() {
                    warnings.push(format!("{}: device_id is only used by authenticate", step.key()));
                }
            }
        }

        if self.authenticate.allow_authorization_override {
            warnings.push(
                "authenticate: allow_authorization_override has no effect (no bearer token)"
                    .to_string(),
            );
        }

        Ok(warnings)
    }

    /// Starter file written by `config init`.
    pub fn template() -> &'static str {
        r#"# tokenchain configuration
#
# Each section configures one call of the chain. `method` defaults to POST.
# Extra headers go in a `[<section>.headers]` table. The bearer token from
# `authenticate` is added to the other two calls automatically.

[authenticate]
url = "https://api.example.com/auth/login"
method = "POST"
# Dotted path to the token when it is not in a common location.
# token_field = "data.access_token"
# device_id = "YOUR_DEVICE_ID"

[authenticate.headers]

[submit_profile]
url = "https://api.example.com/endpoint2"
method = "POST"

[onboard]
url = "https://api.example.com/client/onboarding"
method = "POST"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample() -> FlowConfig {
        FlowConfig {
            authenticate: CallConfig::new("https://api.example.com/login"),
            submit_profile: CallConfig::new("https://api.example.com/profile"),
            onboard: CallConfig::new("https://api.example.com/onboard"),
        }
    }

    #[test]
    fn template_parses_and_validates() {
        let config = FlowConfig::from_toml_str(FlowConfig::template()).unwrap();
        assert_eq!(config.authenticate.method_name(), "POST");
        assert!(config.authenticate.headers.is_empty());
        assert_eq!(config.validate().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn method_defaults_to_post_and_is_uppercased() {
        let call = CallConfig::new("https://x");
        assert_eq!(call.http_method().unwrap(), Method::POST);
        let call = call.with_method("put");
        assert_eq!(call.http_method().unwrap(), Method::PUT);
        let call = CallConfig::new("https://x").with_method("  ");
        assert_eq!(call.method_name(), "POST");
    }

    #[test]
    fn invalid_method_is_rejected() {
        let mut config = sample();
        config.onboard.method = Some("NOT A METHOD".into());
        assert!(matches!(config.validate(), Err(FlowError::Config(_))));
    }

    #[test]
    fn missing_url_is_rejected() {
        let mut config = sample();
        config.submit_profile.url = " ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("submit_profile: url is empty"));
    }

    #[test]
    fn authorization_header_is_flagged() {
        let mut config = sample();
        config.submit_profile = config
            .submit_profile
            .with_header("Authorization", "Basic abc");
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ignored"));
    }

    #[test]
    fn overrides_replace_urls_and_token_field() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TOKENCHAIN_AUTHENTICATE_URL", "http://localhost:9000/login"),
            ("TOKENCHAIN_ONBOARD_URL", "  "),
            ("TOKENCHAIN_TOKEN_FIELD", "payload.jwt"),
        ]);
        let mut config = sample();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.authenticate.url, "http://localhost:9000/login");
        assert_eq!(config.onboard.url, "https://api.example.com/onboard");
        assert_eq!(config.authenticate.token_field.as_deref(), Some("payload.jwt"));
        assert_eq!(config.authenticate.device_id, None);
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.toml");
        std::fs::write(
            &path,
            r#"
[authenticate]
url = "https://a.example/login"
token_field = "data.jwt"

[authenticate.headers]
X-Api-Key = "secret"

[submit_profile]
url = "https://a.example/profile"

[onboard]
url = "https://a.example/onboard"
method = "PATCH"
"#,
        )
        .unwrap();

        let (loaded_from, config) = FlowConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded_from, path);
        assert_eq!(config.authenticate.token_field.as_deref(), Some("data.jwt"));
        assert_eq!(config.authenticate.headers["X-Api-Key"], "secret");
        assert_eq!(config.onboard.http_method().unwrap(), Method::PATCH);
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FlowConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
    }
}

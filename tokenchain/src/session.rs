//! Session-scoped state threaded between the three calls.
//!
//! Each field has exactly one writer: the access token belongs to
//! [`Step::Authenticate`], the identifier to [`Step::SubmitProfile`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three calls of the chain, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Authenticate,
    SubmitProfile,
    Onboard,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Authenticate, Step::SubmitProfile, Step::Onboard];

    /// Position in the chain, shown in status lines as "API n".
    pub fn ordinal(&self) -> usize {
        match self {
            Step::Authenticate => 1,
            Step::SubmitProfile => 2,
            Step::Onboard => 3,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Step::Authenticate => "authenticate",
            Step::SubmitProfile => "submit_profile",
            Step::Onboard => "onboard",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Authenticate => write!(f, "Authenticate"),
            Step::SubmitProfile => write!(f, "Submit profile"),
            Step::Onboard => write!(f, "Onboard"),
        }
    }
}

/// Lifecycle of one call slot. Resets on the next invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    #[default]
    Idle,
    Running,
    Succeeded,
    /// Transport succeeded but the expected field was missing.
    Degraded,
    Failed,
}

/// Token and identifier carried forward between calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    access_token: Option<String>,
    identifier: Option<Value>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn identifier(&self) -> Option<&Value> {
        self.identifier
            .as_ref()
            .filter(|v| crate::extract::is_present(v))
    }

    pub fn has_token(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn has_identifier(&self) -> bool {
        self.identifier().is_some()
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.access_token = if token.is_empty() { None } else { Some(token) };
    }

    pub fn clear_access_token(&mut self) {
        self.access_token = None;
    }

    pub fn set_identifier(&mut self, identifier: Value) {
        self.identifier = crate::extract::is_present(&identifier).then_some(identifier);
    }

    pub fn clear_identifier(&mut self) {
        self.identifier = None;
    }

    /// Builder used to seed a session, mostly from tests.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.set_access_token(token);
        self
    }

    pub fn with_identifier(mut self, identifier: Value) -> Self {
        self.set_identifier(identifier);
        self
    }
}

/// Which triggers are currently enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub authenticate: bool,
    pub submit_profile: bool,
    pub onboard: bool,
}

impl Eligibility {
    /// `running` reports whether a slot currently has a call in flight.
    pub fn compute(session: &SessionState, running: impl Fn(Step) -> bool) -> Self {
        Self {
            authenticate: !running(Step::Authenticate),
            submit_profile: session.has_token() && !running(Step::SubmitProfile),
            onboard: session.has_token()
                && session.has_identifier()
                && !running(Step::Onboard),
        }
    }

    pub fn allows(&self, step: Step) -> bool {
        match step {
            Step::Authenticate => self.authenticate,
            Step::SubmitProfile => self.submit_profile,
            Step::Onboard => self.onboard,
        }
    }

    pub fn enabled_steps(&self) -> Vec<Step> {
        Step::ALL.into_iter().filter(|s| self.allows(*s)).collect()
    }
}

/// Shortened credential for display and logs.
pub fn token_preview(token: &str) -> String {
    const PREVIEW_CHARS: usize = 20;
    let head: String = token.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values_are_not_stored() {
        let mut session = SessionState::new();
        session.set_access_token("");
        session.set_identifier(json!(""));
        assert!(!session.has_token());
        assert!(!session.has_identifier());

        session.set_identifier(json!(7));
        assert_eq!(session.identifier(), Some(&json!(7)));
    }

    #[test]
    fn eligibility_follows_prerequisites() {
        let session = SessionState::new();
        let e = Eligibility::compute(&session, |_| false);
        assert_eq!(e.enabled_steps(), vec![Step::Authenticate]);

        let session = session.with_access_token("abc");
        let e = Eligibility::compute(&session, |_| false);
        assert_eq!(e.enabled_steps(), vec![Step::Authenticate, Step::SubmitProfile]);

        let session = session.with_identifier(json!("u-1"));
        let e = Eligibility::compute(&session, |s| s == Step::SubmitProfile);
        assert_eq!(e.enabled_steps(), vec![Step::Authenticate, Step::Onboard]);
    }

    #[test]
    fn identifier_without_token_does_not_unlock_onboard() {
        let session = SessionState::new().with_identifier(json!("u-1"));
        let e = Eligibility::compute(&session, |_| false);
        assert!(!e.onboard);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(token_preview("short"), "short...");
        assert_eq!(
            token_preview("abcdefghijklmnopqrstuvwxyz"),
            "abcdefghijklmnopqrst..."
        );
        assert_eq!(token_preview("ééééééééééééééééééééé"), "éééééééééééééééééééé...");
    }
}

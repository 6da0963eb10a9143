//! User-supplied form values for each call.
//!
//! Inputs are trimmed before validation; a field that is blank after trimming
//! counts as missing and the call is rejected before any request is built.

use crate::error::{FlowError, FlowResult};
use crate::session::Step;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// Call 1 form: login credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[validate(length(min = 1))]
    pub phone_number: String,
    #[validate(length(min = 1))]
    pub mpin: String,
}

/// Call 2 form: profile details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSubmission {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub display_name: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
    #[validate(length(min = 1))]
    pub email: String,
}

/// Call 3 form: confirmation MPIN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnboardRequest {
    #[validate(length(min = 1))]
    pub mpin: String,
}

impl Credentials {
    const FIELDS: &'static [&'static str] = &["phone_number", "mpin"];

    pub fn new(phone_number: impl Into<String>, mpin: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            mpin: mpin.into(),
        }
    }

    pub fn normalized(&self) -> FlowResult<Self> {
        let trimmed = Self {
            phone_number: self.phone_number.trim().to_string(),
            mpin: self.mpin.trim().to_string(),
        };
        trimmed
            .validate()
            .map_err(|e| validation_error(Step::Authenticate, &e, Self::FIELDS))?;
        Ok(trimmed)
    }
}

impl ProfileSubmission {
    const FIELDS: &'static [&'static str] = &["username", "display_name", "phone_number", "email"];

    pub fn normalized(&self) -> FlowResult<Self> {
        let trimmed = Self {
            username: self.username.trim().to_string(),
            display_name: self.display_name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            email: self.email.trim().to_string(),
        };
        trimmed
            .validate()
            .map_err(|e| validation_error(Step::SubmitProfile, &e, Self::FIELDS))?;
        Ok(trimmed)
    }
}

impl OnboardRequest {
    const FIELDS: &'static [&'static str] = &["mpin"];

    pub fn new(mpin: impl Into<String>) -> Self {
        Self { mpin: mpin.into() }
    }

    pub fn normalized(&self) -> FlowResult<Self> {
        let trimmed = Self {
            mpin: self.mpin.trim().to_string(),
        };
        trimmed
            .validate()
            .map_err(|e| validation_error(Step::Onboard, &e, Self::FIELDS))?;
        Ok(trimmed)
    }
}

/// Report missing fields in declaration order.
fn validation_error(step: Step, errors: &ValidationErrors, order: &[&str]) -> FlowError {
    let field_errors = errors.field_errors();
    let missing = order
        .iter()
        .filter(|name| field_errors.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    FlowError::Validation { step, missing }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_trimmed() {
        let creds = Credentials::new("  5551234 ", "\t0000\n").normalized().unwrap();
        assert_eq!(creds, Credentials::new("5551234", "0000"));
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let err = Credentials::new("   ", "1234").normalized().unwrap_err();
        match err {
            FlowError::Validation { step, missing } => {
                assert_eq!(step, Step::Authenticate);
                assert_eq!(missing, vec!["phone_number".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn profile_reports_every_missing_field_in_order() {
        let form = ProfileSubmission {
            username: "jdoe".into(),
            display_name: " ".into(),
            phone_number: "".into(),
            email: "".into(),
        };
        match form.normalized().unwrap_err() {
            FlowError::Validation { missing, .. } => {
                assert_eq!(missing, vec!["display_name", "phone_number", "email"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bodies_use_camel_case_keys() {
        let form = ProfileSubmission {
            username: "jdoe".into(),
            display_name: "J Doe".into(),
            phone_number: "555".into(),
            email: "j@example.com".into(),
        };
        let body = serde_json::to_value(&form).unwrap();
        assert_eq!(body["displayName"], "J Doe");
        assert_eq!(body["phoneNumber"], "555");
    }

    #[test]
    fn onboard_mpin_is_required() {
        assert!(OnboardRequest::new("").normalized().is_err());
        assert_eq!(OnboardRequest::new(" 42 ").normalized().unwrap().mpin, "42");
    }
}

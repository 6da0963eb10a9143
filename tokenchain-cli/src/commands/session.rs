//! Session command - interactive, step-at-a-time walk through the chain

use anyhow::Context;
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};
use tokenchain::{
    session::token_preview, Credentials, FlowError, OnboardRequest, Orchestrator,
    ProfileSubmission, Step,
};
use tracing::debug;

use crate::console::panel_heading;
use crate::context::CliContext;
use crate::output::OutputFormatter;

/// Field values survive between menu rounds, like a form that is never cleared.
/// MPINs are prompted for on every call and never kept.
#[derive(Debug, Default)]
struct Form {
    phone_number: String,
    username: String,
    display_name: String,
    profile_phone_number: String,
    email: String,
}

enum Choice {
    Call(Step),
    Status,
    Reset,
    Quit,
}

impl Choice {
    fn label(&self) -> String {
        match self {
            Choice::Call(step) => panel_heading(*step),
            Choice::Status => "Status".to_string(),
            Choice::Reset => "Reset session".to_string(),
            Choice::Quit => "Quit".to_string(),
        }
    }
}

pub async fn execute(ctx: &CliContext) -> anyhow::Result<()> {
    let flow = ctx.orchestrator()?;
    let formatter = ctx.formatter();
    let theme = ColorfulTheme::default();
    let mut form = Form::default();

    flow.announce_ready();

    loop {
        let mut choices: Vec<Choice> = flow
            .eligibility()
            .await
            .enabled_steps()
            .into_iter()
            .map(Choice::Call)
            .collect();
        choices.extend([Choice::Status, Choice::Reset, Choice::Quit]);
        let labels: Vec<String> = choices.iter().map(Choice::label).collect();

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()
            .context("Selection cancelled")?;

        let result = match &choices[selection] {
            Choice::Call(Step::Authenticate) => {
                form.phone_number = prompt(&theme, "Phone number", &form.phone_number)?;
                let mpin = prompt_secret(&theme, "MPIN")?;
                let credentials = Credentials::new(form.phone_number.clone(), mpin);
                flow.authenticate(&credentials).await.map(drop)
            }
            Choice::Call(Step::SubmitProfile) => {
                form.username = prompt(&theme, "Username", &form.username)?;
                form.display_name = prompt(&theme, "Display name", &form.display_name)?;
                if form.profile_phone_number.is_empty() {
                    form.profile_phone_number = form.phone_number.clone();
                }
                form.profile_phone_number =
                    prompt(&theme, "Phone number", &form.profile_phone_number)?;
                form.email = prompt(&theme, "Email", &form.email)?;
                let profile = ProfileSubmission {
                    username: form.username.clone(),
                    display_name: form.display_name.clone(),
                    phone_number: form.profile_phone_number.clone(),
                    email: form.email.clone(),
                };
                flow.submit_profile(&profile).await.map(drop)
            }
            Choice::Call(Step::Onboard) => {
                let mpin = prompt_secret(&theme, "MPIN")?;
                flow.onboard(&OnboardRequest::new(mpin)).await.map(drop)
            }
            Choice::Status => {
                show_status(&flow, &formatter).await;
                Ok(())
            }
            Choice::Reset => {
                flow.reset().await;
                formatter.success("Session cleared");
                Ok(())
            }
            Choice::Quit => return Ok(()),
        };

        // Validation, gating and transport failures have already been rendered by the sink.
        match result {
            Ok(()) => {}
            Err(FlowError::Busy(step)) => {
                formatter.warning(&format!("{} is still running", step));
            }
            Err(err) => debug!(error = %err, "Step did not complete"),
        }
    }
}

fn prompt(theme: &ColorfulTheme, label: &str, current: &str) -> anyhow::Result<String> {
    Input::<String>::with_theme(theme)
        .with_prompt(label)
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()
        .with_context(|| format!("Failed to read {}", label))
}

fn prompt_secret(theme: &ColorfulTheme, label: &str) -> anyhow::Result<String> {
    Password::with_theme(theme)
        .with_prompt(label)
        .allow_empty_password(true)
        .interact()
        .with_context(|| format!("Failed to read {}", label))
}

async fn show_status(flow: &Orchestrator, formatter: &OutputFormatter) {
    let session = flow.session().await;
    let eligibility = flow.eligibility().await;

    formatter.section("Session");
    formatter.kv(
        "Access token",
        &session
            .access_token()
            .map(token_preview)
            .unwrap_or_else(|| "(none)".to_string()),
    );
    formatter.kv(
        "Identifier",
        &session
            .identifier()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(none)".to_string()),
    );

    formatter.section("Calls");
    for step in Step::ALL {
        let state = flow.call_state(step).await;
        let available = if eligibility.allows(step) {
            "available"
        } else {
            "locked"
        };
        formatter.kv(&panel_heading(step), &format!("{:?}, {}", state, available));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_keeps_no_secrets() {
        let form = Form {
            phone_number: "5551234".into(),
            username: "jdoe".into(),
            ..Form::default()
        };
        let rendered = format!("{:?}", form).to_lowercase();
        assert!(rendered.contains("5551234"));
        assert!(!rendered.contains("mpin"));
    }

    #[test]
    fn menu_labels_follow_panel_headings() {
        let labels: Vec<String> = [Choice::Call(Step::Authenticate), Choice::Status, Choice::Quit]
            .iter()
            .map(Choice::label)
            .collect();
        assert_eq!(labels, vec!["API 1 · Authenticate", "Status", "Quit"]);
    }
}

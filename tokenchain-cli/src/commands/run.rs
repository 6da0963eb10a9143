//! Run command - the whole chain in one go, without prompts

use anyhow::bail;
use clap::Args;
use tokenchain::{CallOutcome, Credentials, OnboardRequest, ProfileSubmission, Step};
use tracing::info;

use crate::context::CliContext;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Phone number used to authenticate
    #[arg(long, env = "TOKENCHAIN_PHONE_NUMBER")]
    phone_number: Option<String>,

    /// MPIN used to authenticate
    #[arg(long, env = "TOKENCHAIN_MPIN", hide_env_values = true)]
    mpin: Option<String>,

    /// Profile username
    #[arg(long, env = "TOKENCHAIN_USERNAME")]
    username: Option<String>,

    /// Profile display name
    #[arg(long, env = "TOKENCHAIN_DISPLAY_NAME")]
    display_name: Option<String>,

    /// Profile email
    #[arg(long, env = "TOKENCHAIN_EMAIL")]
    email: Option<String>,

    /// Phone number sent with the profile (defaults to --phone-number)
    #[arg(long)]
    profile_phone_number: Option<String>,

    /// MPIN sent to onboarding (defaults to --mpin)
    #[arg(long, env = "TOKENCHAIN_ONBOARD_MPIN", hide_env_values = true)]
    onboard_mpin: Option<String>,
}

impl RunArgs {
    fn credentials(&self) -> Credentials {
        Credentials::new(
            self.phone_number.clone().unwrap_or_default(),
            self.mpin.clone().unwrap_or_default(),
        )
    }

    fn profile(&self) -> ProfileSubmission {
        ProfileSubmission {
            username: self.username.clone().unwrap_or_default(),
            display_name: self.display_name.clone().unwrap_or_default(),
            phone_number: self
                .profile_phone_number
                .clone()
                .or_else(|| self.phone_number.clone())
                .unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
        }
    }

    fn onboard(&self) -> OnboardRequest {
        OnboardRequest::new(
            self.onboard_mpin
                .clone()
                .or_else(|| self.mpin.clone())
                .unwrap_or_default(),
        )
    }
}

pub async fn execute(ctx: &CliContext, args: RunArgs) -> anyhow::Result<()> {
    let flow = ctx.orchestrator()?;
    let formatter = ctx.formatter();

    for step in Step::ALL {
        let outcome = match step {
            Step::Authenticate => flow.authenticate(&args.credentials()).await?,
            Step::SubmitProfile => flow.submit_profile(&args.profile()).await?,
            Step::Onboard => flow.onboard(&args.onboard()).await?,
        };
        if let CallOutcome::Degraded(miss) = &outcome {
            bail!(
                "{} succeeded but returned no usable value (tried {}); stopping",
                step,
                miss.attempted.join(", ")
            );
        }
        info!(step = %step, "Step completed");
    }

    formatter.success("Onboarding chain completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        run: RunArgs,
    }

    #[test]
    fn profile_and_onboard_fall_back_to_login_values() {
        let harness = Harness::parse_from([
            "run",
            "--phone-number",
            "5551234",
            "--mpin",
            "0000",
            "--username",
            "jdoe",
        ]);
        let args = harness.run;

        assert_eq!(args.profile().phone_number, "5551234");
        assert_eq!(args.onboard().mpin, "0000");
        assert_eq!(args.profile().email, "");
    }

    #[test]
    fn explicit_profile_values_win() {
        let harness = Harness::parse_from([
            "run",
            "--phone-number",
            "5551234",
            "--profile-phone-number",
            "5559999",
            "--mpin",
            "0000",
            "--onboard-mpin",
            "1111",
        ]);
        let args = harness.run;

        assert_eq!(args.profile().phone_number, "5559999");
        assert_eq!(args.onboard().mpin, "1111");
        assert_eq!(args.credentials().mpin, "0000");
    }
}

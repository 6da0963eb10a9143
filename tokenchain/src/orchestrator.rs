//! Call Orchestrator
//!
//! Runs the three dependent calls and threads their outputs forward:
//!
//! ```text
//! authenticate ──token──▶ submit_profile ──identifier──▶ onboard
//! ```
//!
//! Each call is a guarded action. Inputs are validated and prerequisites
//! checked before anything goes on the wire; a call that is already running
//! rejects re-entry. A call owns exactly one session field and clears it when
//! it fails or cannot find the value in an otherwise successful response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::FlowConfig;
use crate::error::{FlowError, FlowResult, Prerequisite, TransportError};
use crate::extract::{Extracted, FieldExtractor};
use crate::headers::build_headers;
use crate::inputs::{Credentials, OnboardRequest, ProfileSubmission};
use crate::session::{token_preview, CallState, Eligibility, SessionState, Step};
use crate::sink::{ResultPanel, StatusSink, StatusUpdate, Tone, TracingSink};
use crate::transport::{HttpTransport, OutboundRequest, ReqwestTransport};

/// A call that went through at the transport level and found what it needed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub step: Step,
    pub payload: Value,
    /// The extracted token or identifier; `None` for onboard.
    pub extracted: Option<Extracted>,
}

/// A call that succeeded at the transport level but lacked the expected field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionMiss {
    pub step: Step,
    pub payload: Value,
    /// Every path that was tried, in order.
    pub attempted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    Completed(Completion),
    Degraded(ExtractionMiss),
}

impl CallOutcome {
    pub fn step(&self) -> Step {
        match self {
            CallOutcome::Completed(c) => c.step,
            CallOutcome::Degraded(m) => m.step,
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            CallOutcome::Completed(c) => &c.payload,
            CallOutcome::Degraded(m) => &m.payload,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, CallOutcome::Degraded(_))
    }

    pub fn extracted(&self) -> Option<&Extracted> {
        match self {
            CallOutcome::Completed(c) => c.extracted.as_ref(),
            CallOutcome::Degraded(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    running: AtomicBool,
    state: Mutex<CallState>,
}

/// Clears the running flag of a slot on every exit path.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Orchestrator<T: HttpTransport = ReqwestTransport> {
    config: FlowConfig,
    transport: T,
    sink: Arc<dyn StatusSink>,
    session: Mutex<SessionState>,
    slots: [Slot; 3],
}

impl Orchestrator<ReqwestTransport> {
    /// Orchestrator with the default HTTP transport.
    pub fn new(config: FlowConfig) -> FlowResult<Self> {
        Ok(Self::with_transport(config, ReqwestTransport::new()?))
    }
}

impl<T: HttpTransport> Orchestrator<T> {
    pub fn with_transport(config: FlowConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            sink: Arc::new(TracingSink),
            session: Mutex::new(SessionState::default()),
            slots: Default::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Start from an existing session instead of an empty one.
    pub fn with_session(mut self, session: SessionState) -> Self {
        self.session = Mutex::new(session);
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Snapshot of the current session.
    pub async fn session(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    pub async fn call_state(&self, step: Step) -> CallState {
        *self.slot(step).state.lock().await
    }

    pub fn is_running(&self, step: Step) -> bool {
        self.slot(step).running.load(Ordering::Acquire)
    }

    pub async fn eligibility(&self) -> Eligibility {
        let session = self.session.lock().await;
        Eligibility::compute(&session, |step| self.is_running(step))
    }

    /// Drop the token, the identifier and every call state.
    pub async fn reset(&self) {
        *self.session.lock().await = SessionState::default();
        for slot in &self.slots {
            *slot.state.lock().await = CallState::Idle;
        }
        debug!("Session reset");
        self.announce_ready();
    }

    /// Emit the neutral status shown before the first call.
    pub fn announce_ready(&self) {
        self.emit_status(
            Step::Authenticate,
            Tone::Neutral,
            "Ready - Enter credentials to authenticate",
        );
    }

    /// Call 1: exchange credentials for an access token.
    pub async fn authenticate(&self, credentials: &Credentials) -> FlowResult<CallOutcome> {
        let step = Step::Authenticate;
        let _guard = self.begin(step)?;
        let credentials = self.reported(step, credentials.normalized())?;

        let mut body = self.reported(step, encode_body(step, &credentials))?;
        if let (Some(device_id), Value::Object(map)) =
            (self.config.authenticate.device_id.as_deref(), &mut body)
        {
            map.insert("deviceId".to_string(), Value::String(device_id.to_string()));
        }
        let request = self.reported(step, self.build_request(step, None, body))?;

        self.enter_running(step, "Authenticating...", "Authenticating with API 1...")
            .await;

        let payload = match self.exchange(request).await {
            Ok(payload) => payload,
            Err(e) => {
                self.session.lock().await.clear_access_token();
                return Err(self.fail(e, "Authentication Failed").await);
            }
        };

        let extractor = FieldExtractor::for_access_token()
            .with_override(self.config.authenticate.token_field.as_deref());

        match extractor.extract(&payload) {
            Some(found) => {
                let token = found.as_text();
                self.session.lock().await.set_access_token(token.clone());
                info!(
                    path = %found.path,
                    token = %token_preview(&token),
                    "Access token stored"
                );
                self.finish(
                    step,
                    CallState::Succeeded,
                    "Authenticated ✓",
                    format!(
                        "Authentication successful!\nAccess Token: {}\n\nFull response:\n{}",
                        token_preview(&token),
                        pretty(&payload)
                    ),
                )
                .await;
                Ok(CallOutcome::Completed(Completion {
                    step,
                    payload,
                    extracted: Some(found),
                }))
            }
            None => {
                self.session.lock().await.clear_access_token();
                let attempted = extractor.attempted();
                warn!(attempted = ?attempted, "No access token found in authentication response");
                self.finish(
                    step,
                    CallState::Degraded,
                    "No token found",
                    format!(
                        "Authentication response received but no access token found.\nResponse: {}\n\nSet `token_field` under [authenticate] if the token lives elsewhere.\n\nTried: {}",
                        pretty(&payload),
                        attempted.join(", ")
                    ),
                )
                .await;
                Ok(CallOutcome::Degraded(ExtractionMiss {
                    step,
                    payload,
                    attempted,
                }))
            }
        }
    }

    /// Call 2: submit the profile with the bearer token, yielding an identifier.
    pub async fn submit_profile(&self, profile: &ProfileSubmission) -> FlowResult<CallOutcome> {
        let step = Step::SubmitProfile;
        let _guard = self.begin(step)?;
        let profile = self.reported(step, profile.normalized())?;
        let token = self.reported(step, self.require_token(step).await)?;

        let body = self.reported(step, encode_body(step, &profile))?;
        let request = self.reported(step, self.build_request(step, Some(&token), body))?;

        self.enter_running(step, "Submitting profile...", "Calling API 2...")
            .await;

        let payload = match self.exchange(request).await {
            Ok(payload) => payload,
            Err(e) => {
                self.session.lock().await.clear_identifier();
                return Err(self.fail(e, "Failed").await);
            }
        };

        let extractor = FieldExtractor::for_identifier();
        match extractor.extract(&payload) {
            Some(found) => {
                self.session
                    .lock()
                    .await
                    .set_identifier(found.value.clone());
                info!(path = %found.path, identifier = %found.as_text(), "Identifier stored");
                self.finish(
                    step,
                    CallState::Succeeded,
                    "Success - UserId saved",
                    format!(
                        "Success! UserId extracted: {}\n\nFull response:\n{}",
                        found.as_text(),
                        pretty(&payload)
                    ),
                )
                .await;
                Ok(CallOutcome::Completed(Completion {
                    step,
                    payload,
                    extracted: Some(found),
                }))
            }
            None => {
                self.session.lock().await.clear_identifier();
                let attempted = extractor.attempted();
                warn!(attempted = ?attempted, "No identifier found in profile response");
                self.finish(
                    step,
                    CallState::Degraded,
                    "No userId found",
                    format!(
                        "Success but userId not found in response.\nResponse: {}\n\nTried: {}",
                        pretty(&payload),
                        attempted.join(", ")
                    ),
                )
                .await;
                Ok(CallOutcome::Degraded(ExtractionMiss {
                    step,
                    payload,
                    attempted,
                }))
            }
        }
    }

    /// Call 3: onboard using the token and the identifier. Terminal.
    pub async fn onboard(&self, request: &OnboardRequest) -> FlowResult<CallOutcome> {
        let step = Step::Onboard;
        let _guard = self.begin(step)?;
        let request = self.reported(step, request.normalized())?;
        let token = self.reported(step, self.require_token(step).await)?;
        let identifier = self.reported(step, self.require_identifier(step).await)?;

        let body = json!({
            "mpin": request.mpin,
            "userId": identifier,
        });
        let outbound = self.reported(step, self.build_request(step, Some(&token), body))?;

        self.enter_running(step, "Onboarding...", "Calling API 3...")
            .await;

        let payload = match self.exchange(outbound).await {
            Ok(payload) => payload,
            Err(e) => return Err(self.fail(e, "Failed").await),
        };

        info!("Onboarding completed");
        self.finish(step, CallState::Succeeded, "Success", pretty(&payload))
            .await;
        Ok(CallOutcome::Completed(Completion {
            step,
            payload,
            extracted: None,
        }))
    }

    fn slot(&self, step: Step) -> &Slot {
        &self.slots[step.ordinal() - 1]
    }

    fn begin(&self, step: Step) -> FlowResult<RunningGuard<'_>> {
        let flag = &self.slot(step).running;
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(step = %step, "Rejected re-entry while running");
            return Err(FlowError::Busy(step));
        }
        Ok(RunningGuard { flag })
    }

    /// Surface a pre-flight error in the result panel before returning it.
    fn reported<V>(&self, step: Step, result: FlowResult<V>) -> FlowResult<V> {
        if let Err(e) = &result {
            debug!(step = %step, error = %e, "Call rejected before sending");
            self.sink.on_result(&ResultPanel {
                step,
                tone: Tone::Error,
                text: preflight_message(e),
            });
        }
        result
    }

    async fn require_token(&self, step: Step) -> FlowResult<String> {
        self.session
            .lock()
            .await
            .access_token()
            .map(str::to_string)
            .ok_or(FlowError::Gating {
                step,
                prerequisite: Prerequisite::AccessToken,
            })
    }

    async fn require_identifier(&self, step: Step) -> FlowResult<Value> {
        self.session
            .lock()
            .await
            .identifier()
            .cloned()
            .ok_or(FlowError::Gating {
                step,
                prerequisite: Prerequisite::Identifier,
            })
    }

    fn build_request(
        &self,
        step: Step,
        bearer: Option<&str>,
        body: Value,
    ) -> FlowResult<OutboundRequest> {
        let call = self.config.call(step);
        let headers = build_headers(step, &call.headers, bearer, call.allow_authorization_override);
        Ok(OutboundRequest {
            step,
            method: call.http_method()?,
            url: call.url.clone(),
            headers: headers.into_vec(),
            body,
        })
    }

    /// Send and decode. Non-success statuses and non-JSON bodies are failures.
    async fn exchange(&self, request: OutboundRequest) -> Result<Value, TransportError> {
        let step = request.step;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(TransportError::status(step, response.status, response.body));
        }
        serde_json::from_str(&response.body).map_err(|e| TransportError {
            step,
            status: Some(response.status),
            reason: format!("Response is not valid JSON: {}", e),
            body: Some(response.body),
        })
    }

    async fn set_state(&self, step: Step, state: CallState) {
        *self.slot(step).state.lock().await = state;
    }

    async fn enter_running(&self, step: Step, status: &str, panel: &str) {
        self.set_state(step, CallState::Running).await;
        self.emit_status(step, Tone::Loading, status);
        self.sink.on_result(&ResultPanel {
            step,
            tone: Tone::Loading,
            text: panel.to_string(),
        });
    }

    async fn finish(&self, step: Step, state: CallState, status: &str, panel: String) {
        self.set_state(step, state).await;
        let tone = match state {
            CallState::Succeeded => Tone::Success,
            _ => Tone::Error,
        };
        self.emit_status(step, tone, status);
        self.sink.on_result(&ResultPanel {
            step,
            tone,
            text: panel,
        });
    }

    async fn fail(&self, error: TransportError, status_label: &str) -> FlowError {
        let step = error.step;
        warn!(step = %step, status = ?error.status, reason = %error.reason, "Call failed");
        let (label, panel) = match (error.status, error.body.as_deref()) {
            (Some(status), Some(body)) if !(200..300).contains(&status) => {
                (status_label, format!("Error {}: {}", status, pretty_raw(body)))
            }
            // A success status whose body could not be decoded.
            (Some(status), Some(body)) => (
                "Error",
                format!("Error {}: {}\n\n{}", status, error.reason, body),
            ),
            _ => ("Error", format!("Error: {}", error.reason)),
        };
        self.finish(step, CallState::Failed, label, panel).await;
        FlowError::Transport(error)
    }

    fn emit_status(&self, step: Step, tone: Tone, message: &str) {
        self.sink.on_status(&StatusUpdate {
            step,
            tone,
            message: format!("API {}: {}", step.ordinal(), message),
        });
    }
}

fn encode_body<S: Serialize>(step: Step, form: &S) -> FlowResult<Value> {
    serde_json::to_value(form)
        .map_err(|e| FlowError::Config(format!("{}: failed to encode request body: {}", step, e)))
}

fn preflight_message(error: &FlowError) -> String {
    match error {
        FlowError::Validation { missing, .. } => {
            format!("Please fill in all fields ({})", missing.join(", "))
        }
        FlowError::Gating { prerequisite, .. } => match prerequisite {
            Prerequisite::AccessToken => {
                "Please wait for API 1 authentication to complete".to_string()
            }
            Prerequisite::Identifier => "Please call API 2 first to get userId".to_string(),
        },
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Pretty-print a raw body when it is JSON, otherwise return it as-is.
fn pretty_raw(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .map(|v| pretty(&v))
        .unwrap_or_else(|_| body.to_string())
}

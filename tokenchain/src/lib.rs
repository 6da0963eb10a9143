//! tokenchain
//!
//! Three dependent HTTP calls chained through session state: authenticate to
//! obtain a bearer token, submit a profile to obtain an identifier, then
//! onboard with both.

pub mod config;
pub mod error;
pub mod extract;
pub mod headers;
pub mod inputs;
pub mod orchestrator;
pub mod session;
pub mod sink;
pub mod transport;

pub use config::{CallConfig, FlowConfig};
pub use error::{FlowError, FlowResult, Prerequisite, TransportError};
pub use extract::{Extracted, FieldExtractor};
pub use inputs::{Credentials, OnboardRequest, ProfileSubmission};
pub use orchestrator::{CallOutcome, Completion, ExtractionMiss, Orchestrator};
pub use session::{CallState, Eligibility, SessionState, Step};
pub use sink::{MemorySink, ResultPanel, StatusSink, StatusUpdate, Tone, TracingSink};
pub use transport::{HttpTransport, OutboundRequest, RawResponse, ReqwestTransport};

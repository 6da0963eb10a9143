//! Presentation hooks.
//!
//! The orchestrator reports two kinds of output: a one-line status transition
//! and a per-call result panel (pretty JSON or error text). Front ends
//! implement [`StatusSink`] to render them.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{error, info};

use crate::session::Step;

/// Visual weight of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub step: Step,
    pub tone: Tone,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultPanel {
    pub step: Step,
    pub tone: Tone,
    pub text: String,
}

pub trait StatusSink: Send + Sync {
    fn on_status(&self, update: &StatusUpdate);
    fn on_result(&self, panel: &ResultPanel);
}

/// Default sink: forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn on_status(&self, update: &StatusUpdate) {
        match update.tone {
            Tone::Error => error!(step = %update.step, "{}", update.message),
            _ => info!(step = %update.step, "{}", update.message),
        }
    }

    fn on_result(&self, _panel: &ResultPanel) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkEvent {
    Status(StatusUpdate),
    Result(ResultPanel),
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().clone()
    }

    pub fn statuses(&self) -> Vec<StatusUpdate> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Status(s) => Some(s.clone()),
                SinkEvent::Result(_) => None,
            })
            .collect()
    }

    pub fn last_result(&self, step: Step) -> Option<ResultPanel> {
        self.lock().iter().rev().find_map(|e| match e {
            SinkEvent::Result(panel) if panel.step == step => Some(panel.clone()),
            _ => None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatusSink for MemorySink {
    fn on_status(&self, update: &StatusUpdate) {
        self.lock().push(SinkEvent::Status(update.clone()));
    }

    fn on_result(&self, panel: &ResultPanel) {
        self.lock().push(SinkEvent::Result(panel.clone()));
    }
}

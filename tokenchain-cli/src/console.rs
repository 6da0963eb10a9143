//! Terminal rendering of orchestrator status and result panels.

use tokenchain::{ResultPanel, StatusSink, StatusUpdate, Step};

use crate::output::OutputFormatter;

pub struct ConsoleSink {
    formatter: OutputFormatter,
}

impl ConsoleSink {
    pub fn new(formatter: OutputFormatter) -> Self {
        Self { formatter }
    }
}

pub fn panel_heading(step: Step) -> String {
    format!("API {} · {}", step.ordinal(), step)
}

impl StatusSink for ConsoleSink {
    fn on_status(&self, update: &StatusUpdate) {
        self.formatter.status(update.tone, &update.message);
    }

    fn on_result(&self, panel: &ResultPanel) {
        self.formatter
            .panel(&panel_heading(panel.step), panel.tone, &panel.text);
    }
}

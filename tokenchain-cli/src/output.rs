//! Terminal output for the chain: notices, fields, status lines and result panels
//!
//! Every printed item maps to one JSON object per line in `json` mode, tagged
//! with a `kind` so a consumer can follow a run without scraping text.

use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;
use tokenchain::Tone;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Coloured, framed panels
    #[default]
    Table,
    /// JSON lines
    Json,
    /// Uncoloured text with bracketed labels
    Plain,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "plain" => Ok(OutputFormat::Plain),
            _ => Err(format!(
                "Unknown output format '{}'. Valid options: table, json, plain",
                s
            )),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// One-off messages from commands, as opposed to per-call status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notice {
    Success,
    Warning,
    Error,
}

impl Notice {
    fn label(self) -> &'static str {
        match self {
            Notice::Success => "success",
            Notice::Warning => "warning",
            Notice::Error => "error",
        }
    }

    fn marker(self) -> ColoredString {
        match self {
            Notice::Success => "✓".green(),
            Notice::Warning => "⚠".yellow(),
            Notice::Error => "✗".red(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            quiet: false,
        }
    }

    /// Suppress status lines; results and errors are still printed.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn success(&self, message: &str) {
        self.notice(Notice::Success, message);
    }

    pub fn warning(&self, message: &str) {
        self.notice(Notice::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.notice(Notice::Error, message);
    }

    /// Successes go to stdout, warnings and errors to stderr.
    fn notice(&self, notice: Notice, message: &str) {
        let line = match self.format {
            OutputFormat::Json => {
                json!({"kind": "notice", "level": notice.label(), "message": message}).to_string()
            }
            OutputFormat::Plain => format!("[{}] {}", notice.label(), message),
            OutputFormat::Table => format!("{} {}", notice.marker(), message),
        };
        if notice == Notice::Success {
            println!("{}", line);
        } else {
            eprintln!("{}", line);
        }
    }

    /// Pretty JSON document on stdout, whatever the format.
    pub fn json<T: Serialize>(&self, data: &T) {
        match serde_json::to_string_pretty(data) {
            Ok(text) => println!("{}", text),
            Err(e) => self.error(&format!("Failed to serialize to JSON: {}", e)),
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", json!({"kind": "field", "key": key, "value": value}));
            }
            OutputFormat::Table => println!("  {:<24} {}", format!("{}:", key).cyan(), value),
            OutputFormat::Plain => println!("{}: {}", key, value),
        }
    }

    /// Heading for a group of fields. Not emitted in JSON mode.
    pub fn section(&self, title: &str) {
        match self.format {
            OutputFormat::Table => println!("\n{}", title.bold().underline()),
            OutputFormat::Plain => println!("\n{}", title),
            OutputFormat::Json => {}
        }
    }

    pub fn list_item(&self, item: &str) {
        match self.format {
            OutputFormat::Json => println!("{}", json!({"kind": "item", "text": item})),
            OutputFormat::Table => println!("  {} {}", "•".cyan(), item),
            OutputFormat::Plain => println!("  - {}", item),
        }
    }

    /// The status line.
    pub fn status(&self, tone: Tone, message: &str) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    json!({"kind": "status", "tone": tone, "message": message})
                );
            }
            OutputFormat::Plain => eprintln!("[{}] {}", tone_label(tone), message),
            OutputFormat::Table => eprintln!("{}", paint(tone, &format!("» {}", message))),
        }
    }

    /// A result panel: multi-line text framed under a heading.
    pub fn panel(&self, heading: &str, tone: Tone, text: &str) {
        if tone == Tone::Loading && self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    json!({"kind": "result", "panel": heading, "tone": tone, "text": text})
                );
            }
            OutputFormat::Plain => {
                println!("--- {} [{}]", heading, tone_label(tone));
                println!("{}", text);
            }
            OutputFormat::Table => {
                println!("┌ {}", paint(tone, heading));
                for line in text.lines() {
                    println!("│ {}", line);
                }
                println!("└");
            }
        }
    }
}

fn paint(tone: Tone, text: &str) -> ColoredString {
    match tone {
        Tone::Success => text.green().bold(),
        Tone::Error => text.red().bold(),
        Tone::Loading => text.dimmed(),
        Tone::Neutral => text.bold(),
    }
}

fn tone_label(tone: Tone) -> &'static str {
    match tone {
        Tone::Neutral => "info",
        Tone::Loading => "loading",
        Tone::Success => "success",
        Tone::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Plain] {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
    }

    #[test]
    fn every_tone_has_a_distinct_label() {
        let labels = [Tone::Neutral, Tone::Loading, Tone::Success, Tone::Error].map(tone_label);
        for (i, label) in labels.iter().enumerate() {
            assert!(!labels[i + 1..].contains(label));
        }
    }
}

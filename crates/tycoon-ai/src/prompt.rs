//! Deterministic prompt rendering.

use serde::Serialize;
use std::fmt;
use tycoon_core::OutputSchema;

/// Instruction text sent to the model for one feature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub feature: &'static str,
    pub text: String,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Line-oriented builder shared by every feature template.
///
/// Rendering is total: blank values become the caller's placeholder and empty
/// lists are left out, so the same input always yields the same bytes.
#[derive(Debug)]
pub struct PromptBuilder {
    feature: &'static str,
    lines: Vec<String>,
}

impl PromptBuilder {
    pub fn new(feature: &'static str, instruction: &str) -> Self {
        Self {
            feature,
            lines: vec![instruction.trim().to_string(), String::new()],
        }
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.lines.push(text.into());
        self
    }

    pub fn field(self, label: &str, value: impl fmt::Display) -> Self {
        self.line(format!("- {label}: {value}"))
    }

    /// Text field with a placeholder for blank input.
    pub fn text_field(self, label: &str, value: &str, placeholder: &str) -> Self {
        let value = value.trim();
        let shown = if value.is_empty() { placeholder } else { value };
        self.field(label, shown)
    }

    /// Comma-joined list; omitted entirely when there is nothing to show.
    pub fn list_field(self, label: &str, values: &[String]) -> Self {
        let items: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if items.is_empty() {
            return self;
        }
        self.field(label, items.join(", "))
    }

    /// Appends the response schema and produces the prompt.
    pub fn finish(mut self, schema: &OutputSchema) -> Prompt {
        let rendered = serde_json::to_string_pretty(&schema.to_json_schema()).unwrap_or_default();
        self.lines.push(String::new());
        self.lines
            .push("Respond with a single JSON object matching this schema:".to_string());
        self.lines.push(rendered);
        Prompt {
            feature: self.feature,
            text: self.lines.join("\n"),
        }
    }
}

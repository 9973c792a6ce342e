//! Output formatting for CLI commands.
//!
//! This module renders reports for the terminal (colored text and tables)
//! or as JSON for scripting.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{StackDeployConfig, ValidationResult};
use crate::orchestrator::{DeleteOutcome, DeleteReport, DeployOutcome, DeployReport};
use crate::stack::{EventLine, EventSummary, StackOutput, StackPresence};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Stack output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Stack event row for table display.
#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of a deploy run.
    #[must_use]
    pub fn format_deploy(&self, report: &DeployReport) -> String {
        if let OutputFormat::Json = self.format {
            return to_json(report);
        }

        let mut output = String::new();
        let headline = match report.outcome {
            DeployOutcome::Created => {
                format!("{} Stack {} created", "✓".green(), report.stack_name)
            }
            DeployOutcome::Updated => {
                format!("{} Stack {} updated", "✓".green(), report.stack_name)
            }
            DeployOutcome::NoChanges => format!(
                "{} No updates are to be performed on stack {}",
                "✓".green(),
                report.stack_name
            ),
            DeployOutcome::Submitted => format!(
                "{} Stack {} accepted, not waiting for completion",
                "→".cyan(),
                report.stack_name
            ),
        };
        let _ = writeln!(output, "{headline}");
        let _ = writeln!(output, "   Request: {}", short(&report.fingerprint));
        if let Some(stack_id) = &report.stack_id {
            let _ = writeln!(output, "   Stack id: {stack_id}");
        }
        if let Some(status) = &report.final_status {
            let _ = writeln!(output, "   Status: {status}");
        }
        if report.polls > 0 {
            let _ = writeln!(
                output,
                "   Observed for {}s ({} status checks)",
                report.elapsed_secs, report.polls
            );
        }

        if report.outcome != DeployOutcome::Submitted {
            output.push('\n');
            output.push_str(&Self::outputs_text(&report.outputs));
        }

        let _ = write!(
            output,
            "\nTo delete this stack and all its resources, run: {}\n",
            "halldyll-stacks delete".bold()
        );
        output
    }

    /// Formats the result of a delete run.
    #[must_use]
    pub fn format_delete(&self, report: &DeleteReport) -> String {
        if let OutputFormat::Json = self.format {
            return to_json(report);
        }

        match report.outcome {
            DeleteOutcome::Deleted => format!(
                "{} Stack {} deleted ({}s)\n",
                "✓".green(),
                report.stack_name,
                report.elapsed_secs
            ),
            DeleteOutcome::AlreadyAbsent => format!(
                "{} Stack {} does not exist, nothing to delete\n",
                "✓".green(),
                report.stack_name
            ),
            DeleteOutcome::Submitted => format!(
                "{} Deletion of stack {} accepted, not waiting for completion\n",
                "→".cyan(),
                report.stack_name
            ),
        }
    }

    /// Formats the current stack status.
    #[must_use]
    pub fn format_status(&self, stack_name: &str, presence: &StackPresence) -> String {
        match self.format {
            OutputFormat::Json => match presence {
                StackPresence::NotFound => to_json(&serde_json::json!({
                    "stack_name": stack_name,
                    "status": "NOT_FOUND",
                })),
                StackPresence::Exists(description) => to_json(description),
            },
            OutputFormat::Text => match presence {
                StackPresence::NotFound => {
                    format!("Stack {stack_name}: {}\n", "does not exist".dimmed())
                }
                StackPresence::Exists(description) => {
                    let status = description.state.to_string();
                    let colored_status = if description.state.is_failure() {
                        status.red()
                    } else if description.state.is_in_progress() {
                        status.yellow()
                    } else {
                        status.green()
                    };

                    let mut output = format!("Stack {stack_name}: {colored_status}\n");
                    if let Some(id) = &description.stack_id {
                        let _ = writeln!(output, "   Stack id: {id}");
                    }
                    if let Some(reason) = &description.status_reason {
                        let _ = writeln!(output, "   Reason: {reason}");
                    }
                    let _ = writeln!(output, "   Outputs: {}", description.outputs.len());
                    output
                }
            },
        }
    }

    /// Formats stack outputs.
    #[must_use]
    pub fn format_outputs(&self, outputs: &[StackOutput]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&outputs),
            OutputFormat::Text => Self::outputs_text(outputs),
        }
    }

    /// Formats an event summary.
    #[must_use]
    pub fn format_events(&self, summary: &EventSummary) -> String {
        if let OutputFormat::Json = self.format {
            return to_json(summary);
        }

        if summary.is_empty() {
            return String::from("No stack events found.\n");
        }

        let rows: Vec<EventRow> = summary
            .lines
            .iter()
            .map(|line| match line {
                EventLine::Failure {
                    timestamp,
                    logical_resource_id,
                    status,
                    reason,
                } => EventRow {
                    time: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    resource: logical_resource_id.clone(),
                    status: status.red().to_string(),
                    reason: truncate(reason, 80),
                },
                EventLine::Progress {
                    timestamp,
                    logical_resource_id,
                    status,
                } => EventRow {
                    time: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    resource: logical_resource_id.clone(),
                    status: status.clone(),
                    reason: String::new(),
                },
            })
            .collect();

        let mut output = String::from("Recent stack events:\n");
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let failures = summary.failure_count();
        if failures > 0 {
            let _ = writeln!(
                output,
                "\n{} {failures} failed event(s) among {} total",
                "✗".red(),
                summary.total_events
            );
        }
        output
    }

    /// Formats the outcome of `validate`.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &StackDeployConfig,
        result: &ValidationResult,
        template_bytes: usize,
        remote_checked: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": true,
                "stack": config.stack.name,
                "warnings": result.warnings,
                "template_bytes": template_bytes,
                "remote_checked": remote_checked,
            })),
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid\n", "✓".green());
                if remote_checked {
                    let _ = writeln!(output, "{} Template validated successfully", "✓".green());
                }
                if !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                let _ = write!(output, "\nConfiguration summary:\n");
                let _ = writeln!(output, "   Stack: {}", config.stack.name);
                let _ = writeln!(
                    output,
                    "   Region: {}",
                    config.stack.region.as_deref().unwrap_or("(default)")
                );
                let _ = writeln!(
                    output,
                    "   Template: {} ({template_bytes} bytes)",
                    config.stack.template
                );
                let _ = writeln!(output, "   Parameters: {}", config.parameters.len());
                let _ = writeln!(output, "   Tags: {}", config.tags.len());
                output
            }
        }
    }

    /// Formats an error, with the event summary when one was gathered.
    #[must_use]
    pub fn format_error(&self, error: &crate::error::StackDeployError) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "status": "error",
                "message": error.to_string(),
                "events": error.diagnostics(),
            })),
            OutputFormat::Text => {
                let mut output = format!("{} {error}\n", "✗".red());
                if let Some(summary) = error.diagnostics() {
                    output.push('\n');
                    output.push_str(&self.format_events(summary));
                }
                output
            }
        }
    }

    fn outputs_text(outputs: &[StackOutput]) -> String {
        if outputs.is_empty() {
            return String::from("No outputs found for this stack.\n");
        }

        let rows: Vec<OutputRow> = outputs
            .iter()
            .map(|o| OutputRow {
                key: o.key.clone(),
                value: o.value.clone(),
                description: o.description.clone().unwrap_or_default(),
            })
            .collect();

        let mut output = String::from("Stack outputs:\n");
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');
        output
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

/// Truncates a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

//! Failure-prioritized stack event summaries.
//!
//! Failed events are always kept; other events fill the summary until the
//! display limit is reached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use super::provider::StackProvider;
use super::types::StackEvent;

/// Reason shown for failed events that carry none.
pub const NO_REASON: &str = "No reason provided";

/// Default number of non-failure events shown.
pub const DEFAULT_EVENT_LIMIT: usize = 10;

/// One line of an event summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventLine {
    /// A failed resource with its reason.
    Failure {
        /// When it failed.
        timestamp: DateTime<Utc>,
        /// Logical resource id.
        logical_resource_id: String,
        /// Failure status.
        status: String,
        /// Provider reason (or a placeholder).
        reason: String,
    },
    /// Any other event.
    Progress {
        /// When it happened.
        timestamp: DateTime<Utc>,
        /// Logical resource id.
        logical_resource_id: String,
        /// Resource status.
        status: String,
    },
}

/// Bounded, failure-prioritized view over a stack's events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    /// Selected lines, most recent first.
    pub lines: Vec<EventLine>,
    /// Number of events the provider returned.
    pub total_events: usize,
}

impl EventSummary {
    /// Builds a summary from events ordered most recent first.
    #[must_use]
    pub fn from_events(events: &[StackEvent], limit: usize) -> Self {
        let mut lines = Vec::new();
        let mut shown = 0usize;

        for event in events {
            if event.is_failure() {
                lines.push(EventLine::Failure {
                    timestamp: event.timestamp,
                    logical_resource_id: event.logical_resource_id.clone(),
                    status: event.status.clone(),
                    reason: event
                        .reason
                        .clone()
                        .filter(|r| !r.trim().is_empty())
                        .unwrap_or_else(|| NO_REASON.to_string()),
                });
            } else if shown < limit {
                lines.push(EventLine::Progress {
                    timestamp: event.timestamp,
                    logical_resource_id: event.logical_resource_id.clone(),
                    status: event.status.clone(),
                });
                shown += 1;
            }
        }

        Self {
            lines,
            total_events: events.len(),
        }
    }

    /// Number of failure lines.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, EventLine::Failure { .. }))
            .count()
    }

    /// Returns true if no events were selected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for EventLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure {
                logical_resource_id,
                status,
                reason,
                ..
            } => write!(f, "FAILED: {logical_resource_id} ({status}) - {reason}"),
            Self::Progress {
                timestamp,
                logical_resource_id,
                status,
            } => write!(
                f,
                "{} {logical_resource_id}: {status}",
                timestamp.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }
}

impl fmt::Display for EventSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Recent stack events:")?;
        if self.lines.is_empty() {
            return write!(f, "  (no events)");
        }
        for line in &self.lines {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

/// Fetches and summarizes stack events.
#[derive(Debug)]
pub struct EventDiagnostics<'a, P: StackProvider + ?Sized> {
    /// Stack provider.
    provider: &'a P,
    /// Non-failure display limit.
    limit: usize,
}

impl<'a, P: StackProvider + ?Sized> EventDiagnostics<'a, P> {
    /// Creates diagnostics with the given display limit.
    #[must_use]
    pub const fn new(provider: &'a P, limit: usize) -> Self {
        Self { provider, limit }
    }

    /// Fetches the event history and builds a summary.
    ///
    /// Diagnostics never mask the failure that triggered them: when the
    /// events cannot be fetched, a warning is logged and `None` returned.
    pub async fn collect(&self, stack_name: &str) -> Option<EventSummary> {
        match self.provider.list_events(stack_name).await {
            Ok(events) => {
                let summary = EventSummary::from_events(&events, self.limit);
                debug!(
                    "Selected {} of {} events ({} failures) for stack {stack_name}",
                    summary.lines.len(),
                    summary.total_events,
                    summary.failure_count()
                );
                Some(summary)
            }
            Err(err) => {
                warn!("Error retrieving stack events for {stack_name}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(index: usize, status: &str, reason: Option<&str>) -> StackEvent {
        let secs = 1_700_000_000 - i64::try_from(index).expect("small index") * 10;
        StackEvent {
            timestamp: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
            logical_resource_id: format!("Resource{index}"),
            status: status.to_string(),
            reason: reason.map(str::to_string),
        }
    }

    fn history(failed_position: usize, total: usize) -> Vec<StackEvent> {
        (1..=total)
            .map(|i| {
                if i == failed_position {
                    event(i, "CREATE_FAILED", Some("Subnet not found"))
                } else {
                    event(i, "CREATE_COMPLETE", None)
                }
            })
            .collect()
    }

    #[test]
    fn test_failure_beyond_limit_is_shown() {
        let events = history(12, 15);
        let summary = EventSummary::from_events(&events, 10);

        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.lines.len(), 11);
        assert!(summary.lines.iter().any(|l| matches!(
            l,
            EventLine::Failure { logical_resource_id, reason, .. }
                if logical_resource_id == "Resource12" && reason == "Subnet not found"
        )));
        assert!(summary.to_string().contains("Resource12"));
    }

    #[test]
    fn test_failure_within_limit_does_not_consume_slots() {
        let events = history(3, 15);
        let summary = EventSummary::from_events(&events, 10);

        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.lines.len(), 11);
        assert!(matches!(summary.lines[2], EventLine::Failure { .. }));
    }

    #[test]
    fn test_missing_reason_placeholder() {
        let events = vec![event(1, "UPDATE_FAILED", None), event(2, "UPDATE_FAILED", Some(""))];
        let summary = EventSummary::from_events(&events, 0);
        assert_eq!(summary.failure_count(), 2);
        assert!(summary.lines.iter().all(|l| matches!(
            l,
            EventLine::Failure { reason, .. } if reason == NO_REASON
        )));
    }

    #[test]
    fn test_progress_line_format() {
        let line = EventLine::Progress {
            timestamp: Utc.timestamp_opt(0, 0).single().expect("epoch"),
            logical_resource_id: String::from("Bucket"),
            status: String::from("CREATE_COMPLETE"),
        };
        assert_eq!(line.to_string(), "1970-01-01 00:00:00 Bucket: CREATE_COMPLETE");
    }

    #[tokio::test]
    async fn test_collect_uses_provider_events() {
        let provider = crate::stack::fake::FakeStackProvider::absent().with_events(history(12, 15));
        let summary = EventDiagnostics::new(&provider, 10)
            .collect("demo")
            .await
            .expect("summary");
        assert_eq!(summary.total_events, 15);
        assert_eq!(provider.event_calls(), 1);
    }
}

//! Sweep loop body: one idempotent pass over every active meeting.

use meetbell_core::types::{MeetingFilter, MeetingStatus, ReminderKind};

use crate::engine::{FireOutcome, ReminderEngine};
use crate::windows;

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub meetings_checked: usize,
    /// Reminders delivered, by kind.
    pub sent: Vec<ReminderKind>,
    /// Reminders attempted whose delivery failed.
    pub failed: Vec<ReminderKind>,
    pub started: usize,
    pub completed: usize,
    pub store_errors: usize,
}

impl SweepReport {
    /// Nothing fired and nothing moved.
    pub fn is_quiet(&self) -> bool {
        self.sent.is_empty()
            && self.failed.is_empty()
            && self.started == 0
            && self.completed == 0
            && self.store_errors == 0
    }
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "checked={} sent={} failed={} started={} completed={} store_errors={}",
            self.meetings_checked,
            self.sent.len(),
            self.failed.len(),
            self.started,
            self.completed,
            self.store_errors
        )
    }
}

impl ReminderEngine {
    /// Run one sweep: fire every reminder window a scheduled meeting has
    /// entered, then advance lifecycle status. Safe to run repeatedly or
    /// concurrently; every write is guarded.
    pub async fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let meetings = match self.store.find(&MeetingFilter::active()).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("⚠️ Sweep could not load meetings: {e}");
                report.store_errors += 1;
                return report;
            }
        };
        report.meetings_checked = meetings.len();

        for meeting in &meetings {
            if meeting.status == MeetingStatus::Scheduled {
                for kind in windows::due_reminders(meeting, now) {
                    match self.fire_reminder(&meeting.id, kind).await {
                        FireOutcome::Sent => report.sent.push(kind),
                        FireOutcome::SendFailed => report.failed.push(kind),
                        FireOutcome::StoreError => report.store_errors += 1,
                        FireOutcome::AlreadySent
                        | FireOutcome::InFlight
                        | FireOutcome::Gone
                        | FireOutcome::WindowClosed => {}
                    }
                }
            }

            for (_, to) in self.advance_lifecycle(meeting, now).await {
                match to {
                    MeetingStatus::InProgress => report.started += 1,
                    MeetingStatus::Completed => report.completed += 1,
                    _ => {}
                }
            }
        }

        report
    }
}

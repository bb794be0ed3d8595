//! Status transitions driven purely by wall-clock time.

use chrono::{DateTime, Utc};
use meetbell_core::types::{Meeting, MeetingStatus, MeetingUpdate, UpdateOutcome};

use crate::engine::ReminderEngine;

/// Target status a meeting should be in at `now`, given its current status.
/// Terminal meetings never move.
pub fn next_status(meeting: &Meeting, now: DateTime<Utc>) -> Option<MeetingStatus> {
    match meeting.status {
        MeetingStatus::Scheduled if meeting.start_time <= now => Some(MeetingStatus::InProgress),
        MeetingStatus::InProgress if meeting.end_time <= now => Some(MeetingStatus::Completed),
        _ => None,
    }
}

impl ReminderEngine {
    /// Advance `meeting` as far as `now` allows. A meeting whose start and
    /// end have both passed moves scheduled → in-progress → completed in one
    /// call. Each step is a compare-and-set on the stored status, so a
    /// concurrent cancellation wins and stops the chain.
    ///
    /// Returns the transitions that were applied.
    pub async fn advance_lifecycle(
        &self,
        meeting: &Meeting,
        now: DateTime<Utc>,
    ) -> Vec<(MeetingStatus, MeetingStatus)> {
        let mut applied = Vec::new();
        let mut current = meeting.clone();

        while let Some(to) = next_status(&current, now) {
            let from = current.status;
            match self
                .store
                .update(&current.id, MeetingUpdate::Transition { from, to })
                .await
            {
                Ok(UpdateOutcome::Applied) => {
                    tracing::info!(
                        "📝 Meeting '{}' ({}) {from} → {to}",
                        current.title,
                        current.id
                    );
                    current.status = to;
                    applied.push((from, to));
                }
                Ok(UpdateOutcome::Unchanged) => {
                    tracing::debug!("Meeting {} changed status concurrently, skipping", current.id);
                    break;
                }
                Ok(UpdateOutcome::NotFound) => break,
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Failed to move meeting {} {from} → {to}: {e}",
                        current.id
                    );
                    break;
                }
            }
        }

        applied
    }
}

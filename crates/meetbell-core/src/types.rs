//! Meeting data model, the only entity the reminder engine operates on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MeetbellError, Result};

/// A stored meeting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meeting {
    /// Unique meeting ID.
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Absolute start instant. Always before `end_time`.
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Recipient addresses, in invitation order.
    pub participants: Vec<String>,
    /// Owner (user ID) of the meeting, if known.
    pub created_by: Option<String>,
    pub status: MeetingStatus,
    pub reminders_sent: RemindersSent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status. Monotone: scheduled → in-progress → completed,
/// with cancelled reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::InProgress => "in-progress",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(MeetingStatus::Scheduled),
            "in-progress" => Some(MeetingStatus::InProgress),
            "completed" => Some(MeetingStatus::Completed),
            "cancelled" => Some(MeetingStatus::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MeetingStatus::Completed | MeetingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: MeetingStatus) -> bool {
        matches!(
            (self, next),
            (MeetingStatus::Scheduled, MeetingStatus::InProgress)
                | (MeetingStatus::Scheduled, MeetingStatus::Cancelled)
                | (MeetingStatus::InProgress, MeetingStatus::Completed)
                | (MeetingStatus::InProgress, MeetingStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// The three time-relative reminders, ordered from earliest to latest firing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ReminderKind {
    OneDayBefore,
    OneHourBefore,
    FifteenMinsBefore,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 3] = [
        ReminderKind::OneDayBefore,
        ReminderKind::OneHourBefore,
        ReminderKind::FifteenMinsBefore,
    ];

    /// How long before the meeting start this reminder is due.
    pub fn lead(&self) -> Duration {
        match self {
            ReminderKind::OneDayBefore => Duration::hours(24),
            ReminderKind::OneHourBefore => Duration::hours(1),
            ReminderKind::FifteenMinsBefore => Duration::minutes(15),
        }
    }

    /// The next (shorter) reminder, whose lead is this window's far-side bound.
    pub fn next(&self) -> Option<ReminderKind> {
        match self {
            ReminderKind::OneDayBefore => Some(ReminderKind::OneHourBefore),
            ReminderKind::OneHourBefore => Some(ReminderKind::FifteenMinsBefore),
            ReminderKind::FifteenMinsBefore => None,
        }
    }

    /// Remaining-time phrase used in message content.
    pub fn phrase(&self) -> &'static str {
        match self {
            ReminderKind::OneDayBefore => "24 hours",
            ReminderKind::OneHourBefore => "1 hour",
            ReminderKind::FifteenMinsBefore => "15 minutes",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::OneDayBefore => "oneDayBefore",
            ReminderKind::OneHourBefore => "oneHourBefore",
            ReminderKind::FifteenMinsBefore => "fifteenMinsBefore",
        }
    }

    /// Absolute instant at which this reminder is due for a meeting.
    pub fn fire_at(&self, start_time: DateTime<Utc>) -> DateTime<Utc> {
        start_time - self.lead()
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-meeting "already attempted" flags. Each only ever goes false → true.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemindersSent {
    pub one_day_before: bool,
    pub one_hour_before: bool,
    pub fifteen_mins_before: bool,
}

impl RemindersSent {
    pub fn get(&self, kind: ReminderKind) -> bool {
        match kind {
            ReminderKind::OneDayBefore => self.one_day_before,
            ReminderKind::OneHourBefore => self.one_hour_before,
            ReminderKind::FifteenMinsBefore => self.fifteen_mins_before,
        }
    }

    /// Set a flag. Returns false if it was already set.
    pub fn mark(&mut self, kind: ReminderKind) -> bool {
        let flag = match kind {
            ReminderKind::OneDayBefore => &mut self.one_day_before,
            ReminderKind::OneHourBefore => &mut self.one_hour_before,
            ReminderKind::FifteenMinsBefore => &mut self.fifteen_mins_before,
        };
        if *flag {
            return false;
        }
        *flag = true;
        true
    }
}

/// Producer-side input for creating a meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMeeting {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub participants: Vec<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl NewMeeting {
    /// Reject malformed meetings before they are persisted.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(MeetbellError::InvalidMeeting("title is required".into()));
        }
        if self.participants.iter().all(|p| p.trim().is_empty()) {
            return Err(MeetbellError::InvalidMeeting(
                "at least one participant is required".into(),
            ));
        }
        if self.start_time <= now {
            return Err(MeetbellError::InvalidMeeting(
                "meeting start time must be in the future".into(),
            ));
        }
        if self.end_time <= self.start_time {
            return Err(MeetbellError::InvalidMeeting(
                "meeting end time must be after start time".into(),
            ));
        }
        Ok(())
    }

    /// Build the stored record: status scheduled, all reminder flags false.
    pub fn into_meeting(self, now: DateTime<Utc>) -> Meeting {
        Meeting {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            start_time: self.start_time,
            end_time: self.end_time,
            participants: self
                .participants
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            created_by: self.created_by,
            status: MeetingStatus::Scheduled,
            reminders_sent: RemindersSent::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Query predicate for `find` / `delete_many`. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeetingFilter {
    pub statuses: Option<Vec<MeetingStatus>>,
    /// Strict: matches meetings whose `end_time < end_before`.
    pub end_before: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

impl MeetingFilter {
    pub fn with_status(statuses: &[MeetingStatus]) -> Self {
        Self {
            statuses: Some(statuses.to_vec()),
            ..Default::default()
        }
    }

    /// Meetings the engine still has work to do on.
    pub fn active() -> Self {
        Self::with_status(&[MeetingStatus::Scheduled, MeetingStatus::InProgress])
    }

    /// Completed meetings that ended before `cutoff`.
    pub fn stale_completed(cutoff: DateTime<Utc>) -> Self {
        Self {
            statuses: Some(vec![MeetingStatus::Completed]),
            end_before: Some(cutoff),
            created_by: None,
        }
    }

    pub fn owned_by(owner: &str) -> Self {
        Self {
            created_by: Some(owner.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, meeting: &Meeting) -> bool {
        if let Some(statuses) = &self.statuses
            && !statuses.contains(&meeting.status)
        {
            return false;
        }
        if let Some(cutoff) = self.end_before
            && meeting.end_time >= cutoff
        {
            return false;
        }
        if let Some(owner) = &self.created_by
            && meeting.created_by.as_deref() != Some(owner.as_str())
        {
            return false;
        }
        true
    }
}

/// Field-scoped, compare-and-set updates. Neither variant touches any other
/// field, so concurrent writers to different fields never clobber each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingUpdate {
    /// Set one reminder flag true if it is currently false.
    MarkReminderSent(ReminderKind),
    /// Move status `from` → `to` if the stored status is still `from`.
    Transition {
        from: MeetingStatus,
        to: MeetingStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The record exists but the guard did not hold.
    Unchanged,
    NotFound,
}

impl Meeting {
    /// Apply a field-scoped update in place, honouring its guard.
    pub fn apply(&mut self, update: MeetingUpdate, now: DateTime<Utc>) -> UpdateOutcome {
        let applied = match update {
            MeetingUpdate::MarkReminderSent(kind) => self.reminders_sent.mark(kind),
            MeetingUpdate::Transition { from, to } => {
                if self.status == from && from.can_transition_to(to) {
                    self.status = to;
                    true
                } else {
                    false
                }
            }
        };
        if applied {
            self.updated_at = now;
            UpdateOutcome::Applied
        } else {
            UpdateOutcome::Unchanged
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

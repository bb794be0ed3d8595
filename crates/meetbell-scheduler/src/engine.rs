//! Reminder engine: shared state and the reminder send operation used by
//! both the sweep loop and the per-meeting timers.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Duration;
use meetbell_core::clock::{Clock, SystemClock};
use meetbell_core::traits::{MeetingStore, NotificationSender};
use meetbell_core::types::{Meeting, MeetingStatus, MeetingUpdate, ReminderKind, UpdateOutcome};
use meetbell_notify::templates;

use crate::timers::TimerRegistry;
use crate::windows;

/// What happened when a reminder was fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Delivered and flagged.
    Sent,
    /// Delivery failed; the flag is still set so it is not retried.
    SendFailed,
    /// Flag was already set.
    AlreadySent,
    /// The other path is sending this reminder right now.
    InFlight,
    /// Meeting deleted, or no longer scheduled.
    Gone,
    /// A timer woke outside its reminder's window, so nothing was sent.
    WindowClosed,
    /// Could not read the meeting.
    StoreError,
}

pub struct ReminderEngine {
    pub(crate) store: Arc<dyn MeetingStore>,
    pub(crate) sender: Arc<dyn NotificationSender>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) retention: Duration,
    pub(crate) timers: TimerRegistry,
    in_flight: Mutex<HashSet<(String, ReminderKind)>>,
}

impl ReminderEngine {
    pub fn new(store: Arc<dyn MeetingStore>, sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            store,
            sender,
            clock: Arc::new(SystemClock),
            retention: Duration::days(7),
            timers: TimerRegistry::default(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Drive the engine from a different time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// How long completed meetings are kept before eviction.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Build the reminder for `kind` and deliver it to every participant.
    /// Failures are logged and reported as `false`; they never propagate.
    pub async fn send_reminder(&self, meeting: &Meeting, kind: ReminderKind) -> bool {
        let message = templates::reminder(meeting, kind);
        match self
            .sender
            .send(&meeting.participants, &message.subject, &message.body)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "📧 {kind} reminder sent for meeting '{}' ({})",
                    meeting.title,
                    meeting.id
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Failed to send {kind} reminder for meeting '{}' ({}): {e}",
                    meeting.title,
                    meeting.id
                );
                false
            }
        }
    }

    /// Fire one reminder: claim it, re-read the meeting, send, then set the
    /// flag. The flag is set after the send returns whether or not it
    /// succeeded, so each reminder gets at most one attempt.
    ///
    /// The caller has already decided the reminder is due; the sweep calls
    /// this only for windows it found open.
    pub async fn fire_reminder(&self, meeting_id: &str, kind: ReminderKind) -> FireOutcome {
        self.fire(meeting_id, kind, false).await
    }

    /// Fire a reminder from a per-meeting timer. Same as [`fire_reminder`]
    /// but the reminder's window must still be open at the current wall-clock
    /// time, so a late timer never sends a stale reminder.
    ///
    /// [`fire_reminder`]: ReminderEngine::fire_reminder
    pub async fn fire_timed_reminder(&self, meeting_id: &str, kind: ReminderKind) -> FireOutcome {
        self.fire(meeting_id, kind, true).await
    }

    async fn fire(&self, meeting_id: &str, kind: ReminderKind, check_window: bool) -> FireOutcome {
        let Some(_claim) = self.claim(meeting_id, kind) else {
            tracing::debug!("{kind} reminder for {meeting_id} already in flight");
            return FireOutcome::InFlight;
        };

        let meeting = match self.store.get(meeting_id).await {
            Ok(Some(m)) => m,
            Ok(None) => {
                tracing::debug!("Meeting {meeting_id} no longer exists, skipping {kind} reminder");
                return FireOutcome::Gone;
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not load meeting {meeting_id} for {kind} reminder: {e}"
                );
                return FireOutcome::StoreError;
            }
        };
        if meeting.status != MeetingStatus::Scheduled {
            tracing::debug!(
                "Meeting {meeting_id} is {}, skipping {kind} reminder",
                meeting.status
            );
            return FireOutcome::Gone;
        }
        if meeting.reminders_sent.get(kind) {
            return FireOutcome::AlreadySent;
        }
        if check_window && !windows::timer_window_open(kind, meeting.start_time, self.clock.now()) {
            tracing::debug!("{kind} window for {meeting_id} is not open, timer skips it");
            return FireOutcome::WindowClosed;
        }

        let delivered = self.send_reminder(&meeting, kind).await;

        match self
            .store
            .update(meeting_id, MeetingUpdate::MarkReminderSent(kind))
            .await
        {
            Ok(UpdateOutcome::Applied) | Ok(UpdateOutcome::Unchanged) => {}
            Ok(UpdateOutcome::NotFound) => {
                tracing::debug!("Meeting {meeting_id} deleted before {kind} flag could be set");
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to mark {kind} reminder for {meeting_id}: {e}");
            }
        }

        if delivered {
            FireOutcome::Sent
        } else {
            FireOutcome::SendFailed
        }
    }

    fn claim(&self, meeting_id: &str, kind: ReminderKind) -> Option<InFlightClaim<'_>> {
        let key = (meeting_id.to_string(), kind);
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(key.clone()) {
            return None;
        }
        Some(InFlightClaim { engine: self, key })
    }
}

/// Releases the in-flight slot when the fire attempt finishes.
struct InFlightClaim<'a> {
    engine: &'a ReminderEngine,
    key: (String, ReminderKind),
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.engine
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

//! Per-meeting one-shot timers.
//!
//! Armed when a meeting is created, one per reminder whose fire instant is
//! still in the future. Each timer sleeps until its instant, fires the
//! reminder through the shared send path, then removes itself from the
//! registry. A timer that wakes outside its reminder's window (the wall
//! clock jumped while it slept) sends nothing. Timers live only in this
//! process: a restart loses them, and the sweep loop (plus optional
//! re-arming at start) covers the gap.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use meetbell_core::types::{Meeting, MeetingFilter, MeetingStatus, ReminderKind};
use tokio::task::JoinHandle;

use crate::engine::ReminderEngine;
use crate::windows;

/// A timer that has been armed and has not fired yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub meeting_id: String,
    pub kind: ReminderKind,
    pub fire_at: DateTime<Utc>,
}

struct TimerEntry {
    info: PendingTimer,
    handle: JoinHandle<()>,
}

/// Process-local set of armed timers.
#[derive(Default)]
pub struct TimerRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, TimerEntry>>,
}

impl TimerRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, TimerEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn pending(&self) -> Vec<PendingTimer> {
        let mut pending: Vec<PendingTimer> =
            self.lock().values().map(|e| e.info.clone()).collect();
        pending.sort_by_key(|p| p.fire_at);
        pending
    }

    fn finish(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Abort every armed timer.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<TimerEntry> = self.lock().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            entry.handle.abort();
        }
        drained.len()
    }
}

/// Removes a timer's registry entry when its task ends, including by panic
/// or abort.
struct TimerSlot {
    engine: Arc<ReminderEngine>,
    id: u64,
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.engine.timers.finish(self.id);
    }
}

impl ReminderEngine {
    /// Arm timers for a newly persisted meeting. Call exactly once per
    /// meeting; calling twice arms duplicate timers (the flag check at fire
    /// time keeps delivery at most once, but the work is wasted).
    ///
    /// Must be called from within a tokio runtime. Returns how many timers
    /// were armed.
    pub fn on_meeting_created(self: &Arc<Self>, meeting: &Meeting) -> usize {
        if meeting.status != MeetingStatus::Scheduled {
            return 0;
        }
        let now = self.clock.now();
        let instants = windows::future_fire_instants(meeting, now);

        for (kind, fire_at) in &instants {
            let delay = (*fire_at - now).to_std().unwrap_or_default();
            let id = self.timers.next_id.fetch_add(1, Ordering::Relaxed);
            let engine = Arc::clone(self);
            let meeting_id = meeting.id.clone();
            let kind = *kind;

            // Hold the registry lock across spawn + insert so a timer that
            // fires immediately cannot remove itself before it is inserted.
            let mut entries = self.timers.lock();
            let handle = tokio::spawn(async move {
                let slot = TimerSlot { engine, id };
                tokio::time::sleep(delay).await;
                let outcome = slot.engine.fire_timed_reminder(&meeting_id, kind).await;
                tracing::debug!("⏰ Timer {kind} for {meeting_id} fired: {outcome:?}");
            });
            entries.insert(
                id,
                TimerEntry {
                    info: PendingTimer {
                        meeting_id: meeting.id.clone(),
                        kind,
                        fire_at: *fire_at,
                    },
                    handle,
                },
            );
        }

        if !instants.is_empty() {
            tracing::info!(
                "⏰ Armed {} reminder timer(s) for meeting '{}' ({})",
                instants.len(),
                meeting.title,
                meeting.id
            );
        }
        instants.len()
    }

    /// Re-arm timers for every stored scheduled meeting. Used once at
    /// process start to recover timers lost in a restart.
    pub async fn rearm_timers(self: &Arc<Self>) -> usize {
        match self
            .store
            .find(&MeetingFilter::with_status(&[MeetingStatus::Scheduled]))
            .await
        {
            Ok(meetings) => meetings.iter().map(|m| self.on_meeting_created(m)).sum(),
            Err(e) => {
                tracing::warn!("⚠️ Could not re-arm reminder timers: {e}");
                0
            }
        }
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.timers.pending()
    }

    pub fn cancel_timers(&self) -> usize {
        self.timers.cancel_all()
    }
}

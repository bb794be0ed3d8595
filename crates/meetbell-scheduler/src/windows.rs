//! Reminder window math.
//!
//! Each reminder kind owns a half-open interval of "time until start":
//!
//! ```text
//!   24h window: (1h, 24h]     1h window: (15m, 1h]     15m window: (0, 15m]
//! ```
//!
//! The near bound is inclusive and the far bound exclusive, so every
//! instant before the start belongs to exactly one window.

use chrono::{DateTime, Duration, Utc};
use meetbell_core::types::{Meeting, ReminderKind};

/// Whether `start_time` lies in `kind`'s window as seen from `now`.
pub fn in_window(kind: ReminderKind, start_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let lower = match kind.next() {
        Some(next) => now + next.lead(),
        None => now,
    };
    start_time <= now + kind.lead() && start_time > lower
}

/// Reminders a sweep at `now` should fire: in-window and not yet attempted.
pub fn due_reminders(meeting: &Meeting, now: DateTime<Utc>) -> Vec<ReminderKind> {
    ReminderKind::ALL
        .into_iter()
        .filter(|&kind| !meeting.reminders_sent.get(kind))
        .filter(|&kind| in_window(kind, meeting.start_time, now))
        .collect()
}

/// Fire instants still strictly in the future, for arming per-meeting timers.
pub fn future_fire_instants(
    meeting: &Meeting,
    now: DateTime<Utc>,
) -> Vec<(ReminderKind, DateTime<Utc>)> {
    ReminderKind::ALL
        .into_iter()
        .filter(|&kind| !meeting.reminders_sent.get(kind))
        .map(|kind| (kind, kind.fire_at(meeting.start_time)))
        .filter(|(_, at)| *at > now)
        .collect()
}

/// How early, by the wall clock, a timer may wake and still count as on time.
const TIMER_SLACK_MS: i64 = 1_000;

/// Whether a timer armed for `kind` may still deliver at `now`.
///
/// Timers sleep on the monotonic clock while windows are judged by the wall
/// clock, so the two can drift apart after a suspend or a clock step. A
/// timer that wakes outside its window delivers nothing.
pub fn timer_window_open(
    kind: ReminderKind,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    let fire_at = kind.fire_at(start_time);
    let effective = if fire_at > now && fire_at - now <= Duration::milliseconds(TIMER_SLACK_MS) {
        fire_at
    } else {
        now
    };
    in_window(kind, start_time, effective)
}

//! Whole-lifetime simulations: a synthetic clock stepped one sweep at a time.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use meetbell_core::clock::{Clock, ManualClock};
use meetbell_core::error::Result;
use meetbell_core::traits::{MeetingStore, NotificationSender};
use meetbell_core::types::{Meeting, MeetingStatus, NewMeeting, ReminderKind};
use meetbell_scheduler::{MeetingService, ReminderEngine};
use meetbell_store::MemoryStore;

#[derive(Default)]
struct Outbox {
    subjects: Mutex<Vec<String>>,
}

impl Outbox {
    fn subjects(&self) -> Vec<String> {
        self.subjects.lock().unwrap().clone()
    }

    fn reminders(&self) -> Vec<String> {
        self.subjects()
            .into_iter()
            .filter(|s| s.starts_with("Reminder:"))
            .collect()
    }
}

#[async_trait]
impl NotificationSender for Outbox {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, _recipients: &[String], subject: &str, _body: &str) -> Result<()> {
        self.subjects.lock().unwrap().push(subject.to_string());
        Ok(())
    }
}

struct Sim {
    store: Arc<MemoryStore>,
    outbox: Arc<Outbox>,
    clock: ManualClock,
    engine: Arc<ReminderEngine>,
    t0: DateTime<Utc>,
}

impl Sim {
    fn new() -> Self {
        let t0 = Utc::now();
        let clock = ManualClock::new(t0);
        let store = Arc::new(MemoryStore::new().with_clock(Arc::new(clock.clone())));
        let outbox = Arc::new(Outbox::default());
        let engine = Arc::new(
            ReminderEngine::new(store.clone(), outbox.clone()).with_clock(Arc::new(clock.clone())),
        );
        Self {
            store,
            outbox,
            clock,
            engine,
            t0,
        }
    }

    fn service(&self) -> MeetingService {
        MeetingService::new(Arc::clone(&self.engine)).without_timers()
    }

    async fn create(&self, start_in: Duration, length: Duration) -> Meeting {
        self.service()
            .create(NewMeeting {
                title: "Quarterly review".into(),
                description: None,
                start_time: self.t0 + start_in,
                end_time: self.t0 + start_in + length,
                participants: vec!["a@example.com".into(), "b@example.com".into()],
                created_by: None,
            })
            .await
            .unwrap()
    }

    async fn stored(&self, id: &str) -> Option<Meeting> {
        self.store.get(id).await.unwrap()
    }

    /// Step the clock by `tick` and sweep, `n` times.
    async fn run_ticks(&self, tick: Duration, n: usize) {
        for _ in 0..n {
            self.clock.advance(tick);
            self.engine.sweep().await;
        }
    }
}

#[tokio::test]
async fn test_full_lifetime_with_minute_ticks() {
    let sim = Sim::new();
    let m = sim.create(Duration::hours(26), Duration::minutes(30)).await;

    let mut saw_in_progress = false;
    for _ in 0..(27 * 60) {
        sim.clock.advance(Duration::minutes(1));
        sim.engine.sweep().await;
        let now = sim.clock.now();
        let s = sim.stored(&m.id).await.unwrap();

        if now < m.start_time {
            assert_eq!(s.status, MeetingStatus::Scheduled);
        } else if now < m.end_time {
            assert_eq!(s.status, MeetingStatus::InProgress);
            saw_in_progress = true;
        } else {
            assert_eq!(s.status, MeetingStatus::Completed);
        }
    }

    assert!(saw_in_progress);
    assert_eq!(
        sim.outbox.reminders(),
        vec![
            r#"Reminder: "Quarterly review" starts in 24 hours"#.to_string(),
            r#"Reminder: "Quarterly review" starts in 1 hour"#.to_string(),
            r#"Reminder: "Quarterly review" starts in 15 minutes"#.to_string(),
        ]
    );
    let s = sim.stored(&m.id).await.unwrap();
    assert!(s.reminders_sent.one_day_before);
    assert!(s.reminders_sent.one_hour_before);
    assert!(s.reminders_sent.fifteen_mins_before);
}

#[tokio::test]
async fn test_created_five_minutes_out_gets_only_fifteen_minute_reminder() {
    let sim = Sim::new();
    let m = sim.create(Duration::minutes(5), Duration::minutes(30)).await;

    sim.run_ticks(Duration::minutes(1), 1).await;
    assert_eq!(sim.outbox.reminders().len(), 1);
    assert!(sim.outbox.reminders()[0].ends_with("15 minutes"));

    sim.run_ticks(Duration::minutes(1), 60).await;
    assert_eq!(sim.outbox.reminders().len(), 1);
    let s = sim.stored(&m.id).await.unwrap();
    assert!(!s.reminders_sent.one_day_before);
    assert!(!s.reminders_sent.one_hour_before);
    assert_eq!(s.status, MeetingStatus::Completed);
}

#[tokio::test]
async fn test_downtime_across_whole_meeting_cascades_to_completed() {
    let sim = Sim::new();
    let m = sim.create(Duration::minutes(30), Duration::minutes(20)).await;

    sim.clock.advance(Duration::hours(3));
    let report = sim.engine.sweep().await;
    assert_eq!(report.started, 1);
    assert_eq!(report.completed, 1);
    assert!(report.sent.is_empty());
    assert_eq!(sim.stored(&m.id).await.unwrap().status, MeetingStatus::Completed);
    assert!(sim.outbox.reminders().is_empty());
}

#[tokio::test]
async fn test_cancelled_meeting_is_absorbing() {
    let sim = Sim::new();
    let m = sim.create(Duration::hours(2), Duration::hours(1)).await;
    sim.service().cancel(&m.id).await.unwrap();

    sim.run_ticks(Duration::minutes(5), 60).await;
    let s = sim.stored(&m.id).await.unwrap();
    assert_eq!(s.status, MeetingStatus::Cancelled);
    assert!(sim.outbox.reminders().is_empty());
}

#[tokio::test]
async fn test_completed_meeting_evicted_after_retention() {
    let sim = Sim::new();
    let m = sim.create(Duration::minutes(10), Duration::minutes(10)).await;
    sim.run_ticks(Duration::minutes(10), 3).await;
    let done = sim.stored(&m.id).await.unwrap();
    assert_eq!(done.status, MeetingStatus::Completed);
    assert!(done.updated_at >= m.end_time);

    sim.clock.set(m.end_time + Duration::days(6));
    assert_eq!(sim.engine.evict_stale().await.unwrap(), 0);
    assert!(sim.stored(&m.id).await.is_some());

    sim.clock.set(m.end_time + Duration::days(7));
    assert_eq!(sim.engine.evict_stale().await.unwrap(), 0);

    sim.clock.set(m.end_time + Duration::days(8));
    assert_eq!(sim.engine.evict_stale().await.unwrap(), 1);
    assert!(sim.stored(&m.id).await.is_none());
}

#[tokio::test]
async fn test_each_flag_flips_at_most_once_under_many_meetings() {
    let sim = Sim::new();
    let mut ids = Vec::new();
    for i in 0..10 {
        let m = sim
            .create(Duration::minutes(20 + 37 * i), Duration::minutes(30))
            .await;
        ids.push(m.id);
    }

    // Coarse, uneven ticks.
    for step in [7, 13, 3, 29, 11, 17, 41, 5, 23, 60, 90, 120] {
        sim.clock.advance(Duration::minutes(step));
        sim.engine.sweep().await;
    }

    let reminders = sim.outbox.reminders();
    let mut seen = std::collections::HashSet::new();
    for id in &ids {
        let m = sim.stored(id).await.unwrap();
        for kind in ReminderKind::ALL {
            if m.reminders_sent.get(kind) {
                seen.insert((id.clone(), kind));
            }
        }
    }
    assert_eq!(reminders.len(), seen.len());
}

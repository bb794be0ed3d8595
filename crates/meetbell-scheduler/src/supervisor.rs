//! Lifecycle supervisor: hosts the periodic cadences for one process.
//! Uses tokio::interval, so the loops sleep between ticks.

use std::sync::Arc;
use std::time::Duration;

use meetbell_core::config::SchedulerConfig;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::ReminderEngine;

pub struct Supervisor {
    engine: Arc<ReminderEngine>,
    sweep_every: Duration,
    evict_every: Duration,
    rearm_on_start: bool,
}

impl Supervisor {
    pub fn new(engine: Arc<ReminderEngine>, config: &SchedulerConfig) -> Self {
        Self {
            engine,
            sweep_every: Duration::from_secs(config.sweep_interval_secs.max(1)),
            evict_every: Duration::from_secs(config.eviction_interval_secs.max(1)),
            rearm_on_start: config.rearm_timers_on_start,
        }
    }

    /// Start the sweep and eviction loops. Consumes the supervisor, so a
    /// process cannot start the cadences twice through it.
    pub async fn start(self) -> SupervisorHandle {
        if self.rearm_on_start {
            let armed = self.engine.rearm_timers().await;
            tracing::info!("⏰ Re-armed {armed} reminder timer(s) from store");
        }

        let sweep = tokio::spawn(sweep_loop(Arc::clone(&self.engine), self.sweep_every));
        let evict = tokio::spawn(eviction_loop(Arc::clone(&self.engine), self.evict_every));

        SupervisorHandle {
            engine: self.engine,
            loops: vec![sweep, evict],
        }
    }
}

/// Running supervisor. Dropping it leaves the loops running; call
/// [`SupervisorHandle::shutdown`] to stop them.
pub struct SupervisorHandle {
    engine: Arc<ReminderEngine>,
    loops: Vec<JoinHandle<()>>,
}

impl SupervisorHandle {
    pub fn engine(&self) -> &Arc<ReminderEngine> {
        &self.engine
    }

    /// Both loops are still alive.
    pub fn is_running(&self) -> bool {
        self.loops.iter().all(|h| !h.is_finished())
    }

    /// Stop both loops and abort every pending per-meeting timer.
    pub fn shutdown(self) {
        for handle in &self.loops {
            handle.abort();
        }
        let cancelled = self.engine.cancel_timers();
        tracing::info!("🛑 Reminder engine stopped ({cancelled} pending timer(s) cancelled)");
    }
}

async fn sweep_loop(engine: Arc<ReminderEngine>, every: Duration) {
    tracing::info!("⏰ Reminder sweep started (every {}s)", every.as_secs());

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        // Run in its own task so a panic inside one sweep does not end the loop.
        let eng = Arc::clone(&engine);
        match tokio::spawn(async move { eng.sweep().await }).await {
            Ok(report) if report.is_quiet() => {
                tracing::debug!("Sweep: {report}");
            }
            Ok(report) => tracing::info!("🔔 Sweep: {report}"),
            Err(e) => tracing::error!("❌ Sweep aborted: {e}"),
        }
    }
}

async fn eviction_loop(engine: Arc<ReminderEngine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let eng = Arc::clone(&engine);
        match tokio::spawn(async move { eng.evict_stale().await }).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("⚠️ Eviction failed: {e}"),
            Err(e) => tracing::error!("❌ Eviction aborted: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{PanicSender, RecordingSender};
    use chrono::{DateTime, Utc};
    use meetbell_core::clock::ManualClock;
    use meetbell_core::traits::{MeetingStore, NotificationSender};
    use meetbell_core::types::{Meeting, MeetingStatus, NewMeeting};
    use meetbell_store::MemoryStore;

    fn new_meeting(now: DateTime<Utc>, start_in: chrono::Duration) -> Meeting {
        NewMeeting {
            title: "Standup".into(),
            description: None,
            start_time: now + start_in,
            end_time: now + start_in + chrono::Duration::minutes(15),
            participants: vec!["a@example.com".into()],
            created_by: None,
        }
        .into_meeting(now)
    }

    fn engine(
        store: Arc<MemoryStore>,
        sender: Arc<dyn NotificationSender>,
        now: DateTime<Utc>,
    ) -> Arc<ReminderEngine> {
        Arc::new(ReminderEngine::new(store, sender).with_clock(Arc::new(ManualClock::new(now))))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sweep_runs_immediately() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store.insert(&new_meeting(now, chrono::Duration::minutes(30))).await.unwrap();
        let sender = Arc::new(RecordingSender::default());

        let config = SchedulerConfig {
            rearm_timers_on_start: false,
            ..Default::default()
        };
        let handle = Supervisor::new(engine(store, sender.clone(), now), &config).start().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sender.count(), 1);
        assert!(handle.is_running());
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rearms_and_shutdown_cancels_timers() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store.insert(&new_meeting(now, chrono::Duration::days(3))).await.unwrap();

        let handle = Supervisor::new(
            engine(store, Arc::new(RecordingSender::default()), now),
            &SchedulerConfig::default(),
        )
        .start()
        .await;
        let engine = Arc::clone(handle.engine());
        assert_eq!(engine.pending_timers().len(), 3);

        handle.shutdown();
        assert!(engine.pending_timers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_loop_runs() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        let mut old = new_meeting(now - chrono::Duration::days(10), chrono::Duration::hours(1));
        old.status = MeetingStatus::Completed;
        store.insert(&old).await.unwrap();

        let handle = Supervisor::new(
            engine(store.clone(), Arc::new(RecordingSender::default()), now),
            &SchedulerConfig::default(),
        )
        .start()
        .await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(store.is_empty().await);
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_sweep_does_not_stop_loop() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store.insert(&new_meeting(now, chrono::Duration::minutes(30))).await.unwrap();

        let config = SchedulerConfig {
            rearm_timers_on_start: false,
            ..Default::default()
        };
        let handle = Supervisor::new(engine(store, Arc::new(PanicSender), now), &config)
            .start()
            .await;

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert!(handle.is_running());
        handle.shutdown();
    }
}

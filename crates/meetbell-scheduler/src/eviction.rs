//! Stale-meeting eviction, storage hygiene for long-finished meetings.

use meetbell_core::error::Result;
use meetbell_core::types::MeetingFilter;

use crate::engine::ReminderEngine;

impl ReminderEngine {
    /// Delete every completed meeting that ended more than the retention
    /// period ago. Irreversible.
    pub async fn evict_stale(&self) -> Result<u64> {
        let cutoff = self.clock.now() - self.retention;
        let deleted = self
            .store
            .delete_many(&MeetingFilter::stale_completed(cutoff))
            .await?;
        if deleted > 0 {
            tracing::info!("🧹 Cleaned up {deleted} old completed meeting(s)");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::RecordingSender;
    use chrono::{Duration, Utc};
    use meetbell_core::clock::ManualClock;
    use meetbell_core::traits::MeetingStore;
    use meetbell_core::types::{Meeting, MeetingStatus, NewMeeting};
    use meetbell_store::MemoryStore;
    use std::sync::Arc;

    fn ended(now: chrono::DateTime<Utc>, ago: Duration, status: MeetingStatus) -> Meeting {
        let end = now - ago;
        let mut m = NewMeeting {
            title: "Old".into(),
            description: None,
            start_time: end - Duration::hours(1),
            end_time: end,
            participants: vec!["a@example.com".into()],
            created_by: None,
        }
        .into_meeting(end - Duration::days(1));
        m.status = status;
        m
    }

    #[tokio::test]
    async fn test_eight_days_evicted_six_days_kept() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        let old = ended(now, Duration::days(8), MeetingStatus::Completed);
        let recent = ended(now, Duration::days(6), MeetingStatus::Completed);
        let old_cancelled = ended(now, Duration::days(30), MeetingStatus::Cancelled);
        for m in [&old, &recent, &old_cancelled] {
            store.insert(m).await.unwrap();
        }
        let engine = ReminderEngine::new(store.clone(), Arc::new(RecordingSender::default()))
            .with_clock(Arc::new(ManualClock::new(now)));

        assert_eq!(engine.evict_stale().await.unwrap(), 1);
        assert!(store.get(&old.id).await.unwrap().is_none());
        assert!(store.get(&recent.id).await.unwrap().is_some());
        assert!(store.get(&old_cancelled.id).await.unwrap().is_some());

        assert_eq!(engine.evict_stale().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_custom_retention() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .insert(&ended(now, Duration::days(3), MeetingStatus::Completed))
            .await
            .unwrap();
        let engine = ReminderEngine::new(store.clone(), Arc::new(RecordingSender::default()))
            .with_clock(Arc::new(ManualClock::new(now)))
            .with_retention(Duration::days(2));
        assert_eq!(engine.evict_stale().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }
}

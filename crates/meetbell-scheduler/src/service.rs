//! Producer-side facade: what an API layer calls to create and manage
//! meetings. Creation is the only place timers get armed.

use std::sync::Arc;

use meetbell_core::error::{MeetbellError, Result};
use meetbell_core::types::{
    Meeting, MeetingFilter, MeetingStatus, MeetingUpdate, NewMeeting, UpdateOutcome,
};
use meetbell_notify::templates;

use crate::engine::ReminderEngine;

pub struct MeetingService {
    engine: Arc<ReminderEngine>,
    arm_timers: bool,
}

impl MeetingService {
    pub fn new(engine: Arc<ReminderEngine>) -> Self {
        Self {
            engine,
            arm_timers: true,
        }
    }

    /// For short-lived processes that exit before any timer could fire.
    /// The sweep loop of a running server picks these meetings up instead.
    pub fn without_timers(mut self) -> Self {
        self.arm_timers = false;
        self
    }

    pub fn engine(&self) -> &Arc<ReminderEngine> {
        &self.engine
    }

    /// Validate, persist, invite participants, then arm reminder timers.
    /// A failed invitation is logged and does not fail creation.
    pub async fn create(&self, new: NewMeeting) -> Result<Meeting> {
        let now = self.engine.clock.now();
        new.validate(now)?;
        let meeting = new.into_meeting(now);
        self.engine.store.insert(&meeting).await?;
        tracing::info!(
            "📅 Meeting created: '{}' ({}) at {}",
            meeting.title,
            meeting.id,
            meeting.start_time
        );

        let invite = templates::invitation(&meeting);
        if let Err(e) = self
            .engine
            .sender
            .send(&meeting.participants, &invite.subject, &invite.body)
            .await
        {
            tracing::warn!("⚠️ Invitation for meeting {} not delivered: {e}", meeting.id);
        }

        if self.arm_timers {
            self.engine.on_meeting_created(&meeting);
        }
        Ok(meeting)
    }

    pub async fn get(&self, id: &str) -> Result<Meeting> {
        self.engine
            .store
            .get(id)
            .await?
            .ok_or_else(|| MeetbellError::NotFound(format!("meeting {id}")))
    }

    /// All meetings ordered by start time, optionally only those `owner` created.
    pub async fn list(&self, owner: Option<&str>) -> Result<Vec<Meeting>> {
        let filter = match owner {
            Some(o) => MeetingFilter::owned_by(o),
            None => MeetingFilter::default(),
        };
        self.engine.store.find(&filter).await
    }

    /// Move a scheduled or in-progress meeting to cancelled. Pending timers
    /// for it become no-ops when they fire.
    pub async fn cancel(&self, id: &str) -> Result<Meeting> {
        let meeting = self.get(id).await?;
        if meeting.status.is_terminal() {
            return Err(MeetbellError::InvalidMeeting(format!(
                "meeting {id} is already {}",
                meeting.status
            )));
        }

        let update = MeetingUpdate::Transition {
            from: meeting.status,
            to: MeetingStatus::Cancelled,
        };
        match self.engine.store.update(id, update).await? {
            UpdateOutcome::Applied => {
                tracing::info!("📝 Meeting '{}' ({id}) cancelled", meeting.title);
                self.get(id).await
            }
            // Status moved between the read and the write; try once more.
            UpdateOutcome::Unchanged => {
                let current = self.get(id).await?;
                if current.status.is_terminal() {
                    return Err(MeetbellError::InvalidMeeting(format!(
                        "meeting {id} is already {}",
                        current.status
                    )));
                }
                let retry = MeetingUpdate::Transition {
                    from: current.status,
                    to: MeetingStatus::Cancelled,
                };
                match self.engine.store.update(id, retry).await? {
                    UpdateOutcome::Applied => self.get(id).await,
                    UpdateOutcome::NotFound => {
                        Err(MeetbellError::NotFound(format!("meeting {id}")))
                    }
                    UpdateOutcome::Unchanged => Err(MeetbellError::InvalidMeeting(format!(
                        "meeting {id} changed status concurrently"
                    ))),
                }
            }
            UpdateOutcome::NotFound => Err(MeetbellError::NotFound(format!("meeting {id}"))),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.engine.store.delete(id).await? {
            tracing::info!("🗑️ Meeting {id} deleted");
            Ok(())
        } else {
            Err(MeetbellError::NotFound(format!("meeting {id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::RecordingSender;
    use chrono::{DateTime, Duration, Utc};
    use meetbell_core::clock::ManualClock;
    use meetbell_store::MemoryStore;

    fn service(sender: Arc<RecordingSender>) -> (MeetingService, DateTime<Utc>) {
        let now = Utc::now();
        let engine = ReminderEngine::new(Arc::new(MemoryStore::new()), sender)
            .with_clock(Arc::new(ManualClock::new(now)));
        (MeetingService::new(Arc::new(engine)), now)
    }

    fn input(now: DateTime<Utc>, start_in: Duration) -> NewMeeting {
        NewMeeting {
            title: "Design review".into(),
            description: Some("Storage layer".into()),
            start_time: now + start_in,
            end_time: now + start_in + Duration::hours(1),
            participants: vec!["a@example.com".into(), "b@example.com".into()],
            created_by: Some("alice".into()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_invites_and_arms_timers() {
        let sender = Arc::new(RecordingSender::default());
        let (svc, now) = service(sender.clone());

        let m = svc.create(input(now, Duration::days(2))).await.unwrap();
        assert_eq!(m.status, MeetingStatus::Scheduled);
        assert_eq!(sender.subjects(), vec!["Meeting Invitation: Design review".to_string()]);
        assert_eq!(svc.engine().pending_timers().len(), 3);
        svc.engine().cancel_timers();
    }

    #[tokio::test]
    async fn test_create_rejects_past_start() {
        let (svc, now) = service(Arc::new(RecordingSender::default()));
        let err = svc.create(input(now, Duration::minutes(-5))).await.unwrap_err();
        assert!(matches!(err, MeetbellError::InvalidMeeting(_)));
        assert!(svc.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_invitation_does_not_fail_create() {
        let (svc, now) = service(Arc::new(RecordingSender::failing()));
        let m = svc
            .create(input(now, Duration::minutes(5)))
            .await
            .unwrap();
        assert_eq!(svc.get(&m.id).await.unwrap().id, m.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_timers() {
        let (svc, now) = service(Arc::new(RecordingSender::default()));
        let svc = svc.without_timers();
        svc.create(input(now, Duration::days(2))).await.unwrap();
        assert!(svc.engine().pending_timers().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let (svc, now) = service(Arc::new(RecordingSender::default()));
        let svc = svc.without_timers();
        svc.create(input(now, Duration::hours(3))).await.unwrap();
        let mut other = input(now, Duration::hours(2));
        other.created_by = Some("bob".into());
        svc.create(other).await.unwrap();

        assert_eq!(svc.list(None).await.unwrap().len(), 2);
        let alice = svc.list(Some("alice")).await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].created_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_cancel_then_cancel_again() {
        let (svc, now) = service(Arc::new(RecordingSender::default()));
        let svc = svc.without_timers();
        let m = svc.create(input(now, Duration::hours(3))).await.unwrap();

        let cancelled = svc.cancel(&m.id).await.unwrap();
        assert_eq!(cancelled.status, MeetingStatus::Cancelled);
        assert!(matches!(svc.cancel(&m.id).await, Err(MeetbellError::InvalidMeeting(_))));
        assert!(matches!(svc.cancel("missing").await, Err(MeetbellError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let (svc, now) = service(Arc::new(RecordingSender::default()));
        let svc = svc.without_timers();
        let m = svc.create(input(now, Duration::hours(3))).await.unwrap();
        svc.delete(&m.id).await.unwrap();
        assert!(matches!(svc.delete(&m.id).await, Err(MeetbellError::NotFound(_))));
        assert!(matches!(svc.get(&m.id).await, Err(MeetbellError::NotFound(_))));
    }
}

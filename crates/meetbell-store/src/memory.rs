//! In-memory meeting store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use meetbell_core::clock::{Clock, SystemClock};
use meetbell_core::error::{MeetbellError, Result};
use meetbell_core::traits::MeetingStore;
use meetbell_core::types::{Meeting, MeetingFilter, MeetingUpdate, UpdateOutcome};
use tokio::sync::RwLock;

pub struct MemoryStore {
    meetings: RwLock<HashMap<String, Meeting>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            meetings: RwLock::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `updated_at` from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn len(&self) -> usize {
        self.meetings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.meetings.read().await.is_empty()
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, meeting: &Meeting) -> Result<()> {
        let mut meetings = self.meetings.write().await;
        if meetings.contains_key(&meeting.id) {
            return Err(MeetbellError::Store(format!(
                "Duplicate meeting id: {}",
                meeting.id
            )));
        }
        meetings.insert(meeting.id.clone(), meeting.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Meeting>> {
        Ok(self.meetings.read().await.get(id).cloned())
    }

    async fn find(&self, filter: &MeetingFilter) -> Result<Vec<Meeting>> {
        let meetings = self.meetings.read().await;
        let mut found: Vec<Meeting> = meetings
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        found.sort_by_key(|m| m.start_time);
        Ok(found)
    }

    async fn update(&self, id: &str, update: MeetingUpdate) -> Result<UpdateOutcome> {
        let mut meetings = self.meetings.write().await;
        Ok(match meetings.get_mut(id) {
            Some(meeting) => meeting.apply(update, self.clock.now()),
            None => UpdateOutcome::NotFound,
        })
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.meetings.write().await.remove(id).is_some())
    }

    async fn delete_many(&self, filter: &MeetingFilter) -> Result<u64> {
        let mut meetings = self.meetings.write().await;
        let before = meetings.len();
        meetings.retain(|_, m| !filter.matches(m));
        Ok((before - meetings.len()) as u64)
    }
}

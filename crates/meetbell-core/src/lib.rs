//! # Meetbell Core
//! Shared data model, collaborator traits, configuration and errors.

pub mod clock;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MeetbellConfig;
pub use error::{MeetbellError, Result};
pub use traits::{MeetingStore, NotificationSender};
pub use types::{
    Meeting, MeetingFilter, MeetingStatus, MeetingUpdate, NewMeeting, ReminderKind, RemindersSent,
    UpdateOutcome,
};

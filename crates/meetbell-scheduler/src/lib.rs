//! # Meetbell Scheduler
//!
//! The reminder engine: decides when each meeting's three reminders fire
//! (24h, 1h and 15m before start), fires each at most once, and walks every
//! meeting through its lifecycle from wall-clock time alone.
//!
//! ## Architecture
//! ```text
//! Supervisor (started once per process)
//!   ├── sweep loop (tokio interval, 60s)
//!   │     ├── find scheduled + in-progress meetings
//!   │     ├── due_reminders → fire_reminder ──┐
//!   │     └── advance_lifecycle               │
//!   ├── eviction loop (daily)                 │
//!   │     └── delete completed, ended > 7d    │
//!   └── per-meeting timers (armed on create)  │
//!         └── sleep until start − lead ───────┤
//!                                             ▼
//!                 claim (meeting, kind) → re-read → send → mark flag
//! ```
//!
//! Both paths converge on [`ReminderEngine::fire_reminder`]. The store's
//! compare-and-set flag update plus an in-process in-flight set keep
//! delivery at most once per (meeting, kind).

pub mod engine;
pub mod eviction;
pub mod lifecycle;
pub mod service;
pub mod supervisor;
pub mod sweep;
pub mod timers;
pub mod windows;

pub use engine::{FireOutcome, ReminderEngine};
pub use service::MeetingService;
pub use supervisor::{Supervisor, SupervisorHandle};
pub use sweep::SweepReport;
pub use timers::PendingTimer;

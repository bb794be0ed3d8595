//! Message content for invitations and reminders.

use chrono::{DateTime, Utc};
use meetbell_core::types::{Meeting, ReminderKind};

/// A rendered message, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

fn fmt_time(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M UTC").to_string()
}

fn description(meeting: &Meeting) -> &str {
    meeting
        .description
        .as_deref()
        .unwrap_or("No description provided")
}

/// Reminder for one of the three windows.
pub fn reminder(meeting: &Meeting, kind: ReminderKind) -> Message {
    let phrase = kind.phrase();
    let subject = format!("Reminder: \"{}\" starts in {}", meeting.title, phrase);

    let mut body = format!(
        "🔔 MEETING REMINDER\n\n\
         Your meeting \"{title}\" is starting in {phrase}!\n\n\
         📅 Meeting Details:\n\
         • Title: {title}\n\
         • Description: {desc}\n\
         • Start Time: {start}\n\
         • End Time: {end}\n\
         • Duration: {mins} minutes\n\n\
         ⏰ Don't forget to join the meeting!",
        title = meeting.title,
        phrase = phrase,
        desc = description(meeting),
        start = fmt_time(meeting.start_time),
        end = fmt_time(meeting.end_time),
        mins = meeting.duration().num_minutes(),
    );
    if kind == ReminderKind::FifteenMinsBefore {
        body.push_str("\n\n🚨 This is your final reminder - the meeting starts very soon!");
    }
    body.push_str("\n\nHave a productive meeting! 🎯");

    Message { subject, body }
}

/// Invitation sent once when a meeting is created.
pub fn invitation(meeting: &Meeting) -> Message {
    Message {
        subject: format!("Meeting Invitation: {}", meeting.title),
        body: format!(
            "You have been invited to a meeting:\n\n\
             Title: {}\n\
             Description: {}\n\
             Starts At: {}\n\
             Ends At: {}\n\n\
             Don't be late!",
            meeting.title,
            description(meeting),
            fmt_time(meeting.start_time),
            fmt_time(meeting.end_time),
        ),
    }
}

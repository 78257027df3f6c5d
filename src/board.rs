//! Queue board: rendering, replace-in-place announcement and position DMs.

use parking_lot::Mutex;

use crate::core::Course;
use crate::error::Result;
use crate::services::messaging::{notify_quietly, Messenger, Recipient};

/// Render the waitlist as `#<pos> <name> - <times served>` lines.
pub fn render(course: &Course) -> String {
    if course.waitlist.is_empty() {
        return "*queue is empty.*".to_string();
    }
    course
        .waitlist
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let p = p.lock();
            format!("#{} {} - {}\n", i + 1, p.name(), p.times_served)
        })
        .collect()
}

/// What a participant at a 1-based position is told. The head is already
/// with the tutor and gets nothing.
pub fn position_notice(position: usize) -> Option<String> {
    match position {
        0 | 1 => None,
        2 => Some("you are next!".to_string()),
        n => Some(format!("#{} in the queue", n)),
    }
}

/// Post the course board to the announcement channel, replacing the previous
/// post, and optionally DM every participant their position.
///
/// Returns the rendered board.
pub async fn publish(
    course: &Mutex<Course>,
    messenger: &dyn Messenger,
    notify_positions: bool,
) -> Result<String> {
    let (title, body, stale, members) = {
        let mut course = course.lock();
        (
            course.queue_title(),
            render(&course),
            course.announcement.take(),
            course.waitlist.ids(),
        )
    };
    let text = format!("{}\n{}", title, body);

    if let Some(old) = stale {
        if let Err(e) = messenger.delete_message(&old).await {
            tracing::warn!("Failed to remove old queue board: {}", e);
        }
    }

    let posted = messenger.notify(Recipient::Announcements, &text).await?;
    let superseded = match posted {
        Some(handle) => course.lock().announcement.replace(handle),
        None => None,
    };
    // Another publish raced us; keep only the newest board.
    if let Some(extra) = superseded {
        if let Err(e) = messenger.delete_message(&extra).await {
            tracing::warn!("Failed to remove superseded queue board: {}", e);
        }
    }

    if notify_positions {
        for (i, id) in members.into_iter().enumerate() {
            if let Some(notice) = position_notice(i + 1) {
                notify_quietly(messenger, Recipient::Member(id), &format!("{}\n{}", title, notice))
                    .await;
            }
        }
    }

    Ok(text)
}

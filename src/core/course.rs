//! Courses and their 1-based administrative edits.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::participant::ParticipantRef;
use super::waitlist::Waitlist;
use crate::services::messaging::MessageHandle;

/// Upper-cased course code, e.g. "EGR222".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseCode(String);

impl CourseCode {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing course number ("EGR222" -> "222").
    pub fn number(&self) -> &str {
        let start = self
            .0
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[start..]
    }

    /// Whether free-form input names this course, by full code or number.
    pub fn matches(&self, input: &str) -> bool {
        let input = input.trim();
        !input.is_empty()
            && (self.0.eq_ignore_ascii_case(input) || self.number() == input)
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One offered subject and its waitlist.
#[derive(Debug)]
pub struct Course {
    pub code: CourseCode,
    pub title: String,
    pub waitlist: Waitlist,
    /// Last queue board posted to the announcement channel.
    pub announcement: Option<MessageHandle>,
}

impl Course {
    pub fn new(code: CourseCode, title: impl Into<String>) -> Self {
        Self {
            code,
            title: title.into(),
            waitlist: Waitlist::new(),
            announcement: None,
        }
    }

    pub fn queue_title(&self) -> String {
        format!("📋 {} Queue", self.code)
    }

    /// Move using 1-based positions.
    pub fn move_position(&mut self, from: usize, to: usize) -> Option<ParticipantRef> {
        self.waitlist
            .move_entry(from.checked_sub(1)?, to.checked_sub(1)?)
    }

    /// Swap using 1-based positions.
    pub fn swap_positions(&mut self, a: usize, b: usize) -> bool {
        match (a.checked_sub(1), b.checked_sub(1)) {
            (Some(i), Some(j)) => self.waitlist.swap(i, j),
            _ => false,
        }
    }

    /// Kick using a 1-based position.
    pub fn kick_position(&mut self, position: usize) -> Option<ParticipantRef> {
        self.waitlist.kick(position.checked_sub(1)?)
    }
}

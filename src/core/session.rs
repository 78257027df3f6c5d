//! Session holders (tutors) and their confirmation gate.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::course::CourseCode;
use super::participant::MemberId;
use crate::services::messaging::MessageHandle;

/// Identifies one run of the find-next protocol.
pub type CycleId = u64;

/// Confirmation gate of a session holder.
///
/// Anything other than `Idle` means a find-next cycle owns the holder; a
/// second cycle is refused until it returns to `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    Idle,
    /// A cycle is running but no prompt is outstanding right now.
    Searching { cycle: CycleId },
    /// A ready-check prompt is outstanding for `candidate`.
    AwaitingResponse {
        cycle: CycleId,
        candidate: MemberId,
        request: MessageHandle,
        deadline: Instant,
    },
}

impl Confirmation {
    pub fn is_idle(&self) -> bool {
        matches!(self, Confirmation::Idle)
    }

    pub fn cycle(&self) -> Option<CycleId> {
        match self {
            Confirmation::Idle => None,
            Confirmation::Searching { cycle } => Some(*cycle),
            Confirmation::AwaitingResponse { cycle, .. } => Some(*cycle),
        }
    }

    /// Who is being asked and until when.
    pub fn awaiting(&self) -> Option<(MemberId, Instant)> {
        match self {
            Confirmation::AwaitingResponse {
                candidate, deadline, ..
            } => Some((*candidate, *deadline)),
            _ => None,
        }
    }

    pub fn request(&self) -> Option<&MessageHandle> {
        match self {
            Confirmation::AwaitingResponse { request, .. } => Some(request),
            _ => None,
        }
    }
}

/// A staff member driving the queue for one course.
#[derive(Debug, Clone)]
pub struct SessionHolder {
    pub id: MemberId,
    pub name: String,
    pub course: CourseCode,
    pub confirmation: Confirmation,
    pub started_at: DateTime<Utc>,
}

impl SessionHolder {
    pub fn new(id: MemberId, name: impl Into<String>, course: CourseCode) -> Self {
        Self {
            id,
            name: name.into(),
            course,
            confirmation: Confirmation::Idle,
            started_at: Utc::now(),
        }
    }
}

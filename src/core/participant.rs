//! Participant (student) records.

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::course::CourseCode;
use crate::services::rooms::RoomId;

/// Opaque identity of a person (student or tutor), unique per transport user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable part of a participant, as stored by the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub course: Option<CourseCode>,
    #[serde(default = "default_degree")]
    pub degree: String,
}

pub fn default_degree() -> String {
    "Trad".to_string()
}

/// A person requesting service.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub degree: String,
    /// Unset until the participant requests service.
    pub course: Option<CourseCode>,
    pub times_served: u32,
    pub being_served: bool,
    /// Room occupied before being brought to a tutor.
    pub previous_room: Option<RoomId>,
}

impl Participant {
    pub fn from_record(record: ParticipantRecord) -> Self {
        Self {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            student_id: record.student_id,
            degree: record.degree,
            course: record.course,
            times_served: 0,
            being_served: false,
            previous_room: None,
        }
    }

    pub fn to_record(&self) -> ParticipantRecord {
        ParticipantRecord {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            student_id: self.student_id.clone(),
            course: self.course.clone(),
            degree: self.degree.clone(),
        }
    }

    /// Replace profile fields, keeping service counters and room state.
    pub fn update_profile(&mut self, record: ParticipantRecord) {
        self.first_name = record.first_name;
        self.last_name = record.last_name;
        self.student_id = record.student_id;
        self.degree = record.degree;
        self.course = record.course;
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Shared handle to a participant.
///
/// The registry and any waitlist holding the participant share the same
/// record; the identity is cached so lookups never take the lock.
#[derive(Debug, Clone)]
pub struct ParticipantRef {
    id: MemberId,
    inner: Arc<Mutex<Participant>>,
}

impl ParticipantRef {
    pub fn new(participant: Participant) -> Self {
        Self {
            id: participant.id,
            inner: Arc::new(Mutex::new(participant)),
        }
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn lock(&self) -> MutexGuard<'_, Participant> {
        self.inner.lock()
    }

    /// Clone of the current record.
    pub fn snapshot(&self) -> Participant {
        self.inner.lock().clone()
    }

    pub fn name(&self) -> String {
        self.inner.lock().name()
    }

    pub fn ptr_eq(&self, other: &ParticipantRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Capitalize a name the way the roster stores it ("aDA" -> "Ada").
pub fn normalize_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

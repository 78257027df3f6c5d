//! Process-wide registry of courses, participants and session holders.
//!
//! Each course sits behind its own lock, as does the session-holder table.
//! Locks are never held across an await point.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

use super::course::{Course, CourseCode};
use super::participant::{MemberId, Participant, ParticipantRecord, ParticipantRef};
use super::session::{Confirmation, CycleId, SessionHolder};
use crate::config::Settings;
use crate::error::Rejection;
use crate::services::messaging::MessageHandle;

pub struct Registry {
    courses: BTreeMap<CourseCode, Arc<Mutex<Course>>>,
    participants: RwLock<HashMap<MemberId, ParticipantRef>>,
    sessions: Mutex<HashMap<MemberId, SessionHolder>>,
    next_cycle: AtomicU64,
}

impl Registry {
    /// Create a registry with one empty course per `(code, title)`.
    pub fn new<I>(courses: I) -> Self
    where
        I: IntoIterator<Item = (CourseCode, String)>,
    {
        let courses = courses
            .into_iter()
            .map(|(code, title)| {
                let course = Course::new(code.clone(), title);
                (code, Arc::new(Mutex::new(course)))
            })
            .collect();

        Self {
            courses,
            participants: RwLock::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            next_cycle: AtomicU64::new(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings
                .courses
                .iter()
                .map(|c| (CourseCode::new(&c.code), c.title.clone())),
        )
    }

    pub fn course(&self, code: &CourseCode) -> Option<Arc<Mutex<Course>>> {
        self.courses.get(code).cloned()
    }

    /// Resolve free-form input ("egr222", "222") to a configured course.
    pub fn resolve_course(&self, input: &str) -> Option<CourseCode> {
        self.courses.keys().find(|code| code.matches(input)).cloned()
    }

    pub fn course_codes(&self) -> Vec<CourseCode> {
        self.courses.keys().cloned().collect()
    }

    pub fn participant(&self, id: MemberId) -> Option<ParticipantRef> {
        self.participants.read().get(&id).cloned()
    }

    /// Insert a participant or refresh the profile of an existing one.
    pub fn upsert_participant(&self, record: ParticipantRecord) -> ParticipantRef {
        let mut participants = self.participants.write();
        match participants.get(&record.id) {
            Some(existing) => {
                existing.lock().update_profile(record);
                existing.clone()
            }
            None => {
                let participant = ParticipantRef::new(Participant::from_record(record));
                participants.insert(participant.id(), participant.clone());
                participant
            }
        }
    }

    /// Load roster records at startup. Returns how many were loaded.
    pub fn seed(&self, records: Vec<ParticipantRecord>) -> usize {
        let count = records.len();
        for record in records {
            self.upsert_participant(record);
        }
        tracing::info!(count, "Seeded participants from roster");
        count
    }

    pub fn participant_count(&self) -> usize {
        self.participants.read().len()
    }

    /// Register a session holder, returning any holder it replaced.
    pub fn start_session(&self, holder: SessionHolder) -> Option<SessionHolder> {
        self.sessions.lock().insert(holder.id, holder)
    }

    pub fn end_session(&self, id: MemberId) -> Option<SessionHolder> {
        self.sessions.lock().remove(&id)
    }

    pub fn session(&self, id: MemberId) -> Option<SessionHolder> {
        self.sessions.lock().get(&id).cloned()
    }

    /// Claim the holder for a new find-next cycle.
    pub fn begin_cycle(&self, tutor: MemberId) -> Result<CycleId, Rejection> {
        let mut sessions = self.sessions.lock();
        let holder = sessions.get_mut(&tutor).ok_or(Rejection::NoSession)?;
        if !holder.confirmation.is_idle() {
            return Err(Rejection::AlreadyRunning);
        }
        let cycle = self.next_cycle.fetch_add(1, Ordering::Relaxed);
        holder.confirmation = Confirmation::Searching { cycle };
        Ok(cycle)
    }

    /// Whether `cycle` still owns the holder.
    pub fn cycle_active(&self, tutor: MemberId, cycle: CycleId) -> bool {
        self.sessions
            .lock()
            .get(&tutor)
            .map_or(false, |s| s.confirmation.cycle() == Some(cycle))
    }

    /// Record the outstanding prompt. False if the cycle was cancelled.
    pub fn await_response(
        &self,
        tutor: MemberId,
        cycle: CycleId,
        candidate: MemberId,
        request: MessageHandle,
        deadline: Instant,
    ) -> bool {
        self.transition(tutor, cycle, Confirmation::AwaitingResponse {
            cycle,
            candidate,
            request,
            deadline,
        })
    }

    /// Drop the outstanding prompt. False if the cycle was cancelled.
    pub fn resume_search(&self, tutor: MemberId, cycle: CycleId) -> bool {
        self.transition(tutor, cycle, Confirmation::Searching { cycle })
    }

    /// Return the holder to idle if `cycle` still owns it.
    pub fn finish_cycle(&self, tutor: MemberId, cycle: CycleId) {
        self.transition(tutor, cycle, Confirmation::Idle);
    }

    fn transition(&self, tutor: MemberId, cycle: CycleId, next: Confirmation) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&tutor) {
            Some(holder) if holder.confirmation.cycle() == Some(cycle) => {
                holder.confirmation = next;
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever cycle owns the holder.
    ///
    /// Returns the state that was withdrawn, so the caller can delete an
    /// outstanding prompt. Never `Idle`.
    pub fn cancel_cycle(&self, tutor: MemberId) -> Result<Confirmation, Rejection> {
        let mut sessions = self.sessions.lock();
        let holder = sessions.get_mut(&tutor).ok_or(Rejection::NoSession)?;
        match std::mem::replace(&mut holder.confirmation, Confirmation::Idle) {
            Confirmation::Idle => Err(Rejection::NothingToCancel),
            withdrawn => Ok(withdrawn),
        }
    }

    /// Reset all volatile state: empty every waitlist and drop all sessions.
    pub fn shutdown(&self) {
        for course in self.courses.values() {
            let mut course = course.lock();
            course.waitlist.clear();
            course.announcement = None;
        }
        self.sessions.lock().clear();
        tracing::info!("Registry shut down");
    }
}

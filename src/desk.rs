//! Front desk: the operations the command layer exposes to students and
//! tutors, on top of the registry, the matchmaker and the collaborators.

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::board;
use crate::config::Settings;
use crate::core::participant::{default_degree, normalize_name};
use crate::core::{
    Course, CourseCode, MemberId, ParticipantRecord, ParticipantRef, Registry, SessionHolder,
};
use crate::error::{Error, Rejection, Result};
use crate::matchmaking::{Matchmaker, NextOutcome};
use crate::services::messaging::{notify_quietly, MessageHandle, Messenger, Recipient};
use crate::services::rooms::LiveRooms;
use crate::services::roster::RosterStore;
use crate::services::schedule::Schedule;
use crate::services::signin::SignInCheck;

/// Profile fields a student submits with /register.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub course: String,
    pub degree: Option<String>,
}

#[derive(Clone)]
pub struct FrontDesk {
    registry: Arc<Registry>,
    messenger: Arc<dyn Messenger>,
    roster: Arc<dyn RosterStore>,
    sign_in: Arc<dyn SignInCheck>,
    schedules: Arc<HashMap<CourseCode, Schedule>>,
    matchmaker: Matchmaker,
}

impl FrontDesk {
    pub fn new(
        settings: &Settings,
        registry: Arc<Registry>,
        messenger: Arc<dyn Messenger>,
        rooms: Arc<dyn LiveRooms>,
        roster: Arc<dyn RosterStore>,
        sign_in: Arc<dyn SignInCheck>,
    ) -> Self {
        let schedules = registry
            .course_codes()
            .into_iter()
            .map(|code| {
                let week = settings.schedule_for(code.as_str()).cloned().unwrap_or_default();
                let schedule = Schedule::new(code.clone(), &week);
                (code, schedule)
            })
            .collect();
        let matchmaker = Matchmaker::new(
            registry.clone(),
            messenger.clone(),
            rooms,
            sign_in.clone(),
        )
        .with_window(Duration::from_secs(settings.matchmaking.confirmation_timeout_secs));

        Self {
            registry,
            messenger,
            roster,
            sign_in,
            schedules: Arc::new(schedules),
            matchmaker,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Create or update a student's profile and persist it.
    pub fn register(&self, id: MemberId, form: Registration) -> Result<ParticipantRef> {
        let course = self
            .registry
            .resolve_course(&form.course)
            .ok_or(Rejection::UnknownCourse)?;
        let record = ParticipantRecord {
            id,
            first_name: normalize_name(&form.first_name),
            last_name: normalize_name(&form.last_name),
            student_id: form.student_id.trim().to_string(),
            course: Some(course),
            degree: form
                .degree
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(default_degree),
        };

        self.roster.save(&record)?;
        let participant = self.registry.upsert_participant(record);
        tracing::info!(participant = %id, "Registered participant");
        Ok(participant)
    }

    /// Join the queue of one's registered course. Returns the 1-based
    /// position; joining twice keeps the original place.
    pub async fn join(&self, id: MemberId) -> Result<usize> {
        let (participant, code) = self.enrolled(id)?;

        let snapshot = participant.snapshot();
        if !self.sign_in.is_signed_in(&snapshot, &code).await? {
            return Err(Rejection::NotSignedIn.into());
        }

        let course = self.course(&code)?;
        let position = {
            let mut course = course.lock();
            if course.waitlist.append(participant) {
                tracing::info!(participant = %id, course = %code, "Joined queue");
            }
            course.waitlist.position_of(id).map_or(0, |p| p + 1)
        };
        self.refresh_board(&code, false).await;
        Ok(position)
    }

    /// Leave the queue. False if the participant was not queued.
    pub async fn leave(&self, id: MemberId) -> Result<bool> {
        let (_, code) = self.enrolled(id)?;
        let course = self.course(&code)?;
        let removed = course.lock().waitlist.remove(id).is_some();
        if removed {
            tracing::info!(participant = %id, course = %code, "Left queue");
            self.refresh_board(&code, true).await;
        }
        Ok(removed)
    }

    /// Post the participant's course board and return it.
    pub async fn view(&self, id: MemberId) -> Result<String> {
        let (_, code) = self.enrolled(id)?;
        let course = self.course(&code)?;
        board::publish(&course, self.messenger.as_ref(), false).await
    }

    /// Start (or switch) the tutor's session. The display name comes from the
    /// schedule when someone is on shift, else `fallback_name`.
    pub async fn start_session(
        &self,
        tutor: MemberId,
        fallback_name: &str,
        course_input: &str,
        now: NaiveDateTime,
    ) -> Result<SessionHolder> {
        let code = self
            .registry
            .resolve_course(course_input)
            .ok_or(Rejection::UnknownCourse)?;
        let schedule = self.schedule(&code)?;
        let name = schedule
            .tutor_name(now)
            .unwrap_or_else(|| fallback_name.to_string());

        let holder = SessionHolder::new(tutor, name.clone(), code.clone());
        if let Some(replaced) = self.registry.start_session(holder.clone()) {
            if let Some(request) = replaced.confirmation.request() {
                self.discard(request).await;
            }
            tracing::debug!(%tutor, from = %replaced.course, "Replaced existing session");
        }
        tracing::info!(%tutor, course = %code, name = %name, "Tutoring session started");

        notify_quietly(
            self.messenger.as_ref(),
            Recipient::Announcements,
            &format!("{}\n{}'s tutoring session has started!", schedule.title(), name),
        )
        .await;
        Ok(holder)
    }

    /// End the tutor's session, withdrawing any outstanding ready check.
    pub async fn end_session(&self, tutor: MemberId) -> Result<SessionHolder> {
        let holder = self
            .registry
            .end_session(tutor)
            .ok_or(Rejection::NoSession)?;
        if let Some(request) = holder.confirmation.request() {
            self.discard(request).await;
        }
        let minutes = (chrono::Utc::now() - holder.started_at).num_minutes();
        tracing::info!(%tutor, course = %holder.course, minutes, "Tutoring session ended");
        notify_quietly(
            self.messenger.as_ref(),
            Recipient::Announcements,
            &format!("{}'s tutoring session has ended.", holder.name),
        )
        .await;
        Ok(holder)
    }

    pub async fn find_next(&self, tutor: MemberId) -> Result<NextOutcome> {
        self.matchmaker.find_next(tutor).await
    }

    pub async fn stop(&self, tutor: MemberId) -> Result<()> {
        self.matchmaker.stop(tutor).await
    }

    /// Move an entry using 1-based positions. False if either is out of range.
    pub async fn move_entry(&self, tutor: MemberId, from: usize, to: usize) -> Result<bool> {
        self.edit(tutor, |course| course.move_position(from, to).is_some())
            .await
    }

    pub async fn swap(&self, tutor: MemberId, a: usize, b: usize) -> Result<bool> {
        self.edit(tutor, |course| course.swap_positions(a, b)).await
    }

    /// Remove the entry at a 1-based position, returning their name.
    pub async fn kick(&self, tutor: MemberId, position: usize) -> Result<Option<String>> {
        let mut kicked = None;
        self.edit(tutor, |course| {
            kicked = course.kick_position(position).map(|p| p.name());
            kicked.is_some()
        })
        .await?;
        Ok(kicked)
    }

    pub async fn clear(&self, tutor: MemberId) -> Result<()> {
        self.edit(tutor, |course| {
            course.waitlist.clear();
            true
        })
        .await?;
        Ok(())
    }

    /// Rendered weekday hours for a course.
    pub fn hours(&self, course_input: &str) -> Result<String> {
        let code = self
            .registry
            .resolve_course(course_input)
            .ok_or(Rejection::UnknownCourse)?;
        let schedule = self.schedule(&code)?;
        Ok(format!("{}\n{}", schedule.title(), schedule.render()))
    }

    /// Apply an edit to the tutor's course and republish the board if it
    /// changed anything.
    async fn edit<F>(&self, tutor: MemberId, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut Course) -> bool,
    {
        let code = self
            .registry
            .session(tutor)
            .ok_or(Rejection::NoSession)?
            .course;
        let course = self.course(&code)?;
        let changed = apply(&mut *course.lock());
        if changed {
            tracing::info!(%tutor, course = %code, "Queue edited");
            self.refresh_board(&code, true).await;
        } else {
            tracing::debug!(%tutor, course = %code, "Queue edit out of range, nothing changed");
        }
        Ok(changed)
    }

    fn enrolled(&self, id: MemberId) -> Result<(ParticipantRef, CourseCode)> {
        let participant = self.registry.participant(id).ok_or(Rejection::NotRegistered)?;
        let code = participant
            .lock()
            .course
            .clone()
            .ok_or(Rejection::UnknownCourse)?;
        Ok((participant, code))
    }

    fn course(&self, code: &CourseCode) -> Result<Arc<Mutex<Course>>> {
        self.registry
            .course(code)
            .ok_or_else(|| Rejection::UnknownCourse.into())
    }

    fn schedule(&self, code: &CourseCode) -> Result<&Schedule> {
        self.schedules
            .get(code)
            .ok_or_else(|| Error::NotFound(format!("schedule for {}", code)))
    }

    async fn refresh_board(&self, code: &CourseCode, notify_positions: bool) {
        let Ok(course) = self.course(code) else {
            return;
        };
        if let Err(e) = board::publish(&course, self.messenger.as_ref(), notify_positions).await {
            tracing::warn!(course = %code, "Failed to publish queue board: {}", e);
        }
    }

    async fn discard(&self, handle: &MessageHandle) {
        if let Err(e) = self.messenger.delete_message(handle).await {
            tracing::warn!("Failed to delete ready check: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Participant;
    use crate::services::rooms::RoomDirectory;
    use crate::services::roster::JsonRoster;
    use crate::services::signin::NoSignInCheck;
    use crate::testing::{Reply, ScriptedMessenger};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const TUTOR: MemberId = MemberId(100);

    struct DenyAll;

    #[async_trait]
    impl SignInCheck for DenyAll {
        async fn is_signed_in(&self, _p: &Participant, _c: &CourseCode) -> Result<bool> {
            Ok(false)
        }
    }

    struct Fixture {
        _dir: TempDir,
        desk: FrontDesk,
        messenger: Arc<ScriptedMessenger>,
        rooms: Arc<RoomDirectory>,
        roster: Arc<JsonRoster>,
    }

    fn settings() -> Settings {
        serde_json::from_str(
            r#"{
                "courses": [
                    { "code": "EGR222", "title": "Software Engineering" },
                    { "code": "CSC312", "title": "Algorithms" }
                ],
                "schedule": { "EGR222": { "Monday": [
                    { "tutor": "Grace", "location": "Library", "start": "09:00", "end": "11:00" }
                ] } }
            }"#,
        )
        .unwrap()
    }

    fn fixture_with(sign_in: Arc<dyn SignInCheck>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let settings = settings();
        let registry = Arc::new(Registry::from_settings(&settings));
        let messenger = Arc::new(ScriptedMessenger::new());
        let rooms = Arc::new(RoomDirectory::new());
        let roster = Arc::new(JsonRoster::new(dir.path().join("roster.json")));
        let desk = FrontDesk::new(
            &settings,
            registry,
            messenger.clone(),
            rooms.clone(),
            roster.clone(),
            sign_in,
        );
        Fixture {
            _dir: dir,
            desk,
            messenger,
            rooms,
            roster,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(NoSignInCheck))
    }

    fn form(first: &str, course: &str) -> Registration {
        Registration {
            first_name: first.to_string(),
            last_name: "hOPPER".to_string(),
            student_id: "S1".to_string(),
            course: course.to_string(),
            degree: None,
        }
    }

    fn monday(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    async fn enrolled(f: &Fixture, ids: &[u64]) {
        for id in ids {
            f.desk.register(MemberId(*id), form(&format!("s{}", id), "222")).unwrap();
            f.desk.join(MemberId(*id)).await.unwrap();
        }
    }

    fn queue(f: &Fixture) -> Vec<MemberId> {
        f.desk
            .registry()
            .course(&CourseCode::new("EGR222"))
            .unwrap()
            .lock()
            .waitlist
            .ids()
    }

    #[test]
    fn test_register_normalizes_and_persists() {
        let f = fixture();
        let p = f.desk.register(MemberId(1), form("gRACE", "egr222")).unwrap();

        let snapshot = p.snapshot();
        assert_eq!(snapshot.name(), "Grace Hopper");
        assert_eq!(snapshot.degree, "Trad");
        assert_eq!(snapshot.course, Some(CourseCode::new("EGR222")));
        assert_eq!(f.roster.load().unwrap().len(), 1);
    }

    #[test]
    fn test_register_unknown_course() {
        let f = fixture();
        let err = f.desk.register(MemberId(1), form("Grace", "999")).unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::UnknownCourse)));
        assert!(f.roster.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_is_idempotent_and_posts_board() {
        let f = fixture();
        enrolled(&f, &[1, 2]).await;

        assert_eq!(f.desk.join(MemberId(1)).await.unwrap(), 1);
        assert_eq!(queue(&f), vec![MemberId(1), MemberId(2)]);
        let boards = f.messenger.notices_to(Recipient::Announcements);
        assert!(boards.last().unwrap().contains("#2 S2 Hopper - 0"));
    }

    #[tokio::test]
    async fn test_join_requires_registration_and_sign_in() {
        let f = fixture_with(Arc::new(DenyAll));
        let err = f.desk.join(MemberId(1)).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::NotRegistered)));

        f.desk.register(MemberId(1), form("Grace", "222")).unwrap();
        let err = f.desk.join(MemberId(1)).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::NotSignedIn)));
        assert!(queue(&f).is_empty());
    }

    #[tokio::test]
    async fn test_leave() {
        let f = fixture();
        enrolled(&f, &[1, 2]).await;

        assert!(f.desk.leave(MemberId(1)).await.unwrap());
        assert!(!f.desk.leave(MemberId(1)).await.unwrap());
        assert_eq!(queue(&f), vec![MemberId(2)]);
    }

    #[tokio::test]
    async fn test_start_session_resolves_name_from_schedule() {
        let f = fixture();

        let holder = f.desk.start_session(TUTOR, "tutor42", "222", monday(10)).await.unwrap();
        assert_eq!(holder.name, "Grace");
        assert_eq!(holder.course, CourseCode::new("EGR222"));
        let announced = f.messenger.notices_to(Recipient::Announcements);
        assert!(announced[0].contains("EGR222 Tutoring Hours"));
        assert!(announced[0].contains("Grace's tutoring session has started!"));

        let holder = f.desk.start_session(TUTOR, "tutor42", "312", monday(10)).await.unwrap();
        assert_eq!(holder.name, "tutor42");
        assert_eq!(f.desk.registry().session(TUTOR).unwrap().course, CourseCode::new("CSC312"));
    }

    #[tokio::test]
    async fn test_admin_edits_use_tutor_course() {
        let f = fixture();
        enrolled(&f, &[1, 2, 3]).await;

        let err = f.desk.swap(TUTOR, 1, 2).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::NoSession)));

        f.desk.start_session(TUTOR, "Ada", "EGR222", monday(20)).await.unwrap();
        assert!(!f.desk.swap(TUTOR, 1, 5).await.unwrap());
        assert_eq!(queue(&f), vec![MemberId(1), MemberId(2), MemberId(3)]);

        assert!(f.desk.move_entry(TUTOR, 3, 1).await.unwrap());
        assert_eq!(queue(&f), vec![MemberId(3), MemberId(1), MemberId(2)]);

        assert_eq!(f.desk.kick(TUTOR, 2).await.unwrap(), Some("S1 Hopper".to_string()));
        assert_eq!(f.desk.kick(TUTOR, 0).await.unwrap(), None);

        f.desk.clear(TUTOR).await.unwrap();
        assert!(queue(&f).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_session_cancels_running_cycle() {
        let f = fixture();
        enrolled(&f, &[1]).await;
        f.desk.start_session(TUTOR, "Ada", "EGR222", monday(20)).await.unwrap();
        f.rooms.open_room("ada-desk", Some(TUTOR), true);
        f.messenger.script(MemberId(1), &[Reply::Silent]);

        let running = tokio::spawn({
            let desk = f.desk.clone();
            async move { desk.find_next(TUTOR).await }
        });
        f.messenger.wait_for_prompt().await;

        f.desk.end_session(TUTOR).await.unwrap();

        assert_eq!(running.await.unwrap().unwrap(), NextOutcome::Cancelled);
        assert_eq!(f.messenger.open_prompts(), 0);
        assert!(f.desk.registry().session(TUTOR).is_none());
    }

    #[test]
    fn test_hours() {
        let f = fixture();
        let text = f.desk.hours("egr222").unwrap();
        assert!(text.starts_with("🕘 EGR222 Tutoring Hours"));
        assert!(text.contains("[Library] - *Grace*"));
        assert!(f.desk.hours("312").unwrap().ends_with("*tutoring hours not available.*"));
    }
}

//! Connection handoff: bringing a confirmed participant to the tutor's room
//! and sending the previously served participant back where they came from.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::board;
use crate::core::{Course, MemberId, ParticipantRef};
use crate::error::{Error, Result};
use crate::services::messaging::{notify_quietly, Messenger, Recipient};
use crate::services::rooms::{InviteToken, LiveRooms, RoomId};

/// How a participant was brought to the tutor.
#[derive(Debug, Clone, PartialEq)]
pub enum Handoff {
    /// Relocated directly from the room they were in.
    Moved { from: RoomId },
    /// Not in any room; sent a single-use invite and left to accept it.
    Invited { token: InviteToken },
}

#[derive(Clone)]
pub struct ConnectionHandoff {
    rooms: Arc<dyn LiveRooms>,
    messenger: Arc<dyn Messenger>,
}

impl ConnectionHandoff {
    pub fn new(rooms: Arc<dyn LiveRooms>, messenger: Arc<dyn Messenger>) -> Self {
        Self { rooms, messenger }
    }

    /// Place `participant` into the tutor's `room`.
    pub async fn connect(
        &self,
        tutor: MemberId,
        room: &RoomId,
        participant: &ParticipantRef,
        course: &Mutex<Course>,
    ) -> Result<Handoff> {
        let id = participant.id();
        let name = participant.name();

        match self.rooms.current_room(id).await? {
            Some(current) => {
                if &current != room {
                    participant.lock().previous_room = Some(current.clone());
                }
                self.rooms.grant_temporary_access(room, id).await?;
                self.rooms.move_into(id, room).await?;
                tracing::info!(participant = %id, from = %current, to = %room, "Moved participant to tutor");

                if let Err(e) = board::publish(course, self.messenger.as_ref(), true).await {
                    tracing::warn!("Failed to publish queue board: {}", e);
                }
                Ok(Handoff::Moved { from: current })
            }
            None => {
                let token = self.rooms.create_invite(room).await?;
                self.rooms.grant_temporary_access(room, id).await?;
                self.messenger
                    .notify(
                        Recipient::Member(id),
                        &format!("your tutor is ready for you! use /accept {} to join.", token),
                    )
                    .await?;
                notify_quietly(
                    self.messenger.as_ref(),
                    Recipient::Member(tutor),
                    &format!("waiting for {} to accept the invite.", name),
                )
                .await;
                tracing::info!(participant = %id, room = %room, "Invited participant to tutor room");
                Ok(Handoff::Invited { token })
            }
        }
    }

    /// Undo a previous `connect` once the participant is rotated out.
    ///
    /// Someone still in the tutor's room goes back to their recorded room,
    /// or is disconnected if it no longer exists. Someone who never joined
    /// only loses the access grant.
    pub async fn release_previous(&self, room: &RoomId, participant: &ParticipantRef) -> Result<()> {
        let id = participant.id();
        self.rooms.revoke_access(room, id).await?;

        let previous = participant.lock().previous_room.take();
        let current = self.rooms.current_room(id).await?;
        if current.as_ref() != Some(room) {
            return Ok(());
        }

        match previous {
            Some(previous) => match self.rooms.move_into(id, &previous).await {
                Ok(()) => {
                    tracing::debug!(participant = %id, to = %previous, "Returned participant to previous room");
                    Ok(())
                }
                Err(Error::RoomNotFound(_)) => {
                    tracing::debug!(participant = %id, "Previous room is gone, disconnecting");
                    self.rooms.disconnect(id).await
                }
                Err(e) => Err(e),
            },
            None => self.rooms.disconnect(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CourseCode, Participant, ParticipantRecord};
    use crate::services::rooms::RoomDirectory;
    use crate::testing::ScriptedMessenger;

    const TUTOR: MemberId = MemberId(100);

    struct Fixture {
        rooms: Arc<RoomDirectory>,
        messenger: Arc<ScriptedMessenger>,
        handoff: ConnectionHandoff,
        room: RoomId,
        course: Mutex<Course>,
        student: ParticipantRef,
    }

    fn fixture() -> Fixture {
        let rooms = Arc::new(RoomDirectory::new());
        let messenger = Arc::new(ScriptedMessenger::new());
        let handoff = ConnectionHandoff::new(rooms.clone(), messenger.clone());
        let room = rooms.open_room("tutor-desk", Some(TUTOR), true);
        let student = ParticipantRef::new(Participant::from_record(ParticipantRecord {
            id: MemberId(1),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            student_id: String::new(),
            course: None,
            degree: "Trad".to_string(),
        }));
        let mut course = Course::new(CourseCode::new("EGR222"), "");
        course.waitlist.append(student.clone());

        Fixture {
            rooms,
            messenger,
            handoff,
            room,
            course: Mutex::new(course),
            student,
        }
    }

    #[tokio::test]
    async fn test_connect_moves_present_participant() {
        let f = fixture();
        let lounge = f.rooms.open_room("lounge", None, false);
        f.rooms.enter(MemberId(1), &lounge).unwrap();

        let outcome = f
            .handoff
            .connect(TUTOR, &f.room, &f.student, &f.course)
            .await
            .unwrap();

        assert_eq!(outcome, Handoff::Moved { from: lounge.clone() });
        assert_eq!(f.rooms.current_room(MemberId(1)).await.unwrap(), Some(f.room.clone()));
        assert_eq!(f.student.snapshot().previous_room, Some(lounge));
        assert!(f.rooms.has_access(&f.room, MemberId(1)));
        assert_eq!(f.messenger.notices_to(Recipient::Announcements).len(), 1);
    }

    #[tokio::test]
    async fn test_connect_invites_absent_participant() {
        let f = fixture();

        let outcome = f
            .handoff
            .connect(TUTOR, &f.room, &f.student, &f.course)
            .await
            .unwrap();

        let token = match outcome {
            Handoff::Invited { token } => token,
            other => panic!("unexpected {:?}", other),
        };
        assert!(f.rooms.has_access(&f.room, MemberId(1)));
        assert_eq!(f.rooms.current_room(MemberId(1)).await.unwrap(), None);
        assert!(f.messenger.notices_to(Recipient::Member(MemberId(1)))[0].contains(&token.0));
        assert!(f.messenger.notices_to(Recipient::Member(TUTOR))[0].contains("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_release_returns_to_previous_room() {
        let f = fixture();
        let lounge = f.rooms.open_room("lounge", None, false);
        f.rooms.enter(MemberId(1), &lounge).unwrap();
        f.handoff.connect(TUTOR, &f.room, &f.student, &f.course).await.unwrap();

        f.handoff.release_previous(&f.room, &f.student).await.unwrap();

        assert_eq!(f.rooms.current_room(MemberId(1)).await.unwrap(), Some(lounge));
        assert!(!f.rooms.has_access(&f.room, MemberId(1)));
        assert_eq!(f.student.snapshot().previous_room, None);
    }

    #[tokio::test]
    async fn test_release_disconnects_when_previous_room_gone() {
        let f = fixture();
        let lounge = f.rooms.open_room("lounge", None, false);
        f.rooms.enter(MemberId(1), &lounge).unwrap();
        f.handoff.connect(TUTOR, &f.room, &f.student, &f.course).await.unwrap();
        f.rooms.close_room(&lounge);

        f.handoff.release_previous(&f.room, &f.student).await.unwrap();

        assert_eq!(f.rooms.current_room(MemberId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_release_is_noop_when_invite_never_accepted() {
        let f = fixture();
        let elsewhere = f.rooms.open_room("elsewhere", None, false);
        f.handoff.connect(TUTOR, &f.room, &f.student, &f.course).await.unwrap();
        f.rooms.enter(MemberId(1), &elsewhere).unwrap();

        f.handoff.release_previous(&f.room, &f.student).await.unwrap();

        assert_eq!(f.rooms.current_room(MemberId(1)).await.unwrap(), Some(elsewhere));
        assert!(!f.rooms.has_access(&f.room, MemberId(1)));
    }
}

//! The find-next protocol: walk a course waitlist in cyclic order, ask each
//! candidate whether they are ready, and hand the first one who is over to
//! the tutor.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::handoff::{ConnectionHandoff, Handoff};
use crate::core::{Course, CourseCode, CycleId, MemberId, ParticipantRef, Registry};
use crate::error::{Rejection, Result};
use crate::services::messaging::{notify_quietly, Choice, MessageHandle, Messenger, Recipient};
use crate::services::rooms::{LiveRooms, RoomId};
use crate::services::signin::SignInCheck;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15);

/// How a find-next run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    /// A candidate confirmed and is at the head of the waitlist, marked served.
    Connected {
        participant: MemberId,
        handoff: Handoff,
    },
    /// The tutor stopped the run.
    Cancelled,
    /// Everyone left the queue before anyone confirmed.
    QueueEmptied,
}

/// Holds a tutor's confirmation gate for one cycle and releases it however
/// the cycle ends, including when the future is dropped.
struct CycleClaim<'a> {
    registry: &'a Registry,
    tutor: MemberId,
    cycle: CycleId,
}

impl Drop for CycleClaim<'_> {
    fn drop(&mut self) {
        self.registry.finish_cycle(self.tutor, self.cycle);
    }
}

#[derive(Clone)]
pub struct Matchmaker {
    registry: Arc<Registry>,
    messenger: Arc<dyn Messenger>,
    rooms: Arc<dyn LiveRooms>,
    sign_in: Arc<dyn SignInCheck>,
    handoff: ConnectionHandoff,
    window: Duration,
}

impl Matchmaker {
    pub fn new(
        registry: Arc<Registry>,
        messenger: Arc<dyn Messenger>,
        rooms: Arc<dyn LiveRooms>,
        sign_in: Arc<dyn SignInCheck>,
    ) -> Self {
        let handoff = ConnectionHandoff::new(rooms.clone(), messenger.clone());
        Self {
            registry,
            messenger,
            rooms,
            sign_in,
            handoff,
            window: DEFAULT_WINDOW,
        }
    }

    /// Override the per-candidate response window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Find the next ready participant for `tutor`.
    ///
    /// Preconditions are checked before anything is mutated or sent. Candidate
    /// timeouts and declines are reported to the tutor and never end the run.
    pub async fn find_next(&self, tutor: MemberId) -> Result<NextOutcome> {
        let holder = self.registry.session(tutor).ok_or(Rejection::NoSession)?;
        if !holder.confirmation.is_idle() {
            return Err(Rejection::AlreadyRunning.into());
        }
        let course = self
            .registry
            .course(&holder.course)
            .ok_or(Rejection::UnknownCourse)?;
        let empty = course.lock().waitlist.is_empty();
        if empty {
            return Err(Rejection::NothingToServe.into());
        }
        let room = self
            .rooms
            .current_room(tutor)
            .await?
            .ok_or(Rejection::NoRoom)?;

        let cycle = self.registry.begin_cycle(tutor)?;
        let _claim = CycleClaim {
            registry: &self.registry,
            tutor,
            cycle,
        };
        tracing::info!(%tutor, course = %holder.course, cycle, room = %room, "Starting find-next cycle");

        let cx = CycleContext {
            tutor,
            tutor_name: &holder.name,
            cycle,
            room: &room,
            code: &holder.course,
            course: &course,
        };
        let outcome = self.run_cycle(&cx).await;
        match &outcome {
            Ok(result) => tracing::info!(%tutor, cycle, ?result, "Find-next cycle finished"),
            Err(e) => tracing::warn!(%tutor, cycle, "Find-next cycle failed: {}", e),
        }
        outcome
    }

    async fn run_cycle(&self, cx: &CycleContext<'_>) -> Result<NextOutcome> {
        let rotated = cx.course.lock().waitlist.rotate_served_to_back();
        if let Some(previous) = rotated {
            tracing::debug!(participant = %previous.id(), "Rotated served participant to the back");
            if let Err(e) = self.handoff.release_previous(cx.room, &previous).await {
                tracing::warn!(participant = %previous.id(), "Failed to release participant: {}", e);
                self.tell_tutor(
                    cx,
                    &format!("could not return {} to their previous room: {}", previous.name(), e),
                )
                .await;
            }
        }

        let prompt = format!(
            "{} is ready to help you with {}. are you ready?",
            cx.tutor_name, cx.code
        );
        let mut index = 0usize;

        loop {
            if !self.registry.cycle_active(cx.tutor, cx.cycle) {
                return Ok(NextOutcome::Cancelled);
            }

            let candidate = {
                let course = cx.course.lock();
                let size = course.waitlist.len();
                if size == 0 {
                    None
                } else {
                    index %= size;
                    course.waitlist.get(index).cloned()
                }
            };
            let Some(candidate) = candidate else {
                self.tell_tutor(cx, "the queue is now empty.").await;
                return Ok(NextOutcome::QueueEmptied);
            };
            let name = candidate.name();

            let request = match self
                .messenger
                .send_confirmation(candidate.id(), &prompt, self.window)
                .await
            {
                Ok(request) => request,
                Err(e) => {
                    self.tell_tutor(cx, &format!("could not reach {}: {}", name, e)).await;
                    return Err(e);
                }
            };
            let deadline = Instant::now() + self.window;
            tracing::debug!(candidate = %candidate.id(), cycle = cx.cycle, "Sent ready check");

            if !self.registry.await_response(
                cx.tutor,
                cx.cycle,
                candidate.id(),
                request.handle.clone(),
                deadline,
            ) {
                self.discard(&request.handle).await;
                return Ok(NextOutcome::Cancelled);
            }

            let answer = tokio::time::timeout_at(deadline, request.response).await;
            self.discard(&request.handle).await;

            if !self.registry.resume_search(cx.tutor, cx.cycle) {
                return Ok(NextOutcome::Cancelled);
            }

            match answer {
                Ok(Ok(Choice::Ready)) => {
                    if promote(cx.course, &candidate) {
                        tracing::info!(candidate = %candidate.id(), cycle = cx.cycle, "Candidate confirmed");
                        return self.connect(cx, &candidate).await;
                    }
                    self.tell_tutor(cx, &format!("{} left the queue.", name)).await;
                }
                Ok(Ok(Choice::NotReady)) => {
                    tracing::debug!(candidate = %candidate.id(), "Candidate skipped");
                    self.tell_tutor(cx, &format!("{} skipped.", name)).await;
                }
                Ok(Err(_)) | Err(_) => {
                    tracing::debug!(candidate = %candidate.id(), "Candidate did not respond");
                    self.tell_tutor(cx, &format!("{} did not respond.", name)).await;
                }
            }
            index = next_index(cx.course, &candidate, index);
        }
    }

    async fn connect(&self, cx: &CycleContext<'_>, candidate: &ParticipantRef) -> Result<NextOutcome> {
        let name = candidate.name();
        let handoff = match self
            .handoff
            .connect(cx.tutor, cx.room, candidate, cx.course)
            .await
        {
            Ok(handoff) => handoff,
            Err(e) => {
                self.tell_tutor(cx, &format!("could not connect {}: {}", name, e)).await;
                return Err(e);
            }
        };

        let snapshot = candidate.snapshot();
        match self.sign_in.is_signed_in(&snapshot, cx.code).await {
            Ok(true) => {}
            Ok(false) => {
                self.tell_tutor(cx, &format!("{} has not submitted a sign-in sheet.", name))
                    .await;
            }
            Err(e) => tracing::warn!(participant = %candidate.id(), "Sign-in check failed: {}", e),
        }

        Ok(NextOutcome::Connected {
            participant: candidate.id(),
            handoff,
        })
    }

    /// Cancel the tutor's running cycle and withdraw its outstanding prompt.
    pub async fn stop(&self, tutor: MemberId) -> Result<()> {
        let withdrawn = self.registry.cancel_cycle(tutor)?;
        if let Some((candidate, deadline)) = withdrawn.awaiting() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tracing::debug!(%tutor, %candidate, remaining_ms = remaining.as_millis() as u64, "Withdrawing ready check");
        }
        if let Some(handle) = withdrawn.request() {
            self.discard(handle).await;
        }
        tracing::info!(%tutor, cycle = ?withdrawn.cycle(), "Find-next cycle cancelled");
        Ok(())
    }

    async fn discard(&self, handle: &MessageHandle) {
        if let Err(e) = self.messenger.delete_message(handle).await {
            tracing::warn!("Failed to delete ready check: {}", e);
        }
    }

    async fn tell_tutor(&self, cx: &CycleContext<'_>, text: &str) {
        notify_quietly(self.messenger.as_ref(), Recipient::Member(cx.tutor), text).await;
    }
}

struct CycleContext<'a> {
    tutor: MemberId,
    tutor_name: &'a str,
    cycle: CycleId,
    room: &'a RoomId,
    code: &'a CourseCode,
    course: &'a Mutex<Course>,
}

/// Cursor after `candidate` was asked, against the waitlist as it is now.
/// If they left, whoever slid into their slot is next.
fn next_index(course: &Mutex<Course>, candidate: &ParticipantRef, index: usize) -> usize {
    let course = course.lock();
    let size = course.waitlist.len();
    if size == 0 {
        return 0;
    }
    match course.waitlist.position_of(candidate.id()) {
        Some(position) => (position + 1) % size,
        None => index % size,
    }
}

/// Move a confirmed candidate to the head and mark them served. False if
/// they left the queue while the prompt was open.
fn promote(course: &Mutex<Course>, candidate: &ParticipantRef) -> bool {
    let mut course = course.lock();
    let Some(position) = course.waitlist.position_of(candidate.id()) else {
        return false;
    };
    if course.waitlist.move_entry(position, 0).is_none() {
        return false;
    }
    candidate.lock().being_served = true;
    true
}

//! Core module - courses, waitlists, participants and session holders.
//!
//! This module owns the in-memory queue state:
//! - Ordered, deduplicated waitlists per course
//! - Participant records shared between the registry and waitlists
//! - Session holders and their confirmation gate

pub mod course;
pub mod participant;
pub mod registry;
pub mod session;
pub mod waitlist;

pub use course::{Course, CourseCode};
pub use participant::{MemberId, Participant, ParticipantRecord, ParticipantRef};
pub use registry::Registry;
pub use session::{Confirmation, CycleId, SessionHolder};
pub use waitlist::Waitlist;

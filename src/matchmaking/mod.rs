//! Tutor-driven matchmaking: the find-next ready-check cycle and the room
//! handoff that follows a confirmation.

pub mod handoff;
pub mod protocol;

pub use crate::error::Rejection;
pub use handoff::{ConnectionHandoff, Handoff};
pub use protocol::{Matchmaker, NextOutcome, DEFAULT_WINDOW};

//! Collaborators the queue engine talks to.
//!
//! Each is a narrow trait so transports and backends can be swapped; the
//! concrete implementations here are the ones the daemon runs with.

pub mod messaging;
pub mod rooms;
pub mod roster;
pub mod schedule;
pub mod signin;

pub use messaging::{Choice, ConfirmationRequest, MessageHandle, Messenger, Recipient};
pub use rooms::{InviteToken, LiveRooms, RoomDirectory, RoomId};
pub use roster::{JsonRoster, RosterStore};
pub use schedule::Schedule;
pub use signin::{NoSignInCheck, SignInCheck};

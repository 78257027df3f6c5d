//! Error types for TutorQueue.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Room error: {0}")]
    Room(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("{0}")]
    Rejected(#[from] Rejection),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl From<teloxide::RequestError> for Error {
    fn from(e: teloxide::RequestError) -> Self {
        Error::Telegram(e.to_string())
    }
}

/// A request refused before any state was touched.
///
/// The display text is what the requester sees.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("still waiting on responses from the previous request.")]
    AlreadyRunning,

    #[error("there is nobody in the queue to serve.")]
    NothingToServe,

    #[error("join a room first so students can be brought to you.")]
    NoRoom,

    #[error("start a tutoring session first.")]
    NoSession,

    #[error("there is no request to cancel.")]
    NothingToCancel,

    #[error("invalid course code.")]
    UnknownCourse,

    #[error("account not found. use /register to set one up.")]
    NotRegistered,

    #[error("please submit your sign-in sheet before joining the queue.")]
    NotSignedIn,
}

impl Rejection {
    /// Stable reason code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::AlreadyRunning => "already_running",
            Rejection::NothingToServe => "nothing_to_serve",
            Rejection::NoRoom => "no_room",
            Rejection::NoSession => "no_session",
            Rejection::NothingToCancel => "nothing_to_cancel",
            Rejection::UnknownCourse => "unknown_course",
            Rejection::NotRegistered => "not_registered",
            Rejection::NotSignedIn => "not_signed_in",
        }
    }
}

//! TutorQueue library root.

pub mod board;
pub mod cli;
pub mod config;
pub mod core;
pub mod desk;
pub mod error;
pub mod logging;
pub mod matchmaking;
pub mod services;
pub mod telegram;

#[cfg(test)]
pub mod testing;

pub use crate::cli::Commands;
pub use crate::config::{load_settings, Settings};
pub use crate::core::{Course, CourseCode, MemberId, Participant, Registry, SessionHolder, Waitlist};
pub use crate::desk::FrontDesk;
pub use crate::error::{Error, Rejection, Result};
pub use crate::matchmaking::{Matchmaker, NextOutcome};
pub use crate::telegram::run_telegram_daemon;

//! Sign-in verification before a participant may queue.

use async_trait::async_trait;

use crate::core::{CourseCode, Participant};
use crate::error::Result;

/// Confirms a participant completed the out-of-band sign-in step.
#[async_trait]
pub trait SignInCheck: Send + Sync {
    async fn is_signed_in(&self, participant: &Participant, course: &CourseCode) -> Result<bool>;
}

/// Accepts everyone. Used when no sign-in sheet is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignInCheck;

#[async_trait]
impl SignInCheck for NoSignInCheck {
    async fn is_signed_in(&self, _participant: &Participant, _course: &CourseCode) -> Result<bool> {
        Ok(true)
    }
}

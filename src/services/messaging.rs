//! Messaging collaborator contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::core::MemberId;
use crate::error::Result;

/// Transport handle of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    pub chat: i64,
    pub message: i64,
}

/// Answer to a ready-check prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Ready,
    NotReady,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::Ready => "ready",
            Choice::NotReady => "skip",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ready" => Some(Choice::Ready),
            "skip" => Some(Choice::NotReady),
            _ => None,
        }
    }
}

/// An outstanding ready-check prompt.
///
/// `response` resolves with the recipient's choice. If the prompt is deleted
/// before an answer arrives the sender is dropped and `response` errors.
#[derive(Debug)]
pub struct ConfirmationRequest {
    pub handle: MessageHandle,
    pub response: oneshot::Receiver<Choice>,
}

/// Where a notification goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Member(MemberId),
    Announcements,
}

/// Message delivery used by the queue engine.
///
/// Implementations must attribute a response only to the prompt's recipient
/// and only for the offered choices, and must treat deleting an already
/// deleted message as a no-op.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a two-choice ready-check to `recipient`.
    async fn send_confirmation(
        &self,
        recipient: MemberId,
        prompt: &str,
        window: Duration,
    ) -> Result<ConfirmationRequest>;

    async fn delete_message(&self, handle: &MessageHandle) -> Result<()>;

    async fn notify(&self, recipient: Recipient, text: &str) -> Result<Option<MessageHandle>>;
}

/// Send an informational notice, logging instead of failing.
pub async fn notify_quietly(messenger: &dyn Messenger, recipient: Recipient, text: &str) {
    if let Err(e) = messenger.notify(recipient, text).await {
        tracing::warn!(?recipient, "Failed to deliver notification: {}", e);
    }
}

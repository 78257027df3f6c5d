//! In-process doubles for the messaging collaborator.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};

use crate::core::MemberId;
use crate::error::{Error, Result};
use crate::services::messaging::{Choice, ConfirmationRequest, MessageHandle, Messenger, Recipient};

/// How a scripted recipient answers their next prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ready,
    NotReady,
    /// Never answers; the prompt stays open until deleted or timed out.
    Silent,
    /// Sending the prompt fails.
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Prompt { to: MemberId, handle: MessageHandle },
    Deleted(MessageHandle),
    Notice { to: Recipient, text: String },
}

#[derive(Default)]
pub struct ScriptedMessenger {
    replies: Mutex<HashMap<MemberId, VecDeque<Reply>>>,
    open: Mutex<HashMap<MessageHandle, oneshot::Sender<Choice>>>,
    events: Mutex<Vec<Event>>,
    next_message: AtomicI64,
    prompted: Notify,
}

impl ScriptedMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for a recipient, consumed one per prompt.
    pub fn script(&self, who: MemberId, replies: &[Reply]) {
        self.replies
            .lock()
            .entry(who)
            .or_default()
            .extend(replies.iter().copied());
    }

    /// Wait until a prompt has been sent since the last call.
    pub async fn wait_for_prompt(&self) {
        self.prompted.notified().await;
    }

    /// Wait until at least `count` prompts have gone out in total.
    pub async fn wait_for_prompts(&self, count: usize) {
        while self.prompts().len() < count {
            self.wait_for_prompt().await;
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn prompts(&self) -> Vec<MemberId> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Prompt { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    pub fn notices_to(&self, who: Recipient) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Notice { to, text } if *to == who => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageHandle> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Deleted(h) => Some(h.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn open_prompts(&self) -> usize {
        self.open.lock().len()
    }

    fn handle(&self, chat: i64) -> MessageHandle {
        MessageHandle {
            chat,
            message: self.next_message.fetch_add(1, Ordering::Relaxed) + 1,
        }
    }
}

#[async_trait]
impl Messenger for ScriptedMessenger {
    async fn send_confirmation(
        &self,
        recipient: MemberId,
        _prompt: &str,
        _window: Duration,
    ) -> Result<ConfirmationRequest> {
        let reply = self
            .replies
            .lock()
            .get_mut(&recipient)
            .and_then(|q| q.pop_front())
            .unwrap_or(Reply::Silent);
        if reply == Reply::Unreachable {
            return Err(Error::Messaging(format!("cannot message {}", recipient)));
        }

        let handle = self.handle(recipient.0 as i64);
        let (tx, rx) = oneshot::channel();
        match reply {
            Reply::Ready => {
                let _ = tx.send(Choice::Ready);
            }
            Reply::NotReady => {
                let _ = tx.send(Choice::NotReady);
            }
            _ => {
                self.open.lock().insert(handle.clone(), tx);
            }
        }
        self.events.lock().push(Event::Prompt {
            to: recipient,
            handle: handle.clone(),
        });
        self.prompted.notify_one();
        Ok(ConfirmationRequest {
            handle,
            response: rx,
        })
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<()> {
        self.open.lock().remove(handle);
        self.events.lock().push(Event::Deleted(handle.clone()));
        Ok(())
    }

    async fn notify(&self, recipient: Recipient, text: &str) -> Result<Option<MessageHandle>> {
        self.events.lock().push(Event::Notice {
            to: recipient,
            text: text.to_string(),
        });
        Ok(Some(self.handle(0)))
    }
}

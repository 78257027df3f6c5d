//! `Messenger` over the Telegram Bot API.
//!
//! Ready checks are sent as direct messages with a two-button inline
//! keyboard. Button presses arrive as callback queries and are routed back
//! to the waiting prompt through `resolve`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use tokio::sync::oneshot;

use crate::core::MemberId;
use crate::error::Result;
use crate::services::messaging::{Choice, ConfirmationRequest, MessageHandle, Messenger, Recipient};

const CALLBACK_PREFIX: &str = "confirm";

struct PendingPrompt {
    recipient: MemberId,
    handle: MessageHandle,
    respond: oneshot::Sender<Choice>,
}

/// How a button press was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted,
    /// Pressed by someone other than the prompt's recipient.
    NotYours,
    /// The prompt already timed out, was answered or was withdrawn.
    Expired,
}

pub struct TelegramMessenger {
    bot: Bot,
    announcements: Option<ChatId>,
    pending: Mutex<HashMap<String, PendingPrompt>>,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, announcements: Option<i64>) -> Self {
        Self {
            bot,
            announcements: announcements.map(ChatId),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Route a button press to its prompt. Only the recipient can answer.
    pub fn resolve(&self, key: &str, from: MemberId, choice: Choice) -> Resolution {
        let mut pending = self.pending.lock();
        match pending.get(key) {
            None => Resolution::Expired,
            Some(prompt) if prompt.recipient != from => Resolution::NotYours,
            Some(_) => match pending.remove(key) {
                Some(prompt) => {
                    if prompt.respond.send(choice).is_ok() {
                        Resolution::Accepted
                    } else {
                        Resolution::Expired
                    }
                }
                None => Resolution::Expired,
            },
        }
    }

    fn chat_for(&self, recipient: Recipient) -> Option<ChatId> {
        match recipient {
            // Private chats share the user's id.
            Recipient::Member(id) => Some(ChatId(id.0 as i64)),
            Recipient::Announcements => self.announcements,
        }
    }
}

/// Build the callback payload for a prompt button.
pub fn callback_data(key: &str, choice: Choice) -> String {
    format!("{}:{}:{}", CALLBACK_PREFIX, key, choice.as_str())
}

/// Split a callback payload into prompt key and choice.
pub fn parse_callback(data: &str) -> Option<(&str, Choice)> {
    let mut parts = data.splitn(3, ':');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }
    let key = parts.next()?;
    let choice = Choice::parse(parts.next()?)?;
    Some((key, choice))
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_confirmation(
        &self,
        recipient: MemberId,
        prompt: &str,
        window: Duration,
    ) -> Result<ConfirmationRequest> {
        let key = ulid::Ulid::new().to_string();
        let keyboard = InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::callback("✅ ready", callback_data(&key, Choice::Ready)),
            InlineKeyboardButton::callback("⏭ not ready", callback_data(&key, Choice::NotReady)),
        ]]);

        let chat = ChatId(recipient.0 as i64);
        let text = format!("{}\n(respond within {}s)", prompt, window.as_secs());
        let sent = self.bot.send_message(chat, text).reply_markup(keyboard).await?;

        let handle = MessageHandle {
            chat: chat.0,
            message: i64::from(sent.id.0),
        };
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            key,
            PendingPrompt {
                recipient,
                handle: handle.clone(),
                respond: tx,
            },
        );
        tracing::debug!(%recipient, message = handle.message, "Sent ready check");

        Ok(ConfirmationRequest {
            handle,
            response: rx,
        })
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<()> {
        self.pending.lock().retain(|_, p| &p.handle != handle);

        let Ok(message) = i32::try_from(handle.message) else {
            return Ok(());
        };
        if let Err(e) = self
            .bot
            .delete_message(ChatId(handle.chat), MessageId(message))
            .await
        {
            tracing::debug!("Message {} already gone: {}", handle.message, e);
        }
        Ok(())
    }

    async fn notify(&self, recipient: Recipient, text: &str) -> Result<Option<MessageHandle>> {
        let Some(chat) = self.chat_for(recipient) else {
            tracing::debug!("No announcement chat configured, dropping notice");
            return Ok(None);
        };
        let sent = self.bot.send_message(chat, text).await?;
        Ok(Some(MessageHandle {
            chat: chat.0,
            message: i64::from(sent.id.0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messenger_with_prompt(key: &str, recipient: MemberId) -> (TelegramMessenger, oneshot::Receiver<Choice>) {
        let messenger = TelegramMessenger::new(Bot::new("0:test"), None);
        let (tx, rx) = oneshot::channel();
        messenger.pending.lock().insert(
            key.to_string(),
            PendingPrompt {
                recipient,
                handle: MessageHandle { chat: 1, message: 1 },
                respond: tx,
            },
        );
        (messenger, rx)
    }

    #[test]
    fn test_callback_round_trip() {
        let data = callback_data("01ABC", Choice::NotReady);
        assert_eq!(parse_callback(&data), Some(("01ABC", Choice::NotReady)));
        assert_eq!(parse_callback("confirm:01ABC:maybe"), None);
        assert_eq!(parse_callback("other:01ABC:ready"), None);
    }

    #[test]
    fn test_only_recipient_can_answer() {
        let (messenger, mut rx) = messenger_with_prompt("k1", MemberId(7));

        assert_eq!(messenger.resolve("k1", MemberId(8), Choice::Ready), Resolution::NotYours);
        assert!(rx.try_recv().is_err());

        assert_eq!(messenger.resolve("k1", MemberId(7), Choice::Ready), Resolution::Accepted);
        assert_eq!(rx.try_recv().unwrap(), Choice::Ready);
        assert_eq!(messenger.resolve("k1", MemberId(7), Choice::Ready), Resolution::Expired);
    }

    #[test]
    fn test_answer_after_receiver_dropped_is_expired() {
        let (messenger, rx) = messenger_with_prompt("k2", MemberId(7));
        drop(rx);
        assert_eq!(messenger.resolve("k2", MemberId(7), Choice::NotReady), Resolution::Expired);
        assert!(messenger.pending.lock().is_empty());
    }

    #[tokio::test]
    async fn test_answer_reaches_waiting_prompt() {
        let (messenger, rx) = messenger_with_prompt("k3", MemberId(7));
        let waiting = tokio::spawn(rx);

        assert_eq!(messenger.resolve("k3", MemberId(7), Choice::NotReady), Resolution::Accepted);
        assert_eq!(waiting.await.unwrap(), Ok(Choice::NotReady));
        assert!(messenger.pending.lock().is_empty());
    }
}

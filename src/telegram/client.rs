//! Telegram bot client: dispatches commands to the front desk and button
//! presses to the pending ready checks.

use chrono::Local;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::User;
use teloxide::RequestError;

use crate::config::Settings;
use crate::core::{MemberId, Registry};
use crate::desk::{FrontDesk, Registration};
use crate::error::Error;
use crate::matchmaking::{Handoff, NextOutcome};
use crate::services::rooms::{RoomDirectory, RoomId};
use crate::services::roster::{JsonRoster, RosterStore};
use crate::services::signin::NoSignInCheck;

use super::commands::{menu, Command, HELP_TEXT};
use super::messenger::{parse_callback, Resolution, TelegramMessenger};

/// Shared state handed to every update handler.
#[derive(Clone)]
struct App {
    desk: FrontDesk,
    rooms: Arc<RoomDirectory>,
    messenger: Arc<TelegramMessenger>,
    settings: Arc<Settings>,
}

/// Run the telegram bot until interrupted.
pub async fn run_telegram_daemon(settings: Settings) -> Result<(), Error> {
    tracing::info!("Starting Telegram bot...");

    let token = settings
        .telegram
        .bot_token
        .clone()
        .ok_or_else(|| Error::Telegram("No bot token configured".to_string()))?;
    if settings.telegram.announcement_chat_id.is_none() {
        tracing::warn!("No announcement chat configured; queue boards will not be posted");
    }

    let bot = Bot::new(token);

    if let Err(e) = bot.set_my_commands(menu()).await {
        tracing::warn!("Failed to set commands: {}", e);
    }
    tracing::info!("Telegram bot commands set");

    let registry = Arc::new(Registry::from_settings(&settings));
    let roster = Arc::new(JsonRoster::new(settings.roster.resolve_path()?));
    registry.seed(roster.load()?);

    let messenger = Arc::new(TelegramMessenger::new(
        bot.clone(),
        settings.telegram.announcement_chat_id,
    ));
    let rooms = Arc::new(RoomDirectory::new());
    let desk = FrontDesk::new(
        &settings,
        registry.clone(),
        messenger.clone(),
        rooms.clone(),
        roster,
        Arc::new(NoSignInCheck),
    );
    let app = App {
        desk,
        rooms,
        messenger,
        settings: Arc::new(settings),
    };

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    registry.shutdown();
    tracing::info!("Telegram bot stopped");
    Ok(())
}

/// Handle incoming messages.
async fn handle_message(bot: Bot, msg: Message, app: App) -> Result<(), RequestError> {
    let Some(command) = msg.text().and_then(Command::parse) else {
        return Ok(());
    };
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let sender = MemberId(user.id.0);

    if command.tutor_only() && !app.settings.is_tutor(sender.0) {
        bot.send_message(chat_id, "Only tutors can use this command.").await?;
        return Ok(());
    }
    tracing::debug!(%sender, ?command, "Handling command");

    match command {
        Command::Help => {
            bot.send_message(chat_id, HELP_TEXT).await?;
        }
        Command::Register {
            first_name,
            last_name,
            student_id,
            course,
            degree,
        } => {
            let form = Registration {
                first_name,
                last_name,
                student_id,
                course,
                degree,
            };
            let reply = match app.desk.register(sender, form) {
                Ok(p) => {
                    let p = p.snapshot();
                    format!(
                        "registered {} for {}.",
                        p.name(),
                        p.course.map(|c| c.to_string()).unwrap_or_default()
                    )
                }
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Join => {
            let reply = match app.desk.join(sender).await {
                Ok(position) => format!("you are #{} in the queue.", position),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Leave => {
            let reply = match app.desk.leave(sender).await {
                Ok(true) => "you left the queue.".to_string(),
                Ok(false) => "you are not in the queue.".to_string(),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Queue => {
            let reply = match app.desk.view(sender).await {
                Ok(board) => board,
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Hours(course) => {
            let reply = match app.desk.hours(&course) {
                Ok(hours) => hours,
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::RoomList => {
            let names: Vec<String> = app.rooms.room_names().iter().map(|r| r.to_string()).collect();
            let reply = if names.is_empty() {
                "no rooms are open.".to_string()
            } else {
                format!("open rooms:\n{}", names.join("\n"))
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::RoomOpen(name) => {
            let restricted = app.settings.is_tutor(sender.0);
            let room = app.rooms.open_room(&name, Some(sender), restricted);
            bot.send_message(chat_id, format!("you are now in room {}.", room))
                .await?;
        }
        Command::RoomJoin(name) => {
            let reply = match app.rooms.enter(sender, &RoomId::new(&name)) {
                Ok(()) => format!("you joined room {}.", RoomId::new(&name)),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::RoomLeave => {
            let reply = match app.rooms.leave(sender) {
                Some(room) => format!("you left room {}.", room),
                None => "you are not in a room.".to_string(),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Accept(token) => {
            let reply = match app.rooms.redeem_invite(sender, &token) {
                Ok(room) => format!("you joined room {}. your tutor is waiting!", room),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Start(course) => {
            let now = Local::now().naive_local();
            let reply = match app
                .desk
                .start_session(sender, &display_name(&user), &course, now)
                .await
            {
                Ok(holder) => format!("tutoring session for {} started.", holder.course),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::End => {
            let reply = match app.desk.end_session(sender).await {
                Ok(holder) => format!("tutoring session for {} ended.", holder.course),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Next => {
            // The search can outlive this update; report when it ends.
            let desk = app.desk.clone();
            tokio::spawn(async move {
                let reply = match desk.find_next(sender).await {
                    Ok(outcome) => describe_outcome(&outcome),
                    Err(e) => describe(&e),
                };
                if let Err(e) = bot.send_message(chat_id, reply).await {
                    tracing::warn!("Failed to report find-next result: {}", e);
                }
            });
        }
        Command::Stop => {
            let reply = match app.desk.stop(sender).await {
                Ok(()) => "search cancelled.".to_string(),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Move(from, to) => {
            let reply = edit_reply(app.desk.move_entry(sender, from, to).await);
            bot.send_message(chat_id, reply).await?;
        }
        Command::Swap(a, b) => {
            let reply = edit_reply(app.desk.swap(sender, a, b).await);
            bot.send_message(chat_id, reply).await?;
        }
        Command::Kick(position) => {
            let reply = match app.desk.kick(sender, position).await {
                Ok(Some(name)) => format!("removed {} from the queue.", name),
                Ok(None) => "no change: position out of range.".to_string(),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Clear => {
            let reply = match app.desk.clear(sender).await {
                Ok(()) => "queue cleared.".to_string(),
                Err(e) => describe(&e),
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Usage(usage) => {
            bot.send_message(chat_id, format!("Usage: {}", usage)).await?;
        }
        Command::Unknown => {
            bot.send_message(chat_id, "Unknown command. /help for available commands.")
                .await?;
        }
    }
    Ok(())
}

/// Handle ready-check button presses.
async fn handle_callback(bot: Bot, q: CallbackQuery, app: App) -> Result<(), RequestError> {
    let Some((key, choice)) = q.data.as_deref().and_then(parse_callback) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let from = MemberId(q.from.id.0);
    let resolution = app.messenger.resolve(key, from, choice);
    tracing::debug!(%from, ?choice, ?resolution, "Ready check answered");

    let text = match resolution {
        Resolution::Accepted => "got it!",
        Resolution::NotYours => "this prompt is not for you.",
        Resolution::Expired => "this prompt has expired.",
    };
    bot.answer_callback_query(q.id.clone()).text(text).await?;
    Ok(())
}

fn display_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.full_name())
}

/// User-facing text for a failed operation.
fn describe(e: &Error) -> String {
    match e {
        Error::Rejected(rejection) => {
            tracing::debug!(reason = rejection.code(), "Request rejected");
            rejection.to_string()
        }
        other => {
            tracing::warn!("Request failed: {}", other);
            format!("something went wrong: {}", other)
        }
    }
}

fn describe_outcome(outcome: &NextOutcome) -> String {
    match outcome {
        NextOutcome::Connected {
            handoff: Handoff::Moved { .. },
            ..
        } => "student connected.".to_string(),
        NextOutcome::Connected {
            handoff: Handoff::Invited { .. },
            ..
        } => "invite sent.".to_string(),
        NextOutcome::Cancelled => "search stopped.".to_string(),
        NextOutcome::QueueEmptied => "the queue emptied before anyone was ready.".to_string(),
    }
}

fn edit_reply(result: crate::error::Result<bool>) -> String {
    match result {
        Ok(true) => "queue updated.".to_string(),
        Ok(false) => "no change: position out of range.".to_string(),
        Err(e) => describe(&e),
    }
}

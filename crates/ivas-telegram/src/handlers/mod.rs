//! Telegram update handlers.
//!
//! Commands go to `commands`; any other text feeds the `/login` dialogue.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use ivas_core::domain::{ChatId, MessageId, MessageRef, UserId};

use crate::router::AppState;

mod commands;
mod login;

/// Who sent an update and where to answer.
#[derive(Clone, Debug)]
pub(crate) struct ChatContext {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub first_name: String,
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let ctx = ChatContext {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        first_name: user.first_name.clone(),
    };

    if text.starts_with('/') {
        commands::handle_command(&state, &ctx, text).await;
    } else {
        let origin = MessageRef {
            chat_id: ctx.chat_id,
            message_id: MessageId(msg.id.0),
        };
        login::handle_text(&state, &ctx, origin, text).await;
    }

    Ok(())
}

/// Best-effort HTML reply; delivery failures are only logged.
pub(crate) async fn reply(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
    }
}

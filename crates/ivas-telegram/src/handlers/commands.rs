use ivas_core::{
    domain::ChatId,
    errors::Error,
    formatting::{escape_html, format_sms_batches, numbers_file_name, render_numbers_file},
    service::Fetched,
};

use crate::router::AppState;

use super::{login, reply, ChatContext};

const NOT_LOGGED_IN: &str = "⚠️ You are not logged in. Please use the /login command first.";
const SESSION_EXPIRED: &str =
    "❌ Your session might have expired. Please try logging in again with /login.";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn help_text(first_name: &str) -> String {
    format!(
        "👋 <b>Hello, {}!</b> I am your iVAS SMS bot.\n\n\
Here's what I can do for you:\n\
• Login to your iVAS account securely with /login.\n\
• Retrieve your recent SMS messages with /get_sms.\n\
• Get a list of numbers for a specific termination ID with <code>/get_numbers &lt;id&gt;</code>.\n\
• Forget your session with /logout.",
        escape_html(first_name)
    )
}

pub(crate) async fn handle_command(state: &AppState, ctx: &ChatContext, text: &str) {
    let (cmd, arg) = parse_command(text);

    match cmd.as_str() {
        "start" | "help" => reply(state, ctx.chat_id, &help_text(&ctx.first_name)).await,
        "login" => login::start(state, ctx).await,
        "cancel" => login::cancel(state, ctx).await,
        "get_sms" => get_sms(state, ctx).await,
        "get_numbers" => get_numbers(state, ctx, &arg).await,
        "logout" => {
            let msg = if state.service.logout(ctx.user_id).await {
                "👋 Logged out. Use /login to sign in again."
            } else {
                "You are not logged in."
            };
            reply(state, ctx.chat_id, msg).await;
        }
        _ => {
            reply(
                state,
                ctx.chat_id,
                "Unknown command. Use /start to see what I can do.",
            )
            .await
        }
    }
}

async fn get_sms(state: &AppState, ctx: &ChatContext) {
    if !state.service.is_logged_in(ctx.user_id).await {
        reply(state, ctx.chat_id, NOT_LOGGED_IN).await;
        return;
    }

    reply(state, ctx.chat_id, "⏳ Retrieving your SMS messages...").await;

    match state.service.get_messages(ctx.user_id).await {
        Ok(Fetched::Items(messages)) => {
            let group = ChatId(state.cfg.group_chat_id);
            let limit = state
                .cfg
                .telegram_safe_limit
                .min(state.messenger.max_message_len());
            let mut delivered = true;
            for chunk in format_sms_batches(&messages, limit) {
                if let Err(e) = state.messenger.send_html(group, &chunk).await {
                    tracing::warn!(error = %e, "failed to broadcast sms batch to group");
                    delivered = false;
                    break;
                }
            }
            let msg = if delivered {
                "✅ The SMS messages have been sent to the group chat."
            } else {
                "❌ Retrieved the SMS messages but could not post them to the group chat."
            };
            reply(state, ctx.chat_id, msg).await;
        }
        Ok(outcome) => {
            reply(
                state,
                ctx.chat_id,
                "ℹ️ No new SMS messages found or failed to retrieve.",
            )
            .await;
            if outcome.is_expired() {
                reply(state, ctx.chat_id, SESSION_EXPIRED).await;
            }
        }
        Err(Error::NotLoggedIn) => reply(state, ctx.chat_id, NOT_LOGGED_IN).await,
        Err(e) => {
            tracing::warn!(error = %e, "sms retrieval failed");
            reply(state, ctx.chat_id, "❌ Failed to retrieve SMS messages.").await;
        }
    }
}

async fn get_numbers(state: &AppState, ctx: &ChatContext, arg: &str) {
    if !state.service.is_logged_in(ctx.user_id).await {
        reply(state, ctx.chat_id, NOT_LOGGED_IN).await;
        return;
    }

    let Some(termination_id) = arg.split_whitespace().next() else {
        reply(
            state,
            ctx.chat_id,
            "Please provide a termination ID. Example: <code>/get_numbers 301984</code>",
        )
        .await;
        return;
    };
    let tid_html = escape_html(termination_id);

    reply(
        state,
        ctx.chat_id,
        &format!("⏳ Retrieving numbers for termination ID: <code>{tid_html}</code>..."),
    )
    .await;

    match state.service.get_numbers(ctx.user_id, termination_id).await {
        Ok(Fetched::Items(records)) => {
            let body = render_numbers_file(&records).into_bytes();
            let name = numbers_file_name(termination_id);
            match state
                .messenger
                .send_document(ctx.chat_id, &name, body, None)
                .await
            {
                Ok(_) => {
                    reply(
                        state,
                        ctx.chat_id,
                        &format!(
                            "✅ Numbers for termination ID <code>{tid_html}</code> sent as a text file."
                        ),
                    )
                    .await
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to upload numbers file");
                    reply(state, ctx.chat_id, "❌ Could not upload the numbers file.").await;
                }
            }
        }
        Ok(outcome) => {
            reply(
                state,
                ctx.chat_id,
                &format!("⚠️ No numbers found for termination ID <code>{tid_html}</code>."),
            )
            .await;
            if outcome.is_expired() {
                reply(state, ctx.chat_id, SESSION_EXPIRED).await;
            }
        }
        Err(Error::NotLoggedIn) => reply(state, ctx.chat_id, NOT_LOGGED_IN).await,
        Err(e) => {
            tracing::warn!(error = %e, "numbers retrieval failed");
            reply(state, ctx.chat_id, "❌ Failed to retrieve numbers.").await;
        }
    }
}

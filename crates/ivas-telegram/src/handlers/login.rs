use ivas_core::{conversation::Step, domain::MessageRef};

use crate::router::AppState;

use super::{reply, ChatContext};

pub(crate) async fn start(state: &AppState, ctx: &ChatContext) {
    state.conversations.begin(ctx.user_id).await;
    reply(
        state,
        ctx.chat_id,
        "🔐 <b>Login Process</b>\nPlease provide your iVAS account email address.\n\
Send /cancel to abort.",
    )
    .await;
}

pub(crate) async fn cancel(state: &AppState, ctx: &ChatContext) {
    let msg = if state.conversations.cancel(ctx.user_id).await {
        "👋 Login process canceled. Goodbye!"
    } else {
        "Nothing to cancel."
    };
    reply(state, ctx.chat_id, msg).await;
}

/// Plain text: the next answer of a running `/login` dialogue, if any.
pub(crate) async fn handle_text(
    state: &AppState,
    ctx: &ChatContext,
    origin: MessageRef,
    text: &str,
) {
    match state.conversations.advance(ctx.user_id, text).await {
        Step::Ignored => {
            reply(
                state,
                ctx.chat_id,
                "Use /login to sign in, or /start to see what I can do.",
            )
            .await
        }
        Step::AskPassword => {
            reply(
                state,
                ctx.chat_id,
                "🔒 Thank you. Now, please enter your password.",
            )
            .await
        }
        Step::Credentials { email, password } => {
            // Do not leave the password sitting in the chat history.
            if let Err(e) = state.messenger.delete_message(origin).await {
                tracing::debug!(error = %e, "could not delete password message");
            }

            reply(state, ctx.chat_id, "⏳ <b>Attempting to log you in...</b>").await;

            if state.service.login(ctx.user_id, &email, &password).await {
                reply(
                    state,
                    ctx.chat_id,
                    "✅ <b>Login successful!</b> You are now ready to use the bot.\n\n\
• Use /get_sms to retrieve messages.\n\
• Use /get_numbers to get available numbers.",
                )
                .await;
            } else {
                reply(
                    state,
                    ctx.chat_id,
                    "❌ <b>Login failed.</b> Please check your credentials.",
                )
                .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{ctx, state, ScriptedPortal, Sent};
    use ivas_core::domain::{MessageId, UserId};

    fn origin(chat: i64, id: i32) -> MessageRef {
        MessageRef {
            chat_id: ivas_core::domain::ChatId(chat),
            message_id: MessageId(id),
        }
    }

    #[tokio::test]
    async fn dialogue_logs_user_in_and_deletes_password() {
        let (state, messenger) = state(ScriptedPortal::accepting());
        let c = ctx(9);

        start(&state, &c).await;
        handle_text(&state, &c, origin(9, 10), "me@x.test").await;
        handle_text(&state, &c, origin(9, 11), "hunter2").await;

        assert!(state.service.is_logged_in(UserId(9)).await);
        assert!(messenger.sent().contains(&Sent::Deleted(11)));
        let replies = messenger.html_to(9);
        assert!(replies
            .last()
            .is_some_and(|m| m.contains("Login successful")));
        assert!(!replies.iter().any(|m| m.contains("hunter2")));
    }

    #[tokio::test]
    async fn rejected_credentials_report_failure() {
        let portal = ScriptedPortal::accepting();
        portal.on(true, "/login", "/login", "<html>bad password</html>");
        let (state, messenger) = state(portal);
        let c = ctx(9);

        start(&state, &c).await;
        handle_text(&state, &c, origin(9, 10), "me@x.test").await;
        handle_text(&state, &c, origin(9, 11), "nope").await;

        assert!(!state.service.is_logged_in(UserId(9)).await);
        assert!(messenger
            .html_to(9)
            .last()
            .is_some_and(|m| m.contains("Login failed")));
    }

    #[tokio::test]
    async fn text_outside_dialogue_gets_a_hint() {
        let (state, messenger) = state(ScriptedPortal::accepting());
        handle_text(&state, &ctx(9), origin(9, 1), "hello").await;
        assert_eq!(
            messenger.html_to(9),
            vec!["Use /login to sign in, or /start to see what I can do.".to_string()]
        );
    }

    #[tokio::test]
    async fn cancel_stops_dialogue() {
        let (state, messenger) = state(ScriptedPortal::accepting());
        let c = ctx(9);
        start(&state, &c).await;
        cancel(&state, &c).await;
        handle_text(&state, &c, origin(9, 2), "me@x.test").await;

        let replies = messenger.html_to(9);
        assert_eq!(replies[1], "👋 Login process canceled. Goodbye!");
        assert!(replies[2].starts_with("Use /login"));
    }
}

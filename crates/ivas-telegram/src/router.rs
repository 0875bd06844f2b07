use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};

use ivas_core::{
    config::Config,
    conversation::LoginConversations,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    service::PortalService,
};

use crate::handlers;
use crate::TelegramMessenger;

/// Everything a handler needs, shared across updates.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub service: Arc<PortalService>,
    pub conversations: Arc<LoginConversations>,
    pub messenger: Arc<dyn MessagingPort>,
}

fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Show what this bot can do"),
        BotCommand::new("login", "Log in to your iVAS account"),
        BotCommand::new("get_sms", "Send recent SMS to the group chat"),
        BotCommand::new("get_numbers", "Numbers for a termination ID"),
        BotCommand::new("logout", "Forget your iVAS session"),
        BotCommand::new("cancel", "Cancel the login process"),
    ]
}

pub async fn run_polling(cfg: Arc<Config>, service: Arc<PortalService>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "ivas bot started"),
        Err(e) => tracing::warn!(error = %e, "getMe failed"),
    }
    tracing::info!(
        portal = %cfg.portal_base_url,
        group_chat_id = cfg.group_chat_id,
        "configuration loaded"
    );

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        tracing::warn!(error = %e, "failed to register bot commands");
    }

    // Group broadcasts can be several messages long; throttle to stay under
    // Telegram flood limits. 429 RetryAfter is still retried in the adapter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState {
        cfg,
        service,
        conversations: Arc::new(LoginConversations::new()),
        messenger,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    tracing::info!("bot is running");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}

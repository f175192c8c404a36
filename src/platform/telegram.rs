use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::config::TelegramConfig;
use crate::platform::{respond, IncomingMessage};
use crate::registration::RegistrationHandler;

/// Whether a sender may use the bot. An empty allow-list admits everyone.
fn is_allowed(allowed_user_ids: &[u64], user_id: u64) -> bool {
    allowed_user_ids.is_empty() || allowed_user_ids.contains(&user_id)
}

/// Run the Telegram bot platform
pub async fn run(handler: Arc<RegistrationHandler>, config: TelegramConfig) -> Result<()> {
    let bot = Bot::new(&config.bot_token);
    let allowed_user_ids = config.allowed_user_ids;

    info!("Starting Telegram platform...");

    let update_handler = Update::filter_message()
        .filter_map(move |msg: Message| {
            let user = msg.from.as_ref()?;
            if is_allowed(&allowed_user_ids, user.id.0) {
                Some(msg)
            } else {
                None
            }
        })
        .endpoint(handle_message);

    Dispatcher::builder(bot, update_handler)
        .dependencies(dptree::deps![handler])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    handler: Arc<RegistrationHandler>,
) -> ResponseResult<()> {
    let user_id = match msg.from.as_ref() {
        Some(user) => user.id.0,
        None => return Ok(()),
    };

    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    info!("Telegram message from {}: {}", user_id, text);

    let incoming = IncomingMessage {
        platform: "telegram".to_string(),
        user_id: user_id.to_string(),
        text,
    };

    let reply = respond(&handler, &incoming).await;
    bot.send_message(msg.chat.id, reply).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_allow_list_admits_everyone() {
        assert!(is_allowed(&[], 42));
    }

    #[test]
    fn test_allow_list_filters() {
        assert!(is_allowed(&[1, 42], 42));
        assert!(!is_allowed(&[1, 2], 42));
    }
}

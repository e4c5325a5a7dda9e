//! Long-polling transport: binds a token, dispatches updates to the router.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{
    dispatching::{Dispatcher, ShutdownToken},
    dptree,
    prelude::*,
    types::{CallbackQuery, Message},
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use panelbot_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    ports::{BoundTransport, ChatTransport, MessengerPort},
    router::{CallbackUpdate, CommandRouter, CommandUpdate},
    Error, Result,
};

use crate::TelegramMessenger;

pub struct TelegramTransport;

impl TelegramTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TelegramTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn bind(&self, token: &str) -> Result<Box<dyn BoundTransport>> {
        let bot = Bot::new(token.to_string());

        // getMe doubles as token validation; a bad credential fails here.
        let me = bot
            .get_me()
            .await
            .map_err(|e| Error::Transport(format!("token validation failed: {e}")))?;
        info!(username = %me.username(), "bound telegram bot");

        Ok(Box::new(TelegramBound {
            bot,
            shutdown: None,
            task: None,
        }))
    }
}

pub struct TelegramBound {
    bot: Bot,
    shutdown: Option<ShutdownToken>,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl BoundTransport for TelegramBound {
    fn messenger(&self) -> Arc<dyn MessengerPort> {
        Arc::new(TelegramMessenger::new(self.bot.clone()))
    }

    async fn start_receiving(
        &mut self,
        router: Arc<CommandRouter>,
        drop_pending: bool,
    ) -> Result<()> {
        if drop_pending {
            if let Err(e) = self.bot.delete_webhook().drop_pending_updates(true).await {
                warn!("failed to drop pending updates: {e}");
            }
        }

        let handler = dptree::entry()
            .branch(Update::filter_callback_query().endpoint(on_callback))
            .branch(Update::filter_message().endpoint(on_message));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![router])
            .build();

        self.shutdown = Some(dispatcher.shutdown_token());
        self.task = Some(tokio::spawn(async move {
            dispatcher.dispatch().await;
        }));
        Ok(())
    }

    async fn stop_receiving(&mut self) -> Result<()> {
        if let Some(token) = self.shutdown.take() {
            match token.shutdown() {
                Ok(done) => done.await,
                Err(e) => warn!("dispatcher was not running: {e}"),
            }
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("dispatcher task ended abnormally: {e}");
            }
        }
        Ok(())
    }
}

async fn on_message(msg: Message, router: Arc<CommandRouter>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(command) = parse_command(text) else {
        return Ok(());
    };

    let update = CommandUpdate {
        chat_id: ChatId(msg.chat.id.0),
        user_id: msg.from().map(|u| UserId(u.id.0 as i64)),
        command,
    };
    if let Err(e) = router.handle_command(update).await {
        error!("command handling failed: {e}");
    }
    Ok(())
}

async fn on_callback(q: CallbackQuery, router: Arc<CommandRouter>) -> ResponseResult<()> {
    let Some(data) = q.data else {
        return Ok(());
    };
    let message = q.message.map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });

    let update = CallbackUpdate {
        callback_id: q.id,
        user_id: UserId(q.from.id.0 as i64),
        message,
        data,
    };
    if let Err(e) = router.handle_callback(update).await {
        error!("callback handling failed: {e}");
    }
    Ok(())
}

/// `/nodes@mybot arg` -> `nodes`. Non-commands yield `None`.
fn parse_command(text: &str) -> Option<String> {
    let rest = text.strip_prefix('/')?;
    let word = rest.split_whitespace().next()?;
    let name = word.split('@').next().unwrap_or(word);
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

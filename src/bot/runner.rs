// =============================================================================
// Polling Runner — getUpdates loop that executes dispatch results
// =============================================================================
//
// Updates are handled strictly in order; the offset advances past every update
// we have seen, even when handling it failed, so a poisoned update cannot
// wedge the loop.  Analyses run on their own task so a slow exchange does not
// stall the chat.
// =============================================================================

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use super::handler::{handle_update, BotAction};
use crate::analysis::{render_report, run_analysis};
use crate::app_state::AppState;
use crate::telegram::TelegramClient;

const RETRY_DELAY_SECS: u64 = 5;

/// Run the long-polling loop forever.
pub async fn run_polling(state: Arc<AppState>, telegram: TelegramClient) {
    let timeout = state.config.poll_timeout_secs;
    let mut offset: i64 = 0;

    info!(poll_timeout_secs = timeout, "Telegram polling started");

    loop {
        let updates = match telegram.get_updates(offset, timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                error!(error = %e, "getUpdates failed — retrying in 5s");
                state.push_error(format!("getUpdates: {e}"));
                tokio::time::sleep(tokio::time::Duration::from_secs(RETRY_DELAY_SECS)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            for action in handle_update(&state, &update) {
                if let Err(e) = execute(&state, &telegram, action).await {
                    warn!(update_id = update.update_id, error = %e, "bot action failed");
                    state.push_error(format!("update {}: {e}", update.update_id));
                }
            }
        }
    }
}

async fn execute(state: &Arc<AppState>, telegram: &TelegramClient, action: BotAction) -> Result<()> {
    match action {
        BotAction::Send {
            chat_id,
            text,
            keyboard,
        } => telegram.send_message(chat_id, &text, keyboard.as_ref()).await,
        BotAction::Edit {
            chat_id,
            message_id,
            text,
            keyboard,
        } => {
            telegram
                .edit_message_text(chat_id, message_id, &text, keyboard.as_ref())
                .await
        }
        BotAction::AnswerCallback { callback_id } => {
            telegram.answer_callback_query(&callback_id).await
        }
        BotAction::Analyze {
            chat_id,
            symbol,
            interval,
            strategy,
        } => {
            let state = state.clone();
            let telegram = telegram.clone();
            tokio::spawn(async move {
                let limit = state.config.kline_limit;
                let text = match run_analysis(&state.market, &symbol, &interval, strategy, limit).await {
                    Ok(report) => render_report(&report),
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "analysis failed");
                        state.push_error(format!("analyze {symbol}: {e}"));
                        e.user_message().to_string()
                    }
                };
                if let Err(e) = telegram.send_message(chat_id, &text, None).await {
                    error!(chat_id, error = %e, "failed to deliver analysis");
                    state.push_error(format!("deliver analysis: {e}"));
                }
            });
            Ok(())
        }
    }
}

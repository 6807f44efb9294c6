// =============================================================================
// Update Dispatch — chat updates → bot actions
// =============================================================================
//
// `handle_update` is synchronous and performs no I/O: it reads and mutates
// `AppState` and returns the actions the runner must carry out.  Market data
// fetches are expressed as `BotAction::Analyze` so dispatch stays testable.
// =============================================================================

use tracing::{debug, info, warn};

use super::commands::{parse_command, Command, HELP_TEXT, USAGE_ANALYZE};
use crate::access::{generate_code, ttl_seconds_from_minutes, UserId};
use crate::app_state::AppState;
use crate::signal::Strategy;
use crate::telegram::types::{CallbackQuery, Message};
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup, Update};
use crate::types::{normalize_symbol, parse_interval};

// Callback payloads.
const CB_SEARCH: &str = "search";
const CB_STRATEGIES: &str = "strategies";
const CB_MENU: &str = "menu";
const CB_STRATEGY_PREFIX: &str = "strategy:";
const CB_SYMBOL_PREFIX: &str = "sym:";

pub const MSG_NEED_CODE: &str = "Please enter an access code to use the bot. Use /access <code>";
pub const MSG_INVALID_CODE: &str = "❌ The code is invalid or has expired.";
pub const MSG_CODE_ACTIVATED: &str = "✅ Code activated. You can now use the bot.";
pub const MSG_NOT_ADMIN: &str = "❌ You do not have permission to issue codes.";
pub const MSG_ACCESS_EXPIRED: &str = "❌ The code is invalid or has expired. Please enter a valid code.";
const MSG_MENU: &str =
    "Choose a pair to analyse, search for a symbol, or pick a strategy:";
const MSG_SEARCH_PROMPT: &str = "🔎 Send the symbol to analyse, e.g. BTCUSDT or SOL/USDT.";
const MSG_BAD_SYMBOL: &str = "❌ That does not look like a trading pair. Try e.g. BTCUSDT.";
const MSG_USE_START: &str = "Use /start to open the menu or /help for commands.";

#[derive(Debug, Clone, PartialEq)]
pub enum BotAction {
    Send {
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    AnswerCallback {
        callback_id: String,
    },
    Analyze {
        chat_id: i64,
        symbol: String,
        interval: String,
        strategy: Strategy,
    },
}

impl BotAction {
    fn send(chat_id: i64, text: impl Into<String>) -> Self {
        Self::Send {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Dispatch a single update.
pub fn handle_update(state: &AppState, update: &Update) -> Vec<BotAction> {
    if let Some(msg) = &update.message {
        return handle_message(state, msg);
    }
    if let Some(cb) = &update.callback_query {
        return handle_callback(state, cb);
    }
    debug!(update_id = update.update_id, "ignoring unsupported update");
    Vec::new()
}

// =============================================================================
// Menus
// =============================================================================

fn main_menu(state: &AppState) -> InlineKeyboardMarkup {
    let mut buttons = vec![InlineKeyboardButton::new("🔎 Search symbol", CB_SEARCH)];
    for symbol in &state.config.menu_symbols {
        buttons.push(InlineKeyboardButton::new(
            pretty_pair(symbol),
            format!("{CB_SYMBOL_PREFIX}{symbol}"),
        ));
    }
    buttons.push(InlineKeyboardButton::new("📐 Trading strategies", CB_STRATEGIES));
    InlineKeyboardMarkup::single_column(buttons)
}

fn strategy_menu(current: Strategy) -> InlineKeyboardMarkup {
    let label = |s: Strategy, name: &str| {
        if s == current {
            format!("✅ {name}")
        } else {
            name.to_string()
        }
    };
    InlineKeyboardMarkup::single_column(vec![
        InlineKeyboardButton::new(label(Strategy::Ema, "EMA(20) trend"), format!("{CB_STRATEGY_PREFIX}ema")),
        InlineKeyboardButton::new(label(Strategy::Rsi, "RSI(14) momentum"), format!("{CB_STRATEGY_PREFIX}rsi")),
        InlineKeyboardButton::new("⬅️ Back", CB_MENU),
    ])
}

/// `BTCUSDT` → `BTC/USDT` for display; other symbols pass through.
fn pretty_pair(symbol: &str) -> String {
    for quote in ["USDT", "USDC", "BUSD", "BTC", "ETH"] {
        if let Some(base) = symbol.strip_suffix(quote) {
            if !base.is_empty() {
                return format!("{base}/{quote}");
            }
        }
    }
    symbol.to_string()
}

fn issue_code(state: &AppState, chat_id: i64, code: &str, minutes: i64) -> BotAction {
    let issued = ttl_seconds_from_minutes(minutes).and_then(|ttl| state.access.issue(code, ttl));
    match issued {
        Ok(_) => BotAction::send(
            chat_id,
            format!("✅ Created code: {code} valid for {minutes} minutes."),
        ),
        Err(e) => BotAction::send(chat_id, format!("❌ {e}")),
    }
}

// =============================================================================
// Messages
// =============================================================================

fn handle_message(state: &AppState, msg: &Message) -> Vec<BotAction> {
    let (Some(user), Some(text)) = (&msg.from, &msg.text) else {
        return Vec::new();
    };
    let chat_id = msg.chat.id;
    debug!(user_id = user.id, username = ?user.username, name = %user.first_name, "message received");

    match parse_command(text) {
        Some(Ok(cmd)) => handle_command(state, chat_id, user.id, cmd),
        Some(Err(usage)) => vec![BotAction::send(chat_id, usage)],
        None => handle_plain_text(state, chat_id, user.id, text),
    }
}

fn handle_command(state: &AppState, chat_id: i64, user_id: UserId, cmd: Command) -> Vec<BotAction> {
    match cmd {
        Command::Start => {
            if state.access.has_access(user_id) {
                let text = match state.access.grant(user_id) {
                    Some(g) => format!(
                        "{MSG_MENU}\n\n⏳ Access valid until {} UTC",
                        g.expires_at.format("%Y-%m-%d %H:%M")
                    ),
                    None => MSG_MENU.to_string(),
                };
                vec![BotAction::Send {
                    chat_id,
                    text,
                    keyboard: Some(main_menu(state)),
                }]
            } else {
                vec![BotAction::send(chat_id, MSG_NEED_CODE)]
            }
        }
        Command::Help => vec![BotAction::send(chat_id, HELP_TEXT)],
        Command::CreateCode { code, minutes } => {
            if !state.config.is_admin(user_id) {
                warn!(user_id, "non-admin attempted to create an access code");
                return vec![BotAction::send(chat_id, MSG_NOT_ADMIN)];
            }
            vec![issue_code(state, chat_id, &code, minutes)]
        }
        Command::GenerateCode { minutes } => {
            if !state.config.is_admin(user_id) {
                warn!(user_id, "non-admin attempted to generate an access code");
                return vec![BotAction::send(chat_id, MSG_NOT_ADMIN)];
            }
            vec![issue_code(state, chat_id, &generate_code(), minutes)]
        }
        Command::Access { code } => {
            if state.access.redeem(&code, user_id) {
                info!(user_id, "user activated access");
                vec![BotAction::send(chat_id, MSG_CODE_ACTIVATED)]
            } else {
                vec![BotAction::send(chat_id, MSG_INVALID_CODE)]
            }
        }
        Command::Analyze { symbol, interval } => {
            if !state.access.has_access(user_id) {
                return vec![BotAction::send(chat_id, MSG_ACCESS_EXPIRED)];
            }
            let Some(symbol) = normalize_symbol(&symbol) else {
                return vec![BotAction::send(chat_id, MSG_BAD_SYMBOL)];
            };
            let interval = match interval {
                None => state.config.default_interval.clone(),
                Some(raw) => match parse_interval(&raw) {
                    Some(i) => i.to_string(),
                    None => return vec![BotAction::send(chat_id, USAGE_ANALYZE)],
                },
            };
            vec![BotAction::Analyze {
                chat_id,
                symbol,
                interval,
                strategy: state.strategy_for(user_id),
            }]
        }
        Command::Strategy(choice) => {
            if !state.access.has_access(user_id) {
                return vec![BotAction::send(chat_id, MSG_ACCESS_EXPIRED)];
            }
            match choice {
                Some(strategy) => {
                    state.set_strategy(user_id, strategy);
                    vec![BotAction::send(chat_id, format!("Strategy set to {strategy}."))]
                }
                None => vec![BotAction::Send {
                    chat_id,
                    text: "Choose a strategy:".to_string(),
                    keyboard: Some(strategy_menu(state.strategy_for(user_id))),
                }],
            }
        }
        Command::Unknown(name) => vec![BotAction::send(
            chat_id,
            format!("Unknown command /{name}. {MSG_USE_START}"),
        )],
    }
}

fn handle_plain_text(state: &AppState, chat_id: i64, user_id: UserId, text: &str) -> Vec<BotAction> {
    if !state.take_awaiting_symbol(user_id) {
        return vec![BotAction::send(chat_id, MSG_USE_START)];
    }
    if !state.access.has_access(user_id) {
        return vec![BotAction::send(chat_id, MSG_ACCESS_EXPIRED)];
    }
    match normalize_symbol(text) {
        Some(symbol) => vec![BotAction::Analyze {
            chat_id,
            symbol,
            interval: state.config.default_interval.clone(),
            strategy: state.strategy_for(user_id),
        }],
        None => vec![BotAction::send(chat_id, MSG_BAD_SYMBOL)],
    }
}

// =============================================================================
// Callbacks (inline buttons)
// =============================================================================

fn handle_callback(state: &AppState, cb: &CallbackQuery) -> Vec<BotAction> {
    let mut actions = vec![BotAction::AnswerCallback {
        callback_id: cb.id.clone(),
    }];
    let Some(msg) = &cb.message else {
        return actions;
    };
    let chat_id = msg.chat.id;
    let message_id = msg.message_id;
    let user_id = cb.from.id;

    let edit = |text: String, keyboard: Option<InlineKeyboardMarkup>| BotAction::Edit {
        chat_id,
        message_id,
        text,
        keyboard,
    };

    if !state.access.has_access(user_id) {
        actions.push(edit(MSG_ACCESS_EXPIRED.to_string(), None));
        return actions;
    }

    let data = cb.data.as_deref().unwrap_or_default();
    if data == CB_SEARCH {
        state.set_awaiting_symbol(user_id, true);
        actions.push(BotAction::send(chat_id, MSG_SEARCH_PROMPT));
    } else if data == CB_STRATEGIES {
        actions.push(edit(
            "Choose a strategy:".to_string(),
            Some(strategy_menu(state.strategy_for(user_id))),
        ));
    } else if data == CB_MENU {
        actions.push(edit(MSG_MENU.to_string(), Some(main_menu(state))));
    } else if let Some(raw) = data.strip_prefix(CB_STRATEGY_PREFIX) {
        match raw.parse::<Strategy>() {
            Ok(strategy) => {
                state.set_strategy(user_id, strategy);
                actions.push(edit(
                    format!("Strategy set to {strategy}.\n\n{MSG_MENU}"),
                    Some(main_menu(state)),
                ));
            }
            Err(e) => warn!(error = %e, "bad strategy callback payload"),
        }
    } else if let Some(raw) = data.strip_prefix(CB_SYMBOL_PREFIX) {
        match normalize_symbol(raw) {
            Some(symbol) => actions.push(BotAction::Analyze {
                chat_id,
                symbol,
                interval: state.config.default_interval.clone(),
                strategy: state.strategy_for(user_id),
            }),
            None => warn!(payload = raw, "bad symbol callback payload"),
        }
    } else {
        debug!(payload = data, "ignoring unknown callback payload");
    }

    actions
}

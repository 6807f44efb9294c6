// =============================================================================
// Chat Bot
// =============================================================================
//
// commands — slash-command parsing
// handler  — pure update dispatch into `BotAction`s
// runner   — long-polling loop that performs those actions

pub mod commands;
pub mod handler;
pub mod runner;

pub use runner::run_polling;

// =============================================================================
// Chat Commands — parsing of slash commands into typed values
// =============================================================================

use crate::access::MAX_TTL_MINUTES;
use crate::signal::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Help,
    /// Admin: `/create_code <code> <minutes>`
    CreateCode { code: String, minutes: i64 },
    /// Admin: `/generate_code <minutes>`
    GenerateCode { minutes: i64 },
    /// `/access <code>`
    Access { code: String },
    /// `/analyze <symbol> [interval]`
    Analyze { symbol: String, interval: Option<String> },
    /// `/strategy [ema|rsi]`; without an argument shows the strategy menu.
    Strategy(Option<Strategy>),
    Unknown(String),
}

pub const USAGE_CREATE_CODE: &str =
    "Please provide the code and the duration correctly. Usage: /create_code <code> <minutes>";
pub const USAGE_GENERATE_CODE: &str = "Usage: /generate_code <minutes>";
pub const USAGE_ACCESS: &str = "❌ Please enter a valid code. Usage: /access <code>";
pub const USAGE_ANALYZE: &str = "Usage: /analyze <symbol> [interval], e.g. /analyze BTCUSDT 4h";
pub const USAGE_STRATEGY: &str = "Usage: /strategy ema|rsi";

pub const HELP_TEXT: &str = "Commands:\n\
/start — open the main menu\n\
/access <code> — activate an access code\n\
/analyze <symbol> [interval] — analyse a trading pair\n\
/strategy ema|rsi — choose the analysis strategy\n\
/help — show this message";

/// Parse a message as a command.
///
/// Returns `None` when the text is not a command at all, and `Some(Err(usage))`
/// when it is a known command with bad arguments.
pub fn parse_command(text: &str) -> Option<Result<Command, &'static str>> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    // `/start@MyBot`: commands addressed to a specific bot in group chats.
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    let cmd = match name.as_str() {
        "start" => Ok(Command::Start),
        "help" => Ok(Command::Help),
        "create_code" => match args.as_slice() {
            [code, minutes] => parse_minutes(minutes)
                .map(|minutes| Command::CreateCode {
                    code: code.to_string(),
                    minutes,
                })
                .ok_or(USAGE_CREATE_CODE),
            _ => Err(USAGE_CREATE_CODE),
        },
        "generate_code" => match args.as_slice() {
            [minutes] => parse_minutes(minutes)
                .map(|minutes| Command::GenerateCode { minutes })
                .ok_or(USAGE_GENERATE_CODE),
            _ => Err(USAGE_GENERATE_CODE),
        },
        "access" => match args.first() {
            Some(code) => Ok(Command::Access {
                code: code.to_string(),
            }),
            None => Err(USAGE_ACCESS),
        },
        "analyze" | "analyse" => match args.as_slice() {
            [symbol] => Ok(Command::Analyze {
                symbol: symbol.to_string(),
                interval: None,
            }),
            [symbol, interval] => Ok(Command::Analyze {
                symbol: symbol.to_string(),
                interval: Some(interval.to_string()),
            }),
            _ => Err(USAGE_ANALYZE),
        },
        "strategy" => match args.first() {
            None => Ok(Command::Strategy(None)),
            Some(s) => s.parse().map(|s| Command::Strategy(Some(s))).map_err(|_| USAGE_STRATEGY),
        },
        _ => Ok(Command::Unknown(name)),
    };

    Some(cmd)
}

/// Positive whole minutes, capped at one year.
fn parse_minutes(raw: &str) -> Option<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|m| (1..=MAX_TTL_MINUTES).contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("/start"), Some(Ok(Command::Start)));
        assert_eq!(parse_command("  /HELP "), Some(Ok(Command::Help)));
        assert_eq!(parse_command("/start@SignalBot"), Some(Ok(Command::Start)));
    }

    #[test]
    fn create_code_needs_code_and_positive_minutes() {
        assert_eq!(
            parse_command("/create_code VIP 30"),
            Some(Ok(Command::CreateCode {
                code: "VIP".into(),
                minutes: 30
            }))
        );
        assert_eq!(parse_command("/create_code VIP"), Some(Err(USAGE_CREATE_CODE)));
        assert_eq!(parse_command("/create_code VIP ten"), Some(Err(USAGE_CREATE_CODE)));
        assert_eq!(parse_command("/create_code VIP 0"), Some(Err(USAGE_CREATE_CODE)));
    }

    #[test]
    fn generate_code_parses_minutes() {
        assert_eq!(
            parse_command("/generate_code 15"),
            Some(Ok(Command::GenerateCode { minutes: 15 }))
        );
        assert_eq!(parse_command("/generate_code"), Some(Err(USAGE_GENERATE_CODE)));
    }

    #[test]
    fn access_requires_code() {
        assert_eq!(
            parse_command("/access abc"),
            Some(Ok(Command::Access { code: "abc".into() }))
        );
        assert_eq!(parse_command("/access"), Some(Err(USAGE_ACCESS)));
    }

    #[test]
    fn analyze_with_optional_interval() {
        assert_eq!(
            parse_command("/analyze btcusdt"),
            Some(Ok(Command::Analyze {
                symbol: "btcusdt".into(),
                interval: None
            }))
        );
        assert_eq!(
            parse_command("/analyse ETHUSDT 4h"),
            Some(Ok(Command::Analyze {
                symbol: "ETHUSDT".into(),
                interval: Some("4h".into())
            }))
        );
        assert_eq!(parse_command("/analyze"), Some(Err(USAGE_ANALYZE)));
    }

    #[test]
    fn strategy_argument_is_optional() {
        assert_eq!(parse_command("/strategy"), Some(Ok(Command::Strategy(None))));
        assert_eq!(
            parse_command("/strategy RSI"),
            Some(Ok(Command::Strategy(Some(Strategy::Rsi))))
        );
        assert_eq!(parse_command("/strategy macd"), Some(Err(USAGE_STRATEGY)));
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            parse_command("/moon"),
            Some(Ok(Command::Unknown("moon".into())))
        );
    }
}

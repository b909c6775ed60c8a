use super::types::{BotCommand, InlineKeyboardButton, InlineKeyboardMarkup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Chart,
    Stop,
}

impl Command {
    /// Parses a chat message such as `/chart` or `/chart@fib_bot 4h`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        Self::from_name(name)
    }

    /// Parses the data attached to an inline keyboard button.
    pub fn from_callback(data: &str) -> Option<Self> {
        match data.trim() {
            "chart" => Some(Command::Chart),
            "help" => Some(Command::Help),
            "stop" => Some(Command::Stop),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "chart" => Some(Command::Chart),
            "stop" => Some(Command::Stop),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Chart => "chart",
            Command::Stop => "stop",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Start => "Start the bot",
            Command::Help => "Show help",
            Command::Chart => "Show the chart",
            Command::Stop => "Stop alerts",
        }
    }

    pub fn all() -> [Command; 4] {
        [Command::Start, Command::Help, Command::Chart, Command::Stop]
    }
}

/// Command menu registered with `setMyCommands`.
pub fn bot_commands() -> Vec<BotCommand> {
    Command::all()
        .iter()
        .map(|c| BotCommand {
            command: c.name().to_string(),
            description: c.description().to_string(),
        })
        .collect()
}

pub fn main_keyboard() -> InlineKeyboardMarkup {
    let button = |text: &str, command: Command| InlineKeyboardButton {
        text: text.to_string(),
        callback_data: command.name().to_string(),
    };
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![button("📊 Chart", Command::Chart), button("❓ Help", Command::Help)],
            vec![button("⏹ Stop alerts", Command::Stop)],
        ],
    }
}

pub fn welcome_text(symbol: &str, timeframe: &str) -> String {
    format!(
        "👋 Welcome! I watch {symbol} on the {timeframe} timeframe and message you when the \
         price moves into another Fibonacci retracement band or touches a level.\n\
         Use the buttons below or /help to see what I can do."
    )
}

pub fn help_text() -> String {
    Command::all()
        .iter()
        .map(|c| format!("/{} - {}", c.name(), c.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

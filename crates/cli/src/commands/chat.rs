//! Chat commands from the terminal.

use crm_bridge::chat::ChatBot;

use super::{CliError, Context, emit};

/// Answer one line, or every line on stdin when `line` is `None`.
pub async fn run(ctx: &Context, line: Option<String>) -> Result<(), CliError> {
    let bot = ChatBot::new(ctx.gateway(), ctx.catalog(), ctx.settings());

    if let Some(line) = line {
        return emit(&bot.reply(&line).await);
    }

    for line in std::io::stdin().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        emit(&bot.reply(&line).await)?;
    }
    Ok(())
}

//! Bot initialization and the command surface.

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "show this help message")]
    Help,
    #[command(description = "create a new project")]
    NewProject,
    #[command(description = "log a progress update")]
    UpdateProject,
    #[command(description = "view your projects")]
    MyProjects,
    #[command(description = "search for projects")]
    SearchProjects,
    #[command(description = "cancel the current operation")]
    Cancel,
}

/// Creates the Bot instance with a request timeout.
///
/// The token comes from BOT_TOKEN (or TELOXIDE_TOKEN).
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN environment variable not set");
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(config::BOT_TOKEN.clone(), client))
}

/// Registers the command list in the Telegram UI.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "start the bot"),
        BotCommand::new("help", "show this help message"),
        BotCommand::new("newproject", "create a new project"),
        BotCommand::new("updateproject", "log a progress update"),
        BotCommand::new("myprojects", "view your projects"),
        BotCommand::new("searchprojects", "search for projects"),
        BotCommand::new("cancel", "cancel the current operation"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_are_lowercase() {
        assert_eq!(Command::parse("/newproject", "testbot").unwrap(), Command::NewProject);
        assert_eq!(Command::parse("/myprojects", "testbot").unwrap(), Command::MyProjects);
        assert_eq!(Command::parse("/cancel", "testbot").unwrap(), Command::Cancel);
    }

    #[test]
    fn test_descriptions_list_every_command() {
        let descriptions = format!("{}", Command::descriptions());
        assert!(descriptions.contains("Available commands"));
        for command in [
            "start",
            "help",
            "newproject",
            "updateproject",
            "myprojects",
            "searchprojects",
            "cancel",
        ] {
            assert!(descriptions.contains(command), "missing /{}", command);
        }
    }
}

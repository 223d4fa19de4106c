use super::{InvocationContext, PromptOptions, Transport};
use crate::error::Error;
use crate::{Context, commands};
use async_trait::async_trait;
use serenity::all::{Http, Message, MessageCollector, ReactionCollector, ReactionType};
use sqlx::PgPool;
use std::time::Duration;

/// Context handed to command bodies running on the live bot.
pub type Invocation<'a> = InvocationContext<Context<'a>, PgPool>;

impl<'a> InvocationContext<Context<'a>, PgPool> {
    pub fn from_poise(ctx: Context<'a>) -> Self {
        let data = ctx.data();
        InvocationContext::new(ctx, data.db.clone())
            .with_prompt_defaults(PromptOptions::default().timeout(data.config.prompt_timeout))
    }

    /// HTTP session of the running bot.
    pub fn http(&self) -> &Http {
        &self.transport().serenity_context().http
    }
}

#[async_trait]
impl<'a> Transport for Context<'a> {
    type Message = Message;

    async fn send(&self, content: String) -> Result<Message, Error> {
        let handle = self.say(content).await?;
        Ok(handle.into_message().await?)
    }

    async fn add_reaction(&self, message: &Message, emoji: &str) -> Result<(), Error> {
        message
            .react(self.serenity_context(), ReactionType::Unicode(emoji.to_string()))
            .await?;
        Ok(())
    }

    async fn delete(&self, message: &Message) -> Result<(), Error> {
        message.delete(self.serenity_context()).await?;
        Ok(())
    }

    async fn can_add_reactions(&self) -> Result<bool, Error> {
        // Outside a guild there are no channel overwrites to deny reactions.
        let Some(guild_id) = self.guild_id() else {
            return Ok(true);
        };

        let channel = self
            .channel_id()
            .to_channel(self.serenity_context())
            .await?
            .guild()
            .ok_or(Error::NotFound("guild channel"))?;
        let member = guild_id
            .member(self.serenity_context(), self.framework().bot_id)
            .await?;

        let permissions = {
            let guild = self.guild().ok_or(Error::NotFound("guild"))?;
            guild.user_permissions_in(&channel, &member)
        };
        Ok(permissions.add_reactions())
    }

    async fn wait_for_reply(
        &self,
        accept: for<'s> fn(&'s str) -> bool,
        timeout: Duration,
    ) -> Option<String> {
        MessageCollector::new(self.serenity_context())
            .author_id(self.author().id)
            .channel_id(self.channel_id())
            .timeout(timeout)
            .filter(move |msg| accept(&msg.content))
            .next()
            .await
            .map(|msg| msg.content)
    }

    async fn wait_for_reaction(
        &self,
        message: &Message,
        choices: &[&str],
        timeout: Duration,
    ) -> Option<String> {
        let choices: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
        ReactionCollector::new(self.serenity_context())
            .message_id(message.id)
            .author_id(self.author().id)
            .timeout(timeout)
            .filter(move |reaction| choices.iter().any(|c| reaction.emoji.unicode_eq(c)))
            .next()
            .await
            .map(|reaction| reaction.emoji.to_string())
    }

    fn command_name(&self) -> String {
        self.command().qualified_name.clone()
    }

    async fn render_help(&self, command: &str) -> Result<(), Error> {
        commands::general::render_help(*self, Some(command)).await
    }
}

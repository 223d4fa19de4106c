use crate::error::Error;
use serenity::all::GuildId;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout: Duration,
    pub prompt_timeout: Duration,
    pub command_prefix: String,
    pub guild_id: Option<GuildId>,
    pub bot_version: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DISCORD_TOKEN` — Bot token from Discord Developer Portal
    ///
    /// Optional:
    /// - `DATABASE_URL` — PostgreSQL connection string
    /// - `DATABASE_MAX_CONNECTIONS` — Pool size (default 5)
    /// - `DATABASE_ACQUIRE_TIMEOUT_SECS` — Pool acquire timeout (default 30)
    /// - `PROMPT_TIMEOUT_SECS` — How long confirmation prompts wait (default 60)
    /// - `COMMAND_PREFIX` — Prefix for text commands (default "!")
    /// - `GUILD_ID` — Register slash commands to a single guild
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|val| !val.is_empty())
            .ok_or_else(|| Error::Config("DISCORD_TOKEN environment variable is required".into()))?;

        let database_url = lookup("DATABASE_URL")
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| "postgres://localhost/discord_context".into());

        let database_max_connections =
            parse_number::<u32>(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(5);
        let database_acquire_timeout = Duration::from_secs(
            parse_number::<u64>(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS")?.unwrap_or(30),
        );
        let prompt_timeout =
            Duration::from_secs(parse_number::<u64>(&lookup, "PROMPT_TIMEOUT_SECS")?.unwrap_or(60));

        let command_prefix = lookup("COMMAND_PREFIX")
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| "!".into());

        let guild_id = match parse_number::<u64>(&lookup, "GUILD_ID")? {
            Some(0) => return Err(Error::Config("Invalid value for GUILD_ID: '0'".into())),
            id => id.map(GuildId::new),
        };

        Ok(Self {
            discord_token,
            database_url,
            database_max_connections,
            database_acquire_timeout,
            prompt_timeout,
            command_prefix,
            guild_id,
            bot_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

fn parse_number<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>, Error>
where
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(val) if !val.trim().is_empty() => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value for {var}: '{val}'"))),
        _ => Ok(None),
    }
}

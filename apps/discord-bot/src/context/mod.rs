//! Per-invocation command context.
//!
//! An [`InvocationContext`] is built for every command invocation. It wraps the
//! chat transport and the connection pool, and lazily holds at most one pooled
//! connection for the lifetime of the invocation.

mod acquire;
mod discord;
#[cfg(test)]
mod tests;

pub use acquire::DbAcquire;
pub use discord::Invocation;

use crate::error::Error;
use crate::utils::code;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt::{self, Display};
use std::time::Duration;
use tracing::{debug, warn};

pub const CONFIRM_EMOJI: &str = "\u{2705}";
pub const DENY_EMOJI: &str = "\u{274c}";

const SELECTION_TIMEOUT: Duration = Duration::from_secs(10);
const SELECTION_TRIES: usize = 3;

/// The chat-side operations a context needs from the platform.
///
/// Waits are scoped to the invoking author: replies must come from the author in
/// the invoking channel, and reactions must be added by the author.
#[async_trait]
pub trait Transport: Send + Sync {
    type Message: Send + Sync;

    async fn send(&self, content: String) -> Result<Self::Message, Error>;

    async fn add_reaction(&self, message: &Self::Message, emoji: &str) -> Result<(), Error>;

    async fn delete(&self, message: &Self::Message) -> Result<(), Error>;

    /// Whether the bot may add reactions in the invoking channel.
    async fn can_add_reactions(&self) -> Result<bool, Error>;

    /// Next reply whose content passes `accept`, or `None` on timeout.
    async fn wait_for_reply(
        &self,
        accept: for<'s> fn(&'s str) -> bool,
        timeout: Duration,
    ) -> Option<String>;

    /// Next reaction on `message` that is one of `choices`, or `None` on timeout.
    async fn wait_for_reaction(
        &self,
        message: &Self::Message,
        choices: &[&str],
        timeout: Duration,
    ) -> Option<String>;

    /// Qualified name of the command being executed.
    fn command_name(&self) -> String;

    async fn render_help(&self, command: &str) -> Result<(), Error>;
}

#[async_trait]
pub trait ConnectionPool: Send + Sync {
    type Connection: Send + Sync;

    async fn acquire(&self, timeout: Option<Duration>) -> Result<Self::Connection, Error>;

    async fn release(&self, conn: Self::Connection);
}

/// Options for [`InvocationContext::prompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOptions {
    pub timeout: Duration,
    /// Delete the prompt message once it resolves.
    pub delete_after: bool,
    /// Hand the held connection back to the pool while waiting.
    pub reacquire: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            delete_after: true,
            reacquire: true,
        }
    }
}

impl PromptOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn delete_after(mut self, delete_after: bool) -> Self {
        self.delete_after = delete_after;
        self
    }

    pub fn reacquire(mut self, reacquire: bool) -> Self {
        self.reacquire = reacquire;
        self
    }
}

pub struct InvocationContext<T, P: ConnectionPool> {
    transport: T,
    pool: P,
    db: Option<P::Connection>,
    prompt_defaults: PromptOptions,
}

impl<T, P: ConnectionPool> fmt::Debug for InvocationContext<T, P> {
    // Identical for every invocation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext").finish_non_exhaustive()
    }
}

impl<T: Transport, P: ConnectionPool> InvocationContext<T, P> {
    pub fn new(transport: T, pool: P) -> Self {
        Self {
            transport,
            pool,
            db: None,
            prompt_defaults: PromptOptions::default(),
        }
    }

    pub fn with_prompt_defaults(mut self, options: PromptOptions) -> Self {
        self.prompt_defaults = options;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// The currently held connection, if one has been acquired.
    pub fn db(&mut self) -> Option<&mut P::Connection> {
        self.db.as_mut()
    }

    pub fn is_acquired(&self) -> bool {
        self.db.is_some()
    }

    pub fn prompt_options(&self) -> PromptOptions {
        self.prompt_defaults
    }

    pub async fn send(&self, content: impl Into<String>) -> Result<T::Message, Error> {
        self.transport.send(content.into()).await
    }

    /// Reply with `label: value` lines in a code block, labels left-aligned.
    pub async fn entry_to_code<L, V>(&self, entries: &[(L, V)]) -> Result<T::Message, Error>
    where
        L: AsRef<str>,
        V: Display,
    {
        self.transport.send(code::entry_block(entries)).await
    }

    /// Reply with `label: value` lines in a code block, labels right-aligned.
    pub async fn indented_entry_to_code<L, V>(
        &self,
        entries: &[(L, V)],
    ) -> Result<T::Message, Error>
    where
        L: AsRef<str>,
        V: Display,
    {
        self.transport.send(code::indented_entry_block(entries)).await
    }

    pub fn tick(&self, opt: bool, label: Option<&str>) -> String {
        code::tick(opt, label)
    }

    /// Ask the author to pick one of `matches` by its 1-based number.
    ///
    /// The author gets three attempts, each waiting up to ten seconds. Messages
    /// that are not plain numbers are ignored; out-of-range numbers use up an
    /// attempt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interaction`] when a wait times out or every attempt
    /// was used up, and propagates transport failures.
    pub async fn too_many_matches<M, F>(&self, mut matches: Vec<M>, entry: F) -> Result<M, Error>
    where
        F: Fn(usize, &M) -> String,
    {
        self.send("There are too many matches... Which one did you mean? **Only say the number**.")
            .await?;

        let listing = matches
            .iter()
            .enumerate()
            .map(|(i, candidate)| entry(i + 1, candidate))
            .collect::<Vec<_>>()
            .join("\n");
        self.transport.send(listing).await?;

        for round in 0..SELECTION_TRIES {
            let reply = self
                .transport
                .wait_for_reply(is_number, SELECTION_TIMEOUT)
                .await;
            let Some(reply) = reply else {
                debug!(round, "Selection timed out");
                return Err(Error::interaction("Took too long. Goodbye."));
            };

            let picked = reply
                .parse::<usize>()
                .ok()
                .filter(|index| (1..=matches.len()).contains(index));

            if let Some(index) = picked {
                debug!(round, index, "Selection made");
                return Ok(matches.swap_remove(index - 1));
            }

            let remaining = SELECTION_TRIES - round - 1;
            self.send(format!(
                "Please give me a valid number. {remaining} tries remaining..."
            ))
            .await?;
        }

        Err(Error::interaction("Too many tries. Goodbye."))
    }

    /// An interactive reaction confirmation dialog.
    ///
    /// Returns `Some(true)` on an explicit confirm, `Some(false)` on an explicit
    /// deny and `None` when the prompt timed out.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MissingPermission`] before sending anything when the
    /// bot cannot add reactions in the channel, or with the lookup error when
    /// its permissions there cannot be resolved.
    pub async fn prompt(
        &mut self,
        message: &str,
        options: PromptOptions,
    ) -> Result<Option<bool>, Error> {
        if !self.transport.can_add_reactions().await? {
            return Err(Error::MissingPermission("Add Reactions"));
        }

        let content =
            format!("{message}\n\nReact with {CONFIRM_EMOJI} to confirm or {DENY_EMOJI} to deny.");
        let msg = self.transport.send(content).await?;

        for emoji in [CONFIRM_EMOJI, DENY_EMOJI] {
            self.transport.add_reaction(&msg, emoji).await?;
        }

        if options.reacquire {
            self.release().await;
        }

        let reaction = self
            .transport
            .wait_for_reaction(&msg, &[CONFIRM_EMOJI, DENY_EMOJI], options.timeout)
            .await;

        let confirm = match reaction.as_deref() {
            Some(CONFIRM_EMOJI) => Some(true),
            Some(DENY_EMOJI) => Some(false),
            _ => None,
        };
        debug!(?confirm, "Prompt resolved");

        let reacquired = if options.reacquire {
            self.acquire(None).await.map(|_| ())
        } else {
            Ok(())
        };

        if options.delete_after {
            if let Err(e) = self.transport.delete(&msg).await {
                warn!(error = %e, "Failed to delete prompt message");
            }
        }

        reacquired?;
        Ok(confirm)
    }

    /// Acquires a database connection from the pool.
    ///
    /// Await the returned token to get the connection, or use
    /// [`DbAcquire::scope`] to release it automatically afterwards:
    ///
    /// ```ignore
    /// let conn = ctx.acquire(None).await?;
    /// sqlx::query("SELECT 1").execute(&mut **conn).await?;
    /// ctx.release().await;
    /// ```
    pub fn acquire(&mut self, timeout: Option<Duration>) -> DbAcquire<'_, T, P> {
        DbAcquire::new(self, timeout)
    }

    async fn acquire_held(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<&mut P::Connection, Error> {
        let conn = match self.db.take() {
            Some(conn) => conn,
            None => {
                let conn = self.pool.acquire(timeout).await?;
                debug!(?timeout, "Acquired database connection");
                conn
            }
        };
        Ok(self.db.insert(conn))
    }

    /// Releases the database connection back to the pool.
    ///
    /// Useful for long interactive commands that want to give the connection
    /// back and acquire it again later. Does nothing when no connection is held.
    pub async fn release(&mut self) {
        if let Some(conn) = self.db.take() {
            self.pool.release(conn).await;
            debug!("Released database connection");
        }
    }

    /// Run a command body with this context, releasing any held connection once
    /// the body finishes, whatever its outcome.
    pub async fn run<R, F>(mut self, body: F) -> Result<R, Error>
    where
        F: for<'b> FnOnce(&'b mut Self) -> BoxFuture<'b, Result<R, Error>>,
    {
        let result = body(&mut self).await;
        self.release().await;
        result
    }

    /// Shows help for `command`, or for the current command when none is given.
    pub async fn show_help(&self, command: Option<&str>) -> Result<(), Error> {
        let command = match command {
            Some(name) => name.to_string(),
            None => self.transport.command_name(),
        };
        self.transport.render_help(&command).await
    }
}

fn is_number(content: &str) -> bool {
    !content.is_empty() && content.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Discord API error: {0}")]
    Discord(#[from] Box<serenity::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An interactive step was abandoned (timed out or ran out of tries).
    #[error("Interaction ended: {0}")]
    Interaction(String),

    #[error("Could not resolve the {0} for this invocation")]
    NotFound(&'static str),

    #[error("Bot does not have {0} permission.")]
    MissingPermission(&'static str),
}

impl From<serenity::Error> for Error {
    fn from(err: serenity::Error) -> Self {
        Error::Discord(Box::new(err))
    }
}

impl Error {
    pub fn interaction(msg: impl Into<String>) -> Self {
        Error::Interaction(msg.into())
    }

    pub fn user_message(&self) -> String {
        match self {
            Error::Discord(_) => "Failed to communicate with Discord. Please try again.".into(),
            Error::Config(msg) => msg.clone(),
            Error::Database(sqlx::Error::PoolTimedOut) => {
                "The database is busy right now. Please try again in a moment.".into()
            }
            Error::Database(_) => "A database error occurred. Please try again later.".into(),
            Error::Interaction(msg) => msg.clone(),
            Error::NotFound(_) => "Could not look up this channel. Please try again.".into(),
            Error::MissingPermission(perm) => {
                format!("I need the **{perm}** permission in this channel to do that.")
            }
        }
    }
}

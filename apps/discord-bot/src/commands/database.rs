use crate::context::Invocation;
use crate::utils::{code, embeds};
use crate::Context;
use tracing::{info, warn};

type Error = crate::error::Error;

const IDLE_SESSIONS: &str = "SELECT count(*) FROM pg_stat_activity \
     WHERE datname = current_database() AND state = 'idle' AND pid <> pg_backend_pid()";

const TERMINATE_IDLE_SESSIONS: &str = "SELECT count(*) FILTER (WHERE pg_terminate_backend(pid)) \
     FROM pg_stat_activity \
     WHERE datname = current_database() AND state = 'idle' AND pid <> pg_backend_pid()";

/// Show database connectivity and pool usage.
#[poise::command(slash_command, prefix_command)]
pub async fn dbinfo(ctx: Context<'_>) -> Result<(), Error> {
    Invocation::from_poise(ctx)
        .run(|cx| {
            Box::pin(async move {
                let stats = cx
                    .acquire(None)
                    .scope(|conn| {
                        Box::pin(async move {
                            let row: (String, String) =
                                sqlx::query_as("SELECT version(), now()::text")
                                    .fetch_one(&mut **conn)
                                    .await?;
                            Ok(row)
                        })
                    })
                    .await;

                let mut entries = match stats {
                    Ok((version, now)) => vec![
                        ("Status", code::tick(true, Some("connected"))),
                        ("Server", version),
                        ("Clock", now),
                    ],
                    Err(e) => {
                        warn!(error = %e, "Database stats query failed");
                        vec![
                            ("Status", code::tick(false, Some("unreachable"))),
                            ("Error", e.user_message()),
                        ]
                    }
                };
                entries.push(("Pool size", cx.pool().size().to_string()));
                entries.push(("Idle", cx.pool().num_idle().to_string()));

                cx.indented_entry_to_code(&entries).await?;
                Ok(())
            })
        })
        .await
}

/// Terminate idle sessions on the bot's database.
#[poise::command(slash_command, prefix_command, owners_only)]
pub async fn purge_idle(ctx: Context<'_>) -> Result<(), Error> {
    Invocation::from_poise(ctx)
        .run(|cx| {
            Box::pin(async move {
                let conn = cx.acquire(None).await?;
                let (idle,): (i64,) = sqlx::query_as(IDLE_SESSIONS).fetch_one(&mut **conn).await?;

                if idle == 0 {
                    cx.send("No idle sessions to terminate.").await?;
                    return Ok(());
                }

                let options = cx.prompt_options();
                let question = format!("Terminate **{idle}** idle database sessions?");
                match cx.prompt(&question, options).await? {
                    Some(true) => {}
                    Some(false) => {
                        cx.send("Cancelled.").await?;
                        return Ok(());
                    }
                    None => {
                        cx.send("Took too long. Nothing was terminated.").await?;
                        return Ok(());
                    }
                }

                // The prompt handed the connection back while it waited.
                let conn = cx.acquire(None).await?;
                let (terminated,): (i64,) = sqlx::query_as(TERMINATE_IDLE_SESSIONS)
                    .fetch_one(&mut **conn)
                    .await?;
                cx.release().await;

                info!(terminated, "Terminated idle database sessions");

                let embed = embeds::success_embed()
                    .title("Idle sessions terminated")
                    .description(format!("Requested by {}", cx.transport().author().name))
                    .field("Terminated", terminated.to_string(), true);
                cx.transport()
                    .send(poise::CreateReply::default().embed(embed))
                    .await?;
                Ok(())
            })
        })
        .await
}

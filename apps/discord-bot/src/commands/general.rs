use crate::context::Invocation;
use crate::utils::embeds;
use crate::Context;

type Error = crate::error::Error;

/// Check bot latency.
#[poise::command(slash_command, prefix_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let start = std::time::Instant::now();
    let msg = ctx.say("Pong!").await?;
    let api_latency = start.elapsed().as_millis();

    let embed = embeds::brand_embed().title("Pong!").field(
        "API Latency",
        format!("{}ms", api_latency),
        true,
    );

    msg.edit(ctx, poise::CreateReply::default().content("").embed(embed))
        .await?;

    Ok(())
}

/// Show bot info.
#[poise::command(slash_command, prefix_command)]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let uptime = ctx.data().start_time.elapsed();
    let hours = uptime.as_secs() / 3600;
    let minutes = (uptime.as_secs() % 3600) / 60;
    let seconds = uptime.as_secs() % 60;

    let invocation = Invocation::from_poise(ctx);
    let application = invocation.http().get_current_application_info().await?;
    invocation
        .entry_to_code(&[
            ("Application", application.name),
            ("Version", ctx.data().config.bot_version.clone()),
            ("Uptime", format!("{hours}h {minutes}m {seconds}s")),
            ("Commands", ctx.framework().options().commands.len().to_string()),
            ("Language", "Rust + Serenity/Poise".to_string()),
        ])
        .await?;
    Ok(())
}

/// Find a command by part of its name and show its help.
#[poise::command(slash_command, prefix_command)]
pub async fn lookup(
    ctx: Context<'_>,
    #[description = "Part of a command name"] query: String,
) -> Result<(), Error> {
    let query = query.to_lowercase();
    let mut matches: Vec<String> = ctx
        .framework()
        .options()
        .commands
        .iter()
        .map(|command| command.qualified_name.clone())
        .filter(|name| name.contains(&query))
        .collect();

    let invocation = Invocation::from_poise(ctx);
    let name = match matches.len() {
        0 => {
            ctx.say(format!("No command matches `{query}`.")).await?;
            return Ok(());
        }
        1 => matches.remove(0),
        _ => {
            invocation
                .too_many_matches(matches, |i, name| format!("{i}: `{name}`"))
                .await?
        }
    };

    invocation.show_help(Some(&name)).await
}

/// List all available commands.
#[poise::command(slash_command, prefix_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to get help for"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), Error> {
    render_help(ctx, command.as_deref()).await
}

/// Render the help page for `command`, or the command list when `None`.
pub async fn render_help(ctx: Context<'_>, command: Option<&str>) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        command,
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Built with Rust + Poise",
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

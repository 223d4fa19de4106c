use serenity::all::CreateEmbed;

/// Colors used across bot embeds.
pub struct Colors;

impl Colors {
    pub const BRAND: u32 = 0x5865F2;
    pub const SUCCESS: u32 = 0x00FF7F;
    pub const ERROR: u32 = 0xFF4444;
}

/// Create a standard embed with default color, footer, and timestamp.
pub fn brand_embed() -> CreateEmbed {
    base_embed(Colors::BRAND)
}

/// Create a success-themed embed (green).
pub fn success_embed() -> CreateEmbed {
    base_embed(Colors::SUCCESS)
}

/// Create an error-themed embed (red).
pub fn error_embed() -> CreateEmbed {
    base_embed(Colors::ERROR)
}

fn base_embed(color: u32) -> CreateEmbed {
    CreateEmbed::default()
        .color(color)
        .footer(serenity::all::CreateEmbedFooter::new(concat!(
            "discord-context v",
            env!("CARGO_PKG_VERSION")
        )))
        .timestamp(serenity::model::Timestamp::now())
}

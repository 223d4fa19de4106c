pub mod code;
pub mod embeds;

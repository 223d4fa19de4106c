use std::fmt::Display;

/// Zero-width space; keeps Discord from trimming the padding of right-aligned lines.
pub const ZERO_WIDTH_SPACE: char = '\u{200b}';

pub const TICK_YES: &str = "<:check:316583761540022272>";
pub const TICK_NO: &str = "<:xmark:316583761699536896>";

/// Render `label: value` pairs as a left-aligned code block.
pub fn entry_block<L, V>(entries: &[(L, V)]) -> String
where
    L: AsRef<str>,
    V: Display,
{
    render(entries, |label, width| format!("{label:<width$}"))
}

/// Render `label: value` pairs as a right-aligned code block.
pub fn indented_entry_block<L, V>(entries: &[(L, V)]) -> String
where
    L: AsRef<str>,
    V: Display,
{
    render(entries, |label, width| {
        format!("{ZERO_WIDTH_SPACE}{label:>width$}")
    })
}

fn render<L, V>(entries: &[(L, V)], pad: impl Fn(&str, usize) -> String) -> String
where
    L: AsRef<str>,
    V: Display,
{
    let width = entries
        .iter()
        .map(|(label, _)| label.as_ref().chars().count())
        .max()
        .unwrap_or(0);

    let mut output = vec!["```".to_string()];
    for (label, value) in entries {
        output.push(format!("{}: {value}", pad(label.as_ref(), width)));
    }
    output.push("```".to_string());
    output.join("\n")
}

/// Map a boolean to the check/cross glyph, optionally labelled.
pub fn tick(opt: bool, label: Option<&str>) -> String {
    let emoji = if opt { TICK_YES } else { TICK_NO };
    match label {
        Some(label) => format!("{emoji}: {label}"),
        None => emoji.to_string(),
    }
}

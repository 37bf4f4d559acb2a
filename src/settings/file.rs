//! Reading and writing the generated `settings.py` file.
//!
//! Each setting is one `NAME = literal` line where the literal is `True`,
//! `False`, a decimal integer or a double-quoted string. Quotes inside
//! strings are escaped as `\"`; nothing else is escaped.

use std::fmt::Write;

use super::{SettingValue, SettingsError};

pub const HEADER: &str = "# OpenAFS RobotTest Settings\n\
                          # Please use afs-robotest setup to change this file.\n";

/// Render a value the way it appears on the right of `=`.
pub fn literal(value: &SettingValue) -> String {
    match value {
        SettingValue::Bool(true) => "True".to_string(),
        SettingValue::Bool(false) => "False".to_string(),
        SettingValue::Int(n) => n.to_string(),
        SettingValue::Str(s) => format!("\"{}\"", s.replace('"', "\\\"")),
    }
}

/// Render the whole file; `entries` are written in the order given.
pub fn render<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a SettingValue)>,
{
    let mut out = String::from(HEADER);
    for (name, value) in entries {
        let _ = writeln!(out, "{:<24} = {}", name, literal(value));
    }
    out
}

/// Parse a literal written by [`literal`].
///
/// Single-quoted strings are accepted as well since the file may be
/// edited by hand.
pub fn parse_literal(text: &str) -> Option<SettingValue> {
    let text = text.trim();
    match text {
        "True" => return Some(SettingValue::Bool(true)),
        "False" => return Some(SettingValue::Bool(false)),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(SettingValue::Int(n));
    }
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            let inner = &text[1..text.len() - 1];
            let escaped = format!("\\{}", quote);
            return Some(SettingValue::Str(inner.replace(&escaped, &quote.to_string())));
        }
    }
    None
}

fn parse_line(number: usize, line: &str) -> Result<(String, SettingValue), SettingsError> {
    let parse_error = |message: &str| SettingsError::Parse {
        line: number,
        message: message.to_string(),
    };
    let (name, value) = line
        .split_once('=')
        .ok_or_else(|| parse_error("expected NAME = value"))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(parse_error("invalid setting name"));
    }
    let value = parse_literal(value).ok_or_else(|| parse_error("unsupported value"))?;
    Ok((name.to_string(), value))
}

/// Parse the contents of a settings file, one result per setting line.
///
/// A bad line does not stop the lines after it from being read.
pub fn parse(contents: &str) -> Vec<Result<(String, SettingValue), SettingsError>> {
    contents
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| parse_line(number, line))
        .collect()
}

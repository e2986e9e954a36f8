//! JSON decoding with errors that point at the offending field.

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;

/// Characters of context shown on either side of a parse error.
const SNIPPET_RADIUS: usize = 16;

/// Decode `body`, reporting the serde path, a readable type mismatch and a
/// snippet of the failing line when decoding fails.
pub fn parse_json_with_context<T: DeserializeOwned>(body: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let inner = err.inner();
        let (line, column) = (inner.line(), inner.column());
        let path = err.path().to_string();

        let message = inner.to_string();
        let suffix = format!(" at line {line} column {column}");
        let message = message.strip_suffix(&suffix).unwrap_or(&message);

        let location = if path.is_empty() || path == "." {
            String::new()
        } else {
            format!("at path '{path}': ")
        };
        anyhow!(
            "{location}{} (line {line} col {column})\n{}",
            describe_mismatch(message),
            snippet(body, line, column)
        )
    })
}

/// Turn `invalid type: null, expected a string` into `expected a string, got null`.
fn describe_mismatch(message: &str) -> String {
    if let Some(rest) = message.strip_prefix("invalid type: ")
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {expected}, got {actual}");
    }
    message.to_owned()
}

/// The text around `column` on `line` (both 1-based) with a caret underneath.
fn snippet(body: &str, line: usize, column: usize) -> String {
    let target = body.lines().nth(line.saturating_sub(1)).unwrap_or("");
    if target.is_empty() {
        return "(empty line)".to_owned();
    }

    let chars: Vec<char> = target.chars().collect();
    let at = column.saturating_sub(1).min(chars.len());
    let start = at.saturating_sub(SNIPPET_RADIUS);
    let end = (at + SNIPPET_RADIUS).min(chars.len());
    let excerpt: String = chars[start..end].iter().collect();

    format!("...{excerpt}...\n   {}^", " ".repeat(at - start))
}

//! Best-effort structured extraction from free-form model replies.
//!
//! Providers are asked for JSON but often wrap it in prose or code fences.
//! Callers take the first balanced `{...}` block and decide for themselves
//! what to do when nothing usable is found.

use serde::de::DeserializeOwned;

/// Returns the first balanced `{...}` block in `text`, skipping braces that
/// appear inside JSON strings.
pub fn first_json_object(text: &str) -> Option<&str> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| balanced_from(text, start))
}

fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => (),
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => (),
        }
    }
    None
}

/// Parses the first JSON object in `text` as `T`.
pub fn parse_first<T: DeserializeOwned>(text: &str) -> Option<T> {
    let block = first_json_object(text)?;
    match serde_json::from_str(block) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Discarding unparsable JSON block: {}", e);
            None
        }
    }
}

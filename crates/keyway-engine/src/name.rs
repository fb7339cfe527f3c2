//! Keyword name normalization
//!
//! Keywords are looked up ignoring case, spaces and underscores, so
//! `Do Something`, `do_something` and `doSomething` all address the same
//! operation.

/// Normalize a keyword name for lookup
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Human readable form of a code-style name.
///
/// Splits on underscores, whitespace and camel-case humps and capitalizes
/// each word: `do_something` → `Do Something`, `getHTTPCode` → `Get HTTP Code`.
pub fn printable_name(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for token in name.split(|c: char| c == '_' || c.is_whitespace()) {
        split_humps(token, &mut words);
    }
    words
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_humps(token: &str, words: &mut Vec<String>) {
    let chars: Vec<char> = token.chars().collect();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !current.is_empty() && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

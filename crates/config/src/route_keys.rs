/// Route key that always runs, whatever else is configured.
pub const DEFAULT_ROUTE_KEY: &str = "default";

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '/' | '\\')
}

/// Split every entry on separators, drop blanks, append the default key and
/// dedupe keeping first occurrences.
pub fn normalize_route_keys<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let split = entries
        .iter()
        .flat_map(|entry| entry.as_ref().split(is_separator))
        .chain(std::iter::once(DEFAULT_ROUTE_KEY));
    for key in split {
        let key = key.trim();
        if !key.is_empty() && !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// Split `input` on `delimiter`, treating double-quoted spans as opaque.
///
/// Quotes are kept in the produced tokens and every token is trimmed. An
/// unmatched quote swallows the rest of the input into the current token.
/// Empty input yields a single empty token.
pub fn split_quoted(input: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in input.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            parts.push(input[start..i].trim().to_string());
            start = i + c.len_utf8();
        }
    }

    parts.push(input[start..].trim().to_string());
    parts
}

/// Strip surrounding double quotes, resolving JSON string escapes.
/// Tokens that are not a well-formed quoted string come back unchanged.
pub fn unquote(token: &str) -> String {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        if let Ok(s) = serde_json::from_str::<String>(token) {
            return s;
        }
    }
    token.to_string()
}

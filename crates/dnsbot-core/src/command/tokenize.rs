//! Whitespace tokenizer that keeps quoted segments together
//!
//! A quote only opens at the start of a token, so apostrophes inside a word
//! stay literal. An unterminated quote runs to the end of the line.

/// Split a command line into tokens
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if !in_token && (c == '"' || c == '\'') => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(current);
    }

    tokens
}

/// A whole flow reply as one value
///
/// A reply that starts with a quote and tokenizes to a single token loses
/// its quotes, the same as it would on a command line. Anything else is
/// taken as typed, inner spaces included.
pub fn unquote(input: &str) -> String {
    let trimmed = input.trim();
    if !trimmed.starts_with(['"', '\'']) {
        return trimmed.to_string();
    }
    match tokenize(trimmed).as_slice() {
        [only] => only.clone(),
        _ => trimmed.to_string(),
    }
}

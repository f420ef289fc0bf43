//! PHP literal values and their source spellings

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("invalid integer literal `{0}`")]
    InvalidInteger(String),

    #[error("invalid float literal `{0}`")]
    InvalidFloat(String),

    #[error("unterminated string literal")]
    UnterminatedString,
}

/// Parse an integer literal in any PHP base (`42`, `0x2A`, `0b101`, `0o17`, `017`, `1_000`).
///
/// Returns `Ok(None)` when the value overflows `i64`; PHP turns such literals into floats.
pub fn parse_integer(text: &str) -> Result<Option<i64>, LiteralError> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();

    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(LiteralError::InvalidInteger(text.to_string()));
    }

    Ok(i64::from_str_radix(digits, radix).ok())
}

pub fn parse_float(text: &str) -> Result<f64, LiteralError> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| LiteralError::InvalidFloat(text.to_string()))
}

/// Decode a quoted string literal.
///
/// Single-quoted strings only unescape `\'` and `\\`; double-quoted strings
/// handle the common escapes. Nowdoc and heredoc bodies are returned with
/// their markers stripped.
pub fn unescape_string(text: &str) -> Result<String, LiteralError> {
    let text = text.trim();
    let text = text.strip_prefix(['b', 'B']).filter(|t| t.starts_with(['\'', '"'])).unwrap_or(text);

    if let Some(body) = text.strip_prefix('\'') {
        let body = body.strip_suffix('\'').ok_or(LiteralError::UnterminatedString)?;
        return Ok(unescape_single(body));
    }

    if let Some(body) = text.strip_prefix('"') {
        let body = body.strip_suffix('"').ok_or(LiteralError::UnterminatedString)?;
        return Ok(unescape_double(body));
    }

    if let Some(rest) = text.strip_prefix("<<<") {
        let (header, body) = rest.split_once('\n').ok_or(LiteralError::UnterminatedString)?;
        let nowdoc = header.trim().starts_with('\'');
        let body = body.rsplit_once('\n').map(|(body, _)| body).unwrap_or("");
        return Ok(if nowdoc { body.to_string() } else { unescape_double(body) });
    }

    Err(LiteralError::UnterminatedString)
}

fn unescape_single(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('\'') | Some('\\') => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

fn unescape_double(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('v') => out.push('\u{0B}'),
            Some('e') => out.push('\u{1B}'),
            Some('f') => out.push('\u{0C}'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('$') => out.push('$'),
            Some('"') => out.push('"'),
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_bases() {
        assert_eq!(parse_integer("42"), Ok(Some(42)));
        assert_eq!(parse_integer("0x2A"), Ok(Some(42)));
        assert_eq!(parse_integer("0b101010"), Ok(Some(42)));
        assert_eq!(parse_integer("052"), Ok(Some(42)));
        assert_eq!(parse_integer("0o52"), Ok(Some(42)));
        assert_eq!(parse_integer("1_000"), Ok(Some(1000)));
        assert_eq!(parse_integer("0"), Ok(Some(0)));
    }

    #[test]
    fn test_parse_integer_overflow_and_errors() {
        assert_eq!(parse_integer("99999999999999999999"), Ok(None));
        assert!(parse_integer("0xZZ").is_err());
        assert!(parse_integer("").is_err());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("1.5"), Ok(1.5));
        assert_eq!(parse_float("1e3"), Ok(1000.0));
        assert!(parse_float("abc").is_err());
    }

    #[test]
    fn test_unescape_strings() {
        assert_eq!(unescape_string("'it\\'s'"), Ok("it's".to_string()));
        assert_eq!(unescape_string("'a\\nb'"), Ok("a\\nb".to_string()));
        assert_eq!(unescape_string("\"a\\nb\""), Ok("a\nb".to_string()));
        assert_eq!(unescape_string("\"\\d\""), Ok("\\d".to_string()));
        assert_eq!(unescape_string("<<<'EOT'\nraw\\n\nEOT"), Ok("raw\\n".to_string()));
        assert_eq!(unescape_string("'open"), Err(LiteralError::UnterminatedString));
    }
}

//! Tokenizer for binding expressions.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

// Longest first so `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "++", "--", "+=", "-=", "*=", "/=",
    "+", "-", "*", "/", "%", "<", ">", "!", "=", "?", ":", ".", ",", ";", "(", ")", "[", "]",
    "{", "}",
];

/// Split `source` into tokens, ending with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && peek_digit(&chars, i + 1)) {
            let (number, next) = read_number(&chars, i, source)?;
            tokens.push(Token { kind: TokenKind::Number(number), offset });
            i = next;
            continue;
        }

        if c == '"' || c == '\'' {
            let (text, next) = read_string(&chars, i, c)?;
            tokens.push(Token { kind: TokenKind::String(text), offset });
            i = next;
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_part(chars[i].1) {
                i += 1;
            }
            let name: String = chars[start..i].iter().map(|(_, c)| *c).collect();
            tokens.push(Token { kind: TokenKind::Ident(name), offset });
            continue;
        }

        let rest = &source[offset..];
        match PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            Some(punct) => {
                tokens.push(Token { kind: TokenKind::Punct(punct), offset });
                i += punct.chars().count();
            }
            None => return Err(ParseError::new(format!("unexpected character '{}'", c), offset)),
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn peek_digit(chars: &[(usize, char)], i: usize) -> bool {
    chars.get(i).is_some_and(|(_, c)| c.is_ascii_digit())
}

fn read_number(
    chars: &[(usize, char)],
    start: usize,
    source: &str,
) -> Result<(f64, usize), ParseError> {
    let offset = chars[start].0;

    if chars[start].1 == '0' && matches!(chars.get(start + 1), Some((_, 'x' | 'X'))) {
        let mut i = start + 2;
        while i < chars.len() && chars[i].1.is_ascii_hexdigit() {
            i += 1;
        }
        let digits: String = chars[start + 2..i].iter().map(|(_, c)| *c).collect();
        return i64::from_str_radix(&digits, 16)
            .map(|n| (n as f64, i))
            .map_err(|_| ParseError::new("invalid hex literal", offset));
    }

    let mut i = start;
    let mut seen_dot = false;
    let mut seen_exp = false;
    while i < chars.len() {
        let c = chars[i].1;
        if c.is_ascii_digit() {
            i += 1;
        } else if c == '.' && !seen_dot && !seen_exp {
            seen_dot = true;
            i += 1;
        } else if (c == 'e' || c == 'E') && !seen_exp {
            seen_exp = true;
            i += 1;
            if matches!(chars.get(i), Some((_, '+' | '-'))) {
                i += 1;
            }
        } else {
            break;
        }
    }

    let end = chars.get(i).map(|(o, _)| *o).unwrap_or(source.len());
    source[offset..end]
        .parse::<f64>()
        .map(|n| (n, i))
        .map_err(|_| ParseError::new("invalid number literal", offset))
}

fn read_string(
    chars: &[(usize, char)],
    start: usize,
    quote: char,
) -> Result<(String, usize), ParseError> {
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((out, i + 1));
        }
        if c == '\\' {
            i += 1;
            let Some(&(_, escaped)) = chars.get(i) else { break };
            out.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                other => other,
            });
        } else {
            out.push(c);
        }
        i += 1;
    }
    Err(ParseError::new("unterminated string literal", chars[start].0))
}

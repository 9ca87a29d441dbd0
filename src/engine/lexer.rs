//! Tokenizer for calculator expressions

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Decimal literal, kept as text so it can be read exactly
    Number(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,
    LParen,
    RParen,
    Comma,
    /// `to`, `->` or `→`
    Convert,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(text) | TokenKind::Ident(text) => f.write_str(text),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Caret => f.write_str("^"),
            TokenKind::Bang => f.write_str("!"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Convert => f.write_str("to"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Whitespace separates this token from the previous one
    pub space_before: bool,
}

/// Split an (already unlocalized) expression into tokens
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut space_before = false;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            space_before = true;
            i += 1;
            continue;
        }

        let kind = if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i)) {
            let start = i;
            i = scan_number(&chars, i);
            TokenKind::Number(chars[start..i].iter().collect())
        } else if is_ident_start(c) {
            let start = i;
            i += 1;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if word == "to" {
                TokenKind::Convert
            } else {
                TokenKind::Ident(word)
            }
        } else {
            let (kind, width) = match (c, chars.get(i + 1)) {
                ('-', Some('>')) => (TokenKind::Convert, 2),
                ('*', Some('*')) => (TokenKind::Caret, 2),
                ('→', _) => (TokenKind::Convert, 1),
                ('+', _) => (TokenKind::Plus, 1),
                ('-', _) => (TokenKind::Minus, 1),
                ('*', _) => (TokenKind::Star, 1),
                ('/', _) => (TokenKind::Slash, 1),
                ('%', _) => (TokenKind::Percent, 1),
                ('^', _) => (TokenKind::Caret, 1),
                ('!', _) => (TokenKind::Bang, 1),
                ('(', _) => (TokenKind::LParen, 1),
                (')', _) => (TokenKind::RParen, 1),
                (',', _) => (TokenKind::Comma, 1),
                _ => return Err(format!("Unexpected character \"{}\".", c)),
            };
            i += width;
            kind
        };

        tokens.push(Token { kind, space_before });
        space_before = false;
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
}

/// Digits, an optional fraction and an optional exponent (`1.5e-3`).
/// An `e` not followed by digits is left for the identifier `e`.
fn scan_number(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '_' | '°' | '€' | 'π')
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '°' | '²' | '³')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators_and_numbers() {
        assert_eq!(
            kinds("2+3.5*(4)"),
            vec![
                TokenKind::Number("2".into()),
                TokenKind::Plus,
                TokenKind::Number("3.5".into()),
                TokenKind::Star,
                TokenKind::LParen,
                TokenKind::Number("4".into()),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_exponent_vs_constant_e() {
        assert_eq!(kinds("1e-3"), vec![TokenKind::Number("1e-3".into())]);
        assert_eq!(
            kinds("2e"),
            vec![TokenKind::Number("2".into()), TokenKind::Ident("e".into())]
        );
    }

    #[test]
    fn test_conversion_keywords() {
        for input in ["10 km to mi", "10 km -> mi", "10 km → mi"] {
            assert_eq!(kinds(input)[2], TokenKind::Convert, "{}", input);
        }
        assert_eq!(kinds("2**3")[1], TokenKind::Caret);
    }

    #[test]
    fn test_space_tracking() {
        let tokens = tokenize("2x 3").unwrap();
        assert!(!tokens[1].space_before);
        assert!(tokens[2].space_before);
    }

    #[test]
    fn test_unicode_identifiers() {
        assert_eq!(kinds("π"), vec![TokenKind::Ident("π".into())]);
        assert_eq!(kinds("m²"), vec![TokenKind::Ident("m²".into())]);
        assert_eq!(kinds("°C"), vec![TokenKind::Ident("°C".into())]);
    }

    #[test]
    fn test_unexpected_character() {
        assert!(tokenize("2 & 3").is_err());
    }
}

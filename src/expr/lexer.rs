//! Tokenizer for the condition DSL.
//!
//! Identifier runs accept `[A-Za-z0-9_.-]` (so `q3.1-a` lexes as one token)
//! and are checked against the keyword set *before* normalisation, matching
//! the reference evaluator's `_normalize_expr` behaviour exactly.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    And,
    Or,
    Not,
    In,
    Contains,
    Is,
    Defined,
    True,
    False,
    Null,
    EqEq,
    NotEq,
    Ident(String),
    Str(String),
    Num(f64),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
}

/// Replace any character outside `[0-9A-Za-z_]` with `_`; prefix a leading
/// digit with `_`. Applied to every identifier that isn't a reserved word.
pub fn normalize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }
        match ch {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '\'' | '"' => {
                let quote = ch;
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != quote {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(LexError::UnterminatedString);
                }
                let s: String = chars[start..i].iter().collect();
                tokens.push(Token::Str(s));
                i += 1; // closing quote
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::EqEq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) => {
                let start = i;
                if c == '-' {
                    i += 1;
                }
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let s: String = chars[start..i].iter().collect();
                let n: f64 = s.parse().map_err(|_| LexError::UnexpectedChar(c))?;
                tokens.push(Token::Num(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | '-'))
                {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                tokens.push(match raw.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "is" => Token::Is,
                    "defined" => Token::Defined,
                    "contains" => Token::Contains,
                    "True" | "true" | "TRUE" => Token::True,
                    "False" | "false" | "FALSE" => Token::False,
                    "None" | "null" | "Null" => Token::Null,
                    _ => Token::Ident(normalize_name(&raw)),
                });
            }
            other => return Err(LexError::UnexpectedChar(other)),
        }
    }
    tokens.push(Token::Eof);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dotted_identifier() {
        assert_eq!(normalize_name("q3.1-a"), "q3_1_a");
    }

    #[test]
    fn leading_digit_gets_prefixed() {
        assert_eq!(normalize_name("3abc"), "_3abc");
    }

    #[test]
    fn tokenizes_keyword_vs_identifier() {
        let toks = tokenize("q1 == True and not q2").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Ident("q1".into()),
                Token::EqEq,
                Token::True,
                Token::And,
                Token::Not,
                Token::Ident("q2".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_dotted_ident_as_single_token() {
        let toks = tokenize("q3.1-a == 'x'").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Ident("q3_1_a".into()),
                Token::EqEq,
                Token::Str("x".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_list_literal() {
        let toks = tokenize("X in [a, b, 'c']").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Ident("X".into()),
                Token::In,
                Token::LBracket,
                Token::Ident("a".into()),
                Token::Comma,
                Token::Ident("b".into()),
                Token::Comma,
                Token::Str("c".into()),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(matches!(tokenize("x == 'abc"), Err(LexError::UnterminatedString)));
    }
}

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::QueryError;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Name(String),
    Literal(String),
    Number(f64),
    Slash,
    DoubleSlash,
    Dot,
    DoubleDot,
    At,
    Star,
    Multiply,
    Pipe,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    ColonColon,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    And,
    Or,
    Div,
    Mod,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "name '{name}'"),
            Token::Literal(text) => write!(f, "literal \"{text}\""),
            Token::Number(number) => write!(f, "number {number}"),
            Token::Slash => f.write_str("'/'"),
            Token::DoubleSlash => f.write_str("'//'"),
            Token::Dot => f.write_str("'.'"),
            Token::DoubleDot => f.write_str("'..'"),
            Token::At => f.write_str("'@'"),
            Token::Star | Token::Multiply => f.write_str("'*'"),
            Token::Pipe => f.write_str("'|'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::ColonColon => f.write_str("'::'"),
            Token::Eq => f.write_str("'='"),
            Token::NotEq => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::LtEq => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::GtEq => f.write_str("'>='"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::And => f.write_str("'and'"),
            Token::Or => f.write_str("'or'"),
            Token::Div => f.write_str("'div'"),
            Token::Mod => f.write_str("'mod'"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Whether the previous token ends an operand, which turns `*` into
/// multiplication and `and`/`or`/`div`/`mod` into operators.
fn follows_operand(tokens: &[Spanned], star_counts: bool) -> bool {
    tokens.last().is_some_and(|last| match last.token {
        Token::RBracket
        | Token::RParen
        | Token::Literal(_)
        | Token::Number(_)
        | Token::Name(_)
        | Token::Dot
        | Token::DoubleDot => true,
        Token::Star => star_counts,
        _ => false,
    })
}

fn end_offset(source: &str, chars: &mut Peekable<CharIndices<'_>>) -> usize {
    chars.peek().map(|(offset, _)| *offset).unwrap_or(source.len())
}

fn number(
    source: &str,
    start: usize,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<Token, QueryError> {
    while chars
        .peek()
        .is_some_and(|(_, c)| c.is_ascii_digit() || *c == '.')
    {
        chars.next();
    }
    let raw = &source[start..end_offset(source, chars)];
    raw.parse()
        .map(Token::Number)
        .map_err(|_| QueryError::syntax(source, start, format!("malformed number '{raw}'")))
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, QueryError> {
    let mut tokens: Vec<Spanned> = Vec::with_capacity(16);
    let mut chars = source.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let next = chars.peek().map(|(_, c)| *c);
        let token = match c {
            c if c.is_whitespace() => continue,
            '/' if next == Some('/') => {
                chars.next();
                Token::DoubleSlash
            }
            '/' => Token::Slash,
            '.' if next == Some('.') => {
                chars.next();
                Token::DoubleDot
            }
            '.' if next.is_some_and(|c| c.is_ascii_digit()) => number(source, offset, &mut chars)?,
            '.' => Token::Dot,
            '@' => Token::At,
            '*' if follows_operand(&tokens, false) => Token::Multiply,
            '*' => Token::Star,
            '|' => Token::Pipe,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '=' => Token::Eq,
            '!' if next == Some('=') => {
                chars.next();
                Token::NotEq
            }
            '<' if next == Some('=') => {
                chars.next();
                Token::LtEq
            }
            '<' => Token::Lt,
            '>' if next == Some('=') => {
                chars.next();
                Token::GtEq
            }
            '>' => Token::Gt,
            ':' if next == Some(':') => {
                chars.next();
                Token::ColonColon
            }
            quote @ ('"' | '\'') => {
                let start = offset + quote.len_utf8();
                let mut end = None;
                for (position, c) in chars.by_ref() {
                    if c == quote {
                        end = Some(position);
                        break;
                    }
                }
                let end = end.ok_or_else(|| {
                    QueryError::syntax(source, offset, "unterminated string literal")
                })?;
                Token::Literal(source[start..end].to_string())
            }
            c if c.is_ascii_digit() => number(source, offset, &mut chars)?,
            c if is_name_start(c) => {
                while chars.peek().is_some_and(|(_, c)| is_name_char(*c)) {
                    chars.next();
                }
                let name = &source[offset..end_offset(source, &mut chars)];
                match name {
                    "and" if follows_operand(&tokens, true) => Token::And,
                    "or" if follows_operand(&tokens, true) => Token::Or,
                    "div" if follows_operand(&tokens, true) => Token::Div,
                    "mod" if follows_operand(&tokens, true) => Token::Mod,
                    _ => Token::Name(name.to_string()),
                }
            }
            other => {
                return Err(QueryError::syntax(
                    source,
                    offset,
                    format!("unexpected character '{other}'"),
                ))
            }
        };
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

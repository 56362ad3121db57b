//! Tokenizer for data literals

use std::fmt;

use crate::error::{ParseError, Result};

/// Literal token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer (decimal, hex or character literal)
    Int(i64),
    /// Float
    Float(f64),
    /// String with escapes resolved
    Str(String),
    /// Identifier (struct name)
    Ident(String),
    /// `nil`
    Nil,
    /// `-`
    Minus,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftCurly,
    /// `}`
    RightCurly,
    /// `,`
    Comma,
    /// One or more line breaks
    Linefeed,
    /// End of input
    EndOfFile,
}

impl Token {
    /// Whether a line break right after this token is insignificant
    fn continues_line(&self) -> bool {
        matches!(
            self,
            Self::Comma | Self::LeftBracket | Self::LeftCurly | Self::Minus | Self::Linefeed
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Ident(name) => f.write_str(name),
            Self::Nil => f.write_str("nil"),
            Self::Minus => f.write_str("-"),
            Self::LeftBracket => f.write_str("["),
            Self::RightBracket => f.write_str("]"),
            Self::LeftCurly => f.write_str("{"),
            Self::RightCurly => f.write_str("}"),
            Self::Comma => f.write_str(","),
            Self::Linefeed => f.write_str("linefeed"),
            Self::EndOfFile => f.write_str("end of file"),
        }
    }
}

/// Token with the line it started on
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token
    pub token: Token,
    /// 1-based source line
    pub line: u32,
}

/// Literal lexer.
///
/// Line breaks are significant as element separators, except at the start of
/// input and right after a token that cannot end an element (`,` `[` `{` `-`).
/// Consecutive line breaks, blank lines and comment-only lines produce a
/// single [`Token::Linefeed`].
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    prev: Option<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `src`
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            prev: None,
        }
    }

    /// Current line
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Lex the next token. After the end of input this keeps returning
    /// [`Token::EndOfFile`].
    pub fn next_token(&mut self) -> Result<Spanned> {
        let mut newline_line = None;
        loop {
            match self.peek_char() {
                Some(' ' | '\t' | '\r') => self.bump_char(),
                Some('\n') => {
                    newline_line.get_or_insert(self.line);
                    self.bump_char();
                    self.line += 1;
                }
                Some('/') if self.peek_next_char() == Some('/') => {
                    while self.peek_char().is_some_and(|c| c != '\n') {
                        self.bump_char();
                    }
                }
                _ => break,
            }
        }

        if let Some(line) = newline_line
            && self.prev.as_ref().is_some_and(|t| !t.continues_line())
        {
            return Ok(self.emit(Token::Linefeed, line));
        }

        let line = self.line;
        let Some(ch) = self.peek_char() else {
            return Ok(self.emit(Token::EndOfFile, line));
        };

        let token = match ch {
            '0'..='9' => self.lex_number()?,
            '"' => self.lex_string()?,
            '\'' => self.lex_char()?,
            c if c.is_alphabetic() || c == '_' => self.lex_ident(),
            _ => {
                self.bump_char();
                match ch {
                    '-' => Token::Minus,
                    '[' => Token::LeftBracket,
                    ']' => Token::RightBracket,
                    '{' => Token::LeftCurly,
                    '}' => Token::RightCurly,
                    ',' => Token::Comma,
                    _ => return Err(ParseError::syntax(line, format!("illegal token: `{ch}`"))),
                }
            }
        };
        Ok(self.emit(token, line))
    }

    fn emit(&mut self, token: Token, line: u32) -> Spanned {
        self.prev = Some(token.clone());
        Spanned { token, line }
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while self.peek_char().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump_char();
        }
        match &self.src[start..self.pos] {
            "nil" => Token::Nil,
            name => Token::Ident(name.to_string()),
        }
    }

    fn lex_number(&mut self) -> Result<Token> {
        let start = self.pos;
        if self.peek_char() == Some('0') && matches!(self.peek_next_char(), Some('x' | 'X')) {
            self.bump_char();
            self.bump_char();
            let digits = self.pos;
            while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump_char();
            }
            let text = &self.src[digits..self.pos];
            if text.is_empty() {
                return Err(self.error("hexadecimal literal needs digits"));
            }
            return u64::from_str_radix(text, 16)
                .map(|v| Token::Int(v as i64))
                .map_err(|_| self.error(format!("integer literal out of range: `{}`", &self.src[start..self.pos])));
        }

        self.eat_digits();
        let mut is_float = false;
        if self.peek_char() == Some('.') {
            is_float = true;
            self.bump_char();
            self.eat_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mark = self.pos;
            self.bump_char();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.bump_char();
            }
            if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.eat_digits();
            } else {
                // not an exponent; leave the `e` for the next token
                self.pos = mark;
            }
        }

        let text = &self.src[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.error(format!("malformed float literal: `{text}`")))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| self.error(format!("integer literal out of range: `{text}`")))
        }
    }

    fn lex_string(&mut self) -> Result<Token> {
        let line = self.line;
        self.bump_char();
        let mut out = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(ParseError::syntax(line, "unterminated string literal")),
                Some('"') => {
                    self.bump_char();
                    return Ok(Token::Str(out));
                }
                Some('\\') => out.push(self.lex_escape()?),
                Some(c) => {
                    self.bump_char();
                    out.push(c);
                }
            }
        }
    }

    fn lex_char(&mut self) -> Result<Token> {
        self.bump_char();
        let c = match self.peek_char() {
            Some('\\') => self.lex_escape()?,
            Some(c) if c != '\'' && c != '\n' => {
                self.bump_char();
                c
            }
            _ => return Err(self.error("empty character literal")),
        };
        if self.peek_char() != Some('\'') {
            return Err(self.error("unterminated character literal"));
        }
        self.bump_char();
        Ok(Token::Int(i64::from(u32::from(c))))
    }

    fn lex_escape(&mut self) -> Result<char> {
        self.bump_char();
        let Some(c) = self.peek_char() else {
            return Err(self.error("unterminated escape sequence"));
        };
        self.bump_char();
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '"' | '\'' | '\\' => c,
            'x' => {
                let start = self.pos;
                for _ in 0..2 {
                    if self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.bump_char();
                    }
                }
                let hex = &self.src[start..self.pos];
                match u8::from_str_radix(hex, 16) {
                    Ok(b) if hex.len() == 2 => char::from(b),
                    _ => return Err(self.error("`\\x` escape needs two hex digits")),
                }
            }
            _ => return Err(self.error(format!("unknown escape sequence: `\\{c}`"))),
        })
    }

    fn eat_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump_char();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn bump_char(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.line, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().unwrap().token;
            if t == Token::EndOfFile {
                return out;
            }
            out.push(t);
        }
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("Point{1, -2.5} [nil, \"hi\"]"),
            vec![
                Token::Ident("Point".into()),
                Token::LeftCurly,
                Token::Int(1),
                Token::Comma,
                Token::Minus,
                Token::Float(2.5),
                Token::RightCurly,
                Token::LeftBracket,
                Token::Nil,
                Token::Comma,
                Token::Str("hi".into()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("0x1F 42 1.5e3 2e-1 7. 'a'"),
            vec![
                Token::Int(31),
                Token::Int(42),
                Token::Float(1500.0),
                Token::Float(0.2),
                Token::Float(7.0),
                Token::Int(97),
            ]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            tokens(r#""a\n\t\"\\\x41\0""#),
            vec![Token::Str("a\n\t\"\\A\0".into())]
        );
        assert_eq!(tokens(r"'\n'"), vec![Token::Int(10)]);
    }

    #[test]
    fn test_linefeeds_collapse() {
        assert_eq!(
            tokens("\n\n1\n\n  // comment\n\n2\n"),
            vec![Token::Int(1), Token::Linefeed, Token::Int(2), Token::Linefeed]
        );
    }

    #[test]
    fn test_linefeed_after_separator_is_dropped() {
        assert_eq!(
            tokens("[\n1,\n2\n]"),
            vec![
                Token::LeftBracket,
                Token::Int(1),
                Token::Comma,
                Token::Int(2),
                Token::Linefeed,
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let mut lexer = Lexer::new("1\n\n  2");
        assert_eq!(lexer.next_token().unwrap().line, 1);
        let lf = lexer.next_token().unwrap();
        assert_eq!((lf.token, lf.line), (Token::Linefeed, 1));
        assert_eq!(lexer.next_token().unwrap().line, 3);
    }

    #[test]
    fn test_errors() {
        let err = Lexer::new("\"open").next_token().unwrap_err();
        assert_eq!(err.to_string(), "line 1: unterminated string literal");
        assert!(Lexer::new("@").next_token().is_err());
        assert!(Lexer::new("99999999999999999999").next_token().is_err());
        assert!(Lexer::new(r#""\q""#).next_token().is_err());
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().unwrap().token, Token::EndOfFile);
        assert_eq!(lexer.next_token().unwrap().token, Token::EndOfFile);
    }
}

//! Hand-rolled lexer, the first half of the parse-tree producer §6 treats
//! as an external collaborator. Produces a flat token stream with
//! line/column spans; never fails — an unrecognized character becomes a
//! [`TokenKind::Unknown`] token and lets the parser report `E999` with a
//! real position instead of the lexer aborting the whole pipeline.

use crate::ast::SourceLocation;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    Identifier(String),

    // Keywords
    Let,
    Const,
    Function,
    Class,
    Extends,
    If,
    Else,
    While,
    Do,
    For,
    Foreach,
    In,
    Break,
    Continue,
    Return,
    Switch,
    Case,
    Default,
    New,
    This,
    True,
    False,
    Null,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Colon,
    Comma,
    Dot,
    Question,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,

    Eof,
    Unknown(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLocation,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.advance();
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == b'*' && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let loc = self.loc();

        let Some(c) = self.peek() else {
            return Token {
                kind: TokenKind::Eof,
                loc,
            };
        };

        if c.is_ascii_digit() {
            return self.lex_number(loc);
        }
        if c == b'"' {
            return self.lex_string(loc);
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            return self.lex_identifier(loc);
        }

        self.advance();
        let kind = match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'?' => TokenKind::Question,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ne
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.advance();
                    TokenKind::AndAnd
                } else {
                    TokenKind::Unknown('&')
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.advance();
                    TokenKind::OrOr
                } else {
                    TokenKind::Unknown('|')
                }
            }
            other => TokenKind::Unknown(other as char),
        };
        Token { kind, loc }
    }

    fn lex_number(&mut self, loc: SourceLocation) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("0");
        let kind = if is_float {
            TokenKind::FloatLiteral(text.parse().unwrap_or(0.0))
        } else {
            TokenKind::IntLiteral(text.parse().unwrap_or(0))
        };
        Token { kind, loc }
    }

    fn lex_string(&mut self, loc: SourceLocation) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == b'"' {
                self.advance();
                break;
            }
            if c == b'\\' {
                self.advance();
                match self.advance() {
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(b'"') => value.push('"'),
                    Some(b'\\') => value.push('\\'),
                    Some(other) => value.push(other as char),
                    None => {}
                }
                continue;
            }
            value.push(c as char);
            self.advance();
        }
        Token {
            kind: TokenKind::StringLiteral(value),
            loc,
        }
    }

    fn lex_identifier(&mut self, loc: SourceLocation) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("");
        let kind = match text {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "function" => TokenKind::Function,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "foreach" => TokenKind::Foreach,
            "in" => TokenKind::In,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Identifier(text.to_string()),
        };
        Token { kind, loc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_let_declaration() {
        let tokens = Lexer::new("let x: integer = 5;").tokenize();
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Let,
                TokenKind::Identifier("x".into()),
                TokenKind::Colon,
                TokenKind::Identifier("integer".into()),
                TokenKind::Assign,
                TokenKind::IntLiteral(5),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Lexer::new("let x\n= 1;").tokenize();
        assert_eq!(tokens[0].loc, SourceLocation::new(1, 1));
        let eq = tokens.iter().find(|t| t.kind == TokenKind::Assign).unwrap();
        assert_eq!(eq.loc, SourceLocation::new(2, 1));
    }

    #[test]
    fn distinguishes_and_from_ampersand() {
        let tokens = Lexer::new("a && b & c").tokenize();
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::AndAnd));
        assert!(kinds.iter().any(|k| matches!(k, TokenKind::Unknown('&'))));
    }

    #[test]
    fn skips_line_and_block_comments() {
        let tokens = Lexer::new("// hi\nlet /* mid */ x = 1;").tokenize();
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(kinds[0], TokenKind::Let);
    }
}

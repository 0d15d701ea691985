use std::fmt::{self, Display};

use crate::lexer::cursor::Cursor;
use crate::span::{Idx, Span};

pub mod cursor;

/// Token carrying its kind and location. Text is recovered from the source through the span.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LiteralKind {
    /// `#x1F`, `#-x1F`
    Hex,
    /// `#12`, `#-3`
    Dec,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Mnemonic or symbol name
    Ident,
    /// `name:`, including the colon
    Label,
    Lit(LiteralKind),
    OpenBracket,
    CloseBracket,
    Comment,
    /// Also includes commas and newlines
    Whitespace,
    Unknown,
    Eof,
}

impl TokenKind {
    /// Tokens the parser never needs to see.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Whitespace)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Ident => "identifier",
            TokenKind::Label => "label",
            TokenKind::Lit(_) => "numeric literal",
            TokenKind::OpenBracket => "`[`",
            TokenKind::CloseBracket => "`]`",
            TokenKind::Comment => "comment",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Unknown => "unknown",
            TokenKind::Eof => "end of file",
        };
        f.write_str(name)
    }
}

/// Lex the whole input, stopping before `Eof`.
pub fn tokenize(input: &str) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(input);
    std::iter::from_fn(move || {
        let token = cursor.advance_token();
        if token.kind != TokenKind::Eof {
            Some(token)
        } else {
            None
        }
    })
}

/// Test if a character is considered to be whitespace.
pub(crate) fn is_whitespace(c: char) -> bool {
    // Commas are only there for readability
    matches!(c, ' ' | '\n' | '\t' | '\r' | ',')
}

/// Test if a character can be part of an identifier. Underscores are lexed so the encoder can
/// reject them with a proper message.
pub(crate) fn is_id(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> Token {
        let start = self.token_start();
        let first_char = match self.bump() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, Span::new(Idx(start as u32), 0)),
        };
        let token_kind = match first_char {
            ';' => {
                self.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            // Decimal literal, or hex after `#x`
            '#' => {
                if self.first() == '-' {
                    self.bump();
                }
                if matches!(self.first(), 'x' | 'X') {
                    self.bump();
                    self.take_while(is_id);
                    TokenKind::Lit(LiteralKind::Hex)
                } else {
                    self.take_while(|c| c.is_ascii_digit());
                    TokenKind::Lit(LiteralKind::Dec)
                }
            }
            // Identifiers should be checked after everything else that overlaps.
            c if is_id(c) => {
                self.take_while(is_id);
                if self.first() == ':' {
                    self.bump();
                    TokenKind::Label
                } else {
                    TokenKind::Ident
                }
            }
            _ => TokenKind::Unknown,
        };
        let span = Span::new(Idx(start as u32), self.pos_in_token());
        self.reset_pos();
        Token::new(token_kind, span)
    }
}

//! A tokenizer for C-family source text.
//!
//! Generated artifacts are Go source files, and protobuf shares the same comment and identifier
//! syntax, so a single token set covers both. It only needs to be precise enough to track nesting
//! and find declaration keywords; everything else collapses into [`Token::Punct`].


use std::ops::Range;

use logos::{Lexer, Logos};

#[derive(Debug, Clone, Copy, Logos, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(crate) enum Token<'a> {
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'a str),
    #[regex("[0-9][0-9A-Za-z_.]*")]
    Number(&'a str),
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String(&'a str),
    #[regex(r#"'([^'\\\n]|\\.)*'"#)]
    Char(&'a str),
    #[regex("`[^`]*`")]
    RawString(&'a str),
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("/")]
    ForwardSlash,
    #[regex(r#"[-+*%&|^<>=!:;,.\[\]~?@#$\\]"#)]
    Punct,
    #[regex(r"[^\x00-\x7F]+")]
    NonAscii(&'a str),
    #[regex(r"//[^\n]*")]
    LineComment(&'a str),
    #[token("/*", block_comment)]
    BlockComment(&'a str),
}

impl Token<'_> {
    pub const FUNC: Token<'static> = Token::Ident("func");
    pub const SYNTAX: Token<'static> = Token::Ident("syntax");

    pub fn is_comment(&self) -> bool {
        matches!(self, Token::LineComment(_) | Token::BlockComment(_))
    }
}

fn block_comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Option<&'a str> {
    let remainder = lex.remainder();
    let end = remainder.find("*/")?;
    lex.bump(end + 2);
    Some(&remainder[..end])
}

/// An iterator over the tokens of a source file which skips comments.
pub(crate) struct Tokens<'a> {
    lexer: Lexer<'a, Token<'a>>,
}

/// A span of source text the lexer could not make sense of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InvalidToken {
    pub span: Range<usize>,
}

impl<'a> Tokens<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokens {
            lexer: Token::lexer(source),
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.lexer.span()
    }

    pub fn source(&self) -> &'a str {
        self.lexer.source()
    }

    /// Returns true if the last token returned is the first non-whitespace text on its line.
    pub fn at_line_start(&self) -> bool {
        let line = match self.source()[..self.span().start].rfind('\n') {
            Some(newline) => &self.source()[newline + 1..self.span().start],
            None => &self.source()[..self.span().start],
        };
        line.trim().is_empty()
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, InvalidToken>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lexer.next()? {
                Ok(token) if token.is_comment() => continue,
                Ok(token) => return Some(Ok(token)),
                Err(()) => {
                    return Some(Err(InvalidToken {
                        span: self.lexer.span(),
                    }))
                }
            }
        }
    }
}

/// Returns true if the first statement of a protobuf source file is a `syntax` declaration.
pub(crate) fn declares_syntax(source: &str) -> bool {
    matches!(Tokens::new(source).next(), Some(Ok(Token::SYNTAX)))
}

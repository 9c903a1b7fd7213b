//! The tokenizer: a character stream chopped into S-expression tokens.
//!
//! The lexer exposes a small lookahead contract the parser relies on:
//! [`Lexer::peek`] is non-destructive (repeated calls return the same token),
//! [`Lexer::advance`] moves past the last peeked token, and [`Lexer::is_end`]
//! reports whether only whitespace remains.

use crate::exception::{Exception, RunResult};

/// One lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    OpenParen,
    CloseParen,
    Dot,
    Quote,
    /// An identifier. `#t`/`#f` are lexed as symbols and recognized as
    /// booleans by the parser.
    Symbol(String),
    /// A 64-bit signed integer literal, sign included.
    Constant(i64),
}

/// Cursor over the source bytes with one token of cached lookahead.
#[derive(Debug)]
pub(crate) struct Lexer<'src> {
    src: &'src [u8],
    pos: usize,
    /// Last peeked token plus the position just past it.
    peeked: Option<(Token, usize)>,
}

/// Characters a symbol may contain: letters, digits, and the operator set.
fn is_symbol_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'-' | b'*' | b'/' | b'<' | b'=' | b'>' | b'#' | b'!' | b'?')
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            peeked: None,
        }
    }

    /// Whether only whitespace remains before the end of input.
    ///
    /// A cached, unconsumed lookahead token counts as remaining input.
    pub fn is_end(&self) -> bool {
        if self.peeked.is_some() {
            return false;
        }
        self.src[self.pos..].iter().all(u8::is_ascii_whitespace)
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> RunResult<Token> {
        if let Some((token, _)) = &self.peeked {
            return Ok(token.clone());
        }
        let (token, end) = self.lex_from(self.skip_whitespace())?;
        self.peeked = Some((token.clone(), end));
        Ok(token)
    }

    /// Consumes the token last returned by [`Lexer::peek`], peeking first if
    /// necessary.
    pub fn advance(&mut self) -> RunResult<()> {
        if self.peeked.is_none() {
            self.peek()?;
        }
        let (_, end) = self.peeked.take().expect("peek() always fills the lookahead slot");
        self.pos = end;
        Ok(())
    }

    fn skip_whitespace(&self) -> usize {
        let mut pos = self.pos;
        while pos < self.src.len() && self.src[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    }

    /// Lexes one token starting at `start`, returning it with its end offset.
    fn lex_from(&self, start: usize) -> RunResult<(Token, usize)> {
        let Some(&byte) = self.src.get(start) else {
            return Err(Exception::syntax("unexpected end of input"));
        };
        match byte {
            b'(' => Ok((Token::OpenParen, start + 1)),
            b')' => Ok((Token::CloseParen, start + 1)),
            b'.' => Ok((Token::Dot, start + 1)),
            b'\'' => Ok((Token::Quote, start + 1)),
            b'+' | b'-' => {
                // A sign starts an integer literal only when a digit follows;
                // a bare sign is the one-character symbol.
                if self.src.get(start + 1).is_some_and(u8::is_ascii_digit) {
                    self.lex_constant(start)
                } else {
                    let name = char::from(byte).to_string();
                    Ok((Token::Symbol(name), start + 1))
                }
            }
            b'0'..=b'9' => self.lex_constant(start),
            _ if is_symbol_byte(byte) => {
                let mut end = start + 1;
                while end < self.src.len() && is_symbol_byte(self.src[end]) {
                    end += 1;
                }
                let name = str::from_utf8(&self.src[start..end])
                    .expect("symbol bytes are ASCII")
                    .to_owned();
                Ok((Token::Symbol(name), end))
            }
            _ => {
                if byte.is_ascii() {
                    Err(Exception::syntax(format!("unexpected character '{}'", char::from(byte))))
                } else {
                    Err(Exception::syntax("unexpected non-ASCII character"))
                }
            }
        }
    }

    fn lex_constant(&self, start: usize) -> RunResult<(Token, usize)> {
        let mut end = start + 1;
        while end < self.src.len() && self.src[end].is_ascii_digit() {
            end += 1;
        }
        let text = str::from_utf8(&self.src[start..end]).expect("digit bytes are ASCII");
        let value = text
            .parse::<i64>()
            .map_err(|_| Exception::syntax(format!("integer literal '{text}' is out of range")))?;
        Ok((Token::Constant(value), end))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::exception::ExcKind;

    fn all_tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while !lexer.is_end() {
            tokens.push(lexer.peek().unwrap());
            lexer.advance().unwrap();
        }
        tokens
    }

    #[test]
    fn lexes_a_simple_form() {
        assert_eq!(
            all_tokens("(+ 1 -23)"),
            vec![
                Token::OpenParen,
                Token::Symbol("+".to_owned()),
                Token::Constant(1),
                Token::Constant(-23),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn lexes_quote_dot_and_booleans() {
        assert_eq!(
            all_tokens("'(a . #t)"),
            vec![
                Token::Quote,
                Token::OpenParen,
                Token::Symbol("a".to_owned()),
                Token::Dot,
                Token::Symbol("#t".to_owned()),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn bare_sign_is_a_symbol() {
        assert_eq!(
            all_tokens("+ -"),
            vec![Token::Symbol("+".to_owned()), Token::Symbol("-".to_owned())]
        );
    }

    #[test]
    fn signed_literal_is_a_constant() {
        assert_eq!(all_tokens("+5"), vec![Token::Constant(5)]);
    }

    #[test]
    fn operator_symbols_lex_whole() {
        assert_eq!(
            all_tokens("<= set-car! null?"),
            vec![
                Token::Symbol("<=".to_owned()),
                Token::Symbol("set-car!".to_owned()),
                Token::Symbol("null?".to_owned()),
            ]
        );
    }

    #[test]
    fn peek_is_non_destructive() {
        let mut lexer = Lexer::new("abc");
        assert_eq!(lexer.peek().unwrap(), Token::Symbol("abc".to_owned()));
        assert_eq!(lexer.peek().unwrap(), Token::Symbol("abc".to_owned()));
        assert!(!lexer.is_end());
        lexer.advance().unwrap();
        assert!(lexer.is_end());
    }

    #[test]
    fn is_end_skips_trailing_whitespace() {
        let mut lexer = Lexer::new("  1  \n\t ");
        assert!(!lexer.is_end());
        lexer.advance().unwrap();
        assert!(lexer.is_end());
    }

    #[test]
    fn rejects_unknown_characters() {
        let mut lexer = Lexer::new("@");
        let err = lexer.peek().unwrap_err();
        assert_eq!(err.kind(), ExcKind::SyntaxError);
    }

    #[test]
    fn rejects_out_of_range_literals() {
        let mut lexer = Lexer::new("99999999999999999999");
        let err = lexer.peek().unwrap_err();
        assert_eq!(err.kind(), ExcKind::SyntaxError);
    }
}

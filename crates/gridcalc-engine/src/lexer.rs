use gridcalc_model::{CellAddr, ErrorKind};

use crate::ast::{ParseError, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(ErrorKind),
    Cell(CellAddr),
    Ident(String),
    /// `'Quoted Sheet'` identifier, unescaped.
    QuotedIdent(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Bang,
    Colon,
    ArgSep,
    ArrayRowSep,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Amp,
    Percent,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Eof,
}

impl TokenKind {
    /// Stable name of the token kind, independent of any payload.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Number(_) => "Number",
            TokenKind::String(_) => "String",
            TokenKind::Boolean(_) => "Boolean",
            TokenKind::Error(_) => "Error",
            TokenKind::Cell(_) => "Cell",
            TokenKind::Ident(_) => "Ident",
            TokenKind::QuotedIdent(_) => "QuotedIdent",
            TokenKind::LParen => "LParen",
            TokenKind::RParen => "RParen",
            TokenKind::LBrace => "LBrace",
            TokenKind::RBrace => "RBrace",
            TokenKind::Bang => "Bang",
            TokenKind::Colon => "Colon",
            TokenKind::ArgSep => "ArgSep",
            TokenKind::ArrayRowSep => "ArrayRowSep",
            TokenKind::Plus => "Plus",
            TokenKind::Minus => "Minus",
            TokenKind::Star => "Star",
            TokenKind::Slash => "Slash",
            TokenKind::Caret => "Caret",
            TokenKind::Amp => "Amp",
            TokenKind::Percent => "Percent",
            TokenKind::Eq => "Eq",
            TokenKind::Ne => "Ne",
            TokenKind::Lt => "Lt",
            TokenKind::Gt => "Gt",
            TokenKind::Le => "Le",
            TokenKind::Ge => "Ge",
            TokenKind::Eof => "Eof",
        }
    }
}

/// Every token-kind name, in declaration order.
///
/// Build tooling on the host side consumes this list to mirror the grammar's
/// symbol set; it is a pass-through, not evaluation behavior.
pub const TOKEN_NAMES: &[&str] = &[
    "Number",
    "String",
    "Boolean",
    "Error",
    "Cell",
    "Ident",
    "QuotedIdent",
    "LParen",
    "RParen",
    "LBrace",
    "RBrace",
    "Bang",
    "Colon",
    "ArgSep",
    "ArrayRowSep",
    "Plus",
    "Minus",
    "Star",
    "Slash",
    "Caret",
    "Amp",
    "Percent",
    "Eq",
    "Ne",
    "Lt",
    "Gt",
    "Le",
    "Ge",
    "Eof",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Error literals recognized in formula text, longest first so that
/// prefix-overlapping codes (`#NUM!` vs `#NULL!`) match correctly.
const ERROR_LITERALS: &[(&str, ErrorKind)] = &[
    ("#NOT_IMPLEMENTED!", ErrorKind::NotImplemented),
    ("#DIV/0!", ErrorKind::Div0),
    ("#VALUE!", ErrorKind::Value),
    ("#NULL!", ErrorKind::Null),
    ("#NAME?", ErrorKind::Name),
    ("#REF!", ErrorKind::Ref),
    ("#NUM!", ErrorKind::Num),
    ("#N/A", ErrorKind::NA),
];

pub fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(src).lex()
}

struct Lexer<'a> {
    src: &'a str,
    idx: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            idx: 0,
            tokens: Vec::new(),
        }
    }

    fn lex(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(ch) = self.peek_char() {
            let start = self.idx;
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    // No intersection operator in this grammar; whitespace
                    // only separates tokens.
                    self.take_while(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
                }
                '"' => {
                    let value = self.lex_quoted(start, '"')?;
                    self.push(TokenKind::String(value), start);
                }
                '\'' => {
                    let value = self.lex_quoted(start, '\'')?;
                    self.push(TokenKind::QuotedIdent(value), start);
                }
                '#' => {
                    let rest = &self.src[start..];
                    let Some((code, kind)) = ERROR_LITERALS.iter().find(|(code, _)| {
                        rest.len() >= code.len() && rest[..code.len()].eq_ignore_ascii_case(code)
                    }) else {
                        return Err(ParseError::new(
                            "Invalid error literal",
                            Span::new(start, start + 1),
                        ));
                    };
                    self.idx += code.len();
                    self.push(TokenKind::Error(*kind), start);
                }
                '0'..='9' => {
                    let n = self.lex_number(start)?;
                    self.push(TokenKind::Number(n), start);
                }
                '.' if self.peek_next_is_digit() => {
                    let n = self.lex_number(start)?;
                    self.push(TokenKind::Number(n), start);
                }
                c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                    let word = self.take_while(|c| {
                        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$')
                    });
                    self.push(self.classify_word(word), start);
                }
                _ => {
                    self.idx += ch.len_utf8();
                    let kind = match ch {
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        '{' => TokenKind::LBrace,
                        '}' => TokenKind::RBrace,
                        '!' => TokenKind::Bang,
                        ':' => TokenKind::Colon,
                        ',' => TokenKind::ArgSep,
                        ';' => TokenKind::ArrayRowSep,
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '*' => TokenKind::Star,
                        '/' => TokenKind::Slash,
                        '^' => TokenKind::Caret,
                        '&' => TokenKind::Amp,
                        '%' => TokenKind::Percent,
                        '=' => TokenKind::Eq,
                        '<' => match self.peek_char() {
                            Some('>') => {
                                self.idx += 1;
                                TokenKind::Ne
                            }
                            Some('=') => {
                                self.idx += 1;
                                TokenKind::Le
                            }
                            _ => TokenKind::Lt,
                        },
                        '>' => {
                            if self.peek_char() == Some('=') {
                                self.idx += 1;
                                TokenKind::Ge
                            } else {
                                TokenKind::Gt
                            }
                        }
                        other => {
                            return Err(ParseError::new(
                                format!("Unexpected character `{other}`"),
                                Span::new(start, self.idx),
                            ));
                        }
                    };
                    self.push(kind, start);
                }
            }
        }
        let end = self.src.len();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(end, end),
        });
        Ok(self.tokens)
    }

    /// Classify a word: A1 cell address, boolean literal, or plain identifier.
    ///
    /// A trailing `(` forces identifier, so `LOG10(2)` calls the function
    /// even though `LOG10` is also a well-formed cell address.
    fn classify_word(&self, word: String) -> TokenKind {
        if self.peek_char() == Some('(') {
            return TokenKind::Ident(word);
        }
        if word.eq_ignore_ascii_case("TRUE") {
            return TokenKind::Boolean(true);
        }
        if word.eq_ignore_ascii_case("FALSE") {
            return TokenKind::Boolean(false);
        }
        if let Ok(addr) = CellAddr::from_a1(&word) {
            return TokenKind::Cell(addr);
        }
        TokenKind::Ident(word)
    }

    fn lex_number(&mut self, start: usize) -> Result<f64, ParseError> {
        self.take_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.idx += 1;
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            // Exponent only when digits follow; `1E` alone is `1` then ident `E`.
            let mark = self.idx;
            self.idx += 1;
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.idx += 1;
            }
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                self.idx = mark;
            }
        }
        let raw = &self.src[start..self.idx];
        raw.parse::<f64>().map_err(|_| {
            ParseError::new(
                format!("Invalid number literal `{raw}`"),
                Span::new(start, self.idx),
            )
        })
    }

    /// Lex a `quote`-delimited run with doubled-quote escapes, returning the
    /// unescaped contents.
    fn lex_quoted(&mut self, start: usize, quote: char) -> Result<String, ParseError> {
        self.idx += quote.len_utf8();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                Some(c) if c == quote => {
                    self.idx += c.len_utf8();
                    if self.peek_char() == Some(quote) {
                        self.idx += quote.len_utf8();
                        value.push(quote);
                        continue;
                    }
                    return Ok(value);
                }
                Some(c) => {
                    self.idx += c.len_utf8();
                    value.push(c);
                }
                None => {
                    let what = if quote == '"' {
                        "string literal"
                    } else {
                        "quoted sheet name"
                    };
                    return Err(ParseError::new(
                        format!("Unterminated {what}"),
                        Span::new(start, self.idx),
                    ));
                }
            }
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, self.idx),
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.idx..].chars().next()
    }

    fn peek_next_is_digit(&self) -> bool {
        let mut chars = self.src[self.idx..].chars();
        chars.next();
        chars.next().is_some_and(|c| c.is_ascii_digit())
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.idx;
        while let Some(c) = self.peek_char() {
            if pred(c) {
                self.idx += c.len_utf8();
            } else {
                break;
            }
        }
        self.src[start..self.idx].to_string()
    }
}

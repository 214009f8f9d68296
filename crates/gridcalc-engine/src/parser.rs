use gridcalc_model::CellAddr;

use crate::ast::{
    ArrayLiteral, BinaryExpr, BinaryOp, CellRefExpr, Expr, FunctionCall, NameRef, ParseError,
    PostfixExpr, PostfixOp, RangeRefExpr, Span, UnaryExpr, UnaryOp,
};
use crate::lexer::{lex, Token, TokenKind};

/// Hard cap on expression nesting. Deeper formulas are rejected with a
/// spanned error instead of risking the parser's own stack.
const MAX_NESTING_DEPTH: usize = 64;

/// Hard limit on arguments in a single call, matching the common
/// spreadsheet cap.
pub const MAX_CALL_ARGS: usize = 255;

/// Unary `+`/`-` bind tighter than `^`: `-2^2` is `(-2)^2 = 4`, the usual
/// spreadsheet quirk.
const UNARY_BP: u8 = 60;
/// Postfix `%` binds tighter than `^` too: `2^200%` is `2^2`.
const PERCENT_BP: u8 = 60;

/// Parse formula text (optionally starting with `=`) into an expression.
pub fn parse_formula(formula: &str) -> Result<Expr, ParseError> {
    let (expr_src, span_offset) = match formula.strip_prefix('=') {
        Some(rest) => (rest, 1),
        None => (formula, 0),
    };

    let tokens = lex(expr_src).map_err(|e| e.add_offset(span_offset))?;
    let mut parser = Parser::new(expr_src, tokens);
    let expr = parser
        .parse_expression(0)
        .map_err(|e| e.add_offset(span_offset))?;
    parser
        .expect_eof()
        .map_err(|e| e.add_offset(span_offset))?;
    Ok(expr)
}

fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Range => (82, 83),
        BinaryOp::Pow => (50, 50), // right associative
        BinaryOp::Mul | BinaryOp::Div => (40, 41),
        BinaryOp::Add | BinaryOp::Sub => (30, 31),
        BinaryOp::Concat => (20, 21),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            (10, 11)
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                "Formula is nested too deeply",
                self.current_span(),
            ));
        }
        self.depth += 1;
        let result = self.parse_expression_inner(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_primary()?;

        loop {
            if matches!(self.peek_kind(), TokenKind::Percent) && PERCENT_BP >= min_bp {
                self.bump();
                lhs = Expr::Postfix(PostfixExpr {
                    op: PostfixOp::Percent,
                    expr: Box::new(lhs),
                });
                continue;
            }

            let op = match self.peek_kind() {
                TokenKind::Colon => BinaryOp::Range,
                TokenKind::Caret => BinaryOp::Pow,
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Amp => BinaryOp::Concat,
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            let (lbp, rbp) = infix_binding_power(op);
            if lbp < min_bp {
                break;
            }
            let op_span = self.current_span();
            self.bump();
            let rhs = self.parse_expression(rbp)?;
            lhs = self.build_binary(op, lhs, rhs, op_span)?;
        }

        Ok(lhs)
    }

    /// Assemble a binary node, folding `cell:cell` into a static range.
    fn build_binary(
        &self,
        op: BinaryOp,
        left: Expr,
        right: Expr,
        op_span: Span,
    ) -> Result<Expr, ParseError> {
        if op == BinaryOp::Range {
            if let (Expr::CellRef(a), Expr::CellRef(b)) = (&left, &right) {
                let sheet = match (&a.sheet, &b.sheet) {
                    (Some(l), Some(r)) if l != r => {
                        return Err(ParseError::new(
                            "Range endpoints must be on the same sheet",
                            op_span,
                        ));
                    }
                    (l, r) => l.clone().or_else(|| r.clone()),
                };
                return Ok(Expr::RangeRef(RangeRefExpr {
                    sheet,
                    start: a.addr,
                    end: b.addr,
                }));
            }
        }
        Ok(Expr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.bump();
                Ok(Expr::Number(n))
            }
            TokenKind::String(s) => {
                self.bump();
                Ok(Expr::Text(s))
            }
            TokenKind::Boolean(b) => {
                self.bump();
                Ok(Expr::Bool(b))
            }
            TokenKind::Error(kind) => {
                self.bump();
                Ok(Expr::Error(kind))
            }
            TokenKind::Plus => {
                self.bump();
                let expr = self.parse_expression(UNARY_BP)?;
                Ok(Expr::Unary(UnaryExpr {
                    op: UnaryOp::Plus,
                    expr: Box::new(expr),
                }))
            }
            TokenKind::Minus => {
                self.bump();
                let expr = self.parse_expression(UNARY_BP)?;
                Ok(Expr::Unary(UnaryExpr {
                    op: UnaryOp::Minus,
                    expr: Box::new(expr),
                }))
            }
            TokenKind::LParen => {
                self.bump();
                let expr = self.parse_expression(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBrace => self.parse_array_literal(),
            TokenKind::Cell(addr) => {
                self.bump();
                if matches!(self.peek_kind(), TokenKind::Bang) {
                    // A sheet whose name happens to look like a cell address
                    // (`B2!A1`) is only reachable through quoting.
                    return Err(ParseError::new(
                        "Sheet names that look like cell references must be quoted",
                        span,
                    ));
                }
                Ok(Expr::CellRef(CellRefExpr { sheet: None, addr }))
            }
            TokenKind::Ident(name) => {
                self.bump();
                if matches!(self.peek_kind(), TokenKind::LParen) {
                    self.bump();
                    let args = self.parse_call_args()?;
                    return Ok(Expr::FunctionCall(FunctionCall { name, args }));
                }
                if matches!(self.peek_kind(), TokenKind::Bang) {
                    self.bump();
                    return self.parse_sheet_qualified(name);
                }
                Ok(Expr::NameRef(NameRef { sheet: None, name }))
            }
            TokenKind::QuotedIdent(sheet) => {
                self.bump();
                self.expect(TokenKind::Bang)?;
                self.parse_sheet_qualified(sheet)
            }
            TokenKind::Eof => Err(ParseError::new("Expected an expression", span)),
            other => Err(ParseError::new(
                format!("Unexpected token `{}`", other.name()),
                span,
            )),
        }
    }

    /// The reference part after `Sheet!`: a cell or a defined name.
    fn parse_sheet_qualified(&mut self, sheet: String) -> Result<Expr, ParseError> {
        let span = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Cell(addr) => {
                self.bump();
                Ok(Expr::CellRef(CellRefExpr {
                    sheet: Some(sheet),
                    addr,
                }))
            }
            TokenKind::Ident(name) => {
                self.bump();
                if matches!(self.peek_kind(), TokenKind::LParen) {
                    return Err(ParseError::new(
                        "Function calls cannot be sheet-qualified",
                        span,
                    ));
                }
                Ok(Expr::NameRef(NameRef {
                    sheet: Some(sheet),
                    name,
                }))
            }
            _ => Err(ParseError::new(
                "Expected a cell or name after `!`",
                span,
            )),
        }
    }

    /// Arguments of a call, `(` already consumed. Empty slots parse as
    /// [`Expr::Missing`]: `F(,1,2)` and `F(1,)` are three- and two-argument
    /// calls with a hole.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if matches!(self.peek_kind(), TokenKind::RParen) {
            self.bump();
            return Ok(args);
        }
        loop {
            if args.len() == MAX_CALL_ARGS {
                return Err(ParseError::new(
                    "Function calls are limited to 255 arguments",
                    self.current_span(),
                ));
            }
            if matches!(self.peek_kind(), TokenKind::ArgSep | TokenKind::RParen) {
                args.push(Expr::Missing);
            } else {
                args.push(self.parse_expression(0)?);
            }
            match self.peek_kind() {
                TokenKind::ArgSep => {
                    self.bump();
                }
                TokenKind::RParen => {
                    self.bump();
                    return Ok(args);
                }
                _ => {
                    return Err(ParseError::new(
                        "Expected `,` or `)` in argument list",
                        self.current_span(),
                    ));
                }
            }
        }
    }

    /// `{1,2;3,4}`: rows split on `;`, columns on `,`, constants only.
    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let open_span = self.current_span();
        self.expect(TokenKind::LBrace)?;
        let mut rows: Vec<Vec<Expr>> = Vec::new();
        let mut row: Vec<Expr> = Vec::new();
        loop {
            row.push(self.parse_array_element()?);
            match self.peek_kind() {
                TokenKind::ArgSep => {
                    self.bump();
                }
                TokenKind::ArrayRowSep => {
                    self.bump();
                    rows.push(std::mem::take(&mut row));
                }
                TokenKind::RBrace => {
                    let close_span = self.current_span();
                    self.bump();
                    rows.push(row);
                    let width = rows[0].len();
                    if rows.iter().any(|r| r.len() != width) {
                        return Err(ParseError::new(
                            "Array rows must all have the same width",
                            Span::new(open_span.start, close_span.end),
                        ));
                    }
                    return Ok(Expr::Array(ArrayLiteral { rows }));
                }
                _ => {
                    return Err(ParseError::new(
                        "Expected `,`, `;` or `}` in array constant",
                        self.current_span(),
                    ));
                }
            }
        }
    }

    fn parse_array_element(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        let negate = match self.peek_kind() {
            TokenKind::Minus => {
                self.bump();
                true
            }
            TokenKind::Plus => {
                self.bump();
                false
            }
            _ => false,
        };
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.bump();
                Ok(Expr::Number(if negate { -n } else { n }))
            }
            TokenKind::String(s) if !negate => {
                self.bump();
                Ok(Expr::Text(s))
            }
            TokenKind::Boolean(b) if !negate => {
                self.bump();
                Ok(Expr::Bool(b))
            }
            TokenKind::Error(kind) if !negate => {
                self.bump();
                Ok(Expr::Error(kind))
            }
            _ => Err(ParseError::new(
                "Array constants may only contain numbers, text, booleans, and errors",
                span,
            )),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.peek_kind() == &kind {
            self.bump();
            Ok(())
        } else {
            Err(ParseError::new(
                format!("Expected `{}`", kind.name()),
                self.current_span(),
            ))
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek_kind(), TokenKind::Eof) {
            Ok(())
        } else {
            Err(ParseError::new(
                "Unexpected trailing input",
                self.current_span(),
            ))
        }
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| Span::new(self.src.len(), self.src.len()))
    }
}

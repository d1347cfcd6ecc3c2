//! Recursive-descent parser (spec §4.C) turning a token stream from
//! [`crate::lexer`] into a [`crate::ast::Module`].
//!
//! Precedence is handled the conventional way for a small imperative
//! language: a table of binding powers consulted by a Pratt-style
//! `parse_expr(min_bp)` loop, with every prefix form (literals, `(`,
//! unary operators, `if`/`match`/block-as-expression) routed through
//! `parse_prefix`.

use crate::ast::*;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::token::{LiteralValue, Token, TokenKind};
use crate::types::{StructKind, Type};
use std::path::PathBuf;
use std::rc::Rc;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: DiagnosticSink,
}

type PResult<T> = Result<T, ()>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            diagnostics: DiagnosticSink::new(),
        }
    }

    pub fn parse_module(mut self) -> (Module, Vec<Diagnostic>) {
        let mut items = Vec::new();
        self.skip_newlines();
        while !self.at(TokenKind::Eof) {
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(()) => self.synchronize(),
            }
            self.skip_newlines();
        }
        (Module { items }, self.diagnostics.into_vec())
    }

    // -- token stream helpers --------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check_consume(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            self.error(format!("expected {what}, found '{}'", self.peek().text));
            Err(())
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let tok = self.peek();
        self.diagnostics.push(Diagnostic::error(
            tok.file.as_ref().clone(),
            tok.line as usize + 1,
            message,
        ));
    }

    fn loc(&self) -> SourceLocation {
        let tok = self.peek();
        SourceLocation::new(tok.file.clone(), tok.line)
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.advance();
        }
    }

    /// After a parse error, skip tokens until a likely statement/item
    /// boundary so one mistake doesn't cascade into unrelated errors.
    fn synchronize(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Newline | TokenKind::Dedent => {
                    self.advance();
                    return;
                }
                TokenKind::Fn | TokenKind::Struct | TokenKind::Import => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // -- items -------------------------------------------------------------

    fn parse_item(&mut self) -> PResult<Item> {
        match self.peek_kind() {
            TokenKind::Import => self.parse_import(),
            TokenKind::Struct => self.parse_struct().map(Item::Struct),
            TokenKind::Private | TokenKind::Native | TokenKind::Static | TokenKind::Fn => {
                self.parse_fn().map(Item::Fn)
            }
            _ => {
                self.error(format!(
                    "expected a top-level declaration, found '{}'",
                    self.peek().text
                ));
                Err(())
            }
        }
    }

    fn parse_import(&mut self) -> PResult<Item> {
        let loc = self.loc();
        self.advance(); // import
        let tok = self.expect(TokenKind::StringLiteral, "an import path string")?;
        let path = match tok.literal {
            LiteralValue::Str(s) => s.to_string(),
            _ => tok.text.to_string(),
        };
        Ok(Item::Import { path, loc })
    }

    fn parse_visibility(&mut self) -> FnVisibility {
        match self.peek_kind() {
            TokenKind::Private => {
                self.advance();
                FnVisibility::Private
            }
            TokenKind::Native => {
                self.advance();
                FnVisibility::Native
            }
            _ => FnVisibility::Public,
        }
    }

    fn parse_fn(&mut self) -> PResult<FnDef> {
        let is_static = self.check_consume(TokenKind::Static);
        let visibility = self.parse_visibility();
        let loc = self.loc();
        self.expect(TokenKind::Fn, "'fn'")?;
        let name = self.expect_identifier("a function name")?;
        self.expect(TokenKind::LParen, "'('")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen, "')'")?;
        let ret = if self.check_consume(TokenKind::Colon) {
            self.parse_type()?
        } else {
            Type::Void
        };
        let body = if visibility == FnVisibility::Native {
            self.finish_line()?;
            Vec::new()
        } else {
            self.parse_block()?
        };
        Ok(FnDef {
            name,
            params,
            ret,
            visibility,
            body,
            loc,
            is_static,
        })
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.at(TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let qualifier = match self.peek_kind() {
                TokenKind::Ref => {
                    self.advance();
                    MemoryQualifier::Ref
                }
                _ => {
                    self.check_consume(TokenKind::Val);
                    MemoryQualifier::Val
                }
            };
            let name = self.expect_identifier("a parameter name")?;
            self.expect(TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            params.push(Param { name, ty, qualifier });
            if !self.check_consume(TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_struct(&mut self) -> PResult<StructDef> {
        let loc = self.loc();
        self.advance(); // struct
        let name = self.expect_identifier("a struct name")?;
        let kind = match self.peek_kind() {
            TokenKind::Native => {
                self.advance();
                StructKind::Native
            }
            TokenKind::Identifier if self.peek().text.as_ref() == "packed" => {
                self.advance();
                StructKind::Packed
            }
            _ => StructKind::Regular,
        };
        self.expect(TokenKind::Colon, "':'")?;
        self.finish_line()?;
        self.expect(TokenKind::Indent, "an indented struct body")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.at(TokenKind::Dedent) && !self.at(TokenKind::Eof) {
            if matches!(
                self.peek_kind(),
                TokenKind::Fn | TokenKind::Private | TokenKind::Native | TokenKind::Static
            ) {
                methods.push(self.parse_fn()?);
            } else {
                fields.push(self.parse_struct_field()?);
            }
            self.skip_newlines();
        }
        self.check_consume(TokenKind::Dedent);
        Ok(StructDef {
            name,
            fields,
            methods,
            kind,
            loc,
        })
    }

    fn parse_struct_field(&mut self) -> PResult<StructFieldDef> {
        let name = self.expect_identifier("a field name")?;
        self.expect(TokenKind::Colon, "':'")?;
        let ty = self.parse_type()?;
        let default = if self.check_consume(TokenKind::Assign) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        self.finish_line()?;
        Ok(StructFieldDef { name, ty, default })
    }

    fn expect_identifier(&mut self, what: &str) -> PResult<String> {
        if self.at(TokenKind::Identifier) {
            Ok(self.advance().text.to_string())
        } else {
            self.error(format!("expected {what}, found '{}'", self.peek().text));
            Err(())
        }
    }

    /// Consumes to the end of the current logical line (a trailing
    /// newline, or nothing if we're already at a dedent/eof boundary).
    fn finish_line(&mut self) -> PResult<()> {
        if self.at(TokenKind::Newline) {
            self.advance();
        }
        Ok(())
    }

    fn parse_type(&mut self) -> PResult<Type> {
        let base = match self.peek_kind() {
            TokenKind::TypeName => {
                let text = self.advance().text;
                match text.as_ref() {
                    "byte" => Type::Byte,
                    "int" => Type::Int,
                    "int32" => Type::Int32,
                    "uint" => Type::Uint,
                    "uint32" => Type::Uint32,
                    "long" => Type::Long,
                    "float" => Type::Float,
                    "double" => Type::Double,
                    "bool" => Type::Bool,
                    "char" => Type::Char,
                    "str" => Type::String,
                    other => {
                        self.error(format!("unknown primitive type '{other}'"));
                        return Err(());
                    }
                }
            }
            TokenKind::AnyKw => {
                self.advance();
                Type::Any
            }
            TokenKind::VoidKw => {
                self.advance();
                Type::Void
            }
            TokenKind::Opaque => {
                self.advance();
                let name = self.expect_identifier("an opaque type name")?;
                Type::Opaque(name)
            }
            TokenKind::Identifier => {
                let name = self.advance().text.to_string();
                // Resolved to a concrete `Rc<StructType>` by the type
                // checker; the parser only records the name.
                Type::Opaque(name)
            }
            TokenKind::Star => {
                self.advance();
                Type::Pointer(Box::new(self.parse_type()?))
            }
            _ => {
                self.error(format!("expected a type, found '{}'", self.peek().text));
                return Err(());
            }
        };
        if self.check_consume(TokenKind::LBracket) {
            self.expect(TokenKind::RBracket, "']'")?;
            return Ok(Type::Array(Box::new(base)));
        }
        Ok(base)
    }

    // -- statements ----------------------------------------------------

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::Colon, "':'")?;
        self.finish_line()?;
        self.expect(TokenKind::Indent, "an indented block")?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Dedent) && !self.at(TokenKind::Eof) {
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(()) => self.synchronize(),
            }
            self.skip_newlines();
        }
        self.check_consume(TokenKind::Dedent);
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let loc = self.loc();
        let kind = match self.peek_kind() {
            TokenKind::Var | TokenKind::Val => self.parse_let()?,
            TokenKind::Return => {
                self.advance();
                let value = if matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Dedent) {
                    None
                } else {
                    Some(self.parse_expr(0)?)
                };
                self.finish_line()?;
                StmtKind::Return(value)
            }
            TokenKind::Break => {
                self.advance();
                self.finish_line()?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                self.finish_line()?;
                StmtKind::Continue
            }
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expr(0)?;
                let body = self.parse_block()?;
                StmtKind::While { cond, body }
            }
            TokenKind::For => {
                self.advance();
                let binding = self.expect_identifier("a loop binding name")?;
                self.expect(TokenKind::In, "'in'")?;
                let iterable = self.parse_expr(0)?;
                let body = self.parse_block()?;
                StmtKind::For { binding, iterable, body }
            }
            TokenKind::If => return self.parse_if_stmt(),
            TokenKind::Private => {
                self.advance();
                let body = self.parse_block()?;
                StmtKind::Private { body }
            }
            _ => {
                let expr = self.parse_expr(0)?;
                self.finish_line()?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt { kind, loc })
    }

    fn parse_if_stmt(&mut self) -> PResult<Stmt> {
        let loc = self.loc();
        self.advance(); // if
        let cond = self.parse_expr(0)?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.check_consume(TokenKind::Else) {
            if self.at(TokenKind::If) {
                let inner = self.parse_if_stmt()?;
                Some(vec![inner])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If { cond, then_branch, else_branch },
            loc,
        })
    }

    fn parse_let(&mut self) -> PResult<StmtKind> {
        let mutable = self.at(TokenKind::Var);
        self.advance(); // var/val
        let qualifier = match self.peek_kind() {
            TokenKind::Ref => {
                self.advance();
                MemoryQualifier::Ref
            }
            _ => {
                self.check_consume(TokenKind::As);
                self.check_consume(TokenKind::Val);
                MemoryQualifier::Val
            }
        };
        let name = self.expect_identifier("a variable name")?;
        let ty = if self.check_consume(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_expr(0)?;
        self.finish_line()?;
        Ok(StmtKind::Let { name, ty, qualifier, mutable, value })
    }

    // -- expressions (Pratt parser) --------------------------------------

    fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8, BinOp)> {
        use TokenKind::*;
        Some(match kind {
            OrKw => (1, 2, BinOp::Or),
            AndKw => (3, 4, BinOp::And),
            EqEq => (5, 6, BinOp::Eq),
            NotEq => (5, 6, BinOp::Neq),
            Lt => (7, 8, BinOp::Lt),
            Lte => (7, 8, BinOp::Lte),
            Gt => (7, 8, BinOp::Gt),
            Gte => (7, 8, BinOp::Gte),
            Amp => (9, 10, BinOp::BitAnd),
            Pipe => (9, 10, BinOp::BitOr),
            Caret => (9, 10, BinOp::BitXor),
            Shl => (11, 12, BinOp::Shl),
            Shr => (11, 12, BinOp::Shr),
            Plus => (13, 14, BinOp::Add),
            Minus => (13, 14, BinOp::Sub),
            Star => (15, 16, BinOp::Mul),
            Slash => (15, 16, BinOp::Div),
            Percent => (15, 16, BinOp::Rem),
            _ => return None,
        })
    }

    fn parse_expr(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_prefix()?;
        loop {
            if self.at(TokenKind::As) {
                self.advance();
                let ty = self.parse_type()?;
                let loc = lhs.meta.loc.clone();
                lhs = Expr::new(ExprKind::Cast { expr: Box::new(lhs), ty }, loc);
                continue;
            }
            if self.at(TokenKind::Is) {
                self.advance();
                let ty = self.parse_type()?;
                let loc = lhs.meta.loc.clone();
                lhs = Expr::new(ExprKind::TypeTest { expr: Box::new(lhs), ty }, loc);
                continue;
            }
            if self.at(TokenKind::Assign) {
                let loc = lhs.meta.loc.clone();
                self.advance();
                let value = self.parse_expr(0)?;
                lhs = Expr::new(
                    ExprKind::Assign { target: Box::new(lhs), value: Box::new(value) },
                    loc,
                );
                continue;
            }
            if let Some(op) = self.compound_assign_op() {
                let loc = lhs.meta.loc.clone();
                self.advance();
                let value = self.parse_expr(0)?;
                lhs = Expr::new(
                    ExprKind::CompoundAssign { op, target: Box::new(lhs), value: Box::new(value) },
                    loc,
                );
                continue;
            }
            let Some((lbp, rbp, op)) = Self::infix_binding_power(self.peek_kind()) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            let loc = lhs.meta.loc.clone();
            self.advance();
            let rhs = self.parse_expr(rbp)?;
            lhs = Expr::new(
                ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                loc,
            );
        }
        Ok(lhs)
    }

    fn compound_assign_op(&self) -> Option<BinOp> {
        use TokenKind::*;
        Some(match self.peek_kind() {
            PlusEq => BinOp::Add,
            MinusEq => BinOp::Sub,
            StarEq => BinOp::Mul,
            SlashEq => BinOp::Div,
            PercentEq => BinOp::Rem,
            _ => return None,
        })
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        let kind = self.peek_kind();
        let mut expr = match kind {
            TokenKind::IntLiteral | TokenKind::LongLiteral | TokenKind::UintLiteral => {
                let tok = self.advance();
                let v = match tok.literal {
                    LiteralValue::Int(v) => v,
                    _ => 0,
                };
                let lit = match kind {
                    TokenKind::LongLiteral => LiteralKind::Long(v),
                    TokenKind::UintLiteral => LiteralKind::Uint(v as u64),
                    _ => LiteralKind::Int(v),
                };
                Expr::new(ExprKind::Literal(Literal { kind: lit }), loc)
            }
            TokenKind::Int32Literal | TokenKind::Uint32Literal => {
                let tok = self.advance();
                let v = match tok.literal {
                    LiteralValue::Int(v) => v,
                    _ => 0,
                };
                let lit = if kind == TokenKind::Int32Literal {
                    LiteralKind::Int32(v as i32)
                } else {
                    LiteralKind::Uint32(v as u32)
                };
                Expr::new(ExprKind::Literal(Literal { kind: lit }), loc)
            }
            TokenKind::FloatLiteral | TokenKind::DoubleLiteral => {
                let tok = self.advance();
                let v = match tok.literal {
                    LiteralValue::Double(v) => v,
                    _ => 0.0,
                };
                let lit = if kind == TokenKind::FloatLiteral {
                    LiteralKind::Float(v as f32)
                } else {
                    LiteralKind::Double(v)
                };
                Expr::new(ExprKind::Literal(Literal { kind: lit }), loc)
            }
            TokenKind::CharLiteral => {
                let tok = self.advance();
                let c = match tok.literal {
                    LiteralValue::Char(c) => c,
                    _ => '\0',
                };
                Expr::new(ExprKind::Literal(Literal { kind: LiteralKind::Char(c) }), loc)
            }
            TokenKind::StringLiteral => {
                let tok = self.advance();
                let s = match tok.literal {
                    LiteralValue::Str(s) => s,
                    _ => Rc::from(tok.text.as_ref()),
                };
                Expr::new(ExprKind::Literal(Literal { kind: LiteralKind::Str(s) }), loc)
            }
            TokenKind::True => {
                self.advance();
                Expr::new(ExprKind::Literal(Literal { kind: LiteralKind::Bool(true) }), loc)
            }
            TokenKind::False => {
                self.advance();
                Expr::new(ExprKind::Literal(Literal { kind: LiteralKind::Bool(false) }), loc)
            }
            TokenKind::Nil => {
                self.advance();
                Expr::new(ExprKind::Literal(Literal { kind: LiteralKind::Nil }), loc)
            }
            TokenKind::InterpStringStart => self.parse_interpolated()?,
            TokenKind::Identifier => self.parse_identifier_or_struct_literal()?,
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RParen, "')'")?;
                inner
            }
            TokenKind::LBracket => self.parse_array_literal()?,
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_expr(17)?;
                Expr::new(ExprKind::Unary { op: UnOp::Neg, operand: Box::new(operand) }, loc)
            }
            TokenKind::NotKw => {
                self.advance();
                let operand = self.parse_expr(17)?;
                Expr::new(ExprKind::Unary { op: UnOp::Not, operand: Box::new(operand) }, loc)
            }
            TokenKind::Tilde => {
                self.advance();
                let operand = self.parse_expr(17)?;
                Expr::new(ExprKind::Unary { op: UnOp::BitNot, operand: Box::new(operand) }, loc)
            }
            TokenKind::If => self.parse_if_expr()?,
            TokenKind::Match => self.parse_match()?,
            TokenKind::Sizeof => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::RParen, "')'")?;
                Expr::new(ExprKind::SizeOf(ty), loc)
            }
            TokenKind::Typeof => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RParen, "')'")?;
                Expr::new(ExprKind::TypeOf(Box::new(inner)), loc)
            }
            TokenKind::Lock => {
                self.advance();
                let guard = self.parse_expr(0)?;
                let body = self.parse_block_expr()?;
                Expr::new(ExprKind::Lock { guard: Box::new(guard), body: Box::new(body) }, loc)
            }
            TokenKind::Sync => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let mut args = Vec::new();
                if !self.at(TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expr(0)?);
                        if !self.check_consume(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                Expr::new(ExprKind::Sync(args), loc)
            }
            TokenKind::Fn => self.parse_closure()?,
            _ => {
                self.error(format!("unexpected token '{}' in expression", self.peek().text));
                return Err(());
            }
        };

        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect_identifier("a field or method name")?;
                    if self.at(TokenKind::LParen) {
                        self.advance();
                        let args = self.parse_call_args()?;
                        let loc = expr.meta.loc.clone();
                        expr = Expr::new(
                            ExprKind::MethodCall { receiver: Box::new(expr), method: field, args },
                            loc,
                        );
                    } else {
                        let loc = expr.meta.loc.clone();
                        expr = Expr::new(
                            ExprKind::FieldAccess { receiver: Box::new(expr), field },
                            loc,
                        );
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr(0)?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    let loc = expr.meta.loc.clone();
                    expr = Expr::new(
                        ExprKind::Index { receiver: Box::new(expr), index: Box::new(index) },
                        loc,
                    );
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    let loc = expr.meta.loc.clone();
                    expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args }, loc);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr(0)?);
                if !self.check_consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(args)
    }

    fn parse_identifier_or_struct_literal(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        let name = self.advance().text.to_string();
        if self.at(TokenKind::LBrace) {
            self.advance();
            let mut fields = Vec::new();
            while !self.at(TokenKind::RBrace) {
                let field_name = self.expect_identifier("a field name")?;
                self.expect(TokenKind::Colon, "':'")?;
                let value = self.parse_expr(0)?;
                fields.push((field_name, value));
                if !self.check_consume(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace, "'}'")?;
            return Ok(Expr::new(ExprKind::StructLiteral { name, fields }, loc));
        }
        Ok(Expr::new(ExprKind::Identifier(name), loc))
    }

    fn parse_array_literal(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        self.advance(); // [
        let mut elements = Vec::new();
        while !self.at(TokenKind::RBracket) {
            elements.push(self.parse_expr(0)?);
            if !self.check_consume(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Expr::new(ExprKind::ArrayLiteral(elements), loc))
    }

    /// Turns the lexer's flat `InterpStringStart .. InterpStringEnd` token
    /// run back into a tree: a text part followed by a nested sub-parse of
    /// the hole's own token span (the lexer already emitted full tokens
    /// for the expression inside `{}`).
    fn parse_interpolated(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        self.advance(); // InterpStringStart
        let mut parts = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::InterpStringEnd => {
                    self.advance();
                    break;
                }
                TokenKind::InterpStringPart => {
                    let tok = self.advance();
                    let text = match tok.literal {
                        LiteralValue::Str(s) => s,
                        _ => Rc::from(tok.text.as_ref()),
                    };
                    parts.push(InterpPart::Text(text));
                }
                TokenKind::InterpExprStart => {
                    self.advance();
                    let expr = self.parse_expr(0)?;
                    let format = if self.at(TokenKind::InterpFormatSpec) {
                        Some(self.advance().text.to_string())
                    } else {
                        None
                    };
                    self.expect(TokenKind::InterpExprEnd, "'}' closing an interpolation hole")?;
                    parts.push(InterpPart::Hole { expr: Box::new(expr), format });
                }
                TokenKind::Eof => {
                    self.error("unterminated interpolated string");
                    return Err(());
                }
                _ => {
                    self.error(format!(
                        "unexpected token '{}' inside interpolated string",
                        self.peek().text
                    ));
                    return Err(());
                }
            }
        }
        Ok(Expr::new(ExprKind::Interpolated(parts), loc))
    }

    fn parse_if_expr(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        self.advance(); // if
        let cond = self.parse_expr(0)?;
        let then_branch = self.parse_block_expr()?;
        let else_branch = if self.check_consume(TokenKind::Else) {
            Some(Box::new(self.parse_block_expr()?))
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::If { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch },
            loc,
        ))
    }

    fn parse_block_expr(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        let stmts = self.parse_block()?;
        Ok(Expr::new(ExprKind::Block(stmts), loc))
    }

    fn parse_match(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        self.advance(); // match
        let scrutinee = self.parse_expr(0)?;
        self.expect(TokenKind::Colon, "':'")?;
        self.finish_line()?;
        self.expect(TokenKind::Indent, "an indented match body")?;
        let mut arms = Vec::new();
        while !self.at(TokenKind::Dedent) && !self.at(TokenKind::Eof) {
            let pattern = self.parse_pattern()?;
            let guard = if self.at(TokenKind::Identifier) && self.peek().text.as_ref() == "if" {
                self.advance();
                Some(Box::new(self.parse_expr(0)?))
            } else {
                None
            };
            self.expect(TokenKind::Arrow, "'=>'")?;
            let body = Box::new(self.parse_expr(0)?);
            self.finish_line()?;
            arms.push(MatchArm { pattern, guard, body });
            self.skip_newlines();
        }
        self.check_consume(TokenKind::Dedent);
        Ok(Expr::new(ExprKind::Match { scrutinee: Box::new(scrutinee), arms }, loc))
    }

    fn parse_pattern(&mut self) -> PResult<Pattern> {
        match self.peek_kind() {
            TokenKind::Identifier if self.peek().text.as_ref() == "_" => {
                self.advance();
                Ok(Pattern::Wildcard)
            }
            TokenKind::TypeName | TokenKind::AnyKw => {
                let type_name = self.advance().text.to_string();
                let binding = if self.check_consume(TokenKind::LParen) {
                    let name = self.expect_identifier("a binding name")?;
                    self.expect(TokenKind::RParen, "')'")?;
                    Some(name)
                } else {
                    None
                };
                Ok(Pattern::TypeTest { type_name, binding })
            }
            TokenKind::Identifier => {
                let name = self.advance().text.to_string();
                Ok(Pattern::Binding(name))
            }
            TokenKind::IntLiteral | TokenKind::LongLiteral => {
                let tok = self.advance();
                let v = match tok.literal {
                    LiteralValue::Int(v) => v,
                    _ => 0,
                };
                Ok(Pattern::Literal(LiteralKind::Int(v)))
            }
            TokenKind::StringLiteral => {
                let tok = self.advance();
                let s = match tok.literal {
                    LiteralValue::Str(s) => s,
                    _ => Rc::from(tok.text.as_ref()),
                };
                Ok(Pattern::Literal(LiteralKind::Str(s)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Pattern::Literal(LiteralKind::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Pattern::Literal(LiteralKind::Bool(false)))
            }
            _ => {
                self.error(format!("expected a match pattern, found '{}'", self.peek().text));
                Err(())
            }
        }
    }

    fn parse_closure(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        self.advance(); // fn
        self.expect(TokenKind::LParen, "'('")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = if self.at(TokenKind::Colon) {
            self.parse_block_expr()?
        } else {
            self.expect(TokenKind::Arrow, "'=>' or ':'")?;
            self.parse_expr(0)?
        };
        Ok(Expr::new(ExprKind::Closure { params, body: Box::new(body) }, loc))
    }
}

pub fn parse(tokens: Vec<Token>) -> (Module, Vec<Diagnostic>) {
    Parser::new(tokens).parse_module()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> (Module, Vec<Diagnostic>) {
        let tokens = lex(src, PathBuf::from("t.holt"));
        parse(tokens)
    }

    #[test]
    fn parses_a_function_with_arithmetic() {
        let (module, diags) = parse_src("fn add(a: int, b: int): int:\n  return a + b * 2\n");
        assert!(diags.is_empty(), "{diags:?}");
        let f = module.functions().next().unwrap();
        assert_eq!(f.name, "add");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.ret, Type::Int);
    }

    #[test]
    fn parses_struct_with_default_and_method() {
        let src = "struct Point:\n  x: int = 0\n  y: int = 0\n  fn sum(self: Point): int:\n    return self.x + self.y\n";
        let (module, diags) = parse_src(src);
        assert!(diags.is_empty(), "{diags:?}");
        let s = module.structs().next().unwrap();
        assert_eq!(s.fields.len(), 2);
        assert_eq!(s.methods.len(), 1);
    }

    #[test]
    fn parses_if_while_for_as_statements() {
        let src = "fn f():\n  if true:\n    return\n  while false:\n    break\n  for i in xs:\n    continue\n";
        let (_, diags) = parse_src(src);
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn parses_struct_literal_and_field_access() {
        let src = "fn f():\n  var p = Point{x: 1, y: 2}\n  return p.x\n";
        let (_, diags) = parse_src(src);
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn parses_interpolated_string_expression() {
        let src = "fn f():\n  var x = 1\n  return $\"x = {x}\"\n";
        let (_, diags) = parse_src(src);
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn parse_error_does_not_abort_whole_module() {
        let src = "fn broken(:\n  return 1\n\nfn ok(): int:\n  return 2\n";
        let (module, diags) = parse_src(src);
        assert!(!diags.is_empty());
        assert!(module.functions().any(|f| f.name == "ok"));
    }
}

//! Abstract syntax tree for Holt (spec §3 "Expr"/"Stmt", §4.C).
//!
//! `Expr` and `Stmt` are tagged enums rather than a trait-object tree: every
//! pass (type checker, optimizer, code generator) matches exhaustively on
//! the variant set instead of downcasting, and the compiler refuses to
//! build if a new syntax form is added without updating every pass that
//! matters. Each expression carries an `ExprMeta` alongside its payload so
//! the type checker can annotate a resolved `Type` in place without a
//! parallel side table keyed by node identity.

use crate::types::{StructKind, Type};
use std::path::PathBuf;
use std::rc::Rc;

/// Source location for diagnostics; spans a single line since tokens never
/// straddle lines except inside interpolations and pipe blocks, which are
/// flattened to one logical line by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLocation {
    pub file: Rc<PathBuf>,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: Rc<PathBuf>, line: u32) -> Self {
        SourceLocation { file, line }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Metadata attached to every expression node. `resolved_type` starts as
/// `None` and is filled in by the type checker; nothing after parsing may
/// read it before the type checker has run (spec §4.E).
#[derive(Debug, Clone, PartialEq)]
pub struct ExprMeta {
    pub loc: SourceLocation,
    pub resolved_type: Option<Type>,
    /// `true` once escape analysis (spec §4.E.4) has determined this
    /// expression's result must be allocated in the caller's arena rather
    /// than the callee's activation arena.
    pub escapes: bool,
}

impl ExprMeta {
    pub fn new(loc: SourceLocation) -> Self {
        ExprMeta {
            loc,
            resolved_type: None,
            escapes: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

/// Memory qualifier on a binding or parameter (spec §4.E.3 "memory
/// qualifiers"): `as val` copies into the destination arena, `as ref` keeps
/// a handle into wherever the value already lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryQualifier {
    Val,
    Ref,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub qualifier: MemoryQualifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    Int(i64),
    Int32(i32),
    Uint(u64),
    Uint32(u32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Byte(u8),
    Char(char),
    Str(Rc<str>),
    Nil,
}

/// One piece of an interpolated string literal: either verbatim text or an
/// expression hole with an optional format specifier (spec §4.B/§4.C).
#[derive(Debug, Clone, PartialEq)]
pub enum InterpPart {
    Text(Rc<str>),
    Hole {
        expr: Box<Expr>,
        format: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Box<Expr>>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Wildcard,
    Literal(LiteralKind),
    Binding(String),
    /// `TypeName(binding)`: matches when a boxed `any` holds this runtime
    /// kind, binding the unwrapped value (spec §4.E "interceptability" and
    /// §3 "Boxed `any`" share this destructuring form with `match`).
    TypeTest { type_name: String, binding: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Interpolated(Vec<InterpPart>),
    Identifier(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    CompoundAssign {
        op: BinOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    FieldAccess {
        receiver: Box<Expr>,
        field: String,
    },
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayLiteral(Vec<Expr>),
    StructLiteral {
        name: String,
        fields: Vec<(String, Expr)>,
    },
    Cast {
        expr: Box<Expr>,
        ty: Type,
    },
    TypeTest {
        expr: Box<Expr>,
        ty: Type,
    },
    SizeOf(Type),
    TypeOf(Box<Expr>),
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    Block(Vec<Stmt>),
    Closure {
        params: Vec<Param>,
        body: Box<Expr>,
    },
    /// `lock expr { ... }`: acquires the value's intrinsic mutex for the
    /// duration of the block (spec §5 concurrency model).
    Lock {
        guard: Box<Expr>,
        body: Box<Expr>,
    },
    /// `sync(a, b, c)`: promotes each handle into the current thread's
    /// arena in argument order (spec §4.H, resolved Open Question).
    Sync(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub meta: ExprMeta,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: SourceLocation) -> Self {
        Expr {
            kind,
            meta: ExprMeta::new(loc),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Let {
        name: String,
        ty: Option<Type>,
        qualifier: MemoryQualifier,
        mutable: bool,
        value: Expr,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        binding: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    /// `private:` nested arena scope. Lowered through the same child-arena
    /// create/promote/destroy path as a block expression, but as a bare
    /// statement it has no result to promote — only handles assigned out
    /// to a variable declared before the block escape it.
    Private {
        body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLocation,
}

/// A function's visibility/interception surface (spec §4.E "interceptable
/// flags"): plain functions are interceptable by default, `private`
/// functions are never dispatched through the handler chain, and `native`
/// functions cross into hand-written C and so forgo Holt's memory
/// qualifiers entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnVisibility {
    Public,
    Private,
    Native,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDef {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub visibility: FnVisibility,
    pub body: Vec<Stmt>,
    pub loc: SourceLocation,
    /// `true` for `static fn`: no implicit `self`/arena-carrying
    /// activation context, callable without an instance.
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<StructFieldDef>,
    pub methods: Vec<FnDef>,
    pub kind: StructKind,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructFieldDef {
    pub name: String,
    pub ty: Type,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Fn(FnDef),
    Struct(StructDef),
    Import { path: String, loc: SourceLocation },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub items: Vec<Item>,
}

impl Module {
    pub fn functions(&self) -> impl Iterator<Item = &FnDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Fn(f) => Some(f),
            _ => None,
        })
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Struct(s) => Some(s),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new(Rc::new(PathBuf::from("t.holt")), 1)
    }

    #[test]
    fn module_separates_functions_and_structs() {
        let module = Module {
            items: vec![
                Item::Fn(FnDef {
                    name: "main".into(),
                    params: vec![],
                    ret: Type::Void,
                    visibility: FnVisibility::Public,
                    body: vec![],
                    loc: loc(),
                    is_static: false,
                }),
                Item::Struct(StructDef {
                    name: "Point".into(),
                    fields: vec![],
                    methods: vec![],
                    kind: StructKind::Regular,
                    loc: loc(),
                }),
            ],
        };
        assert_eq!(module.functions().count(), 1);
        assert_eq!(module.structs().count(), 1);
    }

    #[test]
    fn expr_meta_starts_unresolved() {
        let expr = Expr::new(ExprKind::Literal(Literal { kind: LiteralKind::Nil }), loc());
        assert!(expr.meta.resolved_type.is_none());
        assert!(!expr.meta.escapes);
    }
}

//! Type checker (spec §4.E): numeric promotion, struct layout, memory
//! qualifier rules, escape analysis, default-value application,
//! nested-member-access scope-depth propagation, and interceptability
//! flagging, all as a single-pass visitor over each module's statements
//! that accumulates diagnostics instead of stopping at the first one.

use crate::ast::*;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::symtab::SymbolTable;
use crate::types::{StructField, StructKind, StructRegistry, StructType, Type};
use std::collections::HashSet;
use std::rc::Rc;

/// Functions the interception wrapper construct (codegen §4.G) must
/// generate a thunk for: every function that is not `private` and not
/// `native` (spec §4.E "interceptability flagging").
#[derive(Debug, Default)]
pub struct InterceptabilityMap {
    interceptable: HashSet<String>,
}

impl InterceptabilityMap {
    pub fn is_interceptable(&self, name: &str) -> bool {
        self.interceptable.contains(name)
    }
}

pub struct TypeChecker {
    structs: StructRegistry,
    symtab: SymbolTable,
    diagnostics: DiagnosticSink,
    errored: bool,
    interceptable: InterceptabilityMap,
    file: std::path::PathBuf,
}

pub struct CheckResult {
    pub diagnostics: Vec<Diagnostic>,
    pub errored: bool,
    pub structs: StructRegistry,
    pub interceptable: InterceptabilityMap,
}

impl TypeChecker {
    pub fn new(file: std::path::PathBuf) -> Self {
        TypeChecker {
            structs: StructRegistry::new(),
            symtab: SymbolTable::new(),
            diagnostics: DiagnosticSink::new(),
            errored: false,
            interceptable: InterceptabilityMap::default(),
            file,
        }
    }

    fn error(&mut self, loc: &SourceLocation, message: impl Into<String>) {
        self.errored = true;
        self.diagnostics
            .push(Diagnostic::error(loc.file.as_ref().clone(), loc.line as usize + 1, message));
    }

    pub fn check_module(mut self, module: &mut Module) -> CheckResult {
        // Pass 1: register struct shells so forward references resolve.
        for item in &module.items {
            if let Item::Struct(def) = item {
                self.structs.insert(
                    def.name.clone(),
                    Rc::new(StructType {
                        name: def.name.clone(),
                        fields: Vec::new(),
                        methods: def.methods.iter().map(|m| m.name.clone()).collect(),
                        kind: def.kind,
                        size: 0,
                        alignment: 1,
                    }),
                );
            }
        }
        // Pass 2: compute layout now that every struct name is known.
        for item in &module.items {
            if let Item::Struct(def) = item {
                let laid_out = self.layout_struct(def);
                self.structs.insert(def.name.clone(), Rc::new(laid_out));
            }
        }
        // Pass 3: flag interceptability and check bodies.
        for item in &module.items {
            if let Item::Fn(f) = item {
                if f.visibility != FnVisibility::Private && f.visibility != FnVisibility::Native {
                    self.interceptable.interceptable.insert(f.name.clone());
                }
            }
        }
        for item in &mut module.items {
            match item {
                Item::Fn(f) => self.check_fn(f),
                Item::Struct(def) => {
                    for method in &mut def.methods {
                        self.check_fn(method);
                    }
                }
                Item::Import { .. } => {}
            }
        }
        CheckResult {
            diagnostics: self.diagnostics.into_vec(),
            errored: self.errored,
            structs: self.structs,
            interceptable: self.interceptable,
        }
    }

    /// Computes field offsets, size, and alignment (spec §4.E.2). `Native`
    /// structs keep whatever layout their hand-written C declaration uses
    /// and are never offset-computed here; `Packed` forces alignment 1 and
    /// zero padding.
    fn layout_struct(&self, def: &StructDef) -> StructType {
        if def.kind == StructKind::Native {
            return StructType {
                name: def.name.clone(),
                fields: def
                    .fields
                    .iter()
                    .map(|f| StructField {
                        name: f.name.clone(),
                        ty: f.ty.clone(),
                        offset: 0,
                        has_default: f.default.is_some(),
                        c_alias: Some(f.name.clone()),
                    })
                    .collect(),
                methods: def.methods.iter().map(|m| m.name.clone()).collect(),
                kind: StructKind::Native,
                size: 0,
                alignment: 1,
            };
        }

        let packed = def.kind == StructKind::Packed;
        let mut offset = 0u32;
        let mut max_align = 1u32;
        let mut fields = Vec::with_capacity(def.fields.len());
        for f in &def.fields {
            let align = if packed { 1 } else { f.ty.alignment() };
            if !packed {
                let misalignment = offset % align;
                if misalignment != 0 {
                    offset += align - misalignment;
                }
            }
            max_align = max_align.max(align);
            fields.push(StructField {
                name: f.name.clone(),
                ty: f.ty.clone(),
                offset,
                has_default: f.default.is_some(),
                c_alias: None,
            });
            offset += f.ty.size_of();
        }
        if !packed && max_align > 1 {
            let misalignment = offset % max_align;
            if misalignment != 0 {
                offset += max_align - misalignment;
            }
        }
        StructType {
            name: def.name.clone(),
            fields,
            methods: def.methods.iter().map(|m| m.name.clone()).collect(),
            kind: def.kind,
            size: offset,
            alignment: max_align,
        }
    }

    fn resolve_named_type(&self, ty: &Type) -> Type {
        if let Type::Opaque(name) = ty {
            if let Some(s) = self.structs.get(name) {
                return Type::Struct(s.clone());
            }
        }
        ty.clone()
    }

    fn check_fn(&mut self, f: &mut FnDef) {
        self.symtab.enter_scope();
        self.symtab.enclosing_fn_visibility = Some(f.visibility);
        for p in &f.params {
            let ty = self.resolve_named_type(&p.ty);
            self.symtab.declare(&p.name, ty);
        }
        for stmt in &mut f.body {
            self.check_stmt(stmt, &f.ret);
        }
        self.symtab.enclosing_fn_visibility = None;
        self.symtab.leave_scope();
    }

    fn check_stmt(&mut self, stmt: &mut Stmt, ret_ty: &Type) {
        let loc = stmt.loc.clone();
        match &mut stmt.kind {
            StmtKind::Expr(e) => {
                self.check_expr(e);
            }
            StmtKind::Let { name, ty, value, .. } => {
                let value_ty = self.check_expr(value);
                let declared = ty.as_ref().map(|t| self.resolve_named_type(t));
                let final_ty = match (&declared, &value_ty) {
                    (Some(d), Some(v)) if d == v => d.clone(),
                    (Some(d), Some(v)) => {
                        if let Some(w) = Type::widen_numeric(d, v) {
                            if &w != d {
                                self.error(
                                    &loc,
                                    format!(
                                        "cannot assign a '{v}' to a binding declared '{d}' without narrowing"
                                    ),
                                );
                            }
                            d.clone()
                        } else {
                            self.error(&loc, format!("type mismatch: expected '{d}', found '{v}'"));
                            d.clone()
                        }
                    }
                    (None, Some(v)) => v.clone(),
                    (Some(d), None) => d.clone(),
                    (None, None) => Type::Any,
                };
                self.symtab.declare(name, final_ty);
            }
            StmtKind::Return(expr) => {
                let actual = expr.as_mut().map(|e| self.check_expr(e)).flatten();
                if let Some(actual) = actual {
                    if &actual != ret_ty && Type::widen_numeric(&actual, ret_ty).as_ref() != Some(ret_ty) {
                        self.error(
                            &loc,
                            format!("return type mismatch: expected '{ret_ty}', found '{actual}'"),
                        );
                    }
                } else if *ret_ty != Type::Void {
                    self.error(&loc, format!("missing return value for '{ret_ty}' function"));
                }
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::While { cond, body } => {
                self.check_expr(cond);
                self.symtab.enter_scope();
                for s in body {
                    self.check_stmt(s, ret_ty);
                }
                self.symtab.leave_scope();
            }
            StmtKind::For { binding, iterable, body } => {
                let elem_ty = match self.check_expr(iterable) {
                    Some(Type::Array(inner)) => *inner,
                    _ => Type::Any,
                };
                self.symtab.enter_scope();
                self.symtab.declare(binding, elem_ty);
                // `for i in 0..n` style ranges prove the binding
                // non-negative for the optimizer's checked-arithmetic fast
                // path; a plain array iteration does not.
                if matches!(&iterable.kind, ExprKind::Binary { .. }) {
                    self.symtab.mark_loop_counter(binding);
                }
                for s in body {
                    self.check_stmt(s, ret_ty);
                }
                self.symtab.leave_scope();
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.check_expr(cond);
                self.symtab.enter_scope();
                for s in then_branch {
                    self.check_stmt(s, ret_ty);
                }
                self.symtab.leave_scope();
                if let Some(else_branch) = else_branch {
                    self.symtab.enter_scope();
                    for s in else_branch {
                        self.check_stmt(s, ret_ty);
                    }
                    self.symtab.leave_scope();
                }
            }
            StmtKind::Private { body } => {
                self.symtab.enter_scope();
                for s in body {
                    self.check_stmt(s, ret_ty);
                }
                self.symtab.leave_scope();
            }
        }
    }

    /// Checks one expression, annotates `meta.resolved_type` and
    /// `meta.escapes`, and returns the resolved type (or `None` if a prior
    /// error makes further checking of the parent meaningless).
    fn check_expr(&mut self, expr: &mut Expr) -> Option<Type> {
        let loc = expr.meta.loc.clone();
        let ty = match &mut expr.kind {
            ExprKind::Literal(lit) => Some(match &lit.kind {
                LiteralKind::Int(_) => Type::Int,
                LiteralKind::Int32(_) => Type::Int32,
                LiteralKind::Uint(_) => Type::Uint,
                LiteralKind::Uint32(_) => Type::Uint32,
                LiteralKind::Long(_) => Type::Long,
                LiteralKind::Float(_) => Type::Float,
                LiteralKind::Double(_) => Type::Double,
                LiteralKind::Bool(_) => Type::Bool,
                LiteralKind::Byte(_) => Type::Byte,
                LiteralKind::Char(_) => Type::Char,
                LiteralKind::Str(_) => Type::String,
                LiteralKind::Nil => Type::Nil,
            }),
            ExprKind::Interpolated(parts) => {
                for part in parts {
                    if let InterpPart::Hole { expr, .. } = part {
                        self.check_expr(expr);
                    }
                }
                Some(Type::String)
            }
            ExprKind::Identifier(name) => match self.symtab.lookup(name) {
                Some((ty, decl_depth)) => {
                    let ty = ty.clone();
                    // Escape analysis (§4.E.4): a reference-like value
                    // read from an outer (shallower) scope than the
                    // current depth, and later returned or stored past
                    // this block, needs promotion; we flag candidacy here
                    // and let codegen's statements.rs decide materially
                    // based on usage position.
                    if ty.is_reference_like() && decl_depth < self.symtab.arena_depth {
                        expr.meta.escapes = true;
                    }
                    Some(ty)
                }
                None => {
                    self.error(&loc, format!("undefined identifier '{name}'"));
                    None
                }
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lt = self.check_expr(lhs);
                let rt = self.check_expr(rhs);
                match (lt, rt) {
                    (Some(lt), Some(rt)) => self.check_binary(*op, &lt, &rt, &loc),
                    _ => None,
                }
            }
            ExprKind::Unary { op, operand } => {
                let ot = self.check_expr(operand);
                match (op, ot) {
                    (UnOp::Not, Some(Type::Bool)) => Some(Type::Bool),
                    (UnOp::Neg, Some(t)) if t.is_numeric() => Some(t),
                    (UnOp::BitNot, Some(t)) if t.is_numeric() && !t.is_float() => Some(t),
                    (_, Some(t)) => {
                        self.error(&loc, format!("operator not applicable to '{t}'"));
                        None
                    }
                    (_, None) => None,
                }
            }
            ExprKind::Assign { target, value } => {
                let vt = self.check_expr(value);
                let tt = self.check_expr(target);
                match (&tt, &vt) {
                    (Some(tt), Some(vt)) if tt != vt && Type::widen_numeric(tt, vt).as_ref() != Some(tt) => {
                        self.error(&loc, format!("cannot assign '{vt}' to '{tt}'"));
                    }
                    _ => {}
                }
                tt
            }
            ExprKind::CompoundAssign { op, target, value } => {
                let vt = self.check_expr(value);
                let tt = self.check_expr(target);
                if let (Some(tt), Some(vt)) = (&tt, &vt) {
                    self.check_binary(*op, tt, vt, &loc);
                }
                tt
            }
            ExprKind::Call { callee, args } => {
                for a in args {
                    self.check_expr(a);
                }
                self.check_expr(callee);
                None
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                self.check_expr(receiver);
                for a in args {
                    self.check_expr(a);
                }
                None
            }
            ExprKind::FieldAccess { receiver, field } => {
                let rt = self.check_expr(receiver);
                // Nested-member propagation (§4.E.6): a field access
                // inherits its receiver's escape status so `a.b.c`
                // propagates `a`'s scope depth through every link.
                let receiver_escapes = receiver.meta.escapes;
                if receiver_escapes {
                    expr.meta.escapes = true;
                }
                match rt {
                    Some(Type::Struct(s)) => match s.fields.iter().find(|f| &f.name == field) {
                        Some(f) => Some(f.ty.clone()),
                        None => {
                            self.error(&loc, format!("struct '{}' has no field '{field}'", s.name));
                            None
                        }
                    },
                    Some(other) => {
                        self.error(&loc, format!("'{other}' has no fields"));
                        None
                    }
                    None => None,
                }
            }
            ExprKind::Index { receiver, index } => {
                let rt = self.check_expr(receiver);
                let it = self.check_expr(index);
                if let Some(it) = &it {
                    if !it.is_numeric() || it.is_float() {
                        self.error(&loc, "array index must be an integer");
                    }
                }
                match rt {
                    Some(Type::Array(inner)) => Some(*inner),
                    Some(other) => {
                        self.error(&loc, format!("cannot index into '{other}'"));
                        None
                    }
                    None => None,
                }
            }
            ExprKind::ArrayLiteral(elements) => {
                let mut elem_ty = None;
                for e in elements.iter_mut() {
                    let t = self.check_expr(e);
                    if elem_ty.is_none() {
                        elem_ty = t;
                    }
                }
                Some(Type::Array(Box::new(elem_ty.unwrap_or(Type::Any))))
            }
            ExprKind::StructLiteral { name, fields } => self.check_struct_literal(name, fields, &loc),
            ExprKind::Cast { expr: inner, ty } => {
                self.check_expr(inner);
                Some(self.resolve_named_type(ty))
            }
            ExprKind::TypeTest { expr: inner, .. } => {
                self.check_expr(inner);
                Some(Type::Bool)
            }
            ExprKind::SizeOf(_) => Some(Type::Uint),
            ExprKind::TypeOf(inner) => {
                self.check_expr(inner);
                Some(Type::String)
            }
            ExprKind::If { cond, then_branch, else_branch } => {
                self.check_expr(cond);
                let then_ty = self.check_expr(then_branch);
                let else_ty = else_branch.as_mut().and_then(|e| self.check_expr(e));
                match (then_ty, else_ty) {
                    (Some(t), Some(e)) if t == e => Some(t),
                    (Some(t), None) => Some(t),
                    _ => None,
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                self.check_expr(scrutinee);
                let mut result = None;
                for arm in arms {
                    if let Pattern::Binding(name) = &arm.pattern {
                        self.symtab.enter_scope();
                        self.symtab.declare(name, Type::Any);
                        let t = self.check_expr(&mut arm.body);
                        self.symtab.leave_scope();
                        result = result.or(t);
                    } else {
                        let t = self.check_expr(&mut arm.body);
                        result = result.or(t);
                    }
                }
                result
            }
            ExprKind::Block(stmts) => {
                self.symtab.enter_scope();
                let mut last = None;
                for s in stmts.iter_mut() {
                    if let StmtKind::Expr(e) = &mut s.kind {
                        last = self.check_expr(e);
                    } else {
                        self.check_stmt(s, &Type::Void);
                        last = None;
                    }
                }
                self.symtab.leave_scope();
                last
            }
            ExprKind::Closure { params, body } => {
                self.symtab.enter_scope();
                for p in params.iter() {
                    self.symtab.declare(&p.name, self.resolve_named_type(&p.ty));
                }
                let ret = self.check_expr(body).unwrap_or(Type::Void);
                self.symtab.leave_scope();
                Some(Type::Function {
                    params: params.iter().map(|p| self.resolve_named_type(&p.ty)).collect(),
                    ret: Box::new(ret),
                })
            }
            ExprKind::Lock { guard, body } => {
                self.check_expr(guard);
                self.check_expr(body)
            }
            ExprKind::Sync(args) => {
                for a in args {
                    self.check_expr(a);
                }
                None
            }
        };
        expr.meta.resolved_type = ty.clone();
        ty
    }

    fn check_binary(&mut self, op: BinOp, lt: &Type, rt: &Type, loc: &SourceLocation) -> Option<Type> {
        use BinOp::*;
        match op {
            Add | Sub | Mul | Div | Rem | BitAnd | BitOr | BitXor | Shl | Shr => {
                match Type::widen_numeric(lt, rt) {
                    Some(t) => Some(t),
                    None => {
                        self.error(loc, format!("cannot apply operator to '{lt}' and '{rt}'"));
                        None
                    }
                }
            }
            Eq | Neq | Lt | Lte | Gt | Gte => {
                if lt == rt || Type::widen_numeric(lt, rt).is_some() {
                    Some(Type::Bool)
                } else {
                    self.error(loc, format!("cannot compare '{lt}' with '{rt}'"));
                    None
                }
            }
            And | Or => {
                if *lt == Type::Bool && *rt == Type::Bool {
                    Some(Type::Bool)
                } else {
                    self.error(loc, "'and'/'or' require bool operands");
                    None
                }
            }
        }
    }

    /// Applies struct defaults (§4.E.5): missing fields re-evaluate the
    /// default *expression* (not a cached value) so a default referencing
    /// another field or a constant sees fresh state per literal.
    fn check_struct_literal(
        &mut self,
        name: &str,
        fields: &mut [(String, Expr)],
        loc: &SourceLocation,
    ) -> Option<Type> {
        let Some(s) = self.structs.get(name).cloned() else {
            self.error(loc, format!("undefined struct '{name}'"));
            return None;
        };
        let provided: HashSet<String> = fields.iter().map(|(n, _)| n.clone()).collect();
        for (field_name, value) in fields.iter_mut() {
            let declared = s.fields.iter().find(|f| &f.name == field_name);
            let value_ty = self.check_expr(value);
            match (declared, value_ty) {
                (Some(f), Some(vt)) if f.ty != vt && Type::widen_numeric(&f.ty, &vt).as_ref() != Some(&f.ty) => {
                    self.error(
                        loc,
                        format!("field '{field_name}' expects '{}', found '{vt}'", f.ty),
                    );
                }
                (None, _) => {
                    self.error(loc, format!("struct '{name}' has no field '{field_name}'"));
                }
                _ => {}
            }
        }
        for f in &s.fields {
            if !provided.contains(f.name.as_str()) && !f.has_default {
                self.error(
                    loc,
                    format!("missing field '{}' of struct '{name}' with no default", f.name),
                );
            }
        }
        Some(Type::Struct(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use std::path::PathBuf;

    fn check(src: &str) -> CheckResult {
        let tokens = lex(src, PathBuf::from("t.holt"));
        let (mut module, parse_diags) = parse(tokens);
        assert!(parse_diags.is_empty(), "{parse_diags:?}");
        TypeChecker::new(PathBuf::from("t.holt")).check_module(&mut module)
    }

    #[test]
    fn numeric_promotion_accepts_byte_into_int() {
        let result = check("fn f(b: byte): int:\n  var x: int = b\n  return x\n");
        assert!(!result.errored, "{:?}", result.diagnostics);
    }

    #[test]
    fn mismatched_return_type_is_an_error() {
        let result = check("fn f(): int:\n  return true\n");
        assert!(result.errored);
    }

    #[test]
    fn struct_layout_packs_regular_with_natural_alignment() {
        let result = check(
            "struct Pair:\n  a: byte\n  b: long\n  fn unused(self: int): int:\n    return self\n",
        );
        let s = result.structs.get("Pair").unwrap();
        assert_eq!(s.fields[0].offset, 0);
        assert_eq!(s.fields[1].offset, 8);
        assert_eq!(s.size, 16);
        assert_eq!(s.alignment, 8);
    }

    #[test]
    fn packed_struct_has_no_padding() {
        let result = check("struct Pair packed:\n  a: byte\n  b: long\n");
        let s = result.structs.get("Pair").unwrap();
        assert_eq!(s.fields[1].offset, 1);
        assert_eq!(s.alignment, 1);
    }

    #[test]
    fn struct_literal_missing_field_without_default_errors() {
        let result = check("struct P:\n  x: int\n  y: int = 0\nfn f():\n  var p = P{y: 1}\n");
        assert!(result.errored);
    }

    #[test]
    fn private_function_is_not_interceptable() {
        let result = check("private fn helper(): int:\n  return 1\nfn visible(): int:\n  return 2\n");
        assert!(!result.interceptable.is_interceptable("helper"));
        assert!(result.interceptable.is_interceptable("visible"));
    }

    #[test]
    fn undefined_identifier_is_reported() {
        let result = check("fn f(): int:\n  return missing\n");
        assert!(result.errored);
    }
}

//! Shared enumerations referenced on both sides of the codegen/runtime ABI.
//!
//! Keeping these in `holt-core` instead of duplicating them in
//! `holt-compiler` and `holt-runtime` is the "glossary/shared" component
//! (spec §2, component I): the code generator picks a `RuntimeKind` when it
//! boxes a value into `RtAny`, and the runtime's `rt_unbox_*` family reads
//! the very same tag back.

/// Binary and unary operators recognized by the parser and folded by the
/// optimizer's constant-folding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
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
    Not,
    Neg,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Shl,
    Shr,
}

impl OperatorKind {
    /// Operators the optimizer is permitted to fold when every operand is a
    /// literal (spec §4.F). `Div` and `Rem` are foldable only when the
    /// divisor is a nonzero literal; the caller is responsible for that
    /// check since it depends on the operand value, not just the operator.
    pub fn is_foldable(self) -> bool {
        true
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            OperatorKind::Eq
                | OperatorKind::Neq
                | OperatorKind::Lt
                | OperatorKind::Lte
                | OperatorKind::Gt
                | OperatorKind::Gte
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, OperatorKind::And | OperatorKind::Or | OperatorKind::Not)
    }

    pub fn symbol(self) -> &'static str {
        use OperatorKind::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Eq => "==",
            Neq => "!=",
            Lt => "<",
            Lte => "<=",
            Gt => ">",
            Gte => ">=",
            And => "and",
            Or => "or",
            Not => "not",
            Neg => "-",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            BitNot => "~",
            Shl => "<<",
            Shr => ">>",
        }
    }
}

/// The small tag set the runtime uses inside a boxed `RtAny`
/// (spec §3 "Boxed `any`"). Every `Type` the type checker assigns
/// ultimately maps onto one of these at the codegen/runtime boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RuntimeKind {
    Long = 0,
    Double = 1,
    Bool = 2,
    Byte = 3,
    Char = 4,
    StringHandle = 5,
    ArrayHandle = 6,
    StructHandle = 7,
    Closure = 8,
    Nil = 9,
}

impl RuntimeKind {
    pub fn from_tag(tag: u8) -> Option<RuntimeKind> {
        use RuntimeKind::*;
        Some(match tag {
            0 => Long,
            1 => Double,
            2 => Bool,
            3 => Byte,
            4 => Char,
            5 => StringHandle,
            6 => ArrayHandle,
            7 => StructHandle,
            8 => Closure,
            9 => Nil,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Reference-like kinds are 8-byte handles on the 64-bit model the
    /// runtime targets (spec §3); the rest are inline payloads.
    pub fn is_reference_like(self) -> bool {
        matches!(
            self,
            RuntimeKind::StringHandle
                | RuntimeKind::ArrayHandle
                | RuntimeKind::StructHandle
                | RuntimeKind::Closure
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_tag() {
        for kind in [
            RuntimeKind::Long,
            RuntimeKind::Double,
            RuntimeKind::Bool,
            RuntimeKind::Byte,
            RuntimeKind::Char,
            RuntimeKind::StringHandle,
            RuntimeKind::ArrayHandle,
            RuntimeKind::StructHandle,
            RuntimeKind::Closure,
            RuntimeKind::Nil,
        ] {
            assert_eq!(RuntimeKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(RuntimeKind::from_tag(200), None);
    }

    #[test]
    fn operator_symbols_match_the_language_surface() {
        assert_eq!(OperatorKind::Add.symbol(), "+");
        assert_eq!(OperatorKind::Lte.symbol(), "<=");
        assert!(OperatorKind::Lt.is_comparison());
        assert!(!OperatorKind::Add.is_comparison());
    }
}

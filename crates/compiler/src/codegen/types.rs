//! `Type` → C type mapping (spec §4.G).
//!
//! Reference-like types (`string`, `array`, `function`, `any`, `opaque`)
//! become `RtHandleV2*`; everything else maps onto a small C primitive.
//! Structs that themselves hold handles get `__copy_<Name>__`/
//! `__free_<Name>__` callbacks registered against every handle of that
//! type so the runtime's promotion machinery can deep-copy them without
//! the code generator hand-writing a copy routine per struct shape.

use crate::types::{StructKind, Type};

pub fn c_type(ty: &Type) -> String {
    match ty {
        Type::Int | Type::Long => "int64_t".to_string(),
        Type::Int32 => "int32_t".to_string(),
        Type::Uint => "uint64_t".to_string(),
        Type::Uint32 => "uint32_t".to_string(),
        Type::Float => "float".to_string(),
        Type::Double => "double".to_string(),
        Type::Bool => "bool".to_string(),
        Type::Byte => "uint8_t".to_string(),
        Type::Char => "int32_t".to_string(),
        Type::Void => "void".to_string(),
        Type::Nil => "RtHandleV2*".to_string(),
        Type::String | Type::Array(_) | Type::Any | Type::Function { .. } => "RtHandleV2*".to_string(),
        Type::Opaque(name) => format!("struct {name}*"),
        Type::Pointer(inner) => format!("{}*", c_type(inner)),
        Type::Struct(s) if s.kind == StructKind::Native => format!("struct {}", s.name),
        Type::Struct(_) => "RtHandleV2*".to_string(),
    }
}

/// Whether a handle of this type needs `__copy_*__`/`__free_*__` callback
/// registration when it's boxed into an arena (every reference-like type
/// except a `native` struct, whose lifetime is owned by hand-written C).
pub fn needs_handle_callbacks(ty: &Type) -> bool {
    ty.is_reference_like()
}

pub fn copy_callback_name(struct_name: &str) -> String {
    format!("__copy_{struct_name}__")
}

pub fn free_callback_name(struct_name: &str) -> String {
    format!("__free_{struct_name}__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_map_to_fixed_width_c_types() {
        assert_eq!(c_type(&Type::Byte), "uint8_t");
        assert_eq!(c_type(&Type::Int32), "int32_t");
        assert_eq!(c_type(&Type::Long), "int64_t");
        assert_eq!(c_type(&Type::Double), "double");
    }

    #[test]
    fn reference_like_types_become_handle_pointers() {
        assert_eq!(c_type(&Type::String), "RtHandleV2*");
        assert_eq!(c_type(&Type::Array(Box::new(Type::Int))), "RtHandleV2*");
        assert_eq!(c_type(&Type::Any), "RtHandleV2*");
    }
}

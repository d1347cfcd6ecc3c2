//! Holt Core: the arena allocator, string interner and shared enums used by
//! both the compiler and the runtime.
//!
//! Key design principles:
//! - One bump-allocated `Arena` backs every compile-time allocation: tokens,
//!   AST nodes, and the strings they reference. Nothing in the front-end is
//!   freed individually; the arena is dropped wholesale when compilation
//!   finishes.
//! - `Interner` de-duplicates identifier and keyword text against the same
//!   arena so that repeated identifiers share storage.
//! - `kinds` holds the small enums (`OperatorKind`, `RuntimeKind`) that both
//!   the compiler's codegen and the runtime's boxed-`any` representation
//!   need to agree on, so they live in one place instead of being redefined
//!   on each side of the ABI.
//!
//! # Modules
//!
//! - `arena`: bump allocation and an arena-backed string builder
//! - `intern`: string interning over an `Arena`
//! - `kinds`: operator and runtime-value kind enumerations

pub mod arena;
pub mod intern;
pub mod kinds;

pub use arena::{Arena, StringBuilder};
pub use intern::{Interner, Symbol};
pub use kinds::{OperatorKind, RuntimeKind};

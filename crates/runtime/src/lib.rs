//! Holt runtime: the arena-managed, handle-indirected support library that
//! generated C links against.
//!
//! Key design principles:
//! - Everything that can escape its allocating scope is a versioned handle
//!   (`RtHandleV2`), never a bare pointer into someone else's arena.
//! - Scalars crossing a generic boundary (`any`, interceptor arguments) are
//!   boxed into `RtAny`, a tagged union, since C has no generics.
//! - The runtime never throws: `error::fatal` is the one path out of a
//!   contract violation, and it terminates the process rather than unwind.

pub mod any;
pub mod arena;
pub mod arithmetic;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod intercept;
pub mod io;
pub mod lock;
pub mod memory_stats;
pub mod promote;
pub mod string_ops;
pub mod thread;

pub use any::{RtAny, RtAnyTag};
pub use arena::RtArenaV2;
pub use error::fatal;
pub use handle::{RtHandle, RtHandleV2, RtTypeTag};
pub use intercept::{InterceptorFn, RtInterceptScope};
pub use memory_stats::Snapshot;
pub use string_ops::RtStringBuilder;
pub use thread::{RtThreadHandle, ThreadFn};

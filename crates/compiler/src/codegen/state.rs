//! Code generator context (spec §4.G).
//!
//! `CodeGen` threads the current arena C variable name explicitly through
//! every lowering call as a parameter rather than storing it in a field —
//! never a global, so two nested child-arena blocks can never clobber each
//! other's notion of "the current arena" (spec §9 REDESIGN FLAG).

use holt_core::arena::{Arena, StringBuilder};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

/// Mangles a Holt identifier the way the rest of the pipeline expects it
/// to show up in C (spec §4.G: `__sn__<identifier>`).
pub fn mangle(name: &str) -> String {
    format!("__sn__{}", name.replace('-', "_"))
}

pub fn mangle_method(struct_name: &str, method: &str) -> String {
    format!("{}_{}", mangle(struct_name), method)
}

pub struct CodeGen<'a> {
    pub out: StringBuilder<'a>,
    /// Closure function definitions, discovered mid-lowering of whatever
    /// function happens to contain the closure literal. A forward prototype
    /// is emitted inline at the closure's use site, so these only need to
    /// land anywhere later in the same translation unit; `flush_hoisted`
    /// appends them after every top-level function has been emitted.
    hoisted: StringBuilder<'a>,
    /// When set, `emit` routes to `hoisted` instead of `out` — used while
    /// lowering a closure body, which belongs in its own hoisted function
    /// rather than inline at the closure literal's use site.
    emit_to_hoisted: Cell<bool>,
    temp_counter: Cell<u32>,
    label_counter: Cell<u32>,
    closure_counter: Cell<u32>,
    /// Closure struct typedefs already hoisted, keyed by
    /// [`closures::closure_struct_name`] — one signature can back several
    /// closure literals, and a typedef may only appear once.
    emitted_closure_structs: RefCell<HashSet<String>>,
}

impl<'a> CodeGen<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        CodeGen {
            out: StringBuilder::new(arena),
            hoisted: StringBuilder::new(arena),
            emit_to_hoisted: Cell::new(false),
            temp_counter: Cell::new(0),
            label_counter: Cell::new(0),
            closure_counter: Cell::new(0),
            emitted_closure_structs: RefCell::new(HashSet::new()),
        }
    }

    /// `true` the first time this closure-struct signature name is seen;
    /// the caller should only emit the typedef then.
    pub fn mark_closure_struct_pending(&self, struct_name: &str) -> bool {
        self.emitted_closure_structs.borrow_mut().insert(struct_name.to_string())
    }

    pub fn fresh_temp(&self) -> String {
        let id = self.temp_counter.get();
        self.temp_counter.set(id + 1);
        format!("__t{id}")
    }

    pub fn fresh_label(&self, prefix: &str) -> String {
        let id = self.label_counter.get();
        self.label_counter.set(id + 1);
        format!("{prefix}_{id}")
    }

    /// Mangled name for a closure body function, unique within this module.
    pub fn fresh_closure_id(&self) -> String {
        let id = self.closure_counter.get();
        self.closure_counter.set(id + 1);
        format!("__sn__closure_{id}")
    }

    pub fn emit(&self, line: &str) {
        if self.emit_to_hoisted.get() {
            self.hoisted.push_line(line);
        } else {
            self.out.push_line(line);
        }
    }

    /// Buffers a closure body function definition for emission after the
    /// top-level functions, once every forward-declared use site has
    /// already been generated.
    pub fn emit_hoisted(&self, line: &str) {
        self.hoisted.push_line(line);
    }

    /// Runs `f` with `emit` redirected into the hoisted buffer, restoring
    /// the previous mode afterward (so a nested closure inside a closure
    /// body still routes correctly).
    pub fn with_hoisted_output<T>(&self, f: impl FnOnce() -> T) -> T {
        let previous = self.emit_to_hoisted.replace(true);
        let result = f();
        self.emit_to_hoisted.set(previous);
        result
    }

    pub fn flush_hoisted(&self) {
        let pending = self.hoisted.as_str_snapshot();
        if !pending.is_empty() {
            self.out.push_str(&pending);
        }
    }

    pub fn finish(self) -> &'a str {
        self.out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangles_with_prefix_and_hyphen_rewrite() {
        assert_eq!(mangle("fib-step"), "__sn__fib_step");
        assert_eq!(mangle_method("Point", "sum"), "__sn__Point_sum");
    }

    #[test]
    fn temps_and_labels_are_unique_per_codegen() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        assert_ne!(cg.fresh_temp(), cg.fresh_temp());
        assert_ne!(cg.fresh_label("loop"), cg.fresh_label("loop"));
    }
}

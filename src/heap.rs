use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::{
    arena::Arena,
    diagnostics::{Diagnostic, Result},
    value::{BuiltinFn, Object, Value},
};

/// Owns every object of one runtime instance: the arena, the interned-symbol
/// table, and the Nil/Bool singletons. All constructors and accessors go
/// through here, so a `Value` handle is only ever interpreted against the
/// heap that minted it.
pub struct Heap {
    arena: Arena,
    symbols: IndexMap<Box<str>, Value>,
    nil: Value,
    bool_true: Value,
    bool_false: Value,
}

impl Heap {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let nil = arena.alloc(Object::Nil);
        let bool_true = arena.alloc(Object::Bool(true));
        let bool_false = arena.alloc(Object::Bool(false));
        Self {
            arena,
            symbols: IndexMap::new(),
            nil,
            bool_true,
            bool_false,
        }
    }

    pub fn get(&self, value: Value) -> &Object {
        self.arena.get(value)
    }

    // ---- constructors -----------------------------------------------------

    pub fn nil(&self) -> Value {
        self.nil
    }

    /// Bools are singletons, so handle identity agrees with content equality.
    pub fn bool_value(&self, value: bool) -> Value {
        if value {
            self.bool_true
        } else {
            self.bool_false
        }
    }

    pub fn cons(&mut self, first: Value, rest: Value) -> Value {
        self.arena.alloc(Object::Cons { first, rest })
    }

    pub fn integer(&mut self, value: i64) -> Value {
        self.arena.alloc(Object::Integer(value))
    }

    pub fn string(&mut self, value: impl Into<Box<str>>) -> Value {
        self.arena.alloc(Object::Str(value.into()))
    }

    pub fn lambda(&mut self, params: Value, body: Value, env: Value) -> Value {
        self.arena.alloc(Object::Lambda { params, body, env })
    }

    pub fn builtin(&mut self, name: &'static str, func: BuiltinFn) -> Value {
        self.arena.alloc(Object::Builtin { name, func })
    }

    /// Returns the one live Symbol for `name`, allocating on first sight.
    /// `intern(a) == intern(b)` exactly when `a` and `b` are byte-identical.
    pub fn intern(&mut self, name: &str) -> Value {
        if let Some(existing) = self.symbols.get(name) {
            return *existing;
        }
        let symbol = self.arena.alloc(Object::Symbol(name.into()));
        self.symbols.insert(name.into(), symbol);
        symbol
    }

    /// Builds a proper list from `items`, front to back.
    pub fn list(&mut self, items: &[Value]) -> Value {
        let mut out = self.nil;
        for item in items.iter().rev() {
            out = self.cons(*item, out);
        }
        out
    }

    // ---- predicates and accessors -----------------------------------------

    pub fn is_nil(&self, value: Value) -> bool {
        value == self.nil
    }

    pub fn is_cons(&self, value: Value) -> bool {
        matches!(self.get(value), Object::Cons { .. })
    }

    pub fn is_symbol(&self, value: Value) -> bool {
        matches!(self.get(value), Object::Symbol(_))
    }

    pub fn type_name(&self, value: Value) -> &'static str {
        self.get(value).type_name()
    }

    fn type_error(&self, expected: &str, found: Value) -> Diagnostic {
        Diagnostic::runtime(format!(
            "expected {expected}, found {}",
            self.type_name(found)
        ))
    }

    pub fn first(&self, value: Value) -> Result<Value> {
        match self.get(value) {
            Object::Cons { first, .. } => Ok(*first),
            _ => Err(self.type_error("Cons", value).into()),
        }
    }

    pub fn rest(&self, value: Value) -> Result<Value> {
        match self.get(value) {
            Object::Cons { rest, .. } => Ok(*rest),
            _ => Err(self.type_error("Cons", value).into()),
        }
    }

    pub fn integer_value(&self, value: Value) -> Result<i64> {
        match self.get(value) {
            Object::Integer(n) => Ok(*n),
            _ => Err(self.type_error("Integer", value).into()),
        }
    }

    pub fn string_value(&self, value: Value) -> Result<&str> {
        match self.get(value) {
            Object::Str(text) => Ok(text),
            _ => Err(self.type_error("String", value).into()),
        }
    }

    pub fn symbol_name(&self, value: Value) -> Result<&str> {
        match self.get(value) {
            Object::Symbol(name) => Ok(name),
            _ => Err(self.type_error("Symbol", value).into()),
        }
    }

    pub fn bool_of(&self, value: Value) -> Result<bool> {
        match self.get(value) {
            Object::Bool(b) => Ok(*b),
            _ => Err(self.type_error("Bool", value).into()),
        }
    }

    /// Back-patch for `letlambdas` group construction: overwrite the `first`
    /// slot of a placeholder cons cell. The only mutation the heap permits.
    pub(crate) fn set_first(&mut self, cell: Value, value: Value) -> Result<()> {
        match self.arena.get_mut(cell) {
            Object::Cons { first, .. } => {
                *first = value;
                Ok(())
            }
            _ => Err(self.type_error("Cons", cell).into()),
        }
    }

    // ---- structural operations --------------------------------------------

    /// Structural equality: content for Nil/Integer/String/Bool, recursion
    /// for Cons, handle identity for Symbol/Builtin/Lambda. Not cycle-safe;
    /// never apply it to a cyclic environment chain.
    pub fn equal(&self, a: Value, b: Value) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Object::Nil, Object::Nil) => true,
            (
                Object::Cons { first: af, rest: ar },
                Object::Cons { first: bf, rest: br },
            ) => self.equal(*af, *bf) && self.equal(*ar, *br),
            (Object::Str(x), Object::Str(y)) => x == y,
            (Object::Integer(x), Object::Integer(y)) => x == y,
            (Object::Bool(x), Object::Bool(y)) => x == y,
            _ => false,
        }
    }

    /// Whether `symbol` occurs anywhere in the expression tree `expr`.
    pub fn mentions_symbol(&self, expr: Value, symbol: Value) -> bool {
        match self.get(expr) {
            Object::Cons { first, rest } => {
                self.mentions_symbol(*first, symbol) || self.mentions_symbol(*rest, symbol)
            }
            Object::Symbol(_) => expr == symbol,
            _ => false,
        }
    }

    /// Length of a proper list; a non-cons tail ends the count.
    pub fn list_length(&self, mut list: Value) -> usize {
        let mut len = 0;
        while let Object::Cons { rest, .. } = self.get(list) {
            len += 1;
            list = *rest;
        }
        len
    }

    // ---- rendering --------------------------------------------------------

    /// Plain textual rendering, used for diagnostics and the REPL echo. The
    /// hosted pretty printer owns user-facing program output.
    pub fn render(&self, value: Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value);
        out
    }

    fn write_value(&self, out: &mut String, value: Value) {
        match self.get(value) {
            Object::Nil => out.push_str("()"),
            Object::Cons { first, rest } => {
                out.push('(');
                self.write_value(out, *first);
                let mut tail = *rest;
                loop {
                    match self.get(tail) {
                        Object::Nil => break,
                        Object::Cons { first, rest } => {
                            out.push(' ');
                            self.write_value(out, *first);
                            tail = *rest;
                        }
                        _ => {
                            out.push_str(" . ");
                            self.write_value(out, tail);
                            break;
                        }
                    }
                }
                out.push(')');
            }
            Object::Str(text) => {
                out.push('"');
                for ch in text.chars() {
                    match ch {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            Object::Integer(n) => {
                let _ = write!(out, "{n}");
            }
            Object::Symbol(name) => out.push_str(name),
            Object::Bool(true) => out.push_str("#t"),
            Object::Bool(false) => out.push_str("#f"),
            Object::Builtin { name, .. } => {
                let _ = write!(out, "<builtin {name}>");
            }
            Object::Lambda { .. } => out.push_str("<lambda>"),
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut heap = Heap::new();
        let a = heap.intern("a");
        let b = heap.intern("b");
        let a2 = heap.intern("a");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_ne!(a2, b);
        assert_eq!(heap.symbol_name(a).unwrap(), "a");
    }

    #[test]
    fn structural_equality_across_variants() {
        let mut heap = Heap::new();
        let one = heap.integer(1);
        let two = heap.integer(2);
        let three = heap.integer(3);
        let pair = heap.cons(one, two);
        let same = heap.cons(one, two);
        let other = heap.cons(one, three);

        assert!(heap.equal(pair, pair));
        assert!(heap.equal(pair, same));
        assert!(!heap.equal(pair, other));
        assert!(heap.equal(heap.nil(), heap.nil()));
        assert!(!heap.equal(pair, heap.nil()));

        let hello = heap.string("hello");
        let hello2 = heap.string("hello");
        assert!(heap.equal(hello, hello2));
        assert!(heap.equal(heap.bool_value(true), heap.bool_value(true)));
        assert!(!heap.equal(heap.bool_value(true), heap.bool_value(false)));
    }

    #[test]
    fn lambdas_compare_by_identity() {
        let mut heap = Heap::new();
        let nil = heap.nil();
        let body = heap.integer(1);
        let a = heap.lambda(nil, body, nil);
        let b = heap.lambda(nil, body, nil);
        assert!(heap.equal(a, a));
        assert!(!heap.equal(a, b));
    }

    #[test]
    fn renders_lists_and_dotted_pairs() {
        let mut heap = Heap::new();
        let one = heap.integer(1);
        let two = heap.integer(2);
        let sym = heap.intern("x");
        let nil = heap.nil();
        let list = heap.list(&[sym, one, two]);
        assert_eq!(heap.render(list), "(x 1 2)");
        let dotted = heap.cons(one, two);
        assert_eq!(heap.render(dotted), "(1 . 2)");
        assert_eq!(heap.render(nil), "()");
        let text = heap.string("a\"b");
        assert_eq!(heap.render(text), "\"a\\\"b\"");
    }

    #[test]
    fn mentions_symbol_walks_trees() {
        let mut heap = Heap::new();
        let x = heap.intern("x");
        let y = heap.intern("y");
        let one = heap.integer(1);
        let inner = heap.list(&[y, one]);
        let expr = heap.list(&[x, inner]);
        assert!(heap.mentions_symbol(expr, x));
        assert!(heap.mentions_symbol(expr, y));
        let z = heap.intern("z");
        assert!(!heap.mentions_symbol(expr, z));
    }

    #[test]
    fn checked_accessors_report_tag_mismatch() {
        let mut heap = Heap::new();
        let one = heap.integer(1);
        let err = heap.first(one).unwrap_err();
        assert!(err.to_string().contains("expected Cons"));
        let err = heap.integer_value(heap.nil()).unwrap_err();
        assert!(err.to_string().contains("expected Integer"));
    }
}

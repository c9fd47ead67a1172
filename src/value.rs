use crate::{diagnostics::Result, runtime::Interpreter};

/// Native implementation of a builtin. Receives the already-evaluated
/// argument list as a value.
pub type BuiltinFn = fn(&mut Interpreter, Value) -> Result<Value>;

/// Handle to an [`Object`] in the heap arena. Handles are never null: every
/// `Value` in circulation was minted by an allocation or an intern hit, and
/// objects are never freed before the heap itself drops, so a handle stays
/// valid for the whole runtime lifetime.
///
/// `PartialEq` on handles is reference identity. That is the right equality
/// for Symbol, Builtin and Lambda; use [`crate::heap::Heap::equal`] when
/// structural equality is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value(pub(crate) u32);

impl Value {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A heap object. Exactly one variant is ever active per slot; apart from the
/// `letlambdas` back-patch step, objects are immutable once written.
#[derive(Debug)]
pub enum Object {
    Nil,
    Cons { first: Value, rest: Value },
    Str(Box<str>),
    Integer(i64),
    Symbol(Box<str>),
    Bool(bool),
    Builtin { name: &'static str, func: BuiltinFn },
    Lambda { params: Value, body: Value, env: Value },
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Nil => "Nil",
            Object::Cons { .. } => "Cons",
            Object::Str(_) => "String",
            Object::Integer(_) => "Integer",
            Object::Symbol(_) => "Symbol",
            Object::Bool(_) => "Bool",
            Object::Builtin { .. } => "Builtin",
            Object::Lambda { .. } => "Lambda",
        }
    }
}

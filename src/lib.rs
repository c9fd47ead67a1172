//! Core library for the Tansy language runtime: an arena-backed tagged value
//! model, symbol interning, a tail-call-eliminating tree-walking evaluator
//! with cyclic mutual-recursion closures, a binary value codec, and a
//! bootstrap loader for tooling written in the hosted language itself.

pub mod arena;
pub mod bootstrap;
pub mod builtins;
pub mod codec;
pub mod diagnostics;
pub mod env;
pub mod heap;
pub mod reader;
pub mod repl;
pub mod runtime;
pub mod value;

pub use bootstrap::BootTool;
pub use diagnostics::{Diagnostic, DiagnosticKind, SourceSpan, TansyError};
pub use heap::Heap;
pub use repl::Repl;
pub use runtime::Interpreter;
pub use value::{Object, Value};

//! Bootstrap loader. Parts of the runtime's own tooling — the pretty printer
//! and the macro transformer — are ordinary programs in the hosted language,
//! compiled once with the crate's own serializer and embedded as binary
//! blobs. On first use a blob is deserialized, evaluated in the empty
//! environment, and the resulting callable is cached for the rest of the
//! runtime's lifetime; the blob itself is never re-parsed. The sources live
//! in `boot/` and are recompiled with `tansy transform boot/<tool>.tsy
//! --output boot/<tool>.bin`.

use std::borrow::Cow;

use crate::{
    diagnostics::{Diagnostic, Result},
    runtime::Interpreter,
    value::{Object, Value},
};

static PRETTYPRINT_BLOB: &[u8] = include_bytes!("../boot/prettyprint.bin");
static TRANSFORM_BLOB: &[u8] = include_bytes!("../boot/transform.bin");

/// The hosted tools the runtime can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootTool {
    PrettyPrint = 0,
    Transform = 1,
}

pub(crate) struct ToolSlot {
    blob: Cow<'static, [u8]>,
    cached: Option<Value>,
}

impl ToolSlot {
    pub(crate) fn defaults() -> [ToolSlot; 2] {
        [
            ToolSlot {
                blob: Cow::Borrowed(PRETTYPRINT_BLOB),
                cached: None,
            },
            ToolSlot {
                blob: Cow::Borrowed(TRANSFORM_BLOB),
                cached: None,
            },
        ]
    }
}

impl Interpreter {
    /// Replaces a tool's blob, dropping any cached callable. The next use
    /// loads the new blob.
    pub fn install_tool(&mut self, tool: BootTool, blob: Vec<u8>) {
        let slot = &mut self.tools[tool as usize];
        slot.blob = Cow::Owned(blob);
        slot.cached = None;
    }

    fn tool_callable(&mut self, tool: BootTool) -> Result<Value> {
        let index = tool as usize;
        if let Some(cached) = self.tools[index].cached {
            return Ok(cached);
        }
        let blob = self.tools[index].blob.clone();
        let program = self.deserialize(&blob)?;
        let nil = self.heap.nil();
        let callable = self.eval(program, nil)?;
        match self.heap.get(callable) {
            Object::Lambda { .. } | Object::Builtin { .. } => {}
            other => {
                return Err(Diagnostic::runtime(format!(
                    "bootstrap blob evaluated to {}, expected a callable",
                    other.type_name()
                ))
                .into());
            }
        }
        self.tools[index].cached = Some(callable);
        Ok(callable)
    }

    /// Applies the cached tool to `quote`-wrapped arguments through the
    /// ordinary evaluator.
    fn call_tool(&mut self, tool: BootTool, args: &[Value]) -> Result<Value> {
        let callable = self.tool_callable(tool)?;
        let mut call = vec![callable];
        call.extend_from_slice(args);
        let call = self.heap.list(&call);
        let nil = self.heap.nil();
        self.eval(call, nil)
    }

    fn quoted(&mut self, value: Value) -> Value {
        let quote = self.syms.quote;
        self.heap.list(&[quote, value])
    }

    /// Runs the hosted macro transformer over a parsed program.
    pub fn transform(&mut self, program: Value) -> Result<Value> {
        let quoted = self.quoted(program);
        self.call_tool(BootTool::Transform, &[quoted])
    }

    /// Renders a value through the hosted pretty printer.
    pub fn pretty(&mut self, value: Value, indent: i64) -> Result<String> {
        let quoted = self.quoted(value);
        let indent = self.heap.integer(indent);
        let result = self.call_tool(BootTool::PrettyPrint, &[quoted, indent])?;
        Ok(self.heap.string_value(result)?.to_owned())
    }
}

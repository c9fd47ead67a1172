use crate::{
    builtins,
    diagnostics::{Diagnostic, DiagnosticKind, Result, TansyError},
    env,
    heap::Heap,
    value::{BuiltinFn, Object, Value},
};

/// Non-tail evaluation depth limit. Tail positions loop in place and do not
/// count against this; everything else nests real calls, and exceeding the
/// limit is a reported evaluation error instead of a stack crash. Each level
/// costs several native frames in debug builds, so the limit must stay well
/// inside a 2 MiB thread stack.
const MAX_DEPTH: usize = 200;

/// How many innermost frames a rendered trace shows before eliding the rest.
const MAX_TRACE_FRAMES: usize = 20;

/// Symbols the evaluator recognizes before ordinary evaluation order applies.
pub(crate) struct Syms {
    pub quote: Value,
    pub if_: Value,
    pub letlambdas: Value,
    pub import: Value,
    pub core: Value,
}

/// Transient diagnostic record mirroring evaluator nesting. Pushed on entry
/// to an evaluation, popped on exit, including on error unwind; the chain is
/// rendered into the diagnostic at the moment an error is created.
struct Frame {
    expr: Value,
    env: Value,
}

enum Step {
    Done(Value),
    Tail(Value, Value),
}

enum Callee {
    Builtin(BuiltinFn),
    Lambda { params: Value, body: Value, env: Value },
    Other,
}

/// One runtime instance: the heap, the interned special-form symbols, the
/// core-module table, the builtin registry (in stable codec-id order), the
/// diagnostic frame stack, and the cached bootstrap tools.
pub struct Interpreter {
    pub(crate) heap: Heap,
    pub(crate) syms: Syms,
    pub(crate) builtins: Vec<Value>,
    core_imports: Value,
    frames: Vec<Frame>,
    depth: usize,
    pub(crate) tools: [crate::bootstrap::ToolSlot; 2],
}

impl Interpreter {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let syms = Syms {
            quote: heap.intern("quote"),
            if_: heap.intern("if"),
            letlambdas: heap.intern("letlambdas"),
            import: heap.intern("import"),
            core: heap.intern("core"),
        };
        let mut registry = Vec::new();
        let mut pairs = Vec::new();
        for (name, func) in builtins::REGISTRY {
            let value = heap.builtin(name, *func);
            let sym = heap.intern(name);
            pairs.push(heap.cons(sym, value));
            registry.push(value);
        }
        let core_imports = heap.list(&pairs);
        Self {
            heap,
            syms,
            builtins: registry,
            core_imports,
            frames: Vec::new(),
            depth: 0,
            tools: crate::bootstrap::ToolSlot::defaults(),
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The core-module table doubles as a ready-made environment binding
    /// every builtin under its surface name.
    pub fn core_env(&self) -> Value {
        self.core_imports
    }

    pub fn parse(&mut self, source: &str) -> Result<Value> {
        crate::reader::parse(&mut self.heap, source)
    }

    pub fn parse_multi(&mut self, source: &str) -> Result<Value> {
        crate::reader::parse_multi(&mut self.heap, source)
    }

    pub fn serialize(&self, value: Value) -> Result<Vec<u8>> {
        crate::codec::serialize(&self.heap, &self.builtins, value)
    }

    pub fn deserialize(&mut self, data: &[u8]) -> Result<Value> {
        crate::codec::deserialize(&mut self.heap, &self.builtins, data)
    }

    /// Parses one expression and evaluates it in the core environment.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let expr = self.parse(source)?;
        let env = self.core_env();
        self.eval(expr, env)
    }

    /// Full program pipeline: multi-expression parse, hosted transform, then
    /// evaluation of the transformed program in the empty environment.
    pub fn run_source(&mut self, source: &str) -> Result<Value> {
        let forms = self.parse_multi(source)?;
        let program = self.transform(forms)?;
        let nil = self.heap.nil();
        self.eval(program, nil)
    }

    // ---- evaluator --------------------------------------------------------

    pub fn eval(&mut self, expr: Value, env: Value) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(self.fatal("recursion limit exceeded"));
        }
        self.depth += 1;
        let result = self.eval_loop(expr, env);
        self.depth -= 1;
        result
    }

    /// The trampoline. Tail positions (`if` branches, `letlambdas` bodies,
    /// lambda application) rewrite the (expression, environment) pair and
    /// continue; only non-tail positions recurse into [`Self::eval`].
    fn eval_loop(&mut self, expr: Value, env: Value) -> Result<Value> {
        let mut expr = expr;
        let mut env = env;
        loop {
            self.frames.push(Frame { expr, env });
            let step = self.eval_step(expr, env).map_err(|err| self.attach_trace(err));
            self.frames.pop();
            match step? {
                Step::Done(value) => return Ok(value),
                Step::Tail(next_expr, next_env) => {
                    expr = next_expr;
                    env = next_env;
                }
            }
        }
    }

    fn eval_step(&mut self, expr: Value, env: Value) -> Result<Step> {
        let (head, tail) = match self.heap.get(expr) {
            Object::Symbol(_) => {
                return Ok(Step::Done(env::lookup(&self.heap, env, expr)?));
            }
            Object::Cons { first, rest } => (*first, *rest),
            // Integer, Nil, Bool, String, Builtin and Lambda evaluate to
            // themselves.
            _ => return Ok(Step::Done(expr)),
        };

        if head == self.syms.quote {
            let [arg] = self.form_args(tail, "quote")?;
            return Ok(Step::Done(arg));
        }
        if head == self.syms.if_ {
            let [cond, then_branch, else_branch] = self.form_args(tail, "if")?;
            let cond = self.eval(cond, env)?;
            let cond = self.heap.bool_of(cond)?;
            let branch = if cond { then_branch } else { else_branch };
            return Ok(Step::Tail(branch, env));
        }
        if head == self.syms.letlambdas {
            let [defs, body] = self.form_args(tail, "letlambdas")?;
            let group_env = env::recursive_group(&mut self.heap, defs, env)?;
            return Ok(Step::Tail(body, group_env));
        }
        if head == self.syms.import {
            let [module, name] = self.form_args(tail, "import")?;
            if module != self.syms.core {
                return Err(self.fatal(format!(
                    "unknown module `{}`",
                    self.heap.render(module)
                )));
            }
            return match env::try_lookup(&self.heap, self.core_imports, name)? {
                Some(value) => Ok(Step::Done(value)),
                None => Err(self.fatal(format!(
                    "unknown core import `{}`",
                    self.heap.render(name)
                ))),
            };
        }

        // Application: callee and arguments evaluate left to right.
        let callee = self.eval(head, env)?;
        let args = self.eval_list(tail, env)?;
        let kind = match self.heap.get(callee) {
            Object::Builtin { func, .. } => Callee::Builtin(*func),
            Object::Lambda { params, body, env } => Callee::Lambda {
                params: *params,
                body: *body,
                env: *env,
            },
            _ => Callee::Other,
        };
        match kind {
            Callee::Builtin(func) => {
                // Extra frame so a failing builtin reports the call it was
                // handed, with arguments already evaluated.
                let call = self.heap.cons(callee, args);
                self.frames.push(Frame { expr: call, env });
                let result = func(self, args).map_err(|err| self.attach_trace(err));
                self.frames.pop();
                Ok(Step::Done(result?))
            }
            Callee::Lambda {
                params,
                body,
                env: captured,
            } => {
                let call_env = env::extend(&mut self.heap, params, args, captured)?;
                Ok(Step::Tail(body, call_env))
            }
            Callee::Other => Err(self.fatal(format!(
                "calling non-function value `{}`",
                self.heap.render(callee)
            ))),
        }
    }

    fn eval_list(&mut self, list: Value, env: Value) -> Result<Value> {
        let mut items = Vec::new();
        let mut rest = list;
        while self.heap.is_cons(rest) {
            let first = self.heap.first(rest)?;
            items.push(self.eval(first, env)?);
            rest = self.heap.rest(rest)?;
        }
        let mut out = self.eval(rest, env)?;
        for item in items.into_iter().rev() {
            out = self.heap.cons(item, out);
        }
        Ok(out)
    }

    fn form_args<const N: usize>(&self, tail: Value, form: &str) -> Result<[Value; N]> {
        let mut out = [self.heap.nil(); N];
        let mut list = tail;
        for slot in out.iter_mut() {
            if !self.heap.is_cons(list) {
                return Err(self.malformed(form));
            }
            *slot = self.heap.first(list)?;
            list = self.heap.rest(list)?;
        }
        if !self.heap.is_nil(list) {
            return Err(self.malformed(form));
        }
        Ok(out)
    }

    fn malformed(&self, form: &str) -> TansyError {
        self.fatal(format!("malformed `{form}` special form"))
    }

    // ---- diagnostics ------------------------------------------------------

    /// Builds an evaluation-error diagnostic carrying the current frame
    /// chain. The chain must be captured here, at creation time, because the
    /// frames unwind together with the propagated error.
    pub(crate) fn fatal(&self, message: impl Into<String>) -> TansyError {
        let mut diagnostic = Diagnostic::runtime(message);
        diagnostic.notes = self.render_trace();
        diagnostic.into()
    }

    /// Adds the frame chain to runtime diagnostics coming from layers that
    /// cannot see it (heap accessors, environment helpers, builtins). A
    /// diagnostic that already has notes passes through untouched.
    fn attach_trace(&self, err: TansyError) -> TansyError {
        match err {
            TansyError::Diagnostic(mut diagnostic)
                if diagnostic.kind == DiagnosticKind::Runtime && diagnostic.notes.is_empty() =>
            {
                diagnostic.notes = self.render_trace();
                diagnostic.into()
            }
            other => other,
        }
    }

    /// Renders the frame chain innermost first: each frame's expression, and
    /// for every symbol the expression mentions that was bound since the
    /// parent frame, its value.
    fn render_trace(&self) -> Vec<String> {
        let mut notes = Vec::new();
        let shown = self.frames.len().min(MAX_TRACE_FRAMES);
        for (index, frame) in self.frames.iter().enumerate().rev().take(shown) {
            notes.push(format!("evaluating {}", self.heap.render(frame.expr)));
            let boundary = if index > 0 {
                self.frames[index - 1].env
            } else {
                self.heap.nil()
            };
            let mut env = frame.env;
            while !self.heap.is_nil(env) && env != boundary {
                let entry = self
                    .heap
                    .first(env)
                    .ok()
                    .and_then(|pair| match self.heap.get(pair) {
                        Object::Cons { first, rest } => Some((*first, *rest)),
                        _ => None,
                    });
                let next = match self.heap.rest(env) {
                    Ok(next) => next,
                    Err(_) => break,
                };
                if let Some((key, value)) = entry {
                    if self.heap.mentions_symbol(frame.expr, key) {
                        if let Ok(name) = self.heap.symbol_name(key) {
                            notes.push(format!(
                                "    where {name} = {}",
                                self.heap.render(value)
                            ));
                        }
                    }
                }
                env = next;
            }
        }
        if self.frames.len() > shown {
            notes.push(format!(
                "... {} outer frames elided",
                self.frames.len() - shown
            ));
        }
        notes
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

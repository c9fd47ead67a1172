//! Environment model. An environment is not a distinct type: it is Nil (the
//! empty environment) or a cons chain whose `first` is a `(Symbol . Value)`
//! pair and whose `rest` is the enclosing frame.

use crate::{
    diagnostics::{Diagnostic, Result},
    heap::Heap,
    value::Value,
};

/// Scans `table` outward for a pair whose key is identical to `key`.
/// The first hit wins, which is what gives ordinary lexical shadowing.
pub fn try_lookup(heap: &Heap, table: Value, key: Value) -> Result<Option<Value>> {
    let mut entry = table;
    while !heap.is_nil(entry) {
        let pair = heap.first(entry)?;
        if heap.first(pair)? == key {
            return Ok(Some(heap.rest(pair)?));
        }
        entry = heap.rest(entry)?;
    }
    Ok(None)
}

pub fn lookup(heap: &Heap, env: Value, key: Value) -> Result<Value> {
    match try_lookup(heap, env, key)? {
        Some(value) => Ok(value),
        None => Err(Diagnostic::runtime(format!(
            "unbound symbol `{}`",
            heap.render(key)
        ))
        .into()),
    }
}

/// Pairs each parameter symbol with the matching argument, consing
/// outermost-first onto `env`. Arity must match exactly; no variadics.
pub fn extend(heap: &mut Heap, params: Value, args: Value, env: Value) -> Result<Value> {
    let want = heap.list_length(params);
    let got = heap.list_length(args);
    if want != got {
        return Err(Diagnostic::runtime(format!(
            "arity mismatch: expected {want} arguments, received {got}"
        ))
        .into());
    }
    let mut params = params;
    let mut args = args;
    let mut env = env;
    while !heap.is_nil(params) {
        let key = heap.first(params)?;
        if !heap.is_symbol(key) {
            return Err(Diagnostic::runtime(format!(
                "lambda parameter must be a symbol, found {}",
                heap.type_name(key)
            ))
            .into());
        }
        let value = heap.first(args)?;
        let pair = heap.cons(key, value);
        env = heap.cons(pair, env);
        params = heap.rest(params)?;
        args = heap.rest(args)?;
    }
    Ok(env)
}

/// Builds the environment for a `letlambdas` group.
///
/// Every member's closure must exist before any member's environment is
/// complete, so the chain is built in two passes: allocate one placeholder
/// cell per definition, construct each lambda capturing the head of the
/// still-incomplete chain, then back-patch each placeholder with its
/// `(name . lambda)` pair. The resulting closures form reference cycles with
/// their own capturing environment; lookups by symbol identity are safe on
/// such chains, structural equality is not.
pub fn recursive_group(heap: &mut Heap, defs: Value, env: Value) -> Result<Value> {
    let count = heap.list_length(defs);
    let nil = heap.nil();

    let mut group_env = env;
    for _ in 0..count {
        group_env = heap.cons(nil, group_env);
    }

    let mut slot = group_env;
    let mut remaining = defs;
    while !heap.is_nil(remaining) {
        let def = heap.first(remaining)?;
        let header = heap.first(def)?;
        let body_list = heap.rest(def)?;
        if !heap.is_nil(heap.rest(body_list)?) {
            return Err(Diagnostic::runtime(
                "letlambdas definition takes exactly one body expression",
            )
            .into());
        }
        let body = heap.first(body_list)?;

        let name = heap.first(header)?;
        if !heap.is_symbol(name) {
            return Err(Diagnostic::runtime(format!(
                "letlambdas name must be a symbol, found {}",
                heap.type_name(name)
            ))
            .into());
        }
        let params = heap.rest(header)?;
        check_params(heap, params)?;

        let lambda = heap.lambda(params, body, group_env);
        let pair = heap.cons(name, lambda);
        heap.set_first(slot, pair)?;

        slot = heap.rest(slot)?;
        remaining = heap.rest(remaining)?;
    }
    debug_assert_eq!(slot, env);

    Ok(group_env)
}

/// A well-formed parameter list is Nil or a proper list of symbols.
pub fn check_params(heap: &Heap, params: Value) -> Result<()> {
    let mut entry = params;
    while !heap.is_nil(entry) {
        if !heap.is_cons(entry) {
            return Err(
                Diagnostic::runtime("lambda parameters must form a proper list").into(),
            );
        }
        let param = heap.first(entry)?;
        if !heap.is_symbol(param) {
            return Err(Diagnostic::runtime(format!(
                "lambda parameter must be a symbol, found {}",
                heap.type_name(param)
            ))
            .into());
        }
        entry = heap.rest(entry)?;
    }
    Ok(())
}

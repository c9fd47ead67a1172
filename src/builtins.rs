//! The fixed catalog of native primitive functions reachable through
//! `(import core name)`. Registry order is load-bearing: a builtin's codec id
//! is its position here, so entries must only ever be appended.

use crate::{
    diagnostics::{Diagnostic, Result},
    runtime::Interpreter,
    value::{BuiltinFn, Object, Value},
};

pub const REGISTRY: &[(&'static str, BuiltinFn)] = &[
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    ("modulo", modulo),
    ("cons", cons),
    ("first", first),
    ("rest", rest),
    ("cons?", is_cons),
    ("nil?", is_nil),
    ("int?", is_int),
    ("sym?", is_sym),
    ("str?", is_str),
    ("eq?", is_equal),
    ("lt?", is_less),
    ("concat", concat),
    ("split", split),
    ("sym-name", sym_name),
    ("make-symbol", make_symbol),
    ("type", type_of),
];

fn integers(interp: &Interpreter, mut args: Value) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    while !interp.heap.is_nil(args) {
        let item = interp.heap.first(args)?;
        out.push(interp.heap.integer_value(item)?);
        args = interp.heap.rest(args)?;
    }
    Ok(out)
}

fn arg1(interp: &Interpreter, args: Value) -> Result<Value> {
    let first = interp.heap.first(args)?;
    if !interp.heap.is_nil(interp.heap.rest(args)?) {
        return Err(Diagnostic::runtime("expected exactly 1 argument").into());
    }
    Ok(first)
}

fn arg2(interp: &Interpreter, args: Value) -> Result<(Value, Value)> {
    let first = interp.heap.first(args)?;
    let tail = interp.heap.rest(args)?;
    let second = interp.heap.first(tail)?;
    if !interp.heap.is_nil(interp.heap.rest(tail)?) {
        return Err(Diagnostic::runtime("expected exactly 2 arguments").into());
    }
    Ok((first, second))
}

// ---- arithmetic ------------------------------------------------------------

fn add(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let total = integers(interp, args)?
        .into_iter()
        .fold(0i64, i64::wrapping_add);
    Ok(interp.heap.integer(total))
}

fn mul(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let total = integers(interp, args)?
        .into_iter()
        .fold(1i64, i64::wrapping_mul);
    Ok(interp.heap.integer(total))
}

fn sub(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let values = integers(interp, args)?;
    let result = match values.split_first() {
        None => {
            return Err(Diagnostic::runtime("`-` requires at least one argument").into());
        }
        Some((lone, [])) => lone.wrapping_neg(),
        Some((first, rest)) => rest.iter().fold(*first, |acc, n| acc.wrapping_sub(*n)),
    };
    Ok(interp.heap.integer(result))
}

fn div(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let values = integers(interp, args)?;
    let (first, rest) = values
        .split_first()
        .ok_or_else(|| Diagnostic::runtime("`/` requires at least one argument"))?;
    let mut acc = *first;
    for n in rest {
        if *n == 0 {
            return Err(Diagnostic::runtime("division by zero").into());
        }
        acc = acc.wrapping_div(*n);
    }
    Ok(interp.heap.integer(acc))
}

fn modulo(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let (a, b) = arg2(interp, args)?;
    let a = interp.heap.integer_value(a)?;
    let b = interp.heap.integer_value(b)?;
    if b == 0 {
        return Err(Diagnostic::runtime("modulo by zero").into());
    }
    Ok(interp.heap.integer(a.wrapping_rem(b)))
}

// ---- pairs -----------------------------------------------------------------

fn cons(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let (first, rest) = arg2(interp, args)?;
    Ok(interp.heap.cons(first, rest))
}

fn first(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    interp.heap.first(value)
}

fn rest(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    interp.heap.rest(value)
}

// ---- predicates ------------------------------------------------------------

fn is_cons(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    Ok(interp.heap.bool_value(interp.heap.is_cons(value)))
}

fn is_nil(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    Ok(interp.heap.bool_value(interp.heap.is_nil(value)))
}

fn is_int(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    let hit = matches!(interp.heap.get(value), Object::Integer(_));
    Ok(interp.heap.bool_value(hit))
}

fn is_sym(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    Ok(interp.heap.bool_value(interp.heap.is_symbol(value)))
}

fn is_str(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    let hit = matches!(interp.heap.get(value), Object::Str(_));
    Ok(interp.heap.bool_value(hit))
}

fn is_equal(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let (a, b) = arg2(interp, args)?;
    Ok(interp.heap.bool_value(interp.heap.equal(a, b)))
}

fn is_less(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let (a, b) = arg2(interp, args)?;
    let a = interp.heap.integer_value(a)?;
    let b = interp.heap.integer_value(b)?;
    Ok(interp.heap.bool_value(a < b))
}

// ---- strings and symbols ---------------------------------------------------

fn concat(interp: &mut Interpreter, mut args: Value) -> Result<Value> {
    let mut out = String::new();
    while !interp.heap.is_nil(args) {
        let item = interp.heap.first(args)?;
        out.push_str(interp.heap.string_value(item)?);
        args = interp.heap.rest(args)?;
    }
    Ok(interp.heap.string(out))
}

/// `(split s n1 n2 ...)` cuts successive pieces of the given byte lengths off
/// the front of `s` and returns them, with whatever remains as the final
/// piece: `(split "abcdef" 2 3)` is `("ab" "cde" "f")`.
fn split(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let text_value = interp.heap.first(args)?;
    let mut remaining = interp.heap.string_value(text_value)?.to_owned();
    let lengths = {
        let tail = interp.heap.rest(args)?;
        integers(interp, tail)?
    };
    let mut pieces = Vec::new();
    for len in lengths {
        let len = usize::try_from(len)
            .map_err(|_| Diagnostic::runtime("string index out of bounds"))?;
        if len > remaining.len() || !remaining.is_char_boundary(len) {
            return Err(Diagnostic::runtime("string index out of bounds").into());
        }
        let suffix = remaining.split_off(len);
        pieces.push(interp.heap.string(remaining));
        remaining = suffix;
    }
    pieces.push(interp.heap.string(remaining));
    Ok(interp.heap.list(&pieces))
}

fn sym_name(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    let name = interp.heap.symbol_name(value)?.to_owned();
    Ok(interp.heap.string(name))
}

fn make_symbol(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    let name = interp.heap.string_value(value)?.to_owned();
    Ok(interp.heap.intern(&name))
}

fn type_of(interp: &mut Interpreter, args: Value) -> Result<Value> {
    let value = arg1(interp, args)?;
    let name = interp.heap.type_name(value);
    Ok(interp.heap.intern(name))
}

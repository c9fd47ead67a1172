//! Binary codec for the value graph. One leading tag byte per node, then the
//! payload; lengths and integers use little-endian base-128 varints with the
//! high bit as continuation, and signed integers are zig-zag mapped first.
//!
//! The round-trip contract covers acyclic trees: `decode(encode(v))` is
//! structurally equal to `v`, decoded symbols are re-interned so they stay
//! identity-comparable, and builtins survive through their registry id.
//! Closure environments produced by `letlambdas` are cyclic; the explicit
//! depth limit turns an attempt to encode (or decode) such a graph into a
//! codec error. Both directions run on explicit worklists, so nesting depth
//! is bounded by the heap, never by the native stack.

use crate::{
    diagnostics::{Diagnostic, Result},
    env,
    heap::Heap,
    value::{Object, Value},
};

const TAG_NIL: u8 = 0;
const TAG_CONS: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_INTEGER: u8 = 3;
const TAG_SYMBOL: u8 = 4;
const TAG_BUILTIN: u8 = 5;
const TAG_BOOL_TRUE: u8 = 6;
const TAG_BOOL_FALSE: u8 = 7;
const TAG_LAMBDA: u8 = 8;

const MAX_DEPTH: usize = 4096;

pub fn serialize(heap: &Heap, builtins: &[Value], value: Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_value(heap, builtins, &mut out, value)?;
    Ok(out)
}

pub fn deserialize(heap: &mut Heap, builtins: &[Value], data: &[u8]) -> Result<Value> {
    let mut cursor = data;
    let value = read_value(heap, builtins, &mut cursor)?;
    if !cursor.is_empty() {
        return Err(Diagnostic::codec(format!(
            "trailing garbage after encoded value ({} bytes)",
            cursor.len()
        ))
        .into());
    }
    Ok(value)
}

/// Pre-order DFS over an explicit stack. Every entry carries its tree depth,
/// so a cyclic graph (whose unrolling is infinitely deep) trips the limit.
fn write_value(heap: &Heap, builtins: &[Value], out: &mut Vec<u8>, value: Value) -> Result<()> {
    let mut stack = vec![(value, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            return Err(Diagnostic::codec("value too deeply nested to encode").into());
        }
        match heap.get(value) {
            Object::Nil => out.push(TAG_NIL),
            Object::Cons { first, rest } => {
                out.push(TAG_CONS);
                stack.push((*rest, depth + 1));
                stack.push((*first, depth + 1));
            }
            Object::Str(text) => {
                out.push(TAG_STRING);
                write_bytes(out, text.as_bytes());
            }
            Object::Integer(n) => {
                out.push(TAG_INTEGER);
                write_uint(out, zigzag(*n));
            }
            Object::Symbol(name) => {
                out.push(TAG_SYMBOL);
                write_bytes(out, name.as_bytes());
            }
            Object::Builtin { name, .. } => {
                let id = builtins
                    .iter()
                    .position(|registered| *registered == value)
                    .ok_or_else(|| {
                        Diagnostic::codec(format!(
                            "cannot serialize unregistered builtin `{name}`"
                        ))
                    })?;
                out.push(TAG_BUILTIN);
                write_uint(out, id as u64);
            }
            Object::Bool(true) => out.push(TAG_BOOL_TRUE),
            Object::Bool(false) => out.push(TAG_BOOL_FALSE),
            Object::Lambda { params, body, env } => {
                out.push(TAG_LAMBDA);
                stack.push((*body, depth + 1));
                stack.push((*params, depth + 1));
                stack.push((*env, depth + 1));
            }
        }
    }
    Ok(())
}

/// An interior node whose children are still being decoded. `pending.len()`
/// is the nesting depth of the node currently being read.
enum Pending {
    Cons { first: Option<Value> },
    Lambda { env: Option<Value>, params: Option<Value> },
}

fn read_value(heap: &mut Heap, builtins: &[Value], cursor: &mut &[u8]) -> Result<Value> {
    let mut pending: Vec<Pending> = Vec::new();
    loop {
        if pending.len() > MAX_DEPTH {
            return Err(Diagnostic::codec("encoded value too deeply nested").into());
        }
        let tag = take_byte(cursor)?;
        let mut value = match tag {
            TAG_NIL => heap.nil(),
            TAG_CONS => {
                pending.push(Pending::Cons { first: None });
                continue;
            }
            TAG_STRING => {
                let text = read_text(cursor)?;
                heap.string(text)
            }
            TAG_INTEGER => {
                let n = unzigzag(read_uint(cursor)?);
                heap.integer(n)
            }
            TAG_SYMBOL => {
                let name = read_text(cursor)?;
                heap.intern(&name)
            }
            TAG_BUILTIN => {
                let id = read_uint(cursor)? as usize;
                builtins
                    .get(id)
                    .copied()
                    .ok_or_else(|| Diagnostic::codec(format!("unknown builtin id {id}")))?
            }
            TAG_BOOL_TRUE => heap.bool_value(true),
            TAG_BOOL_FALSE => heap.bool_value(false),
            TAG_LAMBDA => {
                pending.push(Pending::Lambda {
                    env: None,
                    params: None,
                });
                continue;
            }
            other => return Err(Diagnostic::codec(format!("unknown tag byte {other}")).into()),
        };
        // Feed the completed value upward; each finished parent completes in
        // turn until one still wants more children.
        loop {
            match pending.pop() {
                None => return Ok(value),
                Some(Pending::Cons { first: None }) => {
                    pending.push(Pending::Cons { first: Some(value) });
                    break;
                }
                Some(Pending::Cons { first: Some(first) }) => {
                    value = heap.cons(first, value);
                }
                Some(Pending::Lambda { env: None, params }) => {
                    pending.push(Pending::Lambda {
                        env: Some(value),
                        params,
                    });
                    break;
                }
                Some(Pending::Lambda { env, params: None }) => {
                    pending.push(Pending::Lambda {
                        env,
                        params: Some(value),
                    });
                    break;
                }
                Some(Pending::Lambda {
                    env: Some(env),
                    params: Some(params),
                }) => {
                    env::check_params(heap, params).map_err(|_| {
                        Diagnostic::codec("malformed lambda parameter list in encoded value")
                    })?;
                    value = heap.lambda(params, value, env);
                }
            }
        }
    }
}

// ---- varints ---------------------------------------------------------------

fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

fn write_uint(out: &mut Vec<u8>, mut n: u64) {
    loop {
        let mut bits = (n & 0x7f) as u8;
        n >>= 7;
        if n != 0 {
            bits |= 0x80;
        }
        out.push(bits);
        if n == 0 {
            return;
        }
    }
}

fn read_uint(cursor: &mut &[u8]) -> Result<u64> {
    let mut out = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = take_byte(cursor)?;
        // The tenth byte only has room for the top bit of a u64.
        if shift >= 64 || (shift == 63 && byte & 0x7f > 1) {
            return Err(Diagnostic::codec("varint too long").into());
        }
        out |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(out);
        }
        shift += 7;
    }
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_uint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn read_text(cursor: &mut &[u8]) -> Result<String> {
    let len = read_uint(cursor)? as usize;
    if cursor.len() < len {
        return Err(Diagnostic::codec("truncated input").into());
    }
    let (bytes, rest) = cursor.split_at(len);
    *cursor = rest;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Diagnostic::codec("invalid UTF-8 in encoded text").into())
}

fn take_byte(cursor: &mut &[u8]) -> Result<u8> {
    match cursor.split_first() {
        Some((byte, rest)) => {
            *cursor = rest;
            Ok(*byte)
        }
        None => Err(Diagnostic::codec("truncated input").into()),
    }
}

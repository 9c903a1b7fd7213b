//! The runtime value representation and the printer.
//!
//! `Value` is the single tagged sum flowing through the whole interpreter:
//! the parser emits `Value`s, the evaluator reduces `Value`s, and scope frames
//! bind names to `Value`s. Small immediate values (integers, booleans, interned
//! symbols, the empty list) are stored inline; everything with structure or
//! identity (pairs, quotations, lambdas, unevaluated call nodes) lives in the
//! heap arena and is referenced via `Ref(HeapId)`.
//!
//! Keeping `Value` small and `Copy` means argument lists and scope bindings
//! never deep-copy structure; sharing and mutation behave like the pointer
//! graph they replace, with liveness decided by the collector.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    exception::{Exception, RunResult},
    heap::{Heap, HeapData, HeapId},
    intern::{Interns, StringId},
};

/// Primary value type representing expressions and results at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) enum Value {
    /// The empty list `()`. Also stands in for "no value": void-returning
    /// forms reduce to `Nil`, which prints as `()`.
    Nil,
    /// A 64-bit signed integer.
    Int(i64),
    /// `#t` or `#f`.
    Bool(bool),
    /// An interned identifier.
    Symbol(StringId),
    /// A heap-allocated node (pair, quotation, lambda, builtin call, ...).
    Ref(HeapId),
}

impl Value {
    /// Human-readable type label for error messages.
    pub fn type_name(self, heap: &Heap) -> &'static str {
        match self {
            Self::Nil => "the empty list",
            Self::Int(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Symbol(_) => "symbol",
            Self::Ref(id) => match heap.get(id) {
                HeapData::Pair(_) => "pair",
                HeapData::Quote(_) => "quotation",
                HeapData::Formals(_) => "parameter list",
                HeapData::Lambda(_) | HeapData::Primitive(_) | HeapData::Apply(_) => "procedure",
            },
        }
    }
}

/// Renders a value the way the REPL reports results.
///
/// Lambdas, builtin forms, and unevaluated call nodes have no surface syntax
/// and raise NameError. A structure that is cyclic along the traversal path
/// raises RuntimeError rather than looping.
pub(crate) fn print_value(value: Value, heap: &Heap, interns: &Interns) -> RunResult<String> {
    let mut out = String::new();
    let mut path = AHashSet::new();
    write_value(&mut out, value, heap, interns, true, &mut path)?;
    Ok(out)
}

fn write_value(
    out: &mut String,
    value: Value,
    heap: &Heap,
    interns: &Interns,
    top_level: bool,
    path: &mut AHashSet<HeapId>,
) -> RunResult<()> {
    match value {
        Value::Nil => out.push_str("()"),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if b { "#t" } else { "#f" }),
        Value::Symbol(id) => out.push_str(interns.get(id)),
        Value::Ref(id) => match heap.get(id) {
            // A quotation prints as its payload in top-level form.
            HeapData::Quote(payload) => {
                let payload = *payload;
                write_value(out, payload, heap, interns, true, path)?;
            }
            HeapData::Pair(_) => write_pair(out, id, heap, interns, top_level, path)?,
            HeapData::Formals(formals) => {
                out.push('(');
                for (index, &name) in formals.names().iter().enumerate() {
                    if index > 0 {
                        out.push(' ');
                    }
                    out.push_str(interns.get(name));
                }
                out.push(')');
            }
            HeapData::Lambda(_) | HeapData::Primitive(_) | HeapData::Apply(_) => {
                return Err(Exception::name("a procedure cannot be printed"));
            }
        },
    }
    Ok(())
}

/// Walks a pair spine: elements separated by spaces, an improper tail after
/// ` . `, the whole chain wrapped in parentheses at top level.
fn write_pair(
    out: &mut String,
    head: HeapId,
    heap: &Heap,
    interns: &Interns,
    top_level: bool,
    path: &mut AHashSet<HeapId>,
) -> RunResult<()> {
    if top_level {
        out.push('(');
    }
    // Spine ids stay in `path` while this chain (and anything hanging off its
    // cars) is being written, then get released so shared structure printed
    // later is not mistaken for a cycle.
    let mut spine: SmallVec<[HeapId; 8]> = SmallVec::new();
    let mut cursor = head;
    let result = loop {
        if !path.insert(cursor) {
            break Err(Exception::runtime("cannot print a cyclic structure"));
        }
        spine.push(cursor);
        let HeapData::Pair(pair) = heap.get(cursor) else {
            unreachable!("pair spine cursor must point at a pair");
        };
        let (car, cdr) = (pair.car, pair.cdr);
        if let Err(err) = write_value(out, car, heap, interns, true, path) {
            break Err(err);
        }
        match cdr {
            Value::Nil => break Ok(()),
            Value::Ref(next) if matches!(heap.get(next), HeapData::Pair(_)) => {
                out.push(' ');
                cursor = next;
            }
            tail => {
                out.push_str(" . ");
                break write_value(out, tail, heap, interns, false, path);
            }
        }
    };
    for id in spine {
        path.remove(&id);
    }
    result?;
    if top_level {
        out.push(')');
    }
    Ok(())
}

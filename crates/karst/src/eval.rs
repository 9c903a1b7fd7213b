//! The evaluator: depth-first recursive reduction of AST values.
//!
//! Evaluation is single-threaded and strict. Arguments are evaluated in
//! textual order in the caller's scope; only `and`, `or`, and `if` skip
//! evaluation of what their semantics make unreachable. Every result is a
//! `Value`, freshly allocated only where a builtin says so (e.g. `cons`).
//!
//! Recursion uses the host stack. An optional depth cap (see
//! [`ResourceLimits`]) turns runaway recursion into a RuntimeError before it
//! can exhaust the stack; by default there is no cap.

use crate::{
    builtins::{self, Builtin},
    exception::{Exception, RunResult},
    heap::{Heap, HeapData, HeapId},
    intern::{Interns, StringId},
    resource::ResourceLimits,
    scope::ScopeId,
    value::Value,
};

/// Evaluation state for one `run` call: the session's heap and intern table
/// plus the recursion accounting.
pub(crate) struct Vm<'a> {
    pub heap: &'a mut Heap,
    pub interns: &'a Interns,
    limits: ResourceLimits,
    depth: usize,
}

impl<'a> Vm<'a> {
    pub fn new(heap: &'a mut Heap, interns: &'a Interns, limits: ResourceLimits) -> Self {
        Self {
            heap,
            interns,
            limits,
            depth: 0,
        }
    }

    /// Reduces `value` against `scope`.
    pub fn eval(&mut self, value: Value, scope: ScopeId) -> RunResult<Value> {
        if let Some(max) = self.limits.max_recursion_depth
            && self.depth >= max
        {
            return Err(Exception::runtime(format!("recursion depth limit of {max} exceeded")));
        }
        self.depth += 1;
        let result = self.eval_inner(value, scope);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, value: Value, scope: ScopeId) -> RunResult<Value> {
        match value {
            // Scalars are self-evaluating.
            Value::Nil | Value::Int(_) | Value::Bool(_) => Ok(value),
            Value::Symbol(name) => self.heap.lookup(scope, name).ok_or_else(|| {
                Exception::name(format!("variable '{}' is not defined", self.interns.get(name)))
            }),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Quote(payload) => Ok(*payload),
                HeapData::Pair(_) => Err(Exception::name("a bare list cannot be evaluated")),
                HeapData::Formals(_) => Err(Exception::name("a parameter list cannot be evaluated")),
                HeapData::Lambda(lambda) => {
                    let needs_snap = lambda.captured.is_none();
                    if needs_snap {
                        self.snap_lambda(id, scope);
                    }
                    Ok(value)
                }
                HeapData::Primitive(prim) => {
                    let op = prim.op;
                    let args = prim.args.clone();
                    builtins::eval_primitive(self, op, &args, scope)
                }
                HeapData::Apply(call) => {
                    let target = call.target;
                    let args = call.args.clone();
                    self.apply(target, &args, scope)
                }
            },
        }
    }

    /// Fixes a lambda's captured environment to a snapshot fork of the scope
    /// it is first evaluated in. Later evaluations reuse that scope.
    fn snap_lambda(&mut self, lambda: HeapId, scope: ScopeId) {
        let snapshot = self.heap.fork_snapshot(scope);
        let HeapData::Lambda(lambda) = self.heap.get_mut(lambda) else {
            unreachable!("snap_lambda is only called on lambda nodes");
        };
        lambda.captured = Some(snapshot);
    }

    /// Resolves the operator of an application and calls it.
    fn apply(&mut self, target: Value, args: &[Value], scope: ScopeId) -> RunResult<Value> {
        let callee = self.eval(target, scope)?;
        if let Value::Ref(id) = callee
            && matches!(self.heap.get(id), HeapData::Lambda(_))
        {
            return self.apply_lambda(id, args, scope);
        }
        Err(Exception::runtime(format!(
            "cannot call a {}",
            callee.type_name(self.heap)
        )))
    }

    /// The lambda call protocol: snap the captured environment if this is the
    /// first evaluation, fork an empty call frame under it, bind each formal
    /// to its actual evaluated in the caller's scope, then evaluate the body.
    fn apply_lambda(&mut self, lambda: HeapId, args: &[Value], caller_scope: ScopeId) -> RunResult<Value> {
        let captured = {
            let HeapData::Lambda(data) = self.heap.get(lambda) else {
                unreachable!("apply_lambda is only called on lambda nodes");
            };
            data.captured
        };
        let captured = match captured {
            Some(existing) => existing,
            None => {
                self.snap_lambda(lambda, caller_scope);
                let HeapData::Lambda(data) = self.heap.get(lambda) else {
                    unreachable!("lambda node cannot change variant");
                };
                data.captured.expect("snap_lambda fills the captured scope")
            }
        };

        let (formals_id, body) = {
            let HeapData::Lambda(data) = self.heap.get(lambda) else {
                unreachable!("lambda node cannot change variant");
            };
            (data.formals, data.body.clone())
        };
        let names: Vec<StringId> = {
            let HeapData::Formals(formals) = self.heap.get(formals_id) else {
                unreachable!("lambda formals handle points at a parameter list");
            };
            formals.names().to_vec()
        };
        if names.len() != args.len() {
            return Err(Exception::runtime(format!(
                "procedure expects {} argument(s), got {}",
                names.len(),
                args.len()
            )));
        }

        let frame = self.heap.fork(captured);
        for (&name, &actual) in names.iter().zip(args) {
            let value = self.eval(actual, caller_scope)?;
            self.heap.scope_mut(frame).bind(name, value);
        }

        if body.len() == 2 {
            // Two clauses: the first may be an internal definition whose
            // binding must also reach the captured scope (unless shadowed)
            // so the function can refer to it on later calls.
            let lead = body[0];
            self.eval(lead, frame)?;
            if let Some(name) = internal_define_name(self.heap, lead)
                && let Some(defined) = self.heap.scope(frame).get(name)
            {
                self.heap.bind_if_absent(captured, name, defined);
            }
            self.eval(body[1], frame)
        } else {
            self.eval(body[0], frame)
        }
    }
}

/// If `clause` is a `define` node, the name it binds.
fn internal_define_name(heap: &Heap, clause: Value) -> Option<StringId> {
    let Value::Ref(id) = clause else {
        return None;
    };
    let HeapData::Primitive(prim) = heap.get(id) else {
        return None;
    };
    if prim.op != Builtin::Define {
        return None;
    }
    match prim.args.first()? {
        Value::Symbol(name) => Some(*name),
        Value::Ref(formals_id) => match heap.get(*formals_id) {
            HeapData::Formals(formals) => formals.names().first().copied(),
            _ => None,
        },
        _ => None,
    }
}

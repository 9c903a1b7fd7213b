//! The heap: two arenas (values and scopes) plus the mark-and-sweep collector.
//!
//! Every structured value and every scope lives in an arena slot and is
//! referenced by an opaque handle (`HeapId` / `ScopeId`). Slots do not own
//! each other, so pairs may form arbitrary cycles via `set-car!`/`set-cdr!`
//! without leaking or double-freeing; the collector alone decides liveness.
//!
//! Collection runs between top-level evaluations with the session's
//! persistent top-level scope as the sole root. Marking walks scope frames
//! into their bound values, values into their children (pair fields, quote
//! payloads, call arguments, lambda bodies), and lambdas back into their
//! captured scopes, with a seen-check so cyclic graphs are visited at most
//! once. Sweeping clears dead slots and recycles them through a free list,
//! so surviving handles stay valid across any number of collections.

use std::collections::BTreeMap;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    builtins::Builtin,
    intern::StringId,
    scope::{Scope, ScopeId},
    value::Value,
};

/// Opaque handle to a value slot in the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub(crate) struct HeapId(usize);

impl HeapId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A mutable cons cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Pair {
    pub car: Value,
    pub cdr: Value,
}

/// A parameter list: the left-hand side of a function `define` or the
/// formals of a `lambda`. Parser output only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Formals(Vec<StringId>);

impl Formals {
    pub fn new(names: Vec<StringId>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[StringId] {
        &self.0
    }
}

/// A closure: parameter list, one- or two-clause body, and the environment
/// captured on first evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Lambda {
    /// Handle to the `Formals` node holding the parameter names.
    pub formals: HeapId,
    /// Body clauses: an optional internal definition followed by the result
    /// expression.
    pub body: SmallVec<[Value; 2]>,
    /// The definition environment. `None` until the lambda is first
    /// evaluated, at which point it snaps to a fresh snapshot fork of the
    /// enclosing scope and never changes again.
    pub captured: Option<ScopeId>,
}

/// An unevaluated builtin call, dispatched by keyword at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Primitive {
    pub op: Builtin,
    pub args: Vec<Value>,
}

/// An unevaluated application `(operator arg...)` whose operator must reduce
/// to a lambda at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Apply {
    pub target: Value,
    pub args: Vec<Value>,
}

/// Heap-allocated node variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum HeapData {
    Pair(Pair),
    Quote(Value),
    Formals(Formals),
    Lambda(Lambda),
    Primitive(Primitive),
    Apply(Apply),
}

impl HeapData {
    /// Static variant label, used for the per-type stats breakdown.
    fn kind(&self) -> &'static str {
        match self {
            Self::Pair(_) => "Pair",
            Self::Quote(_) => "Quote",
            Self::Formals(_) => "Formals",
            Self::Lambda(_) => "Lambda",
            Self::Primitive(_) => "Primitive",
            Self::Apply(_) => "Apply",
        }
    }

    /// Pushes every directly referenced child onto the mark worklists.
    fn trace(&self, values: &mut Vec<HeapId>, scopes: &mut Vec<ScopeId>) {
        match self {
            Self::Pair(pair) => {
                push_ref(pair.car, values);
                push_ref(pair.cdr, values);
            }
            Self::Quote(payload) => push_ref(*payload, values),
            Self::Formals(_) => {}
            Self::Lambda(lambda) => {
                values.push(lambda.formals);
                for &clause in &lambda.body {
                    push_ref(clause, values);
                }
                if let Some(captured) = lambda.captured {
                    scopes.push(captured);
                }
            }
            Self::Primitive(prim) => {
                for &arg in &prim.args {
                    push_ref(arg, values);
                }
            }
            Self::Apply(call) => {
                push_ref(call.target, values);
                for &arg in &call.args {
                    push_ref(arg, values);
                }
            }
        }
    }
}

fn push_ref(value: Value, values: &mut Vec<HeapId>) {
    if let Value::Ref(id) = value {
        values.push(id);
    }
}

/// Snapshot of heap state at a point in time.
///
/// Captures live/free/total slot counts for both arenas plus a per-variant
/// breakdown. The `objects_by_type` map uses `BTreeMap` for deterministic
/// iteration order, making snapshots suitable for display and comparison
/// without sort overhead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of live value nodes on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) value slots available for reuse.
    pub free_slots: usize,
    /// Total value arena capacity (live + free).
    pub total_slots: usize,
    /// Breakdown of live value nodes by variant name (e.g., "Pair", "Lambda").
    pub objects_by_type: BTreeMap<&'static str, usize>,
    /// Number of live scopes, the persistent top-level scope included.
    pub live_scopes: usize,
    /// Number of free scope slots available for reuse.
    pub free_scope_slots: usize,
    /// Total scope arena capacity (live + free).
    pub total_scope_slots: usize,
    /// Number of symbols in the session's intern table. Symbols are interned
    /// for the life of the session and never collected.
    pub interned_symbols: usize,
}

/// What one collection did: sweep counts and the surviving population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcReport {
    /// Value nodes reclaimed by this sweep.
    pub swept_values: usize,
    /// Scopes reclaimed by this sweep.
    pub swept_scopes: usize,
    /// Value nodes reachable from the root after the sweep.
    pub live_values: usize,
    /// Scopes reachable from the root after the sweep.
    pub live_scopes: usize,
}

/// The two-arena heap. Owned exclusively by one `Session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Heap {
    values: Vec<Option<HeapData>>,
    value_free: Vec<HeapId>,
    scopes: Vec<Option<Scope>>,
    scope_free: Vec<ScopeId>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            value_free: Vec::new(),
            scopes: Vec::new(),
            scope_free: Vec::new(),
        }
    }

    /// Allocates a value node, reusing a swept slot when one is available.
    pub fn alloc(&mut self, data: HeapData) -> HeapId {
        if let Some(id) = self.value_free.pop() {
            self.values[id.index()] = Some(data);
            id
        } else {
            let id = HeapId(self.values.len());
            self.values.push(Some(data));
            id
        }
    }

    pub fn get(&self, id: HeapId) -> &HeapData {
        self.values[id.index()].as_ref().expect("access to a freed heap slot")
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        self.values[id.index()].as_mut().expect("access to a freed heap slot")
    }

    /// Allocates a scope, reusing a swept slot when one is available.
    pub fn alloc_scope(&mut self, scope: Scope) -> ScopeId {
        if let Some(id) = self.scope_free.pop() {
            self.scopes[id.index()] = Some(scope);
            id
        } else {
            let id = ScopeId::new(self.scopes.len());
            self.scopes.push(Some(scope));
            id
        }
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        self.scopes[id.index()].as_ref().expect("access to a freed scope slot")
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.scopes[id.index()].as_mut().expect("access to a freed scope slot")
    }

    /// Builds a proper list of `items`, allocating one pair per element.
    /// An empty slice yields `Nil`.
    pub fn alloc_list(&mut self, items: &[Value]) -> Value {
        let mut tail = Value::Nil;
        for &item in items.iter().rev() {
            let id = self.alloc(HeapData::Pair(Pair { car: item, cdr: tail }));
            tail = Value::Ref(id);
        }
        tail
    }

    /// Returns the pair handles along a proper list's spine, head first.
    ///
    /// `None` when the chain ends in anything but `Nil` or closes into a
    /// cycle, i.e. when the value is not a proper list.
    pub fn list_spine(&self, head: HeapId) -> Option<Vec<HeapId>> {
        let mut spine = Vec::new();
        let mut seen = AHashSet::new();
        let mut cursor = head;
        loop {
            if !seen.insert(cursor) {
                return None;
            }
            let HeapData::Pair(pair) = self.get(cursor) else {
                return None;
            };
            spine.push(cursor);
            match pair.cdr {
                Value::Nil => return Some(spine),
                Value::Ref(next) if matches!(self.get(next), HeapData::Pair(_)) => cursor = next,
                _ => return None,
            }
        }
    }

    /// Mark-and-sweep collection with `root` as the only root scope.
    ///
    /// Marking is iterative over explicit worklists, so deeply nested or
    /// cyclic object graphs cannot overflow the host stack. Every reachable
    /// handle remains valid after the sweep.
    pub fn collect(&mut self, root: ScopeId) -> GcReport {
        let mut live_values: AHashSet<HeapId> = AHashSet::new();
        let mut live_scopes: AHashSet<ScopeId> = AHashSet::new();
        let mut value_work: Vec<HeapId> = Vec::new();
        let mut scope_work: Vec<ScopeId> = vec![root];

        while !value_work.is_empty() || !scope_work.is_empty() {
            while let Some(scope_id) = scope_work.pop() {
                if !live_scopes.insert(scope_id) {
                    continue;
                }
                let scope = self.scope(scope_id);
                if let Some(parent) = scope.parent() {
                    scope_work.push(parent);
                }
                for (_, value) in scope.bindings() {
                    push_ref(value, &mut value_work);
                }
            }
            while let Some(id) = value_work.pop() {
                if !live_values.insert(id) {
                    continue;
                }
                self.get(id).trace(&mut value_work, &mut scope_work);
            }
        }

        let mut swept_values = 0;
        for (index, slot) in self.values.iter_mut().enumerate() {
            if slot.is_some() && !live_values.contains(&HeapId(index)) {
                *slot = None;
                self.value_free.push(HeapId(index));
                swept_values += 1;
            }
        }
        let mut swept_scopes = 0;
        for (index, slot) in self.scopes.iter_mut().enumerate() {
            if slot.is_some() && !live_scopes.contains(&ScopeId::new(index)) {
                *slot = None;
                self.scope_free.push(ScopeId::new(index));
                swept_scopes += 1;
            }
        }

        GcReport {
            swept_values,
            swept_scopes,
            live_values: live_values.len(),
            live_scopes: live_scopes.len(),
        }
    }

    /// Current heap statistics; `interned_symbols` is supplied by the caller
    /// since the intern table lives outside the heap.
    pub fn stats(&self, interned_symbols: usize) -> HeapStats {
        let mut objects_by_type: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut live_objects = 0;
        for slot in self.values.iter().flatten() {
            live_objects += 1;
            *objects_by_type.entry(slot.kind()).or_insert(0) += 1;
        }
        let live_scopes = self.scopes.iter().flatten().count();
        HeapStats {
            live_objects,
            free_slots: self.value_free.len(),
            total_slots: self.values.len(),
            objects_by_type,
            live_scopes,
            free_scope_slots: self.scope_free.len(),
            total_scope_slots: self.scopes.len(),
            interned_symbols,
        }
    }
}

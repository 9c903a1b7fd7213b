//! Persistent interpreter sessions.
//!
//! A [`Session`] owns every byte of interpreter state: the heap arenas, the
//! symbol intern table, and the persistent top-level scope. `run()` calls
//! share that state, so definitions accumulate across calls the way they do
//! in a REPL. Nothing global, nothing shared: independent sessions are fully
//! isolated, and a session moved between threads carries its world with it.

use serde::{Deserialize, Serialize};

use crate::{
    eval::Vm,
    exception::Exception,
    heap::{Heap, HeapData, HeapStats},
    intern::Interns,
    parse,
    resource::ResourceLimits,
    scope::{Scope, ScopeId},
    tracer::{NoopTracer, Tracer},
    value::{self, Value},
};

/// Serializable representation of a full session for disk persistence.
///
/// Pending nothing: sessions have no mid-call state, so a snapshot is just
/// the three owned components. Resource limits are intentionally excluded --
/// the host re-applies them on load.
#[derive(Serialize, Deserialize)]
struct SessionSnapshot {
    interns: Interns,
    heap: Heap,
    top_scope: ScopeId,
}

/// A persistent interpreter session that executes one expression per call
/// against accumulated state.
///
/// Each call sweeps the heap with the top-level scope as the root, parses
/// the source as exactly one expression, evaluates it, and prints the result
/// (void-returning forms print as `()`). Errors unwind to the caller and
/// leave whatever bindings were already established in place.
pub struct Session {
    heap: Heap,
    interns: Interns,
    top_scope: ScopeId,
    limits: ResourceLimits,
}

impl Session {
    /// A fresh session with an empty top-level scope and no limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::unlimited())
    }

    /// A fresh session applying `limits` to every call.
    #[must_use]
    pub fn with_limits(limits: ResourceLimits) -> Self {
        let mut heap = Heap::new();
        let top_scope = heap.alloc_scope(Scope::root());
        Self {
            heap,
            interns: Interns::new(),
            top_scope,
            limits,
        }
    }

    /// Tokenizes, parses, evaluates, and prints one expression.
    pub fn run(&mut self, source: &str) -> Result<String, Exception> {
        self.run_traced(source, &mut NoopTracer)
    }

    /// Like [`Session::run`], reporting pipeline events to `tracer`.
    pub fn run_traced(&mut self, source: &str, tracer: &mut dyn Tracer) -> Result<String, Exception> {
        tracer.run_start(source);
        // Reclaim everything the previous call left unreachable before this
        // call allocates its AST.
        let report = self.heap.collect(self.top_scope);
        tracer.gc_complete(&report);

        let ast = parse::parse_single(source, &mut self.heap, &mut self.interns)?;
        let result = match ast {
            Value::Nil => {
                return Err(Exception::runtime("the empty list is not a valid expression"));
            }
            // A bare symbol reports the value bound at top level.
            Value::Symbol(name) => self.heap.lookup(self.top_scope, name).ok_or_else(|| {
                Exception::name(format!("variable '{}' is not defined", self.interns.get(name)))
            })?,
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::Pair(_)) => {
                return Err(Exception::runtime("a bare list is not a valid expression"));
            }
            other => {
                let mut vm = Vm::new(&mut self.heap, &self.interns, self.limits);
                vm.eval(other, self.top_scope)?
            }
        };

        let printed = value::print_value(result, &self.heap, &self.interns)?;
        tracer.run_complete(&printed);
        Ok(printed)
    }

    /// Names bound in the top-level scope, in binding order.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        self.heap
            .scope(self.top_scope)
            .bindings()
            .map(|(name, _)| self.interns.get(name).to_owned())
            .collect()
    }

    /// Current heap statistics.
    ///
    /// Garbage from the most recent call is still counted: collection runs at
    /// the start of the next call, not at the end of the previous one.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats(self.interns.len())
    }

    /// Serializes the whole session to compact bytes.
    pub fn save(&self) -> Result<Vec<u8>, String> {
        let snapshot = SessionSnapshot {
            interns: self.interns.clone(),
            heap: self.heap.clone(),
            top_scope: self.top_scope,
        };
        postcard::to_allocvec(&snapshot).map_err(|err| format!("failed to serialize session: {err}"))
    }

    /// Restores a session previously produced by [`Session::save`].
    ///
    /// The restored session is independent of the original and carries no
    /// resource limits; apply them afterwards if needed.
    pub fn load(bytes: &[u8]) -> Result<Self, String> {
        let snapshot: SessionSnapshot =
            postcard::from_bytes(bytes).map_err(|err| format!("failed to deserialize session: {err}"))?;
        Ok(Self {
            heap: snapshot.heap,
            interns: snapshot.interns,
            top_scope: snapshot.top_scope,
            limits: ResourceLimits::unlimited(),
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

//! Lexical environments: frames of name-to-value bindings chained to a parent.
//!
//! Scopes live in their own heap arena and are referenced by `ScopeId`, so a
//! lambda can capture its definition environment as a plain handle and the
//! collector can reclaim call frames that nothing references anymore.
//!
//! Two kinds of fork exist, and the difference is observable:
//! [`Heap::fork`] creates an empty child frame (used per call), while
//! [`Heap::fork_snapshot`] copies the parent's current bindings into the
//! child (used once, when a lambda first snaps its captured environment).
//! A snapshot shadows later rebindings in the enclosing scope; an empty
//! child sees them through the parent chain.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{heap::Heap, intern::StringId, value::Value};

/// Opaque handle to a scope slot in the heap's scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub(crate) struct ScopeId(usize);

impl ScopeId {
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One frame of bindings plus an optional parent.
///
/// Bindings use an `IndexMap` so iteration (collection, snapshots, the
/// session's variable listing) follows binding order deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Scope {
    bindings: IndexMap<StringId, Value>,
    parent: Option<ScopeId>,
}

impl Scope {
    /// The parentless top-level frame.
    pub fn root() -> Self {
        Self {
            bindings: IndexMap::new(),
            parent: None,
        }
    }

    fn child_of(parent: ScopeId) -> Self {
        Self {
            bindings: IndexMap::new(),
            parent: Some(parent),
        }
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Sets `name` in this frame, overwriting any previous binding.
    pub fn bind(&mut self, name: StringId, value: Value) {
        self.bindings.insert(name, value);
    }

    /// This frame only; no parent-chain search.
    pub fn get(&self, name: StringId) -> Option<Value> {
        self.bindings.get(&name).copied()
    }

    pub fn contains(&self, name: StringId) -> bool {
        self.bindings.contains_key(&name)
    }

    /// Bindings in insertion order.
    pub fn bindings(&self) -> impl Iterator<Item = (StringId, Value)> + '_ {
        self.bindings.iter().map(|(&name, &value)| (name, value))
    }
}

/// Parent-chain operations. These live on `Heap` because walking the chain
/// means following `ScopeId` handles through the arena.
impl Heap {
    /// Searches `scope` and its ancestors for `name`.
    pub(crate) fn lookup(&self, scope: ScopeId, name: StringId) -> Option<Value> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let frame = self.scope(id);
            if let Some(value) = frame.get(name) {
                return Some(value);
            }
            cursor = frame.parent();
        }
        None
    }

    /// Whether `name` is bound anywhere along the chain.
    pub(crate) fn chain_contains(&self, scope: ScopeId, name: StringId) -> bool {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let frame = self.scope(id);
            if frame.contains(name) {
                return true;
            }
            cursor = frame.parent();
        }
        false
    }

    /// Overwrites `name` in the nearest frame that already binds it.
    /// Returns `false` when no frame does.
    pub(crate) fn set_existing(&mut self, scope: ScopeId, name: StringId, value: Value) -> bool {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let frame = self.scope(id);
            if frame.contains(name) {
                self.scope_mut(id).bind(name, value);
                return true;
            }
            cursor = frame.parent();
        }
        false
    }

    /// Binds `name` in `scope` unless some frame along the chain already
    /// binds it.
    pub(crate) fn bind_if_absent(&mut self, scope: ScopeId, name: StringId, value: Value) {
        if !self.chain_contains(scope, name) {
            self.scope_mut(scope).bind(name, value);
        }
    }

    /// A fresh empty child of `parent`. Used for every call frame.
    pub(crate) fn fork(&mut self, parent: ScopeId) -> ScopeId {
        self.alloc_scope(Scope::child_of(parent))
    }

    /// A child of `parent` seeded with a shallow copy of the parent's current
    /// frame. Used once per lambda, when its captured environment snaps.
    pub(crate) fn fork_snapshot(&mut self, parent: ScopeId) -> ScopeId {
        let mut snapshot = self.scope(parent).clone();
        snapshot.parent = Some(parent);
        self.alloc_scope(snapshot)
    }
}

//! Symbol interning for efficient storage of identifiers.
//!
//! Every symbol encountered by the parser is stored once in the session's
//! intern table and referred to by a `StringId` everywhere else: inside
//! `Value::Symbol`, in scope frames, and in lambda parameter lists. Interning
//! makes name comparison an integer compare and keeps `Value` `Copy`.
//!
//! Lookups of the underlying text are only needed for error messages and for
//! printing results.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Index into the intern table's storage.
///
/// Uses `u32` to save space (4 bytes vs 8 bytes for `usize`). This limits us
/// to ~4 billion unique symbols, which is more than sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub(crate) struct StringId(u32);

impl StringId {
    /// Returns the raw index value.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The intern table: unique symbol names and a reverse map for deduplication.
///
/// Serialized as the bare string vector (the reverse map is rebuilt on
/// deserialization), which keeps session snapshots compact and stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub(crate) struct Interns {
    strings: Vec<String>,
    ids: AHashMap<String, StringId>,
}

impl Interns {
    pub fn new() -> Self {
        Self {
            strings: Vec::new(),
            ids: AHashMap::new(),
        }
    }

    /// Returns the id for `name`, interning it on first sight.
    pub fn intern(&mut self, name: &str) -> StringId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let raw = u32::try_from(self.strings.len()).expect("intern table exceeded u32 capacity");
        let id = StringId(raw);
        self.strings.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// Returns the text for an interned symbol.
    pub fn get(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    /// Number of interned symbols.
    pub fn len(&self) -> usize {
        self.strings.len()
    }
}

impl From<Vec<String>> for Interns {
    fn from(strings: Vec<String>) -> Self {
        let ids = strings
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let raw = u32::try_from(index).expect("intern table exceeded u32 capacity");
                (name.clone(), StringId(raw))
            })
            .collect();
        Self { strings, ids }
    }
}

impl From<Interns> for Vec<String> {
    fn from(interns: Interns) -> Self {
        interns.strings
    }
}

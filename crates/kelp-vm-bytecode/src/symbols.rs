//! Name tables: identifiers, functions, structs and native functions

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::operand::{IdentIndex, NativeIndex, TypeIndex};

/// A source-level variable name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    /// Variable name
    pub name: String,
    /// Declared at top level
    pub global: bool,
    /// Declared with a read-only binding
    pub readonly: bool,
}

impl Ident {
    /// Create a local, mutable identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global: false,
            readonly: false,
        }
    }

    /// Mark as global
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }
}

/// One type specialization of an identifier.
///
/// Instructions reference these; the name comes from `ident`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecIdent {
    /// The identifier this specializes
    pub ident: IdentIndex,
    /// Type of this specialization
    pub ty: TypeIndex,
}

/// A compiled function's entry in the function table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// Function name
    pub name: String,
    /// Word offset of the function's first instruction
    pub bytecode_start: u32,
}

impl FunctionInfo {
    /// Create a function entry
    pub fn new(name: impl Into<String>, bytecode_start: u32) -> Self {
        Self {
            name: name.into(),
            bytecode_start,
        }
    }
}

/// A struct's entry in the struct table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructInfo {
    /// Struct name
    pub name: String,
    /// Field names, in declaration order
    pub fields: Vec<String>,
}

impl StructInfo {
    /// Create a struct entry
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Registered native (builtin) functions, addressed by `BCALL` operands
#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    names: Vec<String>,
    by_name: FxHashMap<String, NativeIndex>,
}

impl NativeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native function, returns its index.
    ///
    /// Registering the same name twice returns the existing index.
    pub fn register(&mut self, name: impl Into<String>) -> NativeIndex {
        let name = name.into();
        if let Some(&idx) = self.by_name.get(&name) {
            return idx;
        }
        let idx = NativeIndex(self.names.len() as u32);
        self.by_name.insert(name.clone(), idx);
        self.names.push(name);
        idx
    }

    /// Name of a registered native
    #[inline]
    pub fn name(&self, index: NativeIndex) -> Option<&str> {
        self.names.get(index.as_usize()).map(String::as_str)
    }

    /// Look up a native by name
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<NativeIndex> {
        self.by_name.get(name).copied()
    }

    /// Number of registered natives
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if nothing is registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for NativeRegistry {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut registry = Self::new();
        for name in iter {
            registry.register(name);
        }
        registry
    }
}

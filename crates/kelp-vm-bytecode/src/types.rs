//! Type table
//!
//! Every module carries a table of type descriptors. Instructions (such as
//! `NEWVEC`) and the literal parser refer to entries by [`TypeIndex`]; the
//! indices never change once a module is loaded.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::operand::{StructIndex, TypeIndex};
use crate::symbols::StructInfo;

/// The kind of value a type descriptor describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// The nil value
    Nil,
    /// Integer
    Int,
    /// Floating point number
    Float,
    /// Ref-counted string
    String,
    /// Function value
    Function,
    /// Coroutine value
    Coroutine,
    /// Homogeneous vector
    Vector,
    /// Named struct with positional fields
    Struct,
    /// Any value (boxed)
    Any,
}

impl TypeKind {
    /// Name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nil => "Nil",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
            Self::Function => "Function",
            Self::Coroutine => "Coroutine",
            Self::Vector => "Vector",
            Self::Struct => "Struct",
            Self::Any => "Any",
        }
    }

    /// Whether values of this kind are plain numbers
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry in the type table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// A non-aggregate kind
    Scalar(TypeKind),
    /// Vector whose elements all have type `element`
    Vector {
        /// Element type
        element: TypeIndex,
    },
    /// Struct instance; `fields` holds one type per field, in order
    Struct {
        /// Index into the struct name table
        struct_id: StructIndex,
        /// Field types, positionally
        fields: Vec<TypeIndex>,
    },
}

impl TypeDescriptor {
    /// The kind of this descriptor
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Scalar(kind) => *kind,
            Self::Vector { .. } => TypeKind::Vector,
            Self::Struct { .. } => TypeKind::Struct,
        }
    }
}

impl TypeIndex {
    /// Builtin `Nil`
    pub const NIL: TypeIndex = TypeIndex(0);
    /// Builtin `Int`
    pub const INT: TypeIndex = TypeIndex(1);
    /// Builtin `Float`
    pub const FLOAT: TypeIndex = TypeIndex(2);
    /// Builtin `String`
    pub const STRING: TypeIndex = TypeIndex(3);
    /// Builtin `Function`
    pub const FUNCTION: TypeIndex = TypeIndex(4);
    /// Builtin `Coroutine`
    pub const COROUTINE: TypeIndex = TypeIndex(5);
    /// Builtin `Any`
    pub const ANY: TypeIndex = TypeIndex(6);
    /// Builtin vector of `Any`
    pub const VECTOR_ANY: TypeIndex = TypeIndex(7);
}

/// Indexed array of type descriptors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    entries: Vec<TypeDescriptor>,
}

impl TypeTable {
    /// Create an empty type table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a table whose first entries are the builtin types, at the
    /// indices named by the `TypeIndex` constants
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for kind in [
            TypeKind::Nil,
            TypeKind::Int,
            TypeKind::Float,
            TypeKind::String,
            TypeKind::Function,
            TypeKind::Coroutine,
            TypeKind::Any,
        ] {
            table.push(TypeDescriptor::Scalar(kind));
        }
        table.push(TypeDescriptor::Vector {
            element: TypeIndex::ANY,
        });
        table
    }

    /// Append a descriptor, returns its index
    pub fn push(&mut self, descriptor: TypeDescriptor) -> TypeIndex {
        let idx = TypeIndex(self.entries.len() as u32);
        self.entries.push(descriptor);
        idx
    }

    /// Get a descriptor by index
    #[inline]
    pub fn get(&self, index: TypeIndex) -> Option<&TypeDescriptor> {
        self.entries.get(index.as_usize())
    }

    /// Kind of the descriptor at `index`
    #[inline]
    pub fn kind(&self, index: TypeIndex) -> Option<TypeKind> {
        self.get(index).map(TypeDescriptor::kind)
    }

    /// Find the descriptor describing instances of struct `struct_id`
    pub fn find_struct(&self, struct_id: StructIndex) -> Option<TypeIndex> {
        self.entries
            .iter()
            .position(|d| matches!(d, TypeDescriptor::Struct { struct_id: s, .. } if *s == struct_id))
            .map(|i| TypeIndex(i as u32))
    }

    /// Number of descriptors
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(index, descriptor)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (TypeIndex, &TypeDescriptor)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, d)| (TypeIndex(i as u32), d))
    }
}

/// Read-only view of the type information the literal parser needs
#[derive(Debug, Clone)]
pub struct TypeContext<'a> {
    types: &'a TypeTable,
    structs: &'a [StructInfo],
    by_name: FxHashMap<&'a str, StructIndex>,
}

impl<'a> TypeContext<'a> {
    /// Build a view over a type table and the struct names it refers to
    pub fn new(types: &'a TypeTable, structs: &'a [StructInfo]) -> Self {
        let mut by_name = FxHashMap::default();
        for (i, info) in structs.iter().enumerate() {
            by_name.entry(info.name.as_str()).or_insert(StructIndex(i as u32));
        }
        Self {
            types,
            structs,
            by_name,
        }
    }

    /// The underlying type table
    #[inline]
    pub fn types(&self) -> &'a TypeTable {
        self.types
    }

    /// Get a descriptor by index
    #[inline]
    pub fn descriptor(&self, index: TypeIndex) -> Option<&'a TypeDescriptor> {
        self.types.get(index)
    }

    /// Registered name of a struct
    pub fn struct_name(&self, struct_id: StructIndex) -> Option<&'a str> {
        self.structs
            .get(struct_id.as_usize())
            .map(|s| s.name.as_str())
    }

    /// Type describing instances of the struct called `name`
    pub fn struct_type_by_name(&self, name: &str) -> Option<TypeIndex> {
        let struct_id = *self.by_name.get(name)?;
        self.types.find_struct(struct_id)
    }
}

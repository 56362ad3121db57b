//! Runtime values

use std::fmt::{self, Write};
use std::sync::Arc;

use kelp_vm_bytecode::{TypeContext, TypeDescriptor, TypeIndex, TypeKind};

use crate::heap::Allocation;

/// A runtime value.
///
/// Scalars are stored inline. Strings and vectors are shared heap objects;
/// cloning a `Value` adds a reference, dropping one releases it.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The nil value
    #[default]
    Nil,
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Heap string
    String(Arc<StringObj>),
    /// Heap vector or struct instance
    Vector(Arc<VectorObj>),
}

/// Heap-allocated string
#[derive(Debug)]
pub struct StringObj {
    data: Box<str>,
    _alloc: Allocation,
}

impl StringObj {
    pub(crate) fn new(data: Box<str>, alloc: Allocation) -> Self {
        Self { data, _alloc: alloc }
    }

    /// String contents
    pub fn as_str(&self) -> &str {
        &self.data
    }
}

/// Heap-allocated vector; struct instances are vectors with a struct type
#[derive(Debug)]
pub struct VectorObj {
    ty: TypeIndex,
    elems: Vec<Value>,
    _alloc: Allocation,
}

impl VectorObj {
    pub(crate) fn new(ty: TypeIndex, elems: Vec<Value>, alloc: Allocation) -> Self {
        Self {
            ty,
            elems,
            _alloc: alloc,
        }
    }

    /// Type of the aggregate (a vector or struct type)
    pub fn ty(&self) -> TypeIndex {
        self.ty
    }

    /// Elements in order
    pub fn elems(&self) -> &[Value] {
        &self.elems
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Check if there are no elements
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

impl Value {
    /// Runtime kind of the value. Vectors report [`TypeKind::Vector`]
    /// regardless of whether their type is a struct.
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Nil => TypeKind::Nil,
            Self::Int(_) => TypeKind::Int,
            Self::Float(_) => TypeKind::Float,
            Self::String(_) => TypeKind::String,
            Self::Vector(_) => TypeKind::Vector,
        }
    }

    /// Check for nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float payload
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Vector object
    pub fn as_vector(&self) -> Option<&VectorObj> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Number of references to the heap object, `None` for scalars
    pub fn ref_count(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(Arc::strong_count(s)),
            Self::Vector(v) => Some(Arc::strong_count(v)),
            _ => None,
        }
    }

    /// Negate a numeric value in place. Returns false for other values.
    pub fn negate(&mut self) -> bool {
        match self {
            Self::Int(i) => *i = i.wrapping_neg(),
            Self::Float(f) => *f = -*f,
            _ => return false,
        }
        true
    }

    /// Render the value as literal text that parses back to an equal value
    /// at its type.
    pub fn to_literal(&self, ctx: &TypeContext<'_>) -> String {
        Literal { value: self, ctx }.to_string()
    }
}

/// Display adapter writing a value in literal syntax
struct Literal<'v, 'c> {
    value: &'v Value,
    ctx: &'c TypeContext<'c>,
}

impl fmt::Display for Literal<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Nil => f.write_str("nil"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => write_string(f, s.as_str()),
            Value::Vector(v) => {
                let (open, close) = match self.ctx.descriptor(v.ty()) {
                    Some(TypeDescriptor::Struct { struct_id, .. }) => {
                        f.write_str(self.ctx.struct_name(*struct_id).unwrap_or("?"))?;
                        ('{', '}')
                    }
                    _ => ('[', ']'),
                };
                f.write_char(open)?;
                for (i, elem) in v.elems().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Literal { value: elem, ctx: self.ctx })?;
                }
                f.write_char(close)
            }
        }
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\0' => f.write_str("\\0")?,
            c if c.is_ascii_control() => write!(f, "\\x{:02X}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Structural equality: strings by contents, vectors by type and elements
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a.as_str() == b.as_str(),
            (Self::Vector(a), Self::Vector(b)) => Arc::ptr_eq(a, b) || (a.ty == b.ty && a.elems == b.elems),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;
    use kelp_vm_bytecode::{StructIndex, StructInfo, TypeTable};

    #[test]
    fn test_negate() {
        let mut v = Value::Int(3);
        assert!(v.negate());
        assert_eq!(v, Value::Int(-3));

        let mut v = Value::Float(2.5);
        assert!(v.negate());
        assert_eq!(v, Value::Float(-2.5));

        let mut v = Value::Nil;
        assert!(!v.negate());
    }

    #[test]
    fn test_structural_equality() {
        let heap = Heap::new();
        let a = heap.new_vector(TypeIndex::VECTOR_ANY, vec![heap.new_string("x"), Value::Int(1)]);
        let b = heap.new_vector(TypeIndex::VECTOR_ANY, vec![heap.new_string("x"), Value::Int(1)]);
        assert_eq!(a, b);
        assert_ne!(a, heap.new_vector(TypeIndex::VECTOR_ANY, vec![]));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_to_literal() {
        let mut types = TypeTable::with_builtins();
        let point = types.push(TypeDescriptor::Struct {
            struct_id: StructIndex(0),
            fields: vec![TypeIndex::INT, TypeIndex::FLOAT],
        });
        let structs = [StructInfo::new("Point", ["x", "y"])];
        let ctx = TypeContext::new(&types, &structs);
        let heap = Heap::new();

        let p = heap.new_vector(point, vec![Value::Int(-1), Value::Float(2.0)]);
        let v = heap.new_vector(TypeIndex::VECTOR_ANY, vec![p, heap.new_string("a\"b\n"), Value::Nil]);
        assert_eq!(v.to_literal(&ctx), r#"[Point{-1, 2.0}, "a\"b\n", nil]"#);
    }

    #[test]
    fn test_ref_count() {
        let heap = Heap::new();
        let s = heap.new_string("x");
        assert_eq!(s.ref_count(), Some(1));
        let t = s.clone();
        assert_eq!(s.ref_count(), Some(2));
        drop(t);
        assert_eq!(s.ref_count(), Some(1));
        assert_eq!(Value::Int(0).ref_count(), None);
    }
}

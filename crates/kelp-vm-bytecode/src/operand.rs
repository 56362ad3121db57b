//! Table indices referenced from instructions and type descriptors

use serde::{Deserialize, Serialize};

macro_rules! table_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a new index
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Get index value
            #[inline]
            pub const fn index(self) -> u32 {
                self.0
            }

            /// Index as a `usize`, for slice access
            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0 as usize
            }

            /// Convert a raw instruction operand, rejecting negatives
            #[inline]
            pub fn from_word(word: i32) -> Option<Self> {
                u32::try_from(word).ok().map(Self)
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                Self(index)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

table_index!(
    /// Index into the module's type table
    TypeIndex
);

table_index!(
    /// Index into the struct name table
    StructIndex
);

table_index!(
    /// Index into the function table
    FunctionIndex
);

table_index!(
    /// Index into the plain identifier table
    IdentIndex
);

table_index!(
    /// Index into the specialized identifier table (what instructions reference)
    SpecIdentIndex
);

table_index!(
    /// Index into the source file name table
    FileIndex
);

table_index!(
    /// Index into a [`NativeRegistry`](crate::symbols::NativeRegistry)
    NativeIndex
);

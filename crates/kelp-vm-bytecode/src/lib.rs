//! # Kelp VM Bytecode
//!
//! In-memory and on-disk representation of compiled Kelp modules.
//!
//! ## Components
//!
//! - **Type table**: indexed type descriptors that aggregate instructions and
//!   literal parsing interpret data against
//! - **Line table**: word offset to source line mapping with a halving search
//! - **Symbol tables**: identifier, function, struct and native names
//! - **Decoder / disassembler**: walks the variable-length instruction stream
//! - **Container**: magic-tagged, length-prefixed, compressed payload
//! - **Verifier**: structural checks a payload must pass before use

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod container;
pub mod disasm;
pub mod error;
pub mod instruction;
pub mod line_table;
pub mod module;
pub mod opcode;
pub mod operand;
pub mod symbols;
pub mod types;
pub mod verify;

pub use config::CodecConfig;
pub use container::{CONTAINER_MAGIC, ContainerCodec, ContainerError, DeflateCodec, EntropyCodec};
pub use disasm::{Disassembler, disassemble};
pub use error::BytecodeError;
pub use instruction::{Cursor, Instruction};
pub use line_table::{LineInfo, LineTable};
pub use module::{Module, ModuleBuilder};
pub use opcode::{LvalOp, Opcode};
pub use operand::{FileIndex, FunctionIndex, IdentIndex, NativeIndex, SpecIdentIndex, StructIndex, TypeIndex};
pub use symbols::{FunctionInfo, Ident, NativeRegistry, SpecIdent, StructInfo};
pub use types::{TypeContext, TypeDescriptor, TypeKind, TypeTable};
pub use verify::{ModuleVerifier, Verifier};

//! Bytecode module format

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::line_table::{LineInfo, LineTable};
use crate::operand::{FileIndex, FunctionIndex, IdentIndex, SpecIdentIndex, StructIndex, TypeIndex};
use crate::symbols::{FunctionInfo, Ident, SpecIdent, StructInfo};
use crate::types::{TypeContext, TypeDescriptor, TypeTable};

/// A compiled module: instruction stream plus every table it references.
///
/// The module owns all of its tables; decoders and parsers only borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Flat instruction stream; opcodes and operands share one word width
    pub instructions: Vec<i32>,

    /// Word offset to source line mapping
    pub line_table: LineTable,

    /// Source file names referenced by the line table
    pub filenames: Vec<String>,

    /// Plain identifiers
    pub idents: Vec<Ident>,

    /// Specialized identifiers, referenced from instructions
    pub spec_idents: Vec<SpecIdent>,

    /// Function table
    pub functions: Vec<FunctionInfo>,

    /// Struct table
    pub structs: Vec<StructInfo>,

    /// Type table
    pub types: TypeTable,
}

impl Module {
    /// Create a new module builder
    pub fn builder() -> ModuleBuilder {
        ModuleBuilder::new()
    }

    /// Serialize the module into the raw payload a container wraps
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize a raw payload.
    ///
    /// This only checks the payload shape; run a
    /// [`Verifier`](crate::verify::Verifier) before trusting the stream.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Name of a specialized identifier
    pub fn ident_name(&self, index: SpecIdentIndex) -> Option<&str> {
        let spec = self.spec_idents.get(index.as_usize())?;
        self.idents.get(spec.ident.as_usize()).map(|i| i.name.as_str())
    }

    /// Get a function by index
    pub fn function(&self, index: FunctionIndex) -> Option<&FunctionInfo> {
        self.functions.get(index.as_usize())
    }

    /// Source file name for a line table entry
    pub fn filename(&self, info: &LineInfo) -> Option<&str> {
        self.filenames.get(info.file.as_usize()).map(String::as_str)
    }

    /// View of the type table and struct names, for literal parsing
    pub fn type_context(&self) -> TypeContext<'_> {
        TypeContext::new(&self.types, &self.structs)
    }
}

/// Builder for creating modules
#[derive(Debug)]
pub struct ModuleBuilder {
    instructions: Vec<i32>,
    lines: Vec<LineInfo>,
    current_file: FileIndex,
    filenames: Vec<String>,
    idents: Vec<Ident>,
    spec_idents: Vec<SpecIdent>,
    functions: Vec<FunctionInfo>,
    structs: Vec<StructInfo>,
    types: TypeTable,
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleBuilder {
    /// Create a new module builder with the builtin types registered
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            lines: Vec::new(),
            current_file: FileIndex(0),
            filenames: Vec::new(),
            idents: Vec::new(),
            spec_idents: Vec::new(),
            functions: Vec::new(),
            structs: Vec::new(),
            types: TypeTable::with_builtins(),
        }
    }

    /// Replace the type table
    pub fn types(mut self, types: TypeTable) -> Self {
        self.types = types;
        self
    }

    /// Add a type descriptor, returns its index
    pub fn add_type(&mut self, descriptor: TypeDescriptor) -> TypeIndex {
        self.types.push(descriptor)
    }

    /// Add a source file and make it current for following line entries
    pub fn add_file(&mut self, name: impl Into<String>) -> FileIndex {
        let idx = FileIndex(self.filenames.len() as u32);
        self.filenames.push(name.into());
        self.current_file = idx;
        idx
    }

    /// Add a plain identifier, returns its index
    pub fn add_ident(&mut self, ident: Ident) -> IdentIndex {
        let idx = IdentIndex(self.idents.len() as u32);
        self.idents.push(ident);
        idx
    }

    /// Add a specialized identifier, returns its index
    pub fn add_spec_ident(&mut self, spec: SpecIdent) -> SpecIdentIndex {
        let idx = SpecIdentIndex(self.spec_idents.len() as u32);
        self.spec_idents.push(spec);
        idx
    }

    /// Add an identifier with a single specialization of type `ty`
    pub fn add_variable(&mut self, ident: Ident, ty: TypeIndex) -> SpecIdentIndex {
        let ident = self.add_ident(ident);
        self.add_spec_ident(SpecIdent { ident, ty })
    }

    /// Add a function, returns its index
    pub fn add_function(&mut self, function: FunctionInfo) -> FunctionIndex {
        let idx = FunctionIndex(self.functions.len() as u32);
        self.functions.push(function);
        idx
    }

    /// Add a struct, returns its index
    pub fn add_struct(&mut self, info: StructInfo) -> StructIndex {
        let idx = StructIndex(self.structs.len() as u32);
        self.structs.push(info);
        idx
    }

    /// Current end of the instruction stream
    #[inline]
    pub fn offset(&self) -> usize {
        self.instructions.len()
    }

    /// Append instruction words, returns the offset of the first one
    pub fn emit(&mut self, words: impl IntoIterator<Item = i32>) -> usize {
        let start = self.instructions.len();
        self.instructions.extend(words);
        start
    }

    /// Append instruction words attributed to source `line`
    pub fn emit_line(&mut self, line: u32, words: impl IntoIterator<Item = i32>) -> usize {
        let start = self.offset() as u32;
        let info = LineInfo {
            bytecode_start: start,
            line,
            file: self.current_file,
        };
        match self.lines.last_mut() {
            Some(last) if last.bytecode_start == start => *last = info,
            Some(last) if last.line == line && last.file == info.file => {}
            _ => self.lines.push(info),
        }
        self.emit(words)
    }

    /// Build the module.
    ///
    /// Offsets emitted before the first line entry are attributed to line 0.
    pub fn build(self) -> Result<Module> {
        let mut lines = self.lines;
        if lines.first().is_none_or(|l| l.bytecode_start != 0) {
            lines.insert(0, LineInfo::new(0, 0));
        }
        Ok(Module {
            instructions: self.instructions,
            line_table: LineTable::new(lines)?,
            filenames: self.filenames,
            idents: self.idents,
            spec_idents: self.spec_idents,
            functions: self.functions,
            structs: self.structs,
            types: self.types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BytecodeError;
    use crate::opcode::Opcode;

    #[test]
    fn test_module_roundtrip() {
        let mut builder = Module::builder();
        builder.add_file("main.kelp");
        let f = builder.add_function(FunctionInfo::new("main", 0));
        let x = builder.add_variable(Ident::new("x").global(), TypeIndex::INT);
        builder.emit_line(1, [Opcode::PushInt.to_word(), 1]);
        builder.emit_line(2, [Opcode::LvalVar.to_word(), 0, x.index() as i32]);
        builder.emit([Opcode::Return.to_word(), f.index() as i32, 0, 0]);
        let module = builder.build().unwrap();

        let bytes = module.to_bytes().unwrap();
        let restored = Module::from_bytes(&bytes).unwrap();

        assert_eq!(restored, module);
        assert_eq!(restored.ident_name(x), Some("x"));
        assert_eq!(restored.function(f).map(|f| f.name.as_str()), Some("main"));
        let entry = restored.line_table.lookup(2);
        assert_eq!(restored.filename(entry), Some("main.kelp"));
    }

    #[test]
    fn test_garbage_payload() {
        assert!(matches!(
            Module::from_bytes(b"not a module"),
            Err(BytecodeError::Payload(_))
        ));
    }

    #[test]
    fn test_leading_words_get_line_zero() {
        let mut builder = Module::builder();
        builder.emit([Opcode::Dup.to_word()]);
        builder.emit_line(4, [Opcode::Pop.to_word()]);
        let module = builder.build().unwrap();
        assert_eq!(module.line_table.lookup_line(0), 0);
        assert_eq!(module.line_table.lookup_line(1), 4);
    }

    #[test]
    fn test_empty_module_builds() {
        let module = Module::builder().build().unwrap();
        assert!(module.instructions.is_empty());
        assert_eq!(module.line_table.len(), 1);
        assert_eq!(module.types.len(), TypeTable::with_builtins().len());
    }
}
